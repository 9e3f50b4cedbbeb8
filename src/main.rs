//! Nishiki CLI - Pod AST to Python Transpiler
//!
//! Author: Tane Channel Technology

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use nishiki::{load_pod, render_pod, transpile_pod, TranspileOptions};

/// Nishiki - Pod AST to Python Transpiler
#[derive(Parser, Debug)]
#[command(name = "nsk")]
#[command(author = "Tane Channel Technology")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Transpile a pod AST to Python", long_about = None)]
struct Cli {
    /// Input pod AST files (JSON), one per pod, in dependency order
    #[arg(value_name = "POD_AST", required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory root (fan/<pod>/ is created beneath it)
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    out_dir: PathBuf,

    /// Directory of hand-written native .py files, <DIR>/<pod>/ per pod
    #[arg(short, long, value_name = "DIR")]
    natives: Option<PathBuf>,

    /// Check only (don't write output)
    #[arg(short, long)]
    check: bool,

    /// Dump the parsed pod AST and exit
    #[arg(long)]
    dump_ast: bool,

    /// Emit JSON diagnostics to stderr
    #[arg(long)]
    diag_json: bool,

    /// Show debug information
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    for input in &cli.inputs {
        if cli.debug {
            println!("[DEBUG] Input: {input:?}");
            println!("[DEBUG] Output: {:?}", cli.out_dir);
        }

        let pod = match load_pod(input) {
            Ok(pod) => pod,
            Err(err) => {
                eprintln!("ERROR: {}: {err}", input.display());
                std::process::exit(1);
            }
        };

        if cli.dump_ast {
            println!("=== Pod AST: {} ===", pod.name);
            for (i, def) in pod.types.iter().enumerate() {
                println!("[{i:03}] {:?}", def);
            }
            continue;
        }

        let natives = cli.natives.as_ref().map(|d| d.join(&pod.name));
        let natives = natives.filter(|d| d.is_dir());

        if cli.check {
            match render_pod(&pod, natives.as_deref()) {
                Ok((files, diags)) => {
                    if cli.debug {
                        for file in &files {
                            println!("[DEBUG] rendered {} ({} bytes)", file.name, file.text.len());
                        }
                    }
                    if cli.diag_json && !diags.is_empty() {
                        eprintln!("{}", diags.to_json());
                    }
                    println!("✅ Pod {} renders clean", pod.name);
                }
                Err(err) => {
                    eprintln!("ERROR: {err}");
                    std::process::exit(1);
                }
            }
            continue;
        }

        let opts = TranspileOptions {
            out_dir: cli.out_dir.clone(),
            natives,
        };
        match transpile_pod(&pod, &opts) {
            Ok(output) => {
                if !output.diags.is_empty() {
                    if cli.diag_json {
                        eprintln!("{}", output.diags.to_json());
                    } else if cli.debug {
                        eprint!("{}", output.diags.to_text());
                    }
                }
                println!(
                    "✅ Transpiled pod {} ({} files)",
                    pod.name,
                    output.files.len()
                );
            }
            Err(err) => {
                eprintln!("ERROR: {err}");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
