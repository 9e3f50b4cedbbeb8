//! Pod orchestration
//!
//! Walks a pod's types in the order the front-end flattened them, renders
//! each non-synthetic type to its `.py` text (or merges the reflection
//! block onto a hand-written native file), and writes the output tree
//! `<outDir>/fan/<pod>/` plus the pod's lazy-loading `__init__.py`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::ast::Pod;
use crate::diagnostics::NskDiagnostics;
use crate::error::Result;
use crate::printer::TypePrinter;

/// Transpiler options consumed by the driver
#[derive(Debug, Clone, Default)]
pub struct TranspileOptions {
    /// Root of the output tree; `fan/<pod>/` is created beneath it
    pub out_dir: PathBuf,
    /// Directory of hand-written native `.py` files for this pod, if any
    pub natives: Option<PathBuf>,
}

/// One rendered file: name within the pod directory plus its full text
#[derive(Debug, Clone)]
pub struct RenderedFile {
    pub name: String,
    pub text: String,
}

/// Result of emitting one pod
#[derive(Debug)]
pub struct PodOutput {
    pub files: Vec<PathBuf>,
    pub diags: NskDiagnostics,
}

/// Render every file of the pod without touching the filesystem (other
/// than reading native inputs). Types render in input order; any failure
/// is fatal for the whole pod.
pub fn render_pod(
    pod: &Pod,
    natives: Option<&Path>,
) -> Result<(Vec<RenderedFile>, NskDiagnostics)> {
    let mut files = Vec::new();
    let mut diags = NskDiagnostics::new();
    let mut declared: Vec<String> = Vec::new();

    for def in &pod.types {
        if def.is_synthetic() {
            continue;
        }
        let mut printer = TypePrinter::new(pod, def);
        let native_path = natives
            .map(|d| d.join(format!("{}.py", def.name)))
            .filter(|p| p.is_file());
        let text = match native_path {
            Some(path) => {
                // the native body is authoritative; only the reflection
                // registration is generated
                let mut out = fs::read_to_string(&path)?;
                if !out.ends_with('\n') {
                    out.push('\n');
                }
                out.push('\n');
                out.push_str(&printer.reflection_block());
                out
            }
            None => printer.emit_file()?,
        };
        diags.extend(printer.diags);
        files.push(RenderedFile {
            name: format!("{}.py", def.name),
            text,
        });
        declared.push(def.name.clone());
    }

    files.push(RenderedFile {
        name: "__init__.py".to_string(),
        text: pod_init_file(pod, &declared),
    });
    Ok((files, diags))
}

/// Render and write the pod's output tree
pub fn emit_pod(pod: &Pod, opts: &TranspileOptions) -> Result<PodOutput> {
    let (rendered, diags) = render_pod(pod, opts.natives.as_deref())?;
    let pod_dir = opts.out_dir.join("fan").join(&pod.name);
    fs::create_dir_all(&pod_dir)?;
    let mut files = Vec::new();
    for file in rendered {
        let path = pod_dir.join(&file.name);
        fs::write(&path, &file.text)?;
        files.push(path);
    }
    Ok(PodOutput { files, diags })
}

/// The pod's `__init__.py`: a name-to-module table and a module-level
/// `__getattr__` that imports lazily on first access, with a `_loading`
/// set guarding against import loops
fn pod_init_file(pod: &Pod, names: &[String]) -> String {
    let mut out = String::from("_types = {\n");
    for name in names {
        out.push_str(&format!("    '{name}': 'fan.{}.{name}',\n", pod.name));
    }
    out.push_str("}\n");
    out.push_str("_loading = set()\n");
    out.push_str("\n\n");
    out.push_str("def __getattr__(name):\n");
    out.push_str("    if name in _types:\n");
    out.push_str("        if name in _loading:\n");
    out.push_str("            raise AttributeError(name)\n");
    out.push_str("        _loading.add(name)\n");
    out.push_str("        try:\n");
    out.push_str("            import importlib\n");
    out.push_str("            module = importlib.import_module(_types[name])\n");
    out.push_str("            return getattr(module, name)\n");
    out.push_str("        finally:\n");
    out.push_str("            _loading.discard(name)\n");
    out.push_str("    raise AttributeError(name)\n");
    out
}
