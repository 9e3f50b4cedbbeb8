//! Nishiki - Pod AST to Python Transpiler
//!
//! # Overview
//! Lowers the semantically-analyzed AST of a pod (one compilation unit of
//! the source language) into idiomatic Python 3.12 source text: one module
//! per type plus a lazy-loading package `__init__.py` per pod.
//!
//! # Author
//! Tane Channel Technology

pub mod ast;
pub mod diagnostics;
pub mod driver;
pub mod error;
pub mod imports;
pub mod names;
pub mod operators;
pub mod printer;

use anyhow::Result;
use std::path::Path;

pub use driver::{emit_pod, render_pod, PodOutput, TranspileOptions};

/// Load a pod AST from the JSON file the front-end produced
pub fn load_pod(path: &Path) -> Result<ast::Pod> {
    let text = std::fs::read_to_string(path)?;
    let pod = serde_json::from_str(&text)?;
    Ok(pod)
}

/// Transpile one pod into `<outDir>/fan/<pod>/`
pub fn transpile_pod(pod: &ast::Pod, opts: &TranspileOptions) -> Result<PodOutput> {
    Ok(emit_pod(pod, opts)?)
}
