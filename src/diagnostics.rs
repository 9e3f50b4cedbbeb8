//! NskDiagnostics - per-pod emission diagnostics collection and output
//!
//! Recoverable per-node fallbacks (unsupported expression kinds, missing
//! parameterized type metadata) are recorded here instead of aborting the
//! pod. `--diag-json` on the CLI prints the collection as JSON.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Serialize)]
pub struct NskDiagnostic {
    pub code: String,
    pub message: String,
    pub severity: DiagnosticSeverity,
    /// Qualified name of the type being emitted, e.g. "testPod::Foo"
    pub type_qname: String,
    /// Pipeline phase: "expr", "stmt", "type", "pod"
    pub phase: String,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct NskDiagnostics {
    pub diagnostics: Vec<NskDiagnostic>,
}

impl NskDiagnostics {
    pub fn new() -> Self {
        Self {
            diagnostics: Vec::new(),
        }
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| matches!(d.severity, DiagnosticSeverity::Error))
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn add(&mut self, diag: NskDiagnostic) {
        self.diagnostics.push(diag);
    }

    pub fn extend(&mut self, other: NskDiagnostics) {
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for diag in &self.diagnostics {
            out.push_str(&format!(
                "[{}] {} {}\n",
                diag.code, diag.type_qname, diag.message
            ));
        }
        out
    }
}

pub fn warning_diag(code: &str, message: String, type_qname: &str, phase: &str) -> NskDiagnostic {
    NskDiagnostic {
        code: code.to_string(),
        message,
        severity: DiagnosticSeverity::Warning,
        type_qname: type_qname.to_string(),
        phase: phase.to_string(),
    }
}

pub fn error_diag(code: &str, message: String, type_qname: &str, phase: &str) -> NskDiagnostic {
    NskDiagnostic {
        code: code.to_string(),
        message,
        severity: DiagnosticSeverity::Error,
        type_qname: type_qname.to_string(),
        phase: phase.to_string(),
    }
}
