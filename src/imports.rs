//! Import resolution
//!
//! Python's module system initializes eagerly, so cross-type references
//! inside one pod would deadlock on circular imports if emitted as plain
//! top-of-file imports. Each reference is therefore classified into one of
//! three forms: a direct import (safe for bases, mixins and catch-clause
//! classes, which Python requires in local scope), a namespace prefix
//! (`sys.` or another pod's name), or a per-use dynamic `__import__`
//! expression the runtime caches to amortize.

use crate::ast::TypeRef;

/// Which reference form a (current pod, target type) pair resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportForm {
    /// `from fan.<pod>.<Name> import <Name>` at top of file
    Direct,
    /// `sys.<Name>` after a single `from fan import sys`
    SysPrefix,
    /// `__import__('fan.<pod>.<Name>', fromlist=['<Name>']).<Name>` per use
    DynamicImport,
    /// `from fan import <pod>` then `<pod>.<Name>`
    Namespace,
}

/// Per-file import planner. TypePrinter registers the always-direct types
/// (base, mixins, Obj, ObjUtil, catch-clause classes) up front; expression
/// emission then asks for reference strings and the planner accumulates
/// whatever top-of-file imports those require.
#[derive(Debug, Clone)]
pub struct ImportResolver {
    current_pod: String,
    /// The type being emitted; self-references need no import at all
    local: Option<(String, String)>,
    /// (pod, type name) pairs imported directly, in registration order
    direct: Vec<(String, String)>,
    uses_sys: bool,
    namespaces: Vec<String>,
}

impl ImportResolver {
    pub fn new(current_pod: &str) -> Self {
        Self {
            current_pod: current_pod.to_string(),
            local: None,
            direct: Vec::new(),
            uses_sys: false,
            namespaces: Vec::new(),
        }
    }

    /// Mark the type currently being emitted; references to it resolve to
    /// the bare class name with no import
    pub fn set_local(&mut self, pod: &str, name: &str) {
        self.local = Some((pod.to_string(), name.to_string()));
    }

    /// Force the `from fan import sys` namespace line; every non-sys type
    /// file carries it
    pub fn require_sys(&mut self) {
        self.uses_sys = true;
    }

    fn is_local(&self, target: &TypeRef) -> bool {
        match &self.local {
            Some((p, n)) => *p == target.pod_name && *n == target.name,
            None => false,
        }
    }

    /// Register a type imported directly at the top of the file
    pub fn register_direct(&mut self, target: &TypeRef) {
        if self.is_local(target) {
            return;
        }
        let key = (target.pod_name.clone(), target.name.clone());
        if !self.direct.contains(&key) {
            self.direct.push(key);
        }
    }

    fn is_direct(&self, target: &TypeRef) -> bool {
        self.direct
            .iter()
            .any(|(p, n)| *p == target.pod_name && *n == target.name)
    }

    /// Classify the reference form for a target type
    pub fn classify(&self, target: &TypeRef) -> ImportForm {
        if self.is_local(target) || self.is_direct(target) {
            ImportForm::Direct
        } else if target.is_sys() && self.current_pod != "sys" {
            ImportForm::SysPrefix
        } else if target.pod_name == self.current_pod {
            ImportForm::DynamicImport
        } else {
            ImportForm::Namespace
        }
    }

    /// Reference string for one use of the target type, recording any
    /// top-of-file import it needs
    pub fn type_ref(&mut self, target: &TypeRef) -> String {
        match self.classify(target) {
            ImportForm::Direct => target.name.clone(),
            ImportForm::SysPrefix => {
                self.uses_sys = true;
                format!("sys.{}", target.name)
            }
            ImportForm::DynamicImport => format!(
                "__import__('fan.{}.{}', fromlist=['{}']).{}",
                target.pod_name, target.name, target.name, target.name
            ),
            ImportForm::Namespace => {
                if !self.namespaces.contains(&target.pod_name) {
                    self.namespaces.push(target.pod_name.clone());
                }
                format!("{}.{}", target.pod_name, target.name)
            }
        }
    }

    /// The accumulated top-of-file import lines, in region order:
    /// sys namespace, direct imports, other pod namespaces
    pub fn header(&self) -> String {
        let mut out = String::new();
        if self.uses_sys {
            out.push_str("from fan import sys\n");
        }
        for (pod, name) in &self.direct {
            out.push_str(&format!("from fan.{pod}.{name} import {name}\n"));
        }
        for pod in &self.namespaces {
            out.push_str(&format!("from fan import {pod}\n"));
        }
        out
    }
}

/// Sanitize a type signature for embedding as a string literal.
///
/// Java-FFI signatures (`[java]java.util::Date`) would not survive the
/// runtime's signature parser; they are rewritten to a plain `pod::Name`
/// shape so `Type.find` fails deterministically instead of at parse time.
pub fn sanitize_sig(sig: &str) -> String {
    if let Some(rest) = sig.strip_prefix("[java]") {
        let (pod, name) = match rest.split_once("::") {
            Some((p, n)) => (p.replace('.', "_"), n.to_string()),
            None => (rest.replace('.', "_"), "Obj".to_string()),
        };
        return format!("{pod}::{name}");
    }
    sig.to_string()
}
