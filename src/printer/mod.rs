//! Python printers
//!
//! `TypePrinter` owns everything needed to lower one type definition to one
//! Python file: the import planner for the file, the per-method
//! `PrinterState`, and the collected diagnostics. The statement and
//! expression rules live in `stmt.rs` and `expr.rs` as further `impl`
//! blocks on the same struct so that all three share one state without any
//! process-wide globals.

pub mod expr;
pub mod stmt;
pub mod typedef;


use std::collections::HashMap;

use crate::ast::{ClosureExpr, Expr, Pod, TypeDef, TypeRef};
use crate::diagnostics::{warning_diag, NskDiagnostics};
use crate::imports::{sanitize_sig, ImportResolver};

/// Hand-written runtime types whose instance fields are Python
/// `@property` objects rather than method-style accessors
const PROPERTY_TYPES: &[&str] = &["sys::Map", "sys::List", "sys::Type", "sys::StrBuf"];

pub fn is_property_type(qname: &str) -> bool {
    PROPERTY_TYPES.contains(&qname)
}

/// A multi-statement closure awaiting emission of its `def`
#[derive(Debug, Clone, Copy)]
pub struct PendingClosure<'a> {
    pub id: u32,
    pub closure: &'a ClosureExpr,
    /// Index of the first statement whose subtree mentions the closure
    pub first_use: usize,
}

/// Shared mutable printing context, re-initialized per method
#[derive(Debug, Default)]
pub struct PrinterState<'a> {
    pub current_method: String,
    pub indent: usize,
    /// Static method or static-field initializer: no `self` in scope
    pub in_static_context: bool,
    /// Emitting the body of an inline lambda that captured outer `this`
    pub in_closure_with_outer: bool,
    /// Emitting the body of an extracted multi-statement closure
    pub in_wrapped_closure: bool,
    pub closure_count: u32,
    pub switch_var_count: u32,
    /// Closure node identity (address) -> closure id, built by the pre-pass
    pub registered_closures: HashMap<usize, u32>,
    pub stmt_index: usize,
    pub closure_depth: usize,
    /// Update expression of each enclosing loop; a for loop pushes
    /// Some(update), a while pushes None, so `continue` always targets the
    /// innermost loop and never inherits an outer for's update
    pub for_loop_update: Vec<Option<&'a Expr>>,
    /// Original local name -> its captured-variable wrapper name
    pub param_wrappers: HashMap<String, String>,
    /// Catch variable whose localDef is suppressed in the current except body
    pub suppress_local: Option<String>,
    /// First invariant violation hit while printing; fatal for the type
    pub invariant_error: Option<String>,
}

impl<'a> PrinterState<'a> {
    pub fn reset_for_method(&mut self, name: &str, is_static: bool) {
        *self = PrinterState {
            current_method: name.to_string(),
            in_static_context: is_static,
            ..PrinterState::default()
        };
    }

    pub fn next_closure_id(&mut self) -> u32 {
        let id = self.closure_count;
        self.closure_count += 1;
        id
    }

    pub fn next_switch_var(&mut self) -> u32 {
        let id = self.switch_var_count;
        self.switch_var_count += 1;
        id
    }

    pub fn invariant(&mut self, message: String) {
        if self.invariant_error.is_none() {
            self.invariant_error = Some(message);
        }
    }
}

/// Identity key for a closure node; the AST is immutable for the life of
/// one method so the address is stable
pub fn closure_key(closure: &ClosureExpr) -> usize {
    closure as *const ClosureExpr as usize
}

/// Prints one type definition as one Python file
pub struct TypePrinter<'a> {
    pub pod: &'a Pod,
    pub def: &'a TypeDef,
    pub resolver: ImportResolver,
    pub state: PrinterState<'a>,
    pub diags: NskDiagnostics,
}

impl<'a> TypePrinter<'a> {
    pub fn new(pod: &'a Pod, def: &'a TypeDef) -> Self {
        let mut resolver = ImportResolver::new(&pod.name);
        resolver.set_local(&pod.name, &def.name);
        Self {
            pod,
            def,
            resolver,
            state: PrinterState::default(),
            diags: NskDiagnostics::new(),
        }
    }

    pub fn ind(&self) -> String {
        "    ".repeat(self.state.indent)
    }

    /// Signature of a type reference as an embeddable string
    pub fn sig(&self, t: &TypeRef) -> String {
        sanitize_sig(&t.signature)
    }

    /// Element-type signature of a parameterized List, falling back to
    /// "sys::Obj?" with a diagnostic when the metadata is missing
    pub fn element_sig(&mut self, t: &TypeRef) -> String {
        match t.element() {
            Some(e) => self.sig(e),
            None => {
                self.type_meta_fallback(&t.signature);
                "sys::Obj?".to_string()
            }
        }
    }

    pub fn key_sig(&mut self, t: &TypeRef) -> String {
        match t.key() {
            Some(k) => self.sig(k),
            None => {
                self.type_meta_fallback(&t.signature);
                "sys::Obj?".to_string()
            }
        }
    }

    fn type_meta_fallback(&mut self, sig: &str) {
        self.diags.add(warning_diag(
            "NSK-TYPE-META",
            format!("no parameterized type metadata on {sig}, using sys::Obj?"),
            &self.def.qname(),
            "expr",
        ));
    }

    /// The `self` expression in the current context
    pub fn this_ref(&self) -> String {
        if self.state.in_wrapped_closure {
            "_self".to_string()
        } else if self.state.in_closure_with_outer {
            "_outer".to_string()
        } else {
            "self".to_string()
        }
    }
}

/// Escape a string as a double-quoted Python literal. Non-ASCII characters
/// are preserved as `\x`, `\u` or `\U` escapes; code points beyond the BMP
/// come out as a single `\U` escape (surrogate pairs in the source were
/// already combined by the front-end's decoder).
pub fn py_str_lit(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\x{:02x}", c as u32)),
            c if c.is_ascii() => out.push(c),
            c if (c as u32) < 0x100 => out.push_str(&format!("\\x{:02x}", c as u32)),
            c if (c as u32) < 0x10000 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push_str(&format!("\\U{:08x}", c as u32)),
        }
    }
    out.push('"');
    out
}

/// Escape a string as a single-quoted Python literal (used for signature
/// and slot-name strings, which are always ASCII)
pub fn py_sig_lit(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}
