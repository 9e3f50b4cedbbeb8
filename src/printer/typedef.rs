//! Type definition lowering
//!
//! Emits one Python file per type: path setup, imports, the class body
//! (constructor factories, field accessors, methods, lazy static init),
//! and the module-level reflection registration block. Output is fully
//! buffered; a type either produces its whole file or nothing.

use crate::ast::{Block, FieldDef, MethodDef, Stmt, TypeRef};
use crate::error::{NishikiError, Result};
use crate::names::python_name;

use super::{py_sig_lit, TypePrinter};

impl<'a> TypePrinter<'a> {
    /// Emit the complete Python file for this type
    pub fn emit_file(&mut self) -> Result<String> {
        let def = self.def;
        self.register_file_imports();

        let mut body = String::new();
        body.push_str(&self.emit_class_header());
        body.push_str(&self.emit_init());
        for ctor in def.ctors() {
            body.push_str(&self.emit_ctor(ctor));
        }
        if def.is_enum() {
            body.push_str(&self.emit_enum_support());
        }
        for field in &def.fields {
            if field.is_synthetic() || field.is_enum_const() {
                continue;
            }
            body.push_str(&self.emit_field_accessor(field));
        }
        for method in &def.methods {
            if method.is_ctor() || method.is_synthetic() {
                continue;
            }
            body.push_str(&self.emit_method(method));
        }
        if def.has_static_fields() {
            body.push_str(&self.emit_static_init());
        }
        body.push('\n');
        body.push_str(&self.reflection_block());

        if let Some(message) = self.state.invariant_error.take() {
            return Err(NishikiError::Invariant {
                pod: self.pod.name.clone(),
                type_name: self.def.name.clone(),
                message,
            });
        }

        // the header is assembled last: emission above discovers which
        // imports each expression needs
        let mut out = String::new();
        out.push_str("import sys as sys_module\n");
        out.push_str("sys_module.path.insert(0, '.')\n");
        out.push_str("from typing import Optional, Callable, List as TypingList, Dict as TypingDict\n");
        out.push_str(&self.resolver.header());
        out.push('\n');
        out.push_str(&body);
        Ok(out)
    }

    /// Register the always-direct imports: Obj and ObjUtil, the base
    /// class, every mixin, and every catch-clause exception type (Python
    /// requires the except class in local scope)
    fn register_file_imports(&mut self) {
        let def = self.def;
        if self.pod.name != "sys" {
            self.resolver.require_sys();
        }
        self.resolver.register_direct(&TypeRef::obj());
        self.resolver.register_direct(&TypeRef::sys("ObjUtil"));
        if let Some(base) = &def.base {
            self.resolver.register_direct(base);
        }
        for mixin in &def.mixins {
            self.resolver.register_direct(mixin);
        }
        let mut catch_types: Vec<&TypeRef> = Vec::new();
        for method in def.methods.iter().chain(&def.synthetic_methods) {
            if let Some(body) = &method.body {
                collect_catch_types(body, &mut catch_types);
            }
        }
        for field in &def.fields {
            if let Some(init) = &field.init {
                if let crate::ast::ExprKind::Closure(c) = &init.kind {
                    collect_catch_types(&c.body, &mut catch_types);
                }
            }
        }
        for t in catch_types {
            self.resolver.register_direct(t);
        }
    }

    fn emit_class_header(&mut self) -> String {
        let def = self.def;
        let mut bases: Vec<String> = Vec::new();
        if let Some(base) = &def.base {
            bases.push(self.resolver.type_ref(base));
        }
        for mixin in &def.mixins {
            bases.push(self.resolver.type_ref(mixin));
        }
        let name = &def.name;
        let mut out = if bases.is_empty() {
            format!("class {name}:\n")
        } else {
            format!("class {name}({}):\n", bases.join(", "))
        };
        // class-level storage for statics, filled in lazily by _static_init
        if def.has_static_fields() {
            out.push_str("    _static_init_done = False\n");
            out.push_str("    _static_init_in_progress = False\n");
            for field in &def.fields {
                if field.is_static() && !field.is_enum_const() && !field.is_synthetic() {
                    out.push_str(&format!("    {} = None\n", Self::storage_name(&field.name)));
                }
            }
        }
        if def.is_enum() {
            out.push_str("    _vals_list = None\n");
        }
        out.push('\n');
        out
    }

    /// `__init__` gives every instance field its declared-initializer
    /// lowering (or None); generated code never calls it directly, only
    /// the constructor factories do
    fn emit_init(&mut self) -> String {
        let def = self.def;
        let mut out = String::from("    def __init__(self):\n");
        if let Some(base) = &def.base {
            let base_ref = self.resolver.type_ref(base);
            out.push_str(&format!("        {base_ref}.__init__(self)\n"));
        }
        let instance_fields: Vec<&FieldDef> = def
            .fields
            .iter()
            .filter(|f| !f.is_static() && !f.is_synthetic())
            .collect();
        if instance_fields.is_empty() && def.base.is_none() {
            out.push_str("        pass\n");
            out.push('\n');
            return out;
        }
        for field in instance_fields {
            self.state.reset_for_method("__init__", false);
            self.state.indent = 2;
            let value = match &field.init {
                Some(e) => self.emit_expr(e),
                None => "None".to_string(),
            };
            out.push_str(&format!(
                "        self.{} = {value}\n",
                Self::storage_name(&field.name)
            ));
        }
        out.push('\n');
        out
    }

    /// One constructor: a class-level factory that allocates through
    /// `__init__` and runs the ctor body method on the fresh instance
    fn emit_ctor(&mut self, ctor: &'a MethodDef) -> String {
        let name = &self.def.name;
        let factory = python_name(&ctor.name);
        let body_method = format!("_{factory}");
        let params = Self::param_list(&ctor.params);
        let args = Self::arg_list(&ctor.params);

        let mut out = String::from("    @staticmethod\n");
        out.push_str(&format!("    def {factory}({params}):\n"));
        out.push_str(&format!("        self_ = {name}()\n"));
        if args.is_empty() {
            out.push_str(&format!("        {name}.{body_method}(self_)\n"));
        } else {
            out.push_str(&format!("        {name}.{body_method}(self_, {args})\n"));
        }
        out.push_str("        return self_\n\n");

        let body_params = if params.is_empty() {
            "self".to_string()
        } else {
            format!("self, {params}")
        };
        out.push_str(&format!("    def {body_method}({body_params}):\n"));
        self.state.reset_for_method(&ctor.name, false);
        self.state.indent = 2;
        match &ctor.body {
            Some(block) => out.push_str(&self.emit_body_with_closures(block)),
            None => out.push_str("        pass\n"),
        }
        out.push('\n');
        out
    }

    fn param_list(params: &[crate::ast::ParamDef]) -> String {
        let parts: Vec<String> = params
            .iter()
            .map(|p| {
                if p.has_default {
                    format!("{}=None", python_name(&p.name))
                } else {
                    python_name(&p.name)
                }
            })
            .collect();
        parts.join(", ")
    }

    fn arg_list(params: &[crate::ast::ParamDef]) -> String {
        let parts: Vec<String> = params.iter().map(|p| python_name(&p.name)).collect();
        parts.join(", ")
    }

    /// Field accessor per the runtime convention: one callable doing both
    /// get and set (`_val_=None`), get-only when the setter is not public,
    /// nothing at all for fully-private fields
    fn emit_field_accessor(&mut self, field: &'a FieldDef) -> String {
        if field.is_private() && field.setter_is_private() {
            return String::new();
        }
        let accessor = python_name(&field.name);
        let storage = Self::storage_name(&field.name);
        let name = &self.def.name;
        let get_only = field.is_get_only();

        if field.is_static() {
            let mut out = String::from("    @staticmethod\n");
            if get_only {
                out.push_str(&format!("    def {accessor}():\n"));
                out.push_str(&format!("        {name}._static_init()\n"));
                out.push_str(&format!("        return {name}.{storage}\n\n"));
            } else {
                out.push_str(&format!("    def {accessor}(_val_=None):\n"));
                out.push_str(&format!("        {name}._static_init()\n"));
                out.push_str("        if _val_ is None:\n");
                out.push_str(&format!("            return {name}.{storage}\n"));
                out.push_str(&format!("        {name}.{storage} = _val_\n\n"));
            }
            return out;
        }

        if get_only {
            let mut out = format!("    def {accessor}(self):\n");
            out.push_str(&format!("        return self.{storage}\n\n"));
            out
        } else {
            let mut out = format!("    def {accessor}(self, _val_=None):\n");
            out.push_str("        if _val_ is None:\n");
            out.push_str(&format!("            return self.{storage}\n"));
            out.push_str(&format!("        self.{storage} = _val_\n\n"));
            out
        }
    }

    fn emit_method(&mut self, method: &'a MethodDef) -> String {
        let def_name = python_name(&method.name);
        let params = Self::param_list(&method.params);
        let mut out = String::new();
        if method.is_static() {
            out.push_str("    @staticmethod\n");
            out.push_str(&format!("    def {def_name}({params}):\n"));
        } else {
            let full = if params.is_empty() {
                "self".to_string()
            } else {
                format!("self, {params}")
            };
            out.push_str(&format!("    def {def_name}({full}):\n"));
        }
        self.state.reset_for_method(&method.name, method.is_static());
        self.state.indent = 2;
        match &method.body {
            Some(block) => out.push_str(&self.emit_body_with_closures(block)),
            None => out.push_str("        pass\n"),
        }
        out.push('\n');
        out
    }

    /// Enum machinery: the lazy `_vals` list built through `object.__new__`
    /// (never the factories), one static accessor per constant, and the
    /// ordinal/name/from_str surface
    fn emit_enum_support(&mut self) -> String {
        let def = self.def;
        let name = def.name.clone();
        let names: Vec<String> = def
            .enum_constants()
            .iter()
            .map(|c| c.name.clone())
            .collect();
        let name_list = names
            .iter()
            .map(|n| py_sig_lit(n))
            .collect::<Vec<_>>()
            .join(", ");
        let list_ref = self.sys_ref("List");
        let qname = self.def.qname();

        let mut out = String::from("    @staticmethod\n    def _vals():\n");
        out.push_str(&format!("        if {name}._vals_list is None:\n"));
        out.push_str("            vals = []\n");
        out.push_str(&format!(
            "            for i, n in enumerate([{name_list}]):\n"
        ));
        out.push_str(&format!("                inst = object.__new__({name})\n"));
        out.push_str("                inst._ordinal = i\n");
        out.push_str("                inst._name = n\n");
        out.push_str("                vals.append(inst)\n");
        out.push_str(&format!(
            "            {name}._vals_list = {list_ref}.from_literal(vals, {}).to_immutable()\n",
            py_sig_lit(&qname)
        ));
        out.push_str(&format!("        return {name}._vals_list\n\n"));

        for (i, constant) in names.iter().enumerate() {
            let accessor = python_name(constant);
            out.push_str("    @staticmethod\n");
            out.push_str(&format!("    def {accessor}():\n"));
            out.push_str(&format!("        return {name}._vals().get({i})\n\n"));
        }

        out.push_str("    def ordinal(self):\n        return self._ordinal\n\n");
        out.push_str("    def name(self):\n        return self._name\n\n");

        let parse_err = self.sys_ref("ParseErr");
        out.push_str("    @staticmethod\n");
        out.push_str("    def from_str(name, checked=True):\n");
        out.push_str(&format!("        for v in {name}._vals():\n"));
        out.push_str("            if v._name == name:\n");
        out.push_str("                return v\n");
        out.push_str("        if checked:\n");
        out.push_str(&format!(
            "            raise {parse_err}.make({} + name)\n",
            py_sig_lit(&format!("{qname}: "))
        ));
        out.push_str("        return None\n\n");
        out
    }

    /// Lazy static-field initialization, guarded against re-entry so a
    /// static initializer that touches another static of the same type
    /// cannot recurse
    fn emit_static_init(&mut self) -> String {
        let name = self.def.name.clone();
        let mut out = String::from("    @staticmethod\n    def _static_init():\n");
        out.push_str(&format!(
            "        if {name}._static_init_done or {name}._static_init_in_progress:\n"
        ));
        out.push_str("            return\n");
        out.push_str(&format!("        {name}._static_init_in_progress = True\n"));
        let def = self.def;
        let static_fields: Vec<&FieldDef> = def
            .fields
            .iter()
            .filter(|f| f.is_static() && !f.is_enum_const() && !f.is_synthetic())
            .collect();
        for field in static_fields {
            self.state.reset_for_method("_static_init", true);
            self.state.indent = 2;
            let value = match &field.init {
                Some(e) => self.emit_expr(e),
                None => "None".to_string(),
            };
            out.push_str(&format!(
                "        {name}.{} = {value}\n",
                Self::storage_name(&field.name)
            ));
        }
        out.push_str(&format!("        {name}._static_init_done = True\n"));
        out.push_str(&format!(
            "        {name}._static_init_in_progress = False\n\n"
        ));
        out
    }

    /// The module-level reflection registration block. Every type
    /// reference is a literal string; nothing is evaluated at import time
    /// beyond the Type.find placeholder.
    pub fn reflection_block(&mut self) -> String {
        let def = self.def;
        let type_ref = self.sys_ref("Type");
        let param_ref = self.sys_ref("Param");
        let mut out = format!("_t = {type_ref}.find({})\n", py_sig_lit(&def.qname()));
        for field in &def.fields {
            if field.is_synthetic() {
                continue;
            }
            let sig = py_sig_lit(&self.sig(&field.ctype));
            let name = py_sig_lit(&field.name);
            let flags = field.flags;
            match field.setter_flags {
                Some(sf) if field.has_explicit_setter => {
                    out.push_str(&format!("_t.af_({name}, {flags}, {sig}, None, {sf})\n"));
                }
                _ => {
                    out.push_str(&format!("_t.af_({name}, {flags}, {sig}, None)\n"));
                }
            }
        }
        for method in &def.methods {
            if method.is_synthetic() {
                continue;
            }
            let name = py_sig_lit(&method.name);
            let flags = method.flags;
            let ret = py_sig_lit(&self.sig(&method.returns));
            let params: Vec<String> = method
                .params
                .iter()
                .map(|p| {
                    format!(
                        "{param_ref}({}, {}, {})",
                        py_sig_lit(&p.name),
                        py_sig_lit(&self.sig(&p.ctype)),
                        if p.has_default { "True" } else { "False" }
                    )
                })
                .collect();
            out.push_str(&format!(
                "_t.am_({name}, {flags}, {ret}, [{}], None)\n",
                params.join(", ")
            ));
        }
        out
    }
}

/// Collect every catch-clause exception type in a block, recursively,
/// including closure bodies
fn collect_catch_types<'a>(block: &'a Block, out: &mut Vec<&'a TypeRef>) {
    for stmt in &block.stmts {
        match stmt {
            Stmt::Try {
                body,
                catches,
                finally,
            } => {
                collect_catch_types(body, out);
                for c in catches {
                    out.push(&c.err_type);
                    collect_catch_types(&c.body, out);
                }
                if let Some(b) = finally {
                    collect_catch_types(b, out);
                }
            }
            Stmt::If {
                then_block,
                else_block,
                ..
            } => {
                collect_catch_types(then_block, out);
                if let Some(b) = else_block {
                    collect_catch_types(b, out);
                }
            }
            Stmt::For { body, .. } | Stmt::While { body, .. } => {
                collect_catch_types(body, out);
            }
            Stmt::Switch { cases, default, .. } => {
                for c in cases {
                    collect_catch_types(&c.body, out);
                }
                if let Some(b) = default {
                    collect_catch_types(b, out);
                }
            }
            _ => {}
        }
    }
}
