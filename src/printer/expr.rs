//! Expression lowering
//!
//! One rewrite rule per expression kind. Rules that Python cannot express
//! natively (identity, truncated division, safe navigation, dynamic
//! dispatch, primitive methods) route through the runtime's `ObjUtil`
//! helpers; everything else becomes plain Python syntax.

use crate::ast::{
    AssignExpr, CallExpr, ClosureExpr, Expr, ExprKind, FieldExpr, ShortcutExpr, ShortcutOp,
    TypeRef,
};
use crate::diagnostics::error_diag;
use crate::names::python_name;
use crate::operators;

use super::stmt::is_multi_stmt;
use super::{closure_key, is_property_type, py_sig_lit, py_str_lit, TypePrinter};

/// Compiler-injected const-field validation calls; the target runtime does
/// not enforce const, so these lower to nothing
pub(crate) fn is_const_validator(name: &str) -> bool {
    name == "checkInCtor"
        || name == "enterCtor"
        || name == "exitCtor"
        || name.starts_with("checkFields")
}

/// Methods that dispatch through ObjUtil regardless of receiver: the Obj
/// identity/hash/type methods (which must also work on primitives and on
/// Map, whose Python class overrides them), plus the Num/Decimal
/// conversions
fn is_obj_util_method(parent_qname: &str, name: &str) -> bool {
    match parent_qname {
        "sys::Obj" => matches!(
            name,
            "equals" | "compare" | "hash" | "toStr" | "typeof" | "isImmutable" | "toImmutable"
                | "trap" | "with"
        ),
        "sys::Map" => matches!(name, "equals" | "hash" | "toStr" | "typeof"),
        "sys::Num" | "sys::Decimal" => matches!(name, "toInt" | "toFloat" | "toDecimal"),
        _ => false,
    }
}

/// Strip the `$N` capture suffix from a synthetic local name
pub(crate) fn capture_base(name: &str) -> &str {
    if let Some(pos) = name.rfind('$') {
        if pos > 0 && name[pos + 1..].chars().all(|c| c.is_ascii_digit()) {
            return &name[..pos];
        }
    }
    name
}

impl<'a> TypePrinter<'a> {
    pub fn emit_expr(&mut self, expr: &'a Expr) -> String {
        match &expr.kind {
            ExprKind::NullLit => "None".to_string(),
            ExprKind::BoolLit(b) => if *b { "True" } else { "False" }.to_string(),
            ExprKind::IntLit(i) => i.to_string(),
            ExprKind::FloatLit(f) => format!("{f:?}"),
            ExprKind::StrLit(s) => py_str_lit(s),
            ExprKind::ListLit { elems } => {
                let of = py_sig_lit(&self.element_sig(&expr.ctype));
                let items = self.emit_args(elems);
                let list = self.sys_ref("List");
                format!("{list}.from_literal([{items}], {of})")
            }
            ExprKind::MapLit { keys, vals } => {
                let k = py_sig_lit(&self.key_sig(&expr.ctype));
                let v = py_sig_lit(&self.element_sig(&expr.ctype));
                let keys = self.emit_args(keys);
                let vals = self.emit_args(vals);
                let map = self.sys_ref("Map");
                format!("{map}.from_literal([{keys}], [{vals}], {k}, {v})")
            }
            ExprKind::RangeLit {
                start,
                end,
                exclusive,
            } => {
                let s = self.emit_expr(start);
                let e = self.emit_expr(end);
                let x = if *exclusive { "True" } else { "False" };
                let range = self.sys_ref("Range");
                format!("{range}.make({s}, {e}, {x})")
            }
            ExprKind::DurationLit { ticks } => {
                let duration = self.sys_ref("Duration");
                format!("{duration}.make({ticks})")
            }
            ExprKind::DecimalLit { literal } => {
                let decimal = self.sys_ref("Decimal");
                format!("{decimal}.from_str({})", py_sig_lit(literal))
            }
            ExprKind::UriLit { literal } => {
                let uri = self.sys_ref("Uri");
                format!("{uri}.from_str({})", py_str_lit(literal))
            }
            ExprKind::LocalVar { name } => self.emit_local_var(name),
            ExprKind::This => self.this_ref(),
            ExprKind::Super => "super()".to_string(),
            ExprKind::It => "it".to_string(),
            ExprKind::ThrowExpr { err } => {
                let e = self.emit_expr(err);
                format!("ObjUtil.throw_({e})")
            }
            ExprKind::Call(call) => {
                if let Some((root, body)) = self.try_safe_chain(expr) {
                    return Self::wrap_safe(root, body);
                }
                let target = call.target.as_ref().map(|t| self.emit_expr(t));
                self.emit_call_resolved(call, target)
            }
            ExprKind::Construction { ctor_name, args } => {
                let class_ref = self.resolver.type_ref(&expr.ctype);
                let factory = python_name(ctor_name);
                let args = self.emit_args(args);
                format!("{class_ref}.{factory}({args})")
            }
            ExprKind::Field(field) => {
                if let Some((root, body)) = self.try_safe_chain(expr) {
                    return Self::wrap_safe(root, body);
                }
                let target = field.target.as_ref().map(|t| self.emit_expr(t));
                self.emit_field_resolved(field, target)
            }
            ExprKind::Assign(assign) => self.emit_assign(assign),
            ExprKind::Same { lhs, rhs } => {
                let a = self.emit_expr(lhs);
                let b = self.emit_expr(rhs);
                format!("ObjUtil.same({a}, {b})")
            }
            ExprKind::NotSame { lhs, rhs } => {
                let a = self.emit_expr(lhs);
                let b = self.emit_expr(rhs);
                format!("not ObjUtil.same({a}, {b})")
            }
            ExprKind::BoolNot { operand } => {
                let x = self.emit_expr(operand);
                format!("(not {x})")
            }
            ExprKind::BoolOr { operands } => {
                let parts: Vec<String> = operands.iter().map(|o| self.emit_expr(o)).collect();
                format!("({})", parts.join(" or "))
            }
            ExprKind::BoolAnd { operands } => {
                let parts: Vec<String> = operands.iter().map(|o| self.emit_expr(o)).collect();
                format!("({})", parts.join(" and "))
            }
            ExprKind::CmpNull { operand } => {
                let x = self.emit_expr(operand);
                format!("({x} is None)")
            }
            ExprKind::CmpNotNull { operand } => {
                let x = self.emit_expr(operand);
                format!("({x} is not None)")
            }
            ExprKind::IsExpr { target, check } => {
                let t = self.emit_expr(target);
                let sig = py_sig_lit(&self.sig(check));
                format!("ObjUtil.is_({t}, {sig})")
            }
            ExprKind::IsnotExpr { target, check } => {
                let t = self.emit_expr(target);
                let sig = py_sig_lit(&self.sig(check));
                format!("not ObjUtil.is_({t}, {sig})")
            }
            ExprKind::AsExpr { target, to } => {
                let t = self.emit_expr(target);
                let sig = py_sig_lit(&self.sig(to));
                format!("ObjUtil.as_({t}, {sig})")
            }
            ExprKind::Coerce { target, to } => {
                let t = self.emit_expr(target);
                let sig = py_sig_lit(&self.sig(to));
                format!("ObjUtil.coerce({t}, {sig})")
            }
            ExprKind::Ternary {
                cond,
                if_true,
                if_false,
            } => {
                let c = self.emit_expr(cond);
                let t = self.emit_expr(if_true);
                let f = self.emit_expr(if_false);
                format!("({t} if {c} else {f})")
            }
            ExprKind::Elvis { lhs, rhs } => {
                let l = self.emit_expr(lhs);
                let r = self.emit_expr(rhs);
                format!("((lambda _v: _v if _v is not None else {r})({l}))")
            }
            ExprKind::Shortcut(shortcut) => self.emit_shortcut(shortcut),
            ExprKind::Closure(closure) => self.emit_closure(closure),
            ExprKind::StaticTarget { of } => self.resolver.type_ref(of),
            ExprKind::TypeLiteral { of } => {
                let ty = self.sys_ref("Type");
                let sig = py_sig_lit(&self.sig(of));
                format!("{ty}.find({sig})")
            }
            ExprKind::SlotLiteral {
                parent,
                name,
                is_field,
            } => {
                let finder = if *is_field {
                    self.sys_ref("Field")
                } else {
                    self.sys_ref("Method")
                };
                let qname = py_sig_lit(&format!("{}.{}", self.sig_base(parent), name));
                format!("{finder}.find({qname})")
            }
            ExprKind::Unknown { kind } => {
                self.diags.add(error_diag(
                    "NSK-UNSUPPORTED-NODE",
                    format!("unknown expression kind '{kind}'"),
                    &self.def.qname(),
                    "expr",
                ));
                "None".to_string()
            }
        }
    }

    /// Reference string for a sys runtime class (List, Map, Type, ...)
    pub fn sys_ref(&mut self, name: &str) -> String {
        self.resolver.type_ref(&TypeRef::sys(name))
    }

    /// Signature without a trailing `?`, for slot qnames
    fn sig_base(&self, t: &TypeRef) -> String {
        let sig = self.sig(t);
        sig.trim_end_matches('?').to_string()
    }

    pub fn emit_args(&mut self, args: &'a [Expr]) -> String {
        let parts: Vec<String> = args.iter().map(|a| self.emit_expr(a)).collect();
        parts.join(", ")
    }

    fn emit_local_var(&mut self, name: &str) -> String {
        if name == "$this" {
            return self.this_ref();
        }
        let base = capture_base(name);
        if self.state.in_wrapped_closure {
            if let Some(wrapper) = self.state.param_wrappers.get(base) {
                return python_name(wrapper);
            }
        }
        python_name(base)
    }

    // ---- safe navigation --------------------------------------------------

    /// If `expr` heads a safe-navigation chain, return the chain root's
    /// emission and the chain body rewritten over `_safe_`. The root is
    /// referenced exactly once, as the lambda's argument.
    fn try_safe_chain(&mut self, expr: &'a Expr) -> Option<(String, String)> {
        let (target, safe) = match &expr.kind {
            ExprKind::Call(c) => (c.target.as_deref()?, c.safe),
            ExprKind::Field(f) => (f.target.as_deref()?, f.safe),
            _ => return None,
        };
        if safe {
            let root = self.emit_expr(target);
            let body = self.emit_over_target(expr, "_safe_".to_string());
            Some((root, body))
        } else {
            let (root, inner) = self.try_safe_chain(target)?;
            let body = self.emit_over_target(expr, inner);
            Some((root, body))
        }
    }

    /// Emit a call or field access with an explicit receiver string
    fn emit_over_target(&mut self, expr: &'a Expr, target: String) -> String {
        match &expr.kind {
            ExprKind::Call(c) => self.emit_call_resolved(c, Some(target)),
            ExprKind::Field(f) => self.emit_field_resolved(f, Some(target)),
            _ => unreachable!("safe chain nodes are calls or fields"),
        }
    }

    fn wrap_safe(root: String, body: String) -> String {
        format!("((lambda _safe_: None if _safe_ is None else {body})(({root})))")
    }

    // ---- calls ------------------------------------------------------------

    /// The call rewrite, given the receiver already rendered (or absent).
    /// Resolution order matters: validators, cvar wrappers, dynamic
    /// dispatch, Func invocation, ObjUtil routing, primitive rewrite,
    /// private static-dispatch, statics, then plain instance calls.
    fn emit_call_resolved(&mut self, call: &'a CallExpr, target: Option<String>) -> String {
        // 1. compiler-injected const-field validators lower to nothing
        if is_const_validator(&call.name) {
            return "None".to_string();
        }

        // 3. closure-variable wrapper construction
        if !call.is_ctor
            && call.name == "make"
            && call.args.len() == 1
            && matches!(call.target.as_deref().map(|t| &t.kind), Some(ExprKind::This))
            && !matches!(call.args[0].kind, ExprKind::Closure(_))
        {
            let arg = self.emit_expr(&call.args[0]);
            return format!("ObjUtil.cvar({arg})");
        }

        // 4. dynamic dispatch: target->name(args)
        if call.is_dynamic {
            let t = target.unwrap_or_else(|| self.this_ref());
            let name = py_sig_lit(&call.name);
            if call.args.is_empty() {
                return format!("ObjUtil.trap({t}, {name}, None)");
            }
            let args = self.emit_args(&call.args);
            return format!("ObjUtil.trap({t}, {name}, [{args}])");
        }

        // 5. Func invocation is a plain Python call
        if call.parent.qname() == "sys::Func" && (call.name == "call" || call.name == "callList") {
            let f = target.unwrap_or_else(|| self.this_ref());
            if call.name == "callList" {
                let lst = self.emit_args(&call.args);
                return format!("{f}(*{lst})");
            }
            let args = self.emit_args(&call.args);
            return format!("{f}({args})");
        }

        // 6. Obj identity/hash/type methods route through ObjUtil
        if is_obj_util_method(&call.parent.qname(), &call.name) {
            let t = target.unwrap_or_else(|| self.this_ref());
            let method = python_name(&call.name);
            if call.args.is_empty() {
                return format!("ObjUtil.{method}({t})");
            }
            let args = self.emit_args(&call.args);
            return format!("ObjUtil.{method}({t}, {args})");
        }

        // 7. primitives have no instance methods in Python
        if call.parent.is_primitive()
            && !call.is_static
            && !matches!(
                call.target.as_deref().map(|t| &t.kind),
                Some(ExprKind::StaticTarget { .. })
            )
        {
            if let Some(t) = target {
                let class_ref = self.resolver.type_ref(&call.parent);
                let method = python_name(&call.name);
                if call.args.is_empty() {
                    return format!("{class_ref}.{method}({t})");
                }
                let args = self.emit_args(&call.args);
                return format!("{class_ref}.{method}({t}, {args})");
            }
        }

        // constructor chaining runs the ctor body on the existing instance
        if call.is_ctor {
            let class_ref = self.resolver.type_ref(&call.parent);
            let body_method = format!("_{}", python_name(&call.name));
            let this = self.this_ref();
            let args = self.emit_args(&call.args);
            if args.is_empty() {
                return format!("{class_ref}.{body_method}({this})");
            }
            return format!("{class_ref}.{body_method}({this}, {args})");
        }

        // super calls use Python's own resolution
        if matches!(
            call.target.as_deref().map(|t| &t.kind),
            Some(ExprKind::Super)
        ) {
            let method = python_name(&call.name);
            let args = self.emit_args(&call.args);
            return format!("super().{method}({args})");
        }

        // 8. private instance methods dispatch statically
        if call.is_private && !call.is_static {
            let class_ref = self.resolver.type_ref(&call.parent);
            let method = python_name(&call.name);
            let t = target.unwrap_or_else(|| self.this_ref());
            if call.args.is_empty() {
                return format!("{class_ref}.{method}({t})");
            }
            let args = self.emit_args(&call.args);
            return format!("{class_ref}.{method}({t}, {args})");
        }

        // 9. statics
        if call.is_static {
            let class_ref = self.resolver.type_ref(&call.parent);
            let method = python_name(&call.name);
            let args = self.emit_args(&call.args);
            return format!("{class_ref}.{method}({args})");
        }

        // 10. plain instance call
        let method = python_name(&call.name);
        let args = self.emit_args(&call.args);
        let receiver = match target {
            Some(t) => t,
            None if self.state.in_static_context => self.resolver.type_ref(&TypeRef::of(
                &self.pod.name.clone(),
                &self.def.name.clone(),
            )),
            None => self.this_ref(),
        };
        format!("{receiver}.{method}({args})")
    }

    // ---- field access -----------------------------------------------------

    /// Storage-slot attribute name of a generated field
    pub fn storage_name(name: &str) -> String {
        format!("_{}", python_name(name))
    }

    /// Whether an access must bypass the accessor: explicit raw mode, or a
    /// field of the current type whose accessor cannot serve the access
    /// (fully private fields have no accessor at all, get-only accessors
    /// take no value). Such accesses only occur inside the declaring type.
    fn field_is_raw(&self, field: &'a FieldExpr) -> bool {
        if field.raw {
            return true;
        }
        match self.local_field_def(field) {
            Some(def) => def.is_private() || def.is_get_only(),
            None => false,
        }
    }

    /// The field definition when the access resolves to the type being
    /// emitted
    fn local_field_def(&self, field: &'a FieldExpr) -> Option<&'a crate::ast::FieldDef> {
        if field.parent.qname() != self.def.qname() {
            return None;
        }
        self.def.fields.iter().find(|f| f.name == field.name)
    }

    fn emit_field_resolved(&mut self, field: &'a FieldExpr, target: Option<String>) -> String {
        if field.is_static {
            let class_ref = self.resolver.type_ref(&field.parent);
            // a fully-private static has no accessor; read its storage
            if let Some(def) = self.local_field_def(field) {
                if def.is_private() && def.setter_is_private() {
                    return format!("{class_ref}.{}", Self::storage_name(&field.name));
                }
            }
            let accessor = python_name(&field.name);
            return format!("{class_ref}.{accessor}()");
        }
        let t = target.unwrap_or_else(|| self.this_ref());
        if self.field_is_raw(field) {
            return format!("{t}.{}", Self::storage_name(&field.name));
        }
        let accessor = python_name(&field.name);
        if is_property_type(&field.parent.qname()) {
            // hand-written runtime type: Python @property, no call
            format!("{t}.{accessor}")
        } else {
            format!("{t}.{accessor}()")
        }
    }

    // ---- assignment -------------------------------------------------------

    fn emit_assign(&mut self, assign: &'a AssignExpr) -> String {
        let rhs = self.emit_expr(&assign.rhs);
        match &assign.lhs.kind {
            ExprKind::LocalVar { name } => {
                let n = self.emit_local_var(name);
                format!("({n} := {rhs})")
            }
            ExprKind::Field(field) => self.emit_field_assign(field, rhs, assign.leave),
            _ => {
                self.diags.add(error_diag(
                    "NSK-UNSUPPORTED-NODE",
                    "assignment to a non-local, non-field location".to_string(),
                    &self.def.qname(),
                    "expr",
                ));
                "None".to_string()
            }
        }
    }

    fn emit_field_assign(&mut self, field: &'a FieldExpr, rhs: String, leave: bool) -> String {
        if field.is_static {
            let class_ref = self.resolver.type_ref(&field.parent);
            // statics without a value-taking accessor are written through
            // their storage slot; such writes only occur in-class
            if let Some(def) = self.local_field_def(field) {
                if def.is_private() || def.is_get_only() {
                    return format!("{class_ref}.{} = {rhs}", Self::storage_name(&field.name));
                }
            }
            let accessor = python_name(&field.name);
            return format!("{class_ref}.{accessor}({rhs})");
        }
        let target = field.target.as_ref().map(|t| self.emit_expr(t));
        let t = target.unwrap_or_else(|| self.this_ref());
        let raw = self.field_is_raw(field);
        if leave {
            // assignment used as a value: route through the runtime so the
            // rhs is evaluated once and returned
            let attr = if !raw && is_property_type(&field.parent.qname()) {
                python_name(&field.name)
            } else {
                Self::storage_name(&field.name)
            };
            return format!("ObjUtil.setattr_return({t}, {}, {rhs})", py_sig_lit(&attr));
        }
        if raw {
            format!("{t}.{} = {rhs}", Self::storage_name(&field.name))
        } else if is_property_type(&field.parent.qname()) {
            format!("{t}.{} = {rhs}", python_name(&field.name))
        } else {
            format!("{t}.{}({rhs})", python_name(&field.name))
        }
    }

    // ---- shortcut operators ----------------------------------------------

    /// Apply a binary operator method to two rendered operands: a native
    /// token where one exists, the truncation helpers for integer div/mod,
    /// the Str.plus coercion, or a plain method call as the fallback
    fn apply_binary(&mut self, method: &str, str_rhs_coerces: bool, a: String, b: String) -> String {
        if method == "sys::Str.plus" && str_rhs_coerces {
            let class_ref = self.sys_ref("Str");
            return format!("{class_ref}.plus({a}, {b})");
        }
        if let Some(tok) = operators::binary_op(method) {
            return format!("({a} {tok} {b})");
        }
        match method {
            "sys::Int.div" => format!("ObjUtil.div({a}, {b})"),
            "sys::Int.mod" => format!("ObjUtil.mod({a}, {b})"),
            _ => {
                let name = method.rsplit('.').next().unwrap_or(method);
                format!("{a}.{}({b})", python_name(name))
            }
        }
    }

    fn emit_shortcut(&mut self, shortcut: &'a ShortcutExpr) -> String {
        use ShortcutOp::*;
        match shortcut.op {
            Increment | Decrement => self.emit_incr_decr(shortcut),
            Eq | Ne => {
                let a = self.emit_expr(&shortcut.target);
                let b = self.emit_expr(&shortcut.args[0]);
                let tok = if shortcut.op == Eq { "==" } else { "!=" };
                format!("({a} {tok} {b})")
            }
            Cmp => {
                let a = self.emit_expr(&shortcut.target);
                let b = self.emit_expr(&shortcut.args[0]);
                format!("ObjUtil.compare({a}, {b})")
            }
            Lt | Le | Ge | Gt => {
                let a = self.emit_expr(&shortcut.target);
                let b = self.emit_expr(&shortcut.args[0]);
                // same-primitive comparisons order natively; everything
                // else needs the <=> tie-breaking helpers
                let lhs_ty = &shortcut.target.ctype;
                let rhs_ty = &shortcut.args[0].ctype;
                if lhs_ty.is_primitive() && !lhs_ty.is_nullable && lhs_ty.name == rhs_ty.name {
                    let tok = match shortcut.op {
                        Lt => "<",
                        Le => "<=",
                        Ge => ">=",
                        _ => ">",
                    };
                    return format!("({a} {tok} {b})");
                }
                let helper = match shortcut.op {
                    Lt => "compare_lt",
                    Le => "compare_le",
                    Ge => "compare_ge",
                    _ => "compare_gt",
                };
                format!("ObjUtil.{helper}({a}, {b})")
            }
            Get => self.emit_index_get(shortcut),
            Set => {
                let t = self.emit_expr(&shortcut.target);
                let i = self.emit_expr(&shortcut.args[0]);
                let v = self.emit_expr(&shortcut.args[1]);
                format!("{t}[{i}] = {v}")
            }
            Negate => {
                let x = self.emit_expr(&shortcut.target);
                match operators::unary_op(&shortcut.method) {
                    Some(tok) => format!("({tok}{x})"),
                    None => format!("{x}.negate()"),
                }
            }
            Plus | Minus | Mult | Div | Mod => {
                if shortcut.is_assign {
                    return self.emit_compound_assign(shortcut);
                }
                let coerces = shortcut
                    .args
                    .first()
                    .map(|a| !a.ctype.is_str())
                    .unwrap_or(false);
                let a = self.emit_expr(&shortcut.target);
                let b = self.emit_expr(&shortcut.args[0]);
                self.apply_binary(&shortcut.method.clone(), coerces, a, b)
            }
        }
    }

    /// Compound assignment `x op= v`: locals re-assign with a walrus,
    /// fields expand over raw storage, indexed locations expand in place
    fn emit_compound_assign(&mut self, shortcut: &'a ShortcutExpr) -> String {
        let method = shortcut.method.clone();
        let v = self.emit_expr(&shortcut.args[0]);
        match &shortcut.target.kind {
            ExprKind::LocalVar { name } => {
                let n = self.emit_local_var(name);
                let applied = self.apply_binary(&method, false, n.clone(), v);
                format!("({n} := {applied})")
            }
            ExprKind::Field(field) => {
                let base = match &field.target {
                    Some(t) => self.emit_expr(t),
                    None => self.this_ref(),
                };
                let slot = format!("{base}.{}", Self::storage_name(&field.name));
                let applied = self.apply_binary(&method, false, slot.clone(), v);
                format!("{slot} = {applied}")
            }
            ExprKind::Shortcut(inner) if inner.op == ShortcutOp::Get => {
                let c = self.emit_expr(&inner.target);
                let i = self.emit_expr(&inner.args[0]);
                let cell = format!("{c}[{i}]");
                let applied = self.apply_binary(&method, false, cell.clone(), v);
                format!("{cell} = {applied}")
            }
            _ => {
                self.diags.add(error_diag(
                    "NSK-UNSUPPORTED-NODE",
                    "compound assignment to an unsupported location".to_string(),
                    &self.def.qname(),
                    "expr",
                ));
                "None".to_string()
            }
        }
    }

    /// Pre/post increment and decrement over a field, an indexed location
    /// or a local. Field and index targets return the chosen value from a
    /// runtime helper; locals use the walrus form.
    fn emit_incr_decr(&mut self, shortcut: &'a ShortcutExpr) -> String {
        let inc = shortcut.op == ShortcutOp::Increment;
        match &shortcut.target.kind {
            ExprKind::Field(field) => {
                let obj = match &field.target {
                    Some(t) => self.emit_expr(t),
                    None => self.this_ref(),
                };
                let helper = match (inc, shortcut.is_postfix) {
                    (true, false) => "inc_field",
                    (true, true) => "inc_field_post",
                    (false, false) => "dec_field",
                    (false, true) => "dec_field_post",
                };
                let attr = py_sig_lit(&Self::storage_name(&field.name));
                format!("ObjUtil.{helper}({obj}, {attr})")
            }
            ExprKind::Shortcut(inner) if inner.op == ShortcutOp::Get => {
                let c = self.emit_expr(&inner.target);
                let i = self.emit_expr(&inner.args[0]);
                let helper = match (inc, shortcut.is_postfix) {
                    (true, false) => "inc_index",
                    (true, true) => "inc_index_post",
                    (false, false) => "dec_index",
                    (false, true) => "dec_index_post",
                };
                format!("ObjUtil.{helper}({c}, {i})")
            }
            ExprKind::LocalVar { name } => {
                let n = self.emit_local_var(name);
                let step = if inc { "+" } else { "-" };
                if shortcut.is_postfix {
                    format!("((_old_{n} := {n}, {n} := {n} {step} 1, _old_{n})[2])")
                } else {
                    format!("({n} := {n} {step} 1)")
                }
            }
            _ => {
                self.diags.add(error_diag(
                    "NSK-UNSUPPORTED-NODE",
                    "increment of an unsupported location".to_string(),
                    &self.def.qname(),
                    "expr",
                ));
                "None".to_string()
            }
        }
    }

    /// Index get: Str indexing returns code points and has its own range
    /// form; range indexes on anything else slice through List
    fn emit_index_get(&mut self, shortcut: &'a ShortcutExpr) -> String {
        let index_expr = &shortcut.args[0];
        let is_range = index_expr.ctype.is_range();
        let t = self.emit_expr(&shortcut.target);
        let i = self.emit_expr(index_expr);
        if shortcut.target.ctype.is_str() {
            let class_ref = self.sys_ref("Str");
            if is_range {
                format!("{class_ref}.get_range({t}, {i})")
            } else {
                format!("{class_ref}.get({t}, {i})")
            }
        } else if is_range {
            let class_ref = self.sys_ref("List");
            format!("{class_ref}.get_range({t}, {i})")
        } else {
            format!("{t}[{i}]")
        }
    }

    // ---- closures ---------------------------------------------------------

    /// Reference or inline a closure. Multi-statement closures must have
    /// been registered by the statement pre-pass and already emitted as a
    /// `def`; referencing one that was not is a transpiler bug.
    fn emit_closure(&mut self, closure: &'a ClosureExpr) -> String {
        let key = closure_key(closure);
        if let Some(&id) = self.state.registered_closures.get(&key) {
            return format!("_closure_{id}");
        }
        if is_multi_stmt(closure) {
            self.state.invariant(format!(
                "multi-statement closure in {} referenced without registration",
                self.state.current_method
            ));
            return "None".to_string();
        }
        let spec = self.closure_spec(closure);
        let mut params = self.lambda_params(closure);
        // a body that reaches for outer `this` gets it bound eagerly as a
        // default parameter, visible in the lambda as _outer
        let mentions_this = super::stmt::block_mentions_this(&closure.body);
        if mentions_this {
            params.push_str(&format!(", _outer={}", self.this_ref()));
        }
        let body = self.inline_closure_body(closure, mentions_this);
        let func = self.sys_ref("Func");
        format!("{func}.make_closure({spec}, (lambda {params}: {body}))")
    }

    /// The spec dict literal passed to Func.make_closure
    pub fn closure_spec(&mut self, closure: &'a ClosureExpr) -> String {
        let returns = match &closure.signature.func_return {
            Some(r) => self.sig(r),
            None => "sys::Obj?".to_string(),
        };
        let immutable = closure.immutability().as_str();
        let params: Vec<String> = self
            .kept_params(closure)
            .iter()
            .map(|p| {
                format!(
                    "{{\"name\":\"{}\",\"type\":\"{}\"}}",
                    python_name(&p.name),
                    self.sig(&p.ctype)
                )
            })
            .collect();
        format!(
            "{{\"returns\":\"{returns}\",\"immutable\":\"{immutable}\",\"params\":[{}]}}",
            params.join(",")
        )
    }

    /// Declared parameters truncated to the signature's arity; extras
    /// beyond what the func type expects are dropped
    pub fn kept_params(&self, closure: &'a ClosureExpr) -> &'a [crate::ast::ParamDef] {
        let arity = closure.signature.func_params.len();
        let n = closure.declared_params.len().min(arity);
        &closure.declared_params[..n]
    }

    /// Lambda/def parameter list; every parameter defaults to None, and a
    /// zero-parameter closure still takes a dummy `_`
    pub fn lambda_params(&mut self, closure: &'a ClosureExpr) -> String {
        let kept = self.kept_params(closure);
        if kept.is_empty() {
            return "_=None".to_string();
        }
        let parts: Vec<String> = kept
            .iter()
            .map(|p| format!("{}=None", python_name(&p.name)))
            .collect();
        parts.join(", ")
    }

    fn inline_closure_body(&mut self, closure: &'a ClosureExpr, mentions_this: bool) -> String {
        let saved_outer = self.state.in_closure_with_outer;
        let saved_wrapped = self.state.in_wrapped_closure;
        if mentions_this {
            self.state.in_closure_with_outer = true;
            self.state.in_wrapped_closure = false;
        }
        let stmts = closure.body.real_stmts();
        let body = match stmts.as_slice() {
            [] => "None".to_string(),
            [crate::ast::Stmt::Return { expr: Some(e) }] => self.emit_expr(e),
            [crate::ast::Stmt::Expr(e)] => self.emit_expr(e),
            [crate::ast::Stmt::Throw { err }] => {
                let e = self.emit_expr(err);
                format!("ObjUtil.throw_({e})")
            }
            _ => {
                self.state.invariant(format!(
                    "closure in {} classified inline but has a multi-statement body",
                    self.state.current_method
                ));
                "None".to_string()
            }
        };
        self.state.in_closure_with_outer = saved_outer;
        self.state.in_wrapped_closure = saved_wrapped;
        body
    }

}
