//! Statement lowering
//!
//! Runs a per-body pre-pass that registers every multi-statement closure
//! before any emission, then drives statement output, writing each pending
//! closure's `def` strictly before the first statement that mentions it.

use crate::ast::{Block, Case, Catch, ClosureExpr, Expr, ExprKind, ShortcutOp, Stmt};
use crate::diagnostics::error_diag;
use crate::names::python_name;

use super::expr::{capture_base, is_const_validator};
use super::{closure_key, PendingClosure, TypePrinter};

/// A closure is extracted to a `def` when a lambda cannot express it:
/// local declarations, statement-level assignments, control flow, or more
/// than one real statement
pub fn is_multi_stmt(closure: &ClosureExpr) -> bool {
    for stmt in &closure.body.stmts {
        match stmt {
            Stmt::LocalDef { .. } => return true,
            Stmt::If { .. }
            | Stmt::Switch { .. }
            | Stmt::For { .. }
            | Stmt::While { .. }
            | Stmt::Try { .. } => return true,
            Stmt::Expr(e) => match &e.kind {
                ExprKind::Assign(_) => return true,
                ExprKind::Shortcut(s) if s.is_assign || s.op == ShortcutOp::Set => return true,
                _ => {}
            },
            _ => {}
        }
    }
    closure.body.real_stmts().len() > 1
}

/// Whether any expression in the block reaches for the enclosing `this`
pub fn block_mentions_this(block: &Block) -> bool {
    block.stmts.iter().any(stmt_mentions_this)
}

fn stmt_mentions_this(stmt: &Stmt) -> bool {
    let mut found = false;
    walk_stmt_exprs(stmt, &mut |e| {
        if matches!(e.kind, ExprKind::This | ExprKind::Super)
            || matches!(&e.kind, ExprKind::LocalVar { name } if name == "$this")
        {
            found = true;
        }
        true
    });
    found
}

/// Visit every expression in a statement subtree. The visitor returns
/// whether to descend into the visited expression's children (closure
/// bodies included), so collectors can prune at extraction boundaries.
fn walk_stmt_exprs<'a>(stmt: &'a Stmt, visit: &mut dyn FnMut(&'a Expr) -> bool) {
    fn on_block<'a>(b: &'a Block, visit: &mut dyn FnMut(&'a Expr) -> bool) {
        for s in &b.stmts {
            walk_stmt_exprs(s, visit);
        }
    }
    match stmt {
        Stmt::Nop | Stmt::Break | Stmt::Continue | Stmt::Unknown { .. } => {}
        Stmt::Expr(e) => walk_expr(e, visit),
        Stmt::LocalDef { init, .. } => {
            if let Some(e) = init {
                walk_expr(e, visit);
            }
        }
        Stmt::If {
            cond,
            then_block,
            else_block,
        } => {
            walk_expr(cond, visit);
            on_block(then_block, visit);
            if let Some(b) = else_block {
                on_block(b, visit);
            }
        }
        Stmt::Return { expr } => {
            if let Some(e) = expr {
                walk_expr(e, visit);
            }
        }
        Stmt::Throw { err } => walk_expr(err, visit),
        Stmt::For {
            init,
            cond,
            update,
            body,
        } => {
            if let Some(s) = init {
                walk_stmt_exprs(s, visit);
            }
            if let Some(e) = cond {
                walk_expr(e, visit);
            }
            if let Some(e) = update {
                walk_expr(e, visit);
            }
            on_block(body, visit);
        }
        Stmt::While { cond, body } => {
            walk_expr(cond, visit);
            on_block(body, visit);
        }
        Stmt::Try {
            body,
            catches,
            finally,
        } => {
            on_block(body, visit);
            for c in catches {
                on_block(&c.body, visit);
            }
            if let Some(b) = finally {
                on_block(b, visit);
            }
        }
        Stmt::Switch {
            cond,
            cases,
            default,
        } => {
            walk_expr(cond, visit);
            for c in cases {
                for l in &c.literals {
                    walk_expr(l, visit);
                }
                on_block(&c.body, visit);
            }
            if let Some(b) = default {
                on_block(b, visit);
            }
        }
    }
}

fn walk_expr<'a>(expr: &'a Expr, visit: &mut dyn FnMut(&'a Expr) -> bool) {
    if !visit(expr) {
        return;
    }
    match &expr.kind {
        ExprKind::ListLit { elems } => {
            for e in elems {
                walk_expr(e, visit);
            }
        }
        ExprKind::MapLit { keys, vals } => {
            for e in keys.iter().chain(vals) {
                walk_expr(e, visit);
            }
        }
        ExprKind::RangeLit { start, end, .. } => {
            walk_expr(start, visit);
            walk_expr(end, visit);
        }
        ExprKind::ThrowExpr { err } => walk_expr(err, visit),
        ExprKind::Call(c) => {
            if let Some(t) = &c.target {
                walk_expr(t, visit);
            }
            for a in &c.args {
                walk_expr(a, visit);
            }
        }
        ExprKind::Construction { args, .. } => {
            for a in args {
                walk_expr(a, visit);
            }
        }
        ExprKind::Field(f) => {
            if let Some(t) = &f.target {
                walk_expr(t, visit);
            }
        }
        ExprKind::Assign(a) => {
            walk_expr(&a.lhs, visit);
            walk_expr(&a.rhs, visit);
        }
        ExprKind::Same { lhs, rhs } | ExprKind::NotSame { lhs, rhs } => {
            walk_expr(lhs, visit);
            walk_expr(rhs, visit);
        }
        ExprKind::BoolNot { operand }
        | ExprKind::CmpNull { operand }
        | ExprKind::CmpNotNull { operand } => walk_expr(operand, visit),
        ExprKind::BoolOr { operands } | ExprKind::BoolAnd { operands } => {
            for e in operands {
                walk_expr(e, visit);
            }
        }
        ExprKind::IsExpr { target, .. }
        | ExprKind::IsnotExpr { target, .. }
        | ExprKind::AsExpr { target, .. }
        | ExprKind::Coerce { target, .. } => walk_expr(target, visit),
        ExprKind::Ternary {
            cond,
            if_true,
            if_false,
        } => {
            walk_expr(cond, visit);
            walk_expr(if_true, visit);
            walk_expr(if_false, visit);
        }
        ExprKind::Elvis { lhs, rhs } => {
            walk_expr(lhs, visit);
            walk_expr(rhs, visit);
        }
        ExprKind::Shortcut(s) => {
            walk_expr(&s.target, visit);
            for a in &s.args {
                walk_expr(a, visit);
            }
        }
        ExprKind::Closure(c) => {
            for s in &c.body.stmts {
                walk_stmt_exprs(s, visit);
            }
        }
        _ => {}
    }
}

/// Collect multi-statement closures in a statement subtree, without
/// descending into the bodies of the closures found: those are nested and
/// register at their parent closure's level when its `def` is emitted
fn find_multi_stmt_closures<'a>(stmt: &'a Stmt, out: &mut Vec<&'a ClosureExpr>) {
    walk_stmt_exprs(stmt, &mut |e| {
        if let ExprKind::Closure(c) = &e.kind {
            if is_multi_stmt(c) {
                out.push(c);
                return false;
            }
        }
        true
    });
}

impl<'a> TypePrinter<'a> {
    /// Emit a body with the closure pre-pass: register every
    /// multi-statement closure, then write each pending `def` immediately
    /// before the first statement that mentions it
    pub fn emit_body_with_closures(&mut self, block: &'a Block) -> String {
        let pending = self.scan_closures(block);
        let mut out = String::new();
        for (i, stmt) in block.stmts.iter().enumerate() {
            self.state.stmt_index = i;
            for p in pending.iter().filter(|p| p.first_use == i) {
                out.push_str(&self.emit_closure_def(p));
            }
            out.push_str(&self.emit_stmt(stmt));
        }
        if out.is_empty() {
            out = format!("{}pass\n", self.ind());
        }
        out
    }

    /// The pre-pass: walk each top-level statement's subtree and register
    /// the multi-statement closures it mentions
    fn scan_closures(&mut self, block: &'a Block) -> Vec<PendingClosure<'a>> {
        let mut pending = Vec::new();
        for (i, stmt) in block.stmts.iter().enumerate() {
            let mut found = Vec::new();
            find_multi_stmt_closures(stmt, &mut found);
            for closure in found {
                let key = closure_key(closure);
                if self.state.registered_closures.contains_key(&key) {
                    continue;
                }
                let id = self.state.next_closure_id();
                self.state.registered_closures.insert(key, id);
                pending.push(PendingClosure {
                    id,
                    closure,
                    first_use: i,
                });
            }
        }
        pending
    }

    /// One extracted closure: a `def` for the body followed by the
    /// `Func.make_closure` wrapping that rebinds the name to the callable
    /// Func object
    fn emit_closure_def(&mut self, pending: &PendingClosure<'a>) -> String {
        let closure = pending.closure;
        let id = pending.id;
        let mentions_this = block_mentions_this(&closure.body);
        let mut params = self.lambda_params(closure);
        if mentions_this {
            params.push_str(&format!(", _self={}", self.this_ref()));
        }
        let mut out = format!("{}def _closure_{id}({params}):\n", self.ind());

        let saved_wrapped = self.state.in_wrapped_closure;
        let saved_outer = self.state.in_closure_with_outer;
        self.state.in_wrapped_closure = true;
        self.state.in_closure_with_outer = false;
        self.state.closure_depth += 1;
        self.state.indent += 1;
        out.push_str(&self.emit_body_with_closures(&closure.body));
        self.state.indent -= 1;
        self.state.closure_depth -= 1;
        self.state.in_wrapped_closure = saved_wrapped;
        self.state.in_closure_with_outer = saved_outer;

        let spec = self.closure_spec(closure);
        let func = self.sys_ref("Func");
        out.push_str(&format!(
            "{}_closure_{id} = {func}.make_closure({spec}, _closure_{id})\n",
            self.ind()
        ));
        out
    }

    /// Emit a nested block (if/loop/try bodies) at one deeper indent; empty
    /// blocks become a single `pass`
    pub fn emit_block(&mut self, block: &'a Block) -> String {
        self.state.indent += 1;
        let mut out = String::new();
        for stmt in &block.stmts {
            out.push_str(&self.emit_stmt(stmt));
        }
        if out.is_empty() {
            out = format!("{}pass\n", self.ind());
        }
        self.state.indent -= 1;
        out
    }

    pub fn emit_stmt(&mut self, stmt: &'a Stmt) -> String {
        let ind = self.ind();
        match stmt {
            Stmt::Nop => String::new(),
            Stmt::Expr(e) => {
                // const-field validator calls vanish entirely
                if let ExprKind::Call(c) = &e.kind {
                    if is_const_validator(&c.name) {
                        return String::new();
                    }
                }
                let s = self.emit_expr(e);
                format!("{ind}{s}\n")
            }
            Stmt::LocalDef { name, init, .. } => self.emit_local_def(name, init.as_ref()),
            Stmt::If {
                cond,
                then_block,
                else_block,
            } => {
                let c = self.emit_expr(cond);
                let mut out = format!("{ind}if {c}:\n");
                out.push_str(&self.emit_block(then_block));
                if let Some(b) = else_block {
                    out.push_str(&format!("{ind}else:\n"));
                    out.push_str(&self.emit_block(b));
                }
                out
            }
            Stmt::Return { expr } => self.emit_return(expr.as_ref()),
            Stmt::Throw { err } => {
                let e = self.emit_expr(err);
                format!("{ind}raise {e}\n")
            }
            Stmt::For {
                init,
                cond,
                update,
                body,
            } => self.emit_for(init.as_deref(), cond.as_ref(), update.as_ref(), body),
            Stmt::While { cond, body } => {
                let c = self.emit_expr(cond);
                let mut out = format!("{ind}while {c}:\n");
                // a while is its own continue target: mask any enclosing
                // for loop's update
                self.state.for_loop_update.push(None);
                out.push_str(&self.emit_block(body));
                self.state.for_loop_update.pop();
                out
            }
            Stmt::Break => format!("{ind}break\n"),
            Stmt::Continue => {
                // inside a lowered for loop the update runs before the jump
                match self.state.for_loop_update.last().copied() {
                    Some(Some(update)) => {
                        let u = self.emit_expr(update);
                        format!("{ind}{u}\n{ind}continue\n")
                    }
                    _ => format!("{ind}continue\n"),
                }
            }
            Stmt::Try {
                body,
                catches,
                finally,
            } => self.emit_try(body, catches, finally.as_ref()),
            Stmt::Switch {
                cond,
                cases,
                default,
            } => self.emit_switch(cond, cases, default.as_ref()),
            Stmt::Unknown { kind } => {
                self.diags.add(error_diag(
                    "NSK-UNSUPPORTED-NODE",
                    format!("unknown statement kind '{kind}'"),
                    &self.def.qname(),
                    "stmt",
                ));
                format!("{ind}# TODO: unknown statement kind '{kind}'\n")
            }
        }
    }

    fn emit_local_def(&mut self, name: &str, init: Option<&'a Expr>) -> String {
        let ind = self.ind();
        // catch variables bind through `except ... as`; drop the localDef
        if self.state.suppress_local.as_deref() == Some(name) {
            return String::new();
        }
        if let Some(init_expr) = init {
            // a captured variable assigned to itself resolves through
            // Python's enclosing-scope capture; nothing to emit
            if let ExprKind::LocalVar { name: init_name } = &init_expr.kind {
                if init_name == name && name.contains('$') {
                    return String::new();
                }
            }
            // cvar wrapper: record the local -> wrapper mapping so closure
            // bodies resolve the captured name to the wrapper
            if let ExprKind::Call(c) = &init_expr.kind {
                if !c.is_ctor
                    && c.name == "make"
                    && c.args.len() == 1
                    && matches!(c.target.as_deref().map(|t| &t.kind), Some(ExprKind::This))
                {
                    if let ExprKind::LocalVar { name: wrapped } = &c.args[0].kind {
                        self.state
                            .param_wrappers
                            .insert(capture_base(wrapped).to_string(), name.to_string());
                    }
                }
            }
            let value = self.emit_expr(init_expr);
            format!("{ind}{} = {value}\n", python_name(capture_base(name)))
        } else {
            format!("{ind}{} = None\n", python_name(capture_base(name)))
        }
    }

    /// `return` with an assignment-valued expression first emits the
    /// assignment as its own statement, then returns the target, so the
    /// right-hand side is evaluated exactly once
    fn emit_return(&mut self, expr: Option<&'a Expr>) -> String {
        let ind = self.ind();
        match expr {
            None => format!("{ind}return\n"),
            Some(e) => match &e.kind {
                ExprKind::Assign(assign) if e.is_local_assign() => {
                    let stmt = self.emit_expr(e);
                    let lhs = self.emit_expr(&assign.lhs);
                    format!("{ind}{stmt}\n{ind}return {lhs}\n")
                }
                ExprKind::Shortcut(s) if s.is_assign => {
                    let stmt = self.emit_expr(e);
                    let target = self.emit_expr(&s.target);
                    format!("{ind}{stmt}\n{ind}return {target}\n")
                }
                _ => {
                    let v = self.emit_expr(e);
                    format!("{ind}return {v}\n")
                }
            },
        }
    }

    /// `for(init; cond; update)` lowers to a while loop with the update at
    /// the end of the body; `continue` emits the update first (see
    /// emit_stmt), driven by the for_loop_update stack
    fn emit_for(
        &mut self,
        init: Option<&'a Stmt>,
        cond: Option<&'a Expr>,
        update: Option<&'a Expr>,
        body: &'a Block,
    ) -> String {
        let ind = self.ind();
        let mut out = String::new();
        if let Some(s) = init {
            out.push_str(&self.emit_stmt(s));
        }
        let c = match cond {
            Some(e) => self.emit_expr(e),
            None => "True".to_string(),
        };
        out.push_str(&format!("{ind}while {c}:\n"));
        self.state.for_loop_update.push(update);
        self.state.indent += 1;
        let mut body_out = String::new();
        for stmt in &body.stmts {
            body_out.push_str(&self.emit_stmt(stmt));
        }
        if let Some(u) = update {
            let u_str = self.emit_expr(u);
            body_out.push_str(&format!("{}{u_str}\n", self.ind()));
        }
        if body_out.is_empty() {
            body_out = format!("{}pass\n", self.ind());
        }
        self.state.indent -= 1;
        self.state.for_loop_update.pop();
        out.push_str(&body_out);
        out
    }

    fn emit_try(
        &mut self,
        body: &'a Block,
        catches: &'a [Catch],
        finally: Option<&'a Block>,
    ) -> String {
        let ind = self.ind();
        let mut out = format!("{ind}try:\n");
        out.push_str(&self.emit_block(body));
        for catch in catches {
            let class_ref = self.resolver.type_ref(&catch.err_type);
            match &catch.var {
                Some(var) => {
                    out.push_str(&format!(
                        "{ind}except {class_ref} as {}:\n",
                        python_name(var)
                    ));
                    let saved = self.state.suppress_local.take();
                    self.state.suppress_local = Some(var.clone());
                    out.push_str(&self.emit_block(&catch.body));
                    self.state.suppress_local = saved;
                }
                None => {
                    out.push_str(&format!("{ind}except {class_ref}:\n"));
                    out.push_str(&self.emit_block(&catch.body));
                }
            }
        }
        if let Some(b) = finally {
            out.push_str(&format!("{ind}finally:\n"));
            out.push_str(&self.emit_block(b));
        }
        out
    }

    /// Switch caches its condition in a fresh local so the condition is
    /// evaluated exactly once, then chains if/elif/else over the case
    /// literals
    fn emit_switch(
        &mut self,
        cond: &'a Expr,
        cases: &'a [Case],
        default: Option<&'a Block>,
    ) -> String {
        let ind = self.ind();
        let var = format!("_switch_{}", self.state.next_switch_var());
        let c = self.emit_expr(cond);
        let mut out = format!("{ind}{var} = {c}\n");
        for (i, case) in cases.iter().enumerate() {
            let kw = if i == 0 { "if" } else { "elif" };
            let tests: Vec<String> = case
                .literals
                .iter()
                .map(|l| {
                    let lit = self.emit_expr(l);
                    format!("({var} == {lit})")
                })
                .collect();
            out.push_str(&format!("{ind}{kw} {}:\n", tests.join(" or ")));
            out.push_str(&self.emit_block(&case.body));
        }
        if let Some(b) = default {
            if cases.is_empty() {
                // degenerate switch: no cases means the default always runs
                for stmt in &b.stmts {
                    out.push_str(&self.emit_stmt(stmt));
                }
            } else {
                out.push_str(&format!("{ind}else:\n"));
                out.push_str(&self.emit_block(b));
            }
        }
        out
    }
}
