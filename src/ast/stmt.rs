//! Statement node model

use serde::Deserialize;

use super::expr::Expr;
use super::types::TypeRef;

/// A statement block
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    #[serde(default)]
    pub stmts: Vec<Stmt>,
}

impl Block {
    pub fn of(stmts: Vec<Stmt>) -> Self {
        Self { stmts }
    }

    /// Statements that survive lowering: synthetic nops and bare `return`
    /// at the end of a void body do not count toward the multi-statement
    /// closure test.
    pub fn real_stmts(&self) -> Vec<&Stmt> {
        let mut out: Vec<&Stmt> = Vec::new();
        for (i, stmt) in self.stmts.iter().enumerate() {
            match stmt {
                Stmt::Nop => continue,
                Stmt::Return { expr: None } if i == self.stmts.len() - 1 => continue,
                _ => out.push(stmt),
            }
        }
        out
    }
}

/// Statement kinds, one per front-end node kind
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Stmt {
    Nop,
    Expr(Expr),
    LocalDef {
        name: String,
        ctype: TypeRef,
        #[serde(default)]
        init: Option<Expr>,
    },
    If {
        cond: Expr,
        then_block: Block,
        #[serde(default)]
        else_block: Option<Block>,
    },
    Return {
        #[serde(default)]
        expr: Option<Expr>,
    },
    Throw {
        err: Expr,
    },
    For {
        #[serde(default)]
        init: Option<Box<Stmt>>,
        #[serde(default)]
        cond: Option<Expr>,
        #[serde(default)]
        update: Option<Expr>,
        body: Block,
    },
    While {
        cond: Expr,
        body: Block,
    },
    Break,
    Continue,
    Try {
        body: Block,
        #[serde(default)]
        catches: Vec<Catch>,
        #[serde(default)]
        finally: Option<Block>,
    },
    Switch {
        cond: Expr,
        #[serde(default)]
        cases: Vec<Case>,
        #[serde(default)]
        default: Option<Block>,
    },
    /// Escape hatch for unknown statement kinds: lowered to a `# TODO` line
    /// plus a diagnostic.
    Unknown {
        kind: String,
    },
}

/// One catch clause of a try statement
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catch {
    pub err_type: TypeRef,
    /// Catch variable name; None for `catch {}` without a binding
    #[serde(default)]
    pub var: Option<String>,
    pub body: Block,
}

/// One case group of a switch statement
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    pub literals: Vec<Expr>,
    pub body: Block,
}
