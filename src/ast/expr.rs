//! Expression node model
//!
//! Tagged variants mirroring the front-end's typed expression nodes. Every
//! expression carries its resolved static type (`ctype`); the printers rely
//! on it for primitive dispatch and element-type signatures and never
//! consult the front-end again.

use serde::Deserialize;

use super::types::TypeRef;
use super::ClosureExpr;

/// A typed expression: kind plus the static type the front-end resolved
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expr {
    pub kind: ExprKind,
    pub ctype: TypeRef,
}

impl Expr {
    pub fn new(kind: ExprKind, ctype: TypeRef) -> Self {
        Self { kind, ctype }
    }

    pub fn null() -> Self {
        Self::new(ExprKind::NullLit, TypeRef::obj().nullable())
    }

    pub fn bool_lit(val: bool) -> Self {
        Self::new(ExprKind::BoolLit(val), TypeRef::sys("Bool"))
    }

    pub fn int_lit(val: i64) -> Self {
        Self::new(ExprKind::IntLit(val), TypeRef::sys("Int"))
    }

    pub fn float_lit(val: f64) -> Self {
        Self::new(ExprKind::FloatLit(val), TypeRef::sys("Float"))
    }

    pub fn str_lit(val: &str) -> Self {
        Self::new(ExprKind::StrLit(val.to_string()), TypeRef::sys("Str"))
    }

    pub fn local(name: &str, ctype: TypeRef) -> Self {
        Self::new(
            ExprKind::LocalVar {
                name: name.to_string(),
            },
            ctype,
        )
    }

    pub fn this(ctype: TypeRef) -> Self {
        Self::new(ExprKind::This, ctype)
    }

    /// True when the expression is an assignment to a local variable; the
    /// ternary and return lowerings special-case this shape.
    pub fn is_local_assign(&self) -> bool {
        match &self.kind {
            ExprKind::Assign(assign) => {
                matches!(assign.lhs.kind, ExprKind::LocalVar { .. })
            }
            _ => false,
        }
    }
}

/// Expression kinds, one per front-end node kind
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ExprKind {
    NullLit,
    BoolLit(bool),
    IntLit(i64),
    FloatLit(f64),
    StrLit(String),
    ListLit {
        elems: Vec<Expr>,
    },
    MapLit {
        keys: Vec<Expr>,
        vals: Vec<Expr>,
    },
    RangeLit {
        start: Box<Expr>,
        end: Box<Expr>,
        exclusive: bool,
    },
    DurationLit {
        ticks: i64,
    },
    DecimalLit {
        literal: String,
    },
    UriLit {
        literal: String,
    },
    LocalVar {
        name: String,
    },
    This,
    Super,
    It,
    ThrowExpr {
        err: Box<Expr>,
    },
    Call(CallExpr),
    Construction {
        ctor_name: String,
        args: Vec<Expr>,
    },
    Field(FieldExpr),
    Assign(AssignExpr),
    Same {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    NotSame {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    BoolNot {
        operand: Box<Expr>,
    },
    BoolOr {
        operands: Vec<Expr>,
    },
    BoolAnd {
        operands: Vec<Expr>,
    },
    CmpNull {
        operand: Box<Expr>,
    },
    CmpNotNull {
        operand: Box<Expr>,
    },
    IsExpr {
        target: Box<Expr>,
        check: TypeRef,
    },
    IsnotExpr {
        target: Box<Expr>,
        check: TypeRef,
    },
    AsExpr {
        target: Box<Expr>,
        to: TypeRef,
    },
    Coerce {
        target: Box<Expr>,
        to: TypeRef,
    },
    Ternary {
        cond: Box<Expr>,
        if_true: Box<Expr>,
        if_false: Box<Expr>,
    },
    Elvis {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Shortcut(ShortcutExpr),
    Closure(ClosureExpr),
    StaticTarget {
        of: TypeRef,
    },
    TypeLiteral {
        of: TypeRef,
    },
    SlotLiteral {
        parent: TypeRef,
        name: String,
        is_field: bool,
    },
    /// Escape hatch for node kinds this transpiler does not know. Lowered to
    /// a `None` placeholder plus a diagnostic (grep-able in output).
    Unknown {
        kind: String,
    },
}

/// Resolved method call
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallExpr {
    /// Receiver; None for implicit this/static calls
    #[serde(default)]
    pub target: Option<Box<Expr>>,
    /// Method name as declared in the source
    pub name: String,
    /// Declaring type of the resolved method
    pub parent: TypeRef,
    #[serde(default)]
    pub args: Vec<Expr>,
    /// Safe navigation: target?.m(args)
    #[serde(default)]
    pub safe: bool,
    /// Dynamic dispatch: target->m(args)
    #[serde(default)]
    pub is_dynamic: bool,
    #[serde(default)]
    pub is_ctor: bool,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_private: bool,
}

impl CallExpr {
    /// Qualified slot name, e.g. "sys::Int.plus"
    pub fn qname(&self) -> String {
        format!("{}.{}", self.parent.qname(), self.name)
    }
}

/// Resolved field access
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldExpr {
    #[serde(default)]
    pub target: Option<Box<Expr>>,
    pub name: String,
    /// Declaring type of the resolved field
    pub parent: TypeRef,
    #[serde(default)]
    pub safe: bool,
    /// Raw storage access (&field): bypass the accessor
    #[serde(default)]
    pub raw: bool,
    #[serde(default)]
    pub is_static: bool,
}

/// Assignment; `leave` marks the result being consumed as a value
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignExpr {
    pub lhs: Box<Expr>,
    pub rhs: Box<Expr>,
    #[serde(default)]
    pub leave: bool,
}

/// Operator method call (the source's shortcut syntax)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortcutExpr {
    pub op: ShortcutOp,
    /// Resolved slot qname, e.g. "sys::Int.plus"; keys the OperatorMap
    pub method: String,
    pub target: Box<Expr>,
    #[serde(default)]
    pub args: Vec<Expr>,
    /// Compound form: x op= v
    #[serde(default)]
    pub is_assign: bool,
    /// Post form of ++/--
    #[serde(default)]
    pub is_postfix: bool,
    /// Result consumed as a value
    #[serde(default)]
    pub leave: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShortcutOp {
    Plus,
    Minus,
    Mult,
    Div,
    Mod,
    Negate,
    Increment,
    Decrement,
    Eq,
    Ne,
    Cmp,
    Lt,
    Le,
    Ge,
    Gt,
    Get,
    Set,
}
