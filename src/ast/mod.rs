//! Input data model: the typed AST of one pod
//!
//! Mirrors the node surface the upstream front-end produces. Nodes are
//! deserialized once (JSON) and treated as read-only for the rest of the
//! run; printers carry `TypeRef`s by value and never hold back-pointers
//! into a type table.

pub mod expr;
pub mod stmt;
pub mod types;

use serde::Deserialize;

pub use expr::{AssignExpr, CallExpr, Expr, ExprKind, FieldExpr, ShortcutExpr, ShortcutOp};
pub use stmt::{Block, Case, Catch, Stmt};
pub use types::TypeRef;

/// Slot flag bits, matching the runtime's FConst values
pub mod flags {
    pub const PUBLIC: u32 = 0x0000_0001;
    pub const PRIVATE: u32 = 0x0000_0002;
    pub const PROTECTED: u32 = 0x0000_0004;
    pub const INTERNAL: u32 = 0x0000_0008;
    pub const NATIVE: u32 = 0x0000_0010;
    pub const ENUM: u32 = 0x0000_0020;
    pub const MIXIN: u32 = 0x0000_0040;
    pub const FINAL: u32 = 0x0000_0080;
    pub const CTOR: u32 = 0x0000_0100;
    pub const OVERRIDE: u32 = 0x0000_0200;
    pub const ABSTRACT: u32 = 0x0000_0400;
    pub const STATIC: u32 = 0x0000_0800;
    pub const VIRTUAL: u32 = 0x0000_1000;
    pub const CONST: u32 = 0x0000_2000;
    pub const READONLY: u32 = 0x0000_4000;
    pub const FACET: u32 = 0x0000_8000;
    pub const GETTER: u32 = 0x0001_0000;
    pub const SETTER: u32 = 0x0002_0000;
    pub const SYNTHETIC: u32 = 0x0010_0000;
    pub const ONCE: u32 = 0x0020_0000;
}

/// A compilation unit: one pod produces one output subtree
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pod {
    pub name: String,
    #[serde(default)]
    pub version: String,
    /// Types in dependency order (bases and mixins before derivatives);
    /// the front-end's flattening is honored, never re-sorted.
    pub types: Vec<TypeDef>,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

/// One type definition
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDef {
    pub pod: String,
    pub name: String,
    #[serde(default)]
    pub base: Option<TypeRef>,
    #[serde(default)]
    pub mixins: Vec<TypeRef>,
    #[serde(default)]
    pub flags: u32,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub methods: Vec<MethodDef>,
    #[serde(default)]
    pub synthetic_methods: Vec<MethodDef>,
}

impl TypeDef {
    pub fn qname(&self) -> String {
        format!("{}::{}", self.pod, self.name)
    }

    pub fn is_abstract(&self) -> bool {
        self.flags & flags::ABSTRACT != 0
    }

    pub fn is_enum(&self) -> bool {
        self.flags & flags::ENUM != 0
    }

    pub fn is_mixin(&self) -> bool {
        self.flags & flags::MIXIN != 0
    }

    pub fn is_synthetic(&self) -> bool {
        self.flags & flags::SYNTHETIC != 0
    }

    /// Enum constants in declaration order
    pub fn enum_constants(&self) -> Vec<&FieldDef> {
        self.fields.iter().filter(|f| f.is_enum_const()).collect()
    }

    /// The unnamed constructor plus any named ones
    pub fn ctors(&self) -> Vec<&MethodDef> {
        self.methods.iter().filter(|m| m.is_ctor()).collect()
    }

    pub fn has_static_fields(&self) -> bool {
        self.fields
            .iter()
            .any(|f| f.is_static() && !f.is_enum_const())
    }
}

/// One field definition
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ctype: TypeRef,
    #[serde(default)]
    pub flags: u32,
    #[serde(default)]
    pub init: Option<Expr>,
    #[serde(default)]
    pub has_explicit_setter: bool,
    #[serde(default)]
    pub setter_flags: Option<u32>,
}

impl FieldDef {
    pub fn is_static(&self) -> bool {
        self.flags & flags::STATIC != 0
    }

    pub fn is_const(&self) -> bool {
        self.flags & flags::CONST != 0
    }

    pub fn is_private(&self) -> bool {
        self.flags & flags::PRIVATE != 0
    }

    pub fn is_synthetic(&self) -> bool {
        self.flags & flags::SYNTHETIC != 0
    }

    pub fn is_readonly(&self) -> bool {
        self.flags & flags::READONLY != 0
    }

    pub fn is_enum_const(&self) -> bool {
        self.flags & flags::ENUM != 0 && self.is_static()
    }

    /// Setter visibility differs from the getter only when the source
    /// declared an explicit setter block.
    pub fn setter_is_private(&self) -> bool {
        match self.setter_flags {
            Some(f) => f & flags::PRIVATE != 0,
            None => self.is_private(),
        }
    }

    /// Whether the generated accessor takes no `_val_` parameter: const and
    /// readonly fields, and fields whose setter is not public. Writes to
    /// such a field cannot go through the accessor and use raw storage.
    pub fn is_get_only(&self) -> bool {
        self.is_const() || self.is_readonly() || self.setter_is_private()
    }
}

/// One method definition
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodDef {
    pub name: String,
    /// Declaring type qname, e.g. "testPod::Foo"
    #[serde(default)]
    pub parent: String,
    #[serde(default)]
    pub params: Vec<ParamDef>,
    pub returns: TypeRef,
    #[serde(default)]
    pub flags: u32,
    #[serde(default)]
    pub body: Option<Block>,
}

impl MethodDef {
    pub fn is_ctor(&self) -> bool {
        self.flags & flags::CTOR != 0
    }

    pub fn is_static(&self) -> bool {
        self.flags & flags::STATIC != 0
    }

    pub fn is_private(&self) -> bool {
        self.flags & flags::PRIVATE != 0
    }

    pub fn is_synthetic(&self) -> bool {
        self.flags & flags::SYNTHETIC != 0
    }

    pub fn is_abstract(&self) -> bool {
        self.flags & flags::ABSTRACT != 0
    }

    pub fn is_native(&self) -> bool {
        self.flags & flags::NATIVE != 0
    }
}

/// One method parameter
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ctype: TypeRef,
    #[serde(default)]
    pub has_default: bool,
}

/// Closure immutability snapshot case, carried into the generated
/// `Func.make_closure` spec dict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImmutabilityCase {
    Always,
    Maybe,
    Never,
}

impl ImmutabilityCase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImmutabilityCase::Always => "always",
            ImmutabilityCase::Maybe => "maybe",
            ImmutabilityCase::Never => "never",
        }
    }
}

/// A closure expression
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosureExpr {
    /// The sys::Func type of the closure
    pub signature: TypeRef,
    #[serde(default)]
    pub declared_params: Vec<ParamDef>,
    pub body: Block,
    #[serde(default)]
    pub captured_field_names: Vec<String>,
    /// May contain `isImmutable`/`toImmutable` methods the front-end
    /// attached; the immutability case is derived from their shapes.
    #[serde(default)]
    pub synthetic_methods: Vec<MethodDef>,
}

impl ClosureExpr {
    fn synthetic(&self, name: &str) -> Option<&MethodDef> {
        self.synthetic_methods.iter().find(|m| m.name == name)
    }

    /// Derive the immutability case from the synthetic method shapes.
    ///
    /// Recognized shapes of `isImmutable`: `return true` (always),
    /// `return false` (never), `return <field>` (maybe). A throwing
    /// `toImmutable` forces never; neither synthetic present means always.
    /// Anything unrecognized derives maybe.
    pub fn immutability(&self) -> ImmutabilityCase {
        if let Some(to_immutable) = self.synthetic("toImmutable") {
            if body_throws(to_immutable) {
                return ImmutabilityCase::Never;
            }
        }
        match self.synthetic("isImmutable") {
            None => ImmutabilityCase::Always,
            Some(is_immutable) => match returned_kind(is_immutable) {
                Some(ExprKind::BoolLit(true)) => ImmutabilityCase::Always,
                Some(ExprKind::BoolLit(false)) => ImmutabilityCase::Never,
                _ => ImmutabilityCase::Maybe,
            },
        }
    }
}

fn body_throws(method: &MethodDef) -> bool {
    match &method.body {
        Some(block) => matches!(block.real_stmts().first(), Some(Stmt::Throw { .. })),
        None => false,
    }
}

fn returned_kind(method: &MethodDef) -> Option<ExprKind> {
    match &method.body {
        Some(block) => match block.real_stmts().first() {
            Some(Stmt::Return { expr: Some(e) }) => Some(e.kind.clone()),
            _ => None,
        },
        None => None,
    }
}
