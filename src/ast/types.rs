//! Type reference model
//!
//! A `TypeRef` is the by-value type annotation the front-end attaches to
//! every node. It carries enough metadata for `sys::List` to expose its
//! element type and `sys::Func` its signature, so the printers never chase
//! back-pointers into the front-end's type tables.

use serde::Deserialize;

/// Resolved type reference carried on every typed AST node
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeRef {
    pub pod_name: String,
    pub name: String,
    /// Stable string identifier, e.g. "sys::Int", "sys::Str?", "foo::Bar"
    pub signature: String,
    #[serde(default)]
    pub is_nullable: bool,
    #[serde(default)]
    pub is_generic: bool,
    #[serde(default)]
    pub is_parameterized: bool,
    /// Key type of a parameterized Map
    #[serde(default)]
    pub k: Option<Box<TypeRef>>,
    /// Value type of a parameterized Map, or element type of a List
    #[serde(default)]
    pub v: Option<Box<TypeRef>>,
    /// Parameter types of a sys::Func
    #[serde(default)]
    pub func_params: Vec<TypeRef>,
    /// Return type of a sys::Func
    #[serde(default)]
    pub func_return: Option<Box<TypeRef>>,
}

impl TypeRef {
    pub fn of(pod: &str, name: &str) -> Self {
        Self {
            pod_name: pod.to_string(),
            name: name.to_string(),
            signature: format!("{pod}::{name}"),
            is_nullable: false,
            is_generic: false,
            is_parameterized: false,
            k: None,
            v: None,
            func_params: Vec::new(),
            func_return: None,
        }
    }

    pub fn sys(name: &str) -> Self {
        Self::of("sys", name)
    }

    pub fn obj() -> Self {
        Self::sys("Obj")
    }

    pub fn void() -> Self {
        Self::sys("Void")
    }

    pub fn nullable(mut self) -> Self {
        if !self.is_nullable {
            self.is_nullable = true;
            self.signature.push('?');
        }
        self
    }

    pub fn list_of(elem: TypeRef) -> Self {
        let mut t = Self::sys("List");
        t.is_parameterized = true;
        t.v = Some(Box::new(elem));
        t
    }

    pub fn map_of(key: TypeRef, val: TypeRef) -> Self {
        let mut t = Self::sys("Map");
        t.is_parameterized = true;
        t.k = Some(Box::new(key));
        t.v = Some(Box::new(val));
        t
    }

    pub fn func(params: Vec<TypeRef>, ret: TypeRef) -> Self {
        let mut t = Self::sys("Func");
        t.is_parameterized = true;
        t.func_params = params;
        t.func_return = Some(Box::new(ret));
        t
    }

    /// Qualified name without nullability, e.g. "sys::Int"
    pub fn qname(&self) -> String {
        format!("{}::{}", self.pod_name, self.name)
    }

    pub fn is_sys(&self) -> bool {
        self.pod_name == "sys"
    }

    pub fn is_obj(&self) -> bool {
        self.is_sys() && self.name == "Obj"
    }

    pub fn is_void(&self) -> bool {
        self.is_sys() && self.name == "Void"
    }

    /// Value types without instance methods in Python: dispatch rewrites to
    /// static calls on the runtime class.
    pub fn is_primitive(&self) -> bool {
        self.is_sys()
            && matches!(
                self.name.as_str(),
                "Bool" | "Int" | "Float" | "Str" | "Decimal"
            )
    }

    pub fn is_list(&self) -> bool {
        self.is_sys() && self.name == "List"
    }

    pub fn is_map(&self) -> bool {
        self.is_sys() && self.name == "Map"
    }

    pub fn is_str(&self) -> bool {
        self.is_sys() && self.name == "Str"
    }

    pub fn is_range(&self) -> bool {
        self.is_sys() && self.name == "Range"
    }

    pub fn is_func(&self) -> bool {
        self.is_sys() && self.name == "Func"
    }

    /// Element type of a parameterized List, if the metadata survived the
    /// front-end. Callers fall back to "sys::Obj?" when this is None.
    pub fn element(&self) -> Option<&TypeRef> {
        self.v.as_deref()
    }

    pub fn key(&self) -> Option<&TypeRef> {
        self.k.as_deref()
    }
}
