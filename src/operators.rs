//! Operator token tables
//!
//! Maps SL operator-method qnames to native Python operator tokens.
//! Integer division and modulo are deliberately absent: SL truncates
//! toward zero while Python floors, so those route to `ObjUtil.div` and
//! `ObjUtil.mod` instead of a token.

use once_cell::sync::Lazy;
use std::collections::HashMap;

const UNARY_OPS: &[(&str, &str)] = &[
    ("sys::Bool.not", "not "),
    ("sys::Int.negate", "-"),
    ("sys::Float.negate", "-"),
];

const BINARY_OPS: &[(&str, &str)] = &[
    ("sys::Int.plus", "+"),
    ("sys::Int.minus", "-"),
    ("sys::Int.mult", "*"),
    ("sys::Float.plus", "+"),
    ("sys::Float.minus", "-"),
    ("sys::Float.mult", "*"),
    ("sys::Float.div", "/"),
    ("sys::Decimal.plus", "+"),
    ("sys::Decimal.minus", "-"),
    ("sys::Decimal.mult", "*"),
    ("sys::Decimal.div", "/"),
    ("sys::Str.plus", "+"),
];

static UNARY_MAP: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| UNARY_OPS.iter().copied().collect());

static BINARY_MAP: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| BINARY_OPS.iter().copied().collect());

/// Python token for a unary operator method, e.g. "sys::Bool.not" -> "not "
pub fn unary_op(qname: &str) -> Option<&'static str> {
    UNARY_MAP.get(qname).copied()
}

/// Python token for a binary operator method, e.g. "sys::Int.plus" -> "+"
pub fn binary_op(qname: &str) -> Option<&'static str> {
    BINARY_MAP.get(qname).copied()
}
