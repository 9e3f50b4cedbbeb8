//! Identifier rewriting
//!
//! Deterministic lowering of SL identifiers to Python identifiers:
//! synthetic-name separators, camelCase to snake_case, and escaping of
//! Python keywords plus the builtins the runtime relies on.

use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Python keywords plus builtins shadowed by generated accessors.
/// Collisions get a trailing underscore.
static RESERVED: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    let mut s = HashSet::new();
    // The 35 Python keywords
    for kw in [
        "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
        "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
        "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
        "try", "while", "with", "yield",
    ] {
        s.insert(kw);
    }
    // Builtins that generated code must not shadow
    for b in [
        "type", "hash", "id", "list", "map", "str", "int", "float", "bool", "self", "abs", "all",
        "any", "min", "max", "pow", "round", "set", "dir", "oct", "open", "vars", "print",
    ] {
        s.insert(b);
    }
    s
});

/// Convert camelCase/PascalCase to snake_case.
///
/// All-lowercase names return unchanged. An underscore is inserted before
/// an upper-case letter when the previous character is lowercase or a
/// digit, or at an acronym boundary (previous upper, next lower):
/// `XMLParser` -> `xml_parser`, `utf16BE` -> `utf16_be`.
pub fn to_snake_case(s: &str) -> String {
    if s.chars().all(|c| !c.is_uppercase()) {
        return s.to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + 4);
    for (i, c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                let prev = chars[i - 1];
                let next_lower = chars.get(i + 1).map(|n| n.is_lowercase()).unwrap_or(false);
                if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_lower)
                {
                    result.push('_');
                }
            }
            result.extend(c.to_lowercase());
        } else {
            result.push(*c);
        }
    }
    result
}

/// Append a trailing underscore when the name collides with a Python
/// keyword or a reserved builtin
pub fn escape_reserved(s: &str) -> String {
    if RESERVED.contains(s) {
        format!("{s}_")
    } else {
        s.to_string()
    }
}

/// Full identifier lowering: `$` separators, snake_case, reserved escape
pub fn python_name(s: &str) -> String {
    escape_reserved(&to_snake_case(&s.replace('$', "_")))
}
