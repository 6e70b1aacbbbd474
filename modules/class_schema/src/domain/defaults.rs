//! Default value resolution for DDL
//!
//! A database default is always a literal. Macro expressions (`{%..%}`,
//! `{?..?}`, `{$..$}`) are resolved by the application layer and are replaced
//! by the type's intrinsic default here.

use super::types::DataTypeSpec;
use crate::contract::FieldInfo;
use once_cell::sync::Lazy;
use regex::Regex;

#[allow(clippy::expect_used)]
static MACRO_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\{%.*?%\}|\{\?.*?\?\}|\{\$.*?\$\}").expect("macro pattern is valid")
});

/// Whether the value contains a deferred-resolution macro expression
pub fn is_macro(value: &str) -> bool {
    MACRO_PATTERN.is_match(value)
}

/// Default value to push to the database for a field.
///
/// - macro-bearing default: the intrinsic default of the type
/// - literal default: used verbatim
/// - no default on a field that disallows empty values: the intrinsic default
/// - otherwise: none
pub fn get_field_default_value(field: &FieldInfo, spec: &DataTypeSpec) -> Option<String> {
    match field.default_value.as_deref() {
        Some(value) if is_macro(value) => spec.intrinsic_default.clone(),
        Some(value) if !value.is_empty() => Some(value.to_string()),
        _ if !field.allow_empty => spec.intrinsic_default.clone(),
        _ => None,
    }
}

/// Default of a field whose type is not registered (virtual fields only)
pub(crate) fn unmapped_default_value(field: &FieldInfo) -> Option<String> {
    field
        .default_value
        .as_deref()
        .filter(|v| !v.is_empty() && !is_macro(v))
        .map(str::to_string)
}

/// Normalize a default reported by live introspection to its literal form.
///
/// Strips type casts (`'x'::character varying`), wrapping parentheses and
/// quotes. Sequence-backed defaults yield `None`.
pub fn normalize_introspected_default(raw: &str) -> Option<String> {
    let mut value = raw.trim();
    let lower = value.to_ascii_lowercase();
    if value.is_empty() || lower == "null" || lower.starts_with("nextval(") {
        return None;
    }

    if let Some(idx) = value.rfind("::") {
        if !value[idx..].contains('\'') {
            value = &value[..idx];
        }
    }
    while value.len() >= 2 && value.starts_with('(') && value.ends_with(')') {
        value = &value[1..value.len() - 1];
    }
    if value.len() >= 2 && value.starts_with('\'') && value.ends_with('\'') {
        return Some(value[1..value.len() - 1].replace("''", "'"));
    }
    Some(value.to_string())
}
