//! Utility types and functions used throughout the codebase.

pub mod newtypes;
pub mod sync;

pub use newtypes::{AdapterId, ScopeId};

/// Returns `name` with its first character lowercased, unless the second
/// character is uppercase too (`URL` stays `URL`, `Title` becomes `title`).
pub fn decapitalize(name: &str) -> String {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    match chars.next() {
        Some(second) if second.is_uppercase() => name.to_string(),
        _ => first.to_lowercase().chain(name.chars().skip(1)).collect(),
    }
}
