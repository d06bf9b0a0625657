//! Deterministic query cleanup applied before any model call.

/// Normalize a raw query: lower-case, collapse whitespace runs to a single
/// space, trim. Pure and idempotent; keeps the query's semantics intact.
pub fn normalize(raw: &str) -> String {
    raw.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
