//! Shared helpers for tool handlers: pagination and filtering.

use regex::{Regex, RegexBuilder};

/// Default page size when the caller omits `limit`.
pub const DEFAULT_LIMIT: usize = 200;
/// Upper bound on `limit`; larger requests are clamped.
pub const LIMIT_CAP: usize = 2000;

/// Normalize pagination arguments: `offset` defaults to 0, `limit` defaults
/// to [`DEFAULT_LIMIT`] and is clamped to [`LIMIT_CAP`]. A limit of zero is
/// rejected.
pub fn normalize_pagination(
    offset: Option<usize>,
    limit: Option<usize>,
) -> Result<(usize, usize), String> {
    let offset = offset.unwrap_or(0);
    let limit = match limit {
        None => DEFAULT_LIMIT,
        Some(0) => return Err("limit must be greater than zero".to_string()),
        Some(limit) => limit.min(LIMIT_CAP),
    };
    Ok((offset, limit))
}

/// Clamp `offset` and the exclusive page end to `total`.
pub fn page_bounds(total: usize, offset: usize, limit: usize) -> (usize, usize) {
    let offset = offset.min(total);
    let end = offset.saturating_add(limit).min(total);
    (offset, end)
}

/// Compile a caller-supplied filter pattern.
pub fn compile_regex(pattern: &str, case_sensitive: bool) -> Result<Regex, String> {
    RegexBuilder::new(pattern)
        .case_insensitive(!case_sensitive)
        .build()
        .map_err(|e| format!("invalid regex: {e}"))
}

/// Substring match for the import module filter.
pub fn module_matches(module: &str, filter: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        module.contains(filter)
    } else {
        module.to_lowercase().contains(&filter.to_lowercase())
    }
}
