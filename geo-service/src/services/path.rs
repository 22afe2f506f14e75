//! Materialized path helpers.
//!
//! A node's path is its ancestors' names joined with `/`, starting at the
//! structure root and ending with the node itself (`PNG/Morobe/Lae`).

use super::error::GeoError;
use crate::models::GeoNode;

pub const SEPARATOR: char = '/';

pub fn build_path(parent_path: &str, name: &str) -> String {
    format!("{}{}{}", parent_path, SEPARATOR, name)
}

/// The path a node contributes as a parent. Roots fall back to their name.
pub fn parent_path(parent: &GeoNode) -> Result<&str, GeoError> {
    if !parent.path.is_empty() {
        Ok(&parent.path)
    } else if parent.is_root() && !parent.name.is_empty() {
        Ok(&parent.name)
    } else {
        Err(GeoError::ParentPathUndetermined(parent.id))
    }
}

pub fn last_segment(path: &str) -> &str {
    path.rsplit(SEPARATOR).next().unwrap_or(path)
}

pub fn replace_last_segment(path: &str, name: &str) -> String {
    match path.rfind(SEPARATOR) {
        Some(idx) => build_path(&path[..idx], name),
        None => name.to_string(),
    }
}

/// True when `candidate` equals `ancestor` or lies underneath it.
pub fn is_same_or_descendant(candidate: &str, ancestor: &str) -> bool {
    candidate == ancestor
        || (candidate.len() > ancestor.len()
            && candidate.starts_with(ancestor)
            && candidate[ancestor.len()..].starts_with(SEPARATOR))
}

/// Re-root `path` from `old_prefix` to `new_prefix`; `None` when `path`
/// is not strictly below `old_prefix`.
pub fn rebase(path: &str, old_prefix: &str, new_prefix: &str) -> Option<String> {
    if path.len() > old_prefix.len() && is_same_or_descendant(path, old_prefix) {
        Some(format!("{}{}", new_prefix, &path[old_prefix.len()..]))
    } else {
        None
    }
}

/// Names become path segments, so they must be non-empty and separator-free.
pub fn validate_name(name: &str) -> Result<String, GeoError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(GeoError::MissingField("name"));
    }
    if trimmed.contains(SEPARATOR) {
        return Err(GeoError::InvalidName(format!(
            "'{}' must not contain '{}'",
            trimmed, SEPARATOR
        )));
    }
    if trimmed.chars().count() > 200 {
        return Err(GeoError::InvalidName(
            "name must be at most 200 characters".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

pub const MAX_CODE_LEN: usize = 50;

/// Trims a code; blank codes become `None`.
pub fn validate_code(code: Option<&str>) -> Result<Option<String>, GeoError> {
    let Some(code) = code.map(str::trim).filter(|c| !c.is_empty()) else {
        return Ok(None);
    };
    if code.chars().count() > MAX_CODE_LEN {
        return Err(GeoError::InvalidCode(format!(
            "code must be at most {} characters",
            MAX_CODE_LEN
        )));
    }
    Ok(Some(code.to_string()))
}
