//! Display name normalization shared by both trees.

use crate::service::error::TreeServiceError;
use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Trims and collapses inner whitespace runs; rejects blank input.
pub fn normalize_name(value: &str) -> Result<String, TreeServiceError> {
    let collapsed = WHITESPACE_RE.replace_all(value.trim(), " ");
    if collapsed.is_empty() {
        return Err(TreeServiceError::InvalidName);
    }
    Ok(collapsed.into_owned())
}

/// Trims a free-text description; blank becomes `None`.
pub fn normalize_description(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}
