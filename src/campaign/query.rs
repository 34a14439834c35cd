//! Query-string parameter extraction and value normalization

use url::form_urlencoded;

/// Longest value, in characters, kept for a campaign dimension
pub const MAX_VALUE_LENGTH: usize = 250;

/// Raw decoded value of `param` in `query_string`
///
/// A single leading `?` is ignored. `+` decodes to a space and percent
/// escapes are decoded; when the parameter occurs more than once the last
/// occurrence wins.
pub fn parameter_from_query_string(query_string: &str, param: &str) -> Option<String> {
    let query_string = query_string.strip_prefix('?').unwrap_or(query_string);
    form_urlencoded::parse(query_string.as_bytes())
        .filter(|(name, _)| name == param)
        .last()
        .map(|(_, value)| value.into_owned())
}

/// Trim, lower-case and truncate a decoded parameter value
///
/// Returns `None` when nothing is left, or when the value is a bare `0`.
pub fn normalize_value(raw: &str) -> Option<String> {
    let value: String = raw
        .trim()
        .to_lowercase()
        .chars()
        .take(MAX_VALUE_LENGTH)
        .collect();

    if value.is_empty() || value == "0" {
        None
    } else {
        Some(value)
    }
}

/// Normalized value of `param` in `query_string`, if it carries one
pub fn value_from_query_string(param: &str, query_string: &str) -> Option<String> {
    parameter_from_query_string(query_string, param).and_then(|raw| normalize_value(&raw))
}
