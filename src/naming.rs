//! Component-name derivation from fully-qualified serial names.
use once_cell::sync::Lazy;
use regex::Regex;

/// OpenAPI component keys must match `^[a-zA-Z0-9\.\-_]+$`.
static NON_COMPONENT_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9._\-]").expect("static regex"));

/// Serial name without the serialization layer's trailing nullable marker.
pub fn canonical_serial_name(serial_name: &str) -> &str {
    serial_name.trim().trim_end_matches('?')
}

/// Short component name: the last `.` segment, reduced to the innermost
/// nested class (`a.Outer$Inner` → `Inner`), with characters outside the
/// component-key alphabet replaced by `_`.
pub fn short_name(serial_name: &str) -> String {
    let canonical = canonical_serial_name(serial_name);
    let segment = canonical.rsplit('.').next().unwrap_or(canonical);
    let segment = segment.rsplit('$').next().unwrap_or(segment);
    // a trailing separator leaves nothing useful; fall back to the whole name
    let segment = if segment.is_empty() { canonical } else { segment };
    NON_COMPONENT_CHARS.replace_all(segment, "_").into_owned()
}
