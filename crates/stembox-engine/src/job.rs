//! Backend job-result normalization.
//!
//! The stem-separation backend reports stems either as an ordered list of
//! `{type, url}` entries or as a `type -> url` mapping. Both collapse here
//! into one canonical ordered list at the boundary; nothing downstream ever
//! branches on the wire shape again.

use stembox_core::StemField;

/// Normalize a stems field into an ordered `(type, url)` list.
///
/// Map iteration order carries no meaning; callers must not depend on it.
/// A missing or malformed field normalizes to an empty list.
pub fn normalize_stems(stems: Option<&StemField>) -> Vec<(String, String)> {
    match stems {
        None => Vec::new(),
        Some(StemField::List(entries)) => entries
            .iter()
            .map(|e| (e.kind.clone(), e.url.clone()))
            .collect(),
        Some(StemField::Map(map)) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
    }
}

/// Resolve a possibly-relative URL against a base. Absolute http(s) URLs
/// pass through unchanged.
pub fn resolve_url(base: Option<&str>, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        return url.to_string();
    }
    match base {
        Some(base) if !base.is_empty() => {
            format!("{}/{}", base.trim_end_matches('/'), url.trim_start_matches('/'))
        }
        _ => url.to_string(),
    }
}
