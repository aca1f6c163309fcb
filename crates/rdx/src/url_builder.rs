//! 🔗 URL Builder: root + path + query, glued together without double slashes.
//!
//! ⚠️ Absent params are `None` and get dropped before anything is stringified.
//! Nobody upstream gets to pass the string "undefined" and hope we catch it.

use reqwest::Url;

/// 🎛️ Query params in insertion order. `None` means "leave it out".
pub type QueryParams = Vec<(&'static str, Option<String>)>;

/// 💀 The root (or root + path) didn't parse as an absolute URL.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Invalid URL '{url}': {reason}")]
pub struct UrlError {
    pub url: String,
    pub reason: String,
}

/// 🔗 Compose `root/path?query`.
///
/// One leading slash is stripped from `endpoint_path` and trailing slashes are
/// trimmed from `root`. Values are form-urlencoded. No `?` when nothing survives the
/// filter.
pub fn build_url(
    root: &str,
    endpoint_path: &str,
    params: &[(&str, Option<String>)],
) -> Result<String, UrlError> {
    let path = endpoint_path.strip_prefix('/').unwrap_or(endpoint_path);
    let joined = format!("{}/{}", root.trim_end_matches('/'), path);
    let mut url = Url::parse(&joined).map_err(|e| UrlError {
        url: joined.clone(),
        reason: e.to_string(),
    })?;

    let mut present = params
        .iter()
        .filter_map(|(key, value)| value.as_deref().map(|v| (*key, v)))
        .peekable();
    // -- 🕳️ only touch the query if something survived, otherwise Url leaves a lonely `?`
    if present.peek().is_some() {
        url.query_pairs_mut().extend_pairs(present);
    }

    Ok(url.to_string())
}
