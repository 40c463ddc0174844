//! URL normalization used for cache keys and feed matching.
//!
//! Two links to the same article usually differ only in tracking parameters,
//! fragments, or a trailing slash. [`normalize_url`] folds those away so they
//! land on the same cache entry.

use url::Url;

/// Canonical form of `input`: fragment and query removed, trailing slashes
/// stripped from the path.
///
/// Input that does not parse as an absolute URL is returned unchanged.
pub fn normalize_url(input: &str) -> String {
    let Ok(mut url) = Url::parse(input) else {
        return input.to_string();
    };

    url.set_fragment(None);
    url.set_query(None);

    let trimmed = url.path().trim_end_matches('/').to_string();
    if trimmed.len() != url.path().len() {
        url.set_path(&trimmed);
    }

    url.to_string()
}

/// The AMP mirror of an article URL (`<path>/amp/`).
///
/// Returns `None` when the URL does not parse or already points at an AMP page.
pub fn amp_url(input: &str) -> Option<String> {
    let mut url = Url::parse(input).ok()?;

    if url.path().trim_end_matches('/').ends_with("/amp") {
        return None;
    }

    let mut path = url.path().to_string();
    if !path.ends_with('/') {
        path.push('/');
    }
    path.push_str("amp/");
    url.set_path(&path);

    Some(url.to_string())
}
