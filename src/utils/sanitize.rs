//! HTML escaping and URL sanitizing.

use url::Url;

/// Query parameters that only carry tracking data
const TRACKING_PARAMS: [&str; 3] = ["fbclid", "gclid", "mc_eid"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UrlError {
    #[error("URL is not valid")]
    Invalid,

    #[error("only http and https URLs are allowed")]
    Scheme,

    #[error("URL must include a host")]
    MissingHost,
}

/// Escape text for inclusion in HTML element content or attribute values
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Trim and drop control characters from single-line user text
pub fn sanitize_text(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Parse a user-supplied URL, allowing only http(s) with a host
pub fn sanitize_url(input: &str) -> Result<Url, UrlError> {
    let url = Url::parse(input.trim()).map_err(|_| UrlError::Invalid)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(UrlError::Scheme);
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(UrlError::MissingHost);
    }
    Ok(url)
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}

/// Canonical form used for de-duplicating KB entries
///
/// Scheme and host are lowercased by the parser; the fragment, tracking
/// parameters and a trailing slash on non-root paths are removed.
pub fn canonicalize_url(input: &str) -> Result<String, UrlError> {
    let mut url = sanitize_url(input)?;
    url.set_fragment(None);

    // Kept segments stay byte for byte as entered.
    let kept = url.query().map(|query| {
        query
            .split('&')
            .filter(|segment| {
                let key = segment.split_once('=').map_or(*segment, |(key, _)| key);
                !segment.is_empty() && !is_tracking_param(key)
            })
            .collect::<Vec<_>>()
            .join("&")
    });
    url.set_query(kept.as_deref().filter(|q| !q.is_empty()));

    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(path.trim_end_matches('/'));
    }

    Ok(url.to_string())
}

/// Accept only same-site relative paths as post-login redirect targets
pub fn safe_redirect_target(next: Option<&str>) -> String {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}
