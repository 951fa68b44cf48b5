//! HTTP utility functions for extracting request information.

use actix_web::HttpRequest;

/// Proxy headers consulted for the client address, in order of preference
const CLIENT_IP_HEADERS: [&str; 4] = [
    "X-Forwarded-For",
    "X-Real-IP",
    "CF-Connecting-IP",
    "X-Cluster-Client-IP",
];

/// Extract the client IP address
///
/// Uses the first address of the first proxy header present, falling back to
/// the connection peer address.
pub fn extract_client_ip(req: &HttpRequest) -> String {
    CLIENT_IP_HEADERS
        .iter()
        .filter_map(|name| req.headers().get(*name))
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(',').next())
        .map(str::trim)
        .find(|ip| !ip.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            req.connection_info()
                .peer_addr()
                .unwrap_or("unknown")
                .to_string()
        })
}

/// Extract user agent from request headers
pub fn extract_user_agent(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get("User-Agent")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string())
}

/// Path plus query string, as used for the login `next` parameter
pub fn path_with_query(req: &HttpRequest) -> String {
    match req.uri().query() {
        Some(query) if !query.is_empty() => format!("{}?{}", req.path(), query),
        _ => req.path().to_string(),
    }
}
