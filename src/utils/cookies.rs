//! Session cookies carrying the auth provider's tokens.

use crate::{config::AuthConfig, models::AuthSession};
use actix_web::{
    HttpRequest,
    cookie::{Cookie, SameSite, time::Duration},
};

pub const ACCESS_TOKEN_COOKIE: &str = "sb-access-token";
pub const REFRESH_TOKEN_COOKIE: &str = "sb-refresh-token";

fn session_cookie(name: &'static str, value: String, max_age: Duration, secure: bool) -> Cookie<'static> {
    Cookie::build(name, value)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(max_age)
        .finish()
}

/// Access and refresh cookies for a freshly issued session
pub fn session_cookies(session: &AuthSession, config: &AuthConfig) -> [Cookie<'static>; 2] {
    [
        session_cookie(
            ACCESS_TOKEN_COOKIE,
            session.access_token.clone(),
            Duration::seconds(session.expires_in.max(0)),
            config.cookie_secure,
        ),
        session_cookie(
            REFRESH_TOKEN_COOKIE,
            session.refresh_token.clone(),
            Duration::days(config.refresh_ttl_days),
            config.cookie_secure,
        ),
    ]
}

/// Expired cookies that make the browser drop the session
pub fn cleared_cookies(config: &AuthConfig) -> [Cookie<'static>; 2] {
    [
        session_cookie(ACCESS_TOKEN_COOKIE, String::new(), Duration::ZERO, config.cookie_secure),
        session_cookie(REFRESH_TOKEN_COOKIE, String::new(), Duration::ZERO, config.cookie_secure),
    ]
}

/// Non-empty value of a request cookie
pub fn cookie_value(req: &HttpRequest, name: &str) -> Option<String> {
    req.cookie(name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AuthUser;
    use uuid::Uuid;

    fn session() -> AuthSession {
        AuthSession {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_in: 3600,
            user: AuthUser {
                id: Uuid::new_v4(),
                email: Some("qa@example.com".to_string()),
            },
        }
    }

    #[test]
    fn test_session_cookies_attributes() {
        let [access, refresh] = session_cookies(&session(), &AuthConfig::default());
        assert_eq!(access.name(), ACCESS_TOKEN_COOKIE);
        assert_eq!(access.value(), "access");
        assert_eq!(access.http_only(), Some(true));
        assert_eq!(access.secure(), Some(true));
        assert_eq!(access.same_site(), Some(SameSite::Lax));
        assert_eq!(access.path(), Some("/"));
        assert_eq!(access.max_age(), Some(Duration::seconds(3600)));
        assert_eq!(refresh.max_age(), Some(Duration::days(30)));
    }

    #[test]
    fn test_cleared_cookies_expire_immediately() {
        let config = AuthConfig {
            cookie_secure: false,
            ..AuthConfig::default()
        };
        for cookie in cleared_cookies(&config) {
            assert_eq!(cookie.value(), "");
            assert_eq!(cookie.max_age(), Some(Duration::ZERO));
            assert_eq!(cookie.secure(), Some(false));
        }
    }
}
