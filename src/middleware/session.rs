//! Session resolution and the public/protected path policy.

use crate::{
    backend::{BackendError, SharedBackend},
    config::{AuthConfig, BackendConfig},
    error::ApiError,
    models::{
        AuthAuditEvent, AuthEventOutcome, AuthEventType, AuthSession, AuthUser, CurrentUser, Role,
    },
    services::profile::fetch_profile_with_retry,
    utils::{
        cookies::{
            ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE, cleared_cookies, cookie_value,
            session_cookies,
        },
        http::path_with_query,
    },
};
use actix_web::{
    Error, HttpMessage, HttpResponse, ResponseError,
    body::{BoxBody, MessageBody},
    cookie::Cookie,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header,
    web,
};
use std::{
    future::{Ready, ready},
    pin::Pin,
    rc::Rc,
    time::Duration,
};

/// Paths served without a session, matched by prefix
const PUBLIC_PREFIXES: [&str; 8] = [
    "/auth/",
    "/api/auth/",
    "/api/health",
    "/api/kb/entries",
    "/api/generators/",
    "/api/validators/",
    "/api/spec",
    "/api/metrics",
];

/// Whether `path` bypasses the sign-in requirement
pub fn is_public_path(path: &str) -> bool {
    path == "/" || PUBLIC_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

/// Login page URL that returns to `target` afterwards
pub fn login_redirect(target: &str) -> String {
    let next: String = url::form_urlencoded::byte_serialize(target.as_bytes()).collect();
    format!("/auth/login?next={next}")
}

/// Identity attached to every request by [`SessionMiddleware`]
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub user: Option<CurrentUser>,
    pub access_token: Option<String>,
}

/// Outcome of reading the session cookies
#[derive(Default)]
struct Resolution {
    context: SessionContext,
    /// Tokens issued by a refresh during this request
    refreshed: Option<AuthSession>,
    /// The cookies no longer identify a session
    stale: bool,
}

/// Session middleware factory
///
/// Resolves the caller from the `sb-access-token` / `sb-refresh-token`
/// cookies, loads the role from the profile, and enforces the path policy.
/// Backend failures leave the request anonymous.
pub struct SessionMiddleware;

impl<S, B> Transform<S, ServiceRequest> for SessionMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type InitError = ();
    type Transform = SessionMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

/// The actual session middleware service
pub struct SessionMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for SessionMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        Box::pin(async move {
            let resolution = resolve_session(&req).await;
            let signed_in = resolution.context.user.is_some();
            req.extensions_mut().insert(resolution.context);

            let auth_config = req
                .app_data::<web::Data<AuthConfig>>()
                .map(|c| c.get_ref().clone())
                .unwrap_or_default();

            let path = req.path().to_string();
            let mut res = if !signed_in && !is_public_path(&path) {
                let response = if path.starts_with("/api/") {
                    ApiError::unauthenticated().error_response()
                } else {
                    HttpResponse::Found()
                        .insert_header((header::LOCATION, login_redirect(&path_with_query(req.request()))))
                        .finish()
                };
                tracing::debug!(path = %path, "Protected path requested without a session");
                req.into_response(response)
            } else {
                service.call(req).await?.map_into_boxed_body()
            };

            let cookies = match (resolution.refreshed, resolution.stale) {
                (Some(session), _) => Some(session_cookies(&session, &auth_config)),
                (None, true) => Some(cleared_cookies(&auth_config)),
                (None, false) => None,
            };
            if let Some(cookies) = cookies {
                set_cookies_unless_present(&mut res, &cookies);
            }

            Ok(res)
        })
    }
}

/// Add session cookies unless the handler already set its own
fn set_cookies_unless_present(res: &mut ServiceResponse<BoxBody>, cookies: &[Cookie<'static>]) {
    let handler_set = res
        .response()
        .cookies()
        .any(|c| c.name() == ACCESS_TOKEN_COOKIE || c.name() == REFRESH_TOKEN_COOKIE);
    if handler_set {
        return;
    }
    for cookie in cookies {
        if let Err(e) = res.response_mut().add_cookie(cookie) {
            tracing::warn!(error = %e, cookie = cookie.name(), "Failed to set session cookie");
        }
    }
}

async fn resolve_session(req: &ServiceRequest) -> Resolution {
    let Some(backend) = req
        .app_data::<web::Data<SharedBackend>>()
        .map(|data| data.get_ref().clone())
    else {
        return Resolution::default();
    };

    let access_token = cookie_value(req.request(), ACCESS_TOKEN_COOKIE);
    let refresh_token = cookie_value(req.request(), REFRESH_TOKEN_COOKIE);
    if access_token.is_none() && refresh_token.is_none() {
        return Resolution::default();
    }

    let mut identity: Option<(AuthUser, String)> = None;
    if let Some(token) = access_token {
        match backend.get_user(&token).await {
            Ok(user) => identity = Some((user, token)),
            Err(BackendError::Unauthorized(_) | BackendError::Auth { .. }) => {
                tracing::debug!("Access token rejected, trying refresh");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Session lookup failed; continuing anonymously");
                return Resolution::default();
            }
        }
    }

    let mut refreshed = None;
    if identity.is_none() {
        let Some(refresh_token) = refresh_token else {
            return Resolution {
                stale: true,
                ..Resolution::default()
            };
        };
        match backend.refresh_session(&refresh_token).await {
            Ok(session) => {
                AuthAuditEvent::from_request(
                    req.request(),
                    AuthEventType::SessionRefreshed,
                    AuthEventOutcome::Success,
                )
                .with_user_id(Some(session.user.id.to_string()))
                .log();
                identity = Some((session.user.clone(), session.access_token.clone()));
                refreshed = Some(session);
            }
            Err(e @ (BackendError::Unauthorized(_) | BackendError::Auth { .. })) => {
                tracing::debug!(error = %e, "Refresh token rejected");
                return Resolution {
                    stale: true,
                    ..Resolution::default()
                };
            }
            Err(e) => {
                tracing::warn!(error = %e, "Session refresh failed; continuing anonymously");
                return Resolution::default();
            }
        }
    }

    let Some((user, token)) = identity else {
        return Resolution::default();
    };

    let config = req
        .app_data::<web::Data<BackendConfig>>()
        .map(|c| c.get_ref().clone())
        .unwrap_or_default();
    let role = match fetch_profile_with_retry(
        backend.as_ref(),
        &token,
        user.id,
        config.profile_fetch_attempts,
        Duration::from_millis(config.profile_fetch_delay_ms),
    )
    .await
    {
        Ok(Some(profile)) => profile.role,
        Ok(None) => {
            tracing::warn!(user_id = %user.id, "Profile missing after retries; using the user role");
            Role::User
        }
        Err(e) => {
            tracing::warn!(user_id = %user.id, error = %e, "Profile lookup failed; using the user role");
            Role::User
        }
    };

    Resolution {
        context: SessionContext {
            user: Some(CurrentUser {
                id: user.id,
                email: user.email,
                role,
            }),
            access_token: Some(token),
        },
        refreshed,
        stale: false,
    }
}
