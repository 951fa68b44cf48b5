//! Sign-in, sign-up, password reset and session refresh over HTTP.

use actix_web::{
    cookie::{Cookie, SameSite},
    dev::ServiceResponse,
    http::StatusCode,
    test,
};
use qa_toolsmith::{
    AppState, AuthConfig, Backend, MemoryBackend, RateLimitConfig, create_app, models::Role,
};
use serde_json::{Value, json};
use std::sync::Arc;

const PASSWORD: &str = "correct-horse";

fn response_cookie(resp: &ServiceResponse, name: &str) -> Option<Cookie<'static>> {
    resp.response()
        .cookies()
        .find(|c| c.name() == name)
        .map(|c| c.into_owned())
}

fn access_cookie(token: &str) -> Cookie<'static> {
    Cookie::new("sb-access-token", token.to_string())
}

fn state(backend: &Arc<MemoryBackend>) -> AppState {
    AppState::with_backend(backend.clone()).unwrap()
}

#[actix_web::test]
async fn test_signup_signs_in_and_sets_cookies() {
    let backend = Arc::new(MemoryBackend::new());
    let app = test::init_service(create_app(state(&backend))).await;

    let req = test::TestRequest::post()
        .uri("/api/auth/signup")
        .set_json(json!({ "email": "New.Tester@Example.com", "password": PASSWORD }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let access = response_cookie(&resp, "sb-access-token").expect("access cookie");
    let refresh = response_cookie(&resp, "sb-refresh-token").expect("refresh cookie");
    assert!(!access.value().is_empty());
    assert!(!refresh.value().is_empty());
    assert_eq!(access.http_only(), Some(true));
    assert_eq!(access.secure(), Some(true));
    assert_eq!(access.same_site(), Some(SameSite::Lax));
    assert_eq!(access.path(), Some("/"));

    let json: Value = test::read_body_json(resp).await;
    assert_eq!(json["data"]["requires_confirmation"], false);
    assert_eq!(json["data"]["user"]["email"], "new.tester@example.com");

    let req = test::TestRequest::get()
        .uri("/api/profile")
        .cookie(access_cookie(access.value()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let json: Value = test::read_body_json(resp).await;
    assert_eq!(json["data"]["role"], "user");
    assert_eq!(json["data"]["email"], "new.tester@example.com");
}

#[actix_web::test]
async fn test_signup_with_confirmation_and_duplicates() {
    let backend = Arc::new(MemoryBackend::new().with_email_confirmation());
    let app = test::init_service(create_app(state(&backend))).await;
    let body = json!({ "email": "pending@example.com", "password": PASSWORD });

    let req = test::TestRequest::post()
        .uri("/api/auth/signup")
        .set_json(&body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert!(response_cookie(&resp, "sb-access-token").is_none());
    let json: Value = test::read_body_json(resp).await;
    assert_eq!(json["data"]["requires_confirmation"], true);

    // Unconfirmed accounts cannot sign in yet
    let req = test::TestRequest::post()
        .uri("/api/auth/signin")
        .set_json(&body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/api/auth/signup")
        .set_json(&body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json: Value = test::read_body_json(resp).await;
    assert_eq!(json["error"]["code"], "SIGNUP_FAILED");
    assert!(!json["error"]["message"].as_str().unwrap().contains("registered"));
}

#[actix_web::test]
async fn test_signin_failures() {
    let backend = Arc::new(MemoryBackend::new());
    backend.add_user("qa@example.com", PASSWORD, Role::User).await;
    let app = test::init_service(create_app(state(&backend))).await;

    let req = test::TestRequest::post()
        .uri("/api/auth/signin")
        .set_json(json!({ "email": "qa@example.com", "password": "wrong-password" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(response_cookie(&resp, "sb-access-token").is_none());
    let json: Value = test::read_body_json(resp).await;
    assert_eq!(json["error"]["code"], "INVALID_CREDENTIALS");

    let req = test::TestRequest::post()
        .uri("/api/auth/signin")
        .set_json(json!({ "email": "not-an-email", "password": "short" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json: Value = test::read_body_json(resp).await;
    assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"]["details"]["fields"].as_array().unwrap().len(), 2);
}

#[actix_web::test]
async fn test_signin_then_signout() {
    let backend = Arc::new(MemoryBackend::new());
    backend.add_user("qa@example.com", PASSWORD, Role::User).await;
    let state = state(&backend).with_auth_config(AuthConfig {
        cookie_secure: false,
        ..AuthConfig::default()
    });
    let app = test::init_service(create_app(state)).await;

    let req = test::TestRequest::post()
        .uri("/api/auth/signin")
        .set_json(json!({ "email": "QA@example.com", "password": PASSWORD }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let access = response_cookie(&resp, "sb-access-token").unwrap();
    assert_eq!(access.secure(), Some(false));
    let json: Value = test::read_body_json(resp).await;
    assert_eq!(json["data"]["user"]["email"], "qa@example.com");

    let req = test::TestRequest::get()
        .uri("/profile")
        .cookie(access_cookie(access.value()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    assert!(std::str::from_utf8(&body).unwrap().contains("qa@example.com"));

    let req = test::TestRequest::post()
        .uri("/api/auth/signout")
        .cookie(access_cookie(access.value()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cleared = response_cookie(&resp, "sb-access-token").unwrap();
    assert_eq!(cleared.value(), "");
    assert_eq!(cleared.max_age(), Some(actix_web::cookie::time::Duration::ZERO));

    // The revoked token no longer identifies a session
    let req = test::TestRequest::get()
        .uri("/api/profile")
        .cookie(access_cookie(access.value()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

    // Signing out without a session still succeeds
    let req = test::TestRequest::post().uri("/api/auth/signout").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_reset_request_does_not_reveal_accounts() {
    let backend = Arc::new(MemoryBackend::new());
    backend.add_user("qa@example.com", PASSWORD, Role::User).await;
    let app = test::init_service(create_app(state(&backend))).await;

    let mut messages = Vec::new();
    for email in ["qa@example.com", "nobody@example.com"] {
        let req = test::TestRequest::post()
            .uri("/api/auth/reset-request")
            .set_json(json!({ "email": email }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json: Value = test::read_body_json(resp).await;
        messages.push(json["data"]["message"].clone());
    }
    assert_eq!(messages[0], messages[1]);
    assert!(backend.recovery_code_for("qa@example.com").await.is_some());

    let req = test::TestRequest::post()
        .uri("/api/auth/reset-request")
        .set_json(json!({ "email": "nope" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_reset_change_with_recovery_code() {
    let backend = Arc::new(MemoryBackend::new());
    backend.add_user("qa@example.com", PASSWORD, Role::User).await;
    backend
        .request_password_reset("qa@example.com", None)
        .await
        .unwrap();
    let code = backend.recovery_code_for("qa@example.com").await.unwrap();
    let app = test::init_service(create_app(state(&backend))).await;

    let req = test::TestRequest::post()
        .uri("/api/auth/reset-change")
        .set_json(json!({ "password": "brand-new-secret", "code": code }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(response_cookie(&resp, "sb-access-token").is_some());

    assert!(backend.sign_in("qa@example.com", "brand-new-secret").await.is_ok());
    assert!(backend.sign_in("qa@example.com", PASSWORD).await.is_err());

    // Recovery codes are single use
    let req = test::TestRequest::post()
        .uri("/api/auth/reset-change")
        .set_json(json!({ "password": "another-secret", "code": code }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json: Value = test::read_body_json(resp).await;
    assert_eq!(json["error"]["code"], "INVALID_RESET_TOKEN");
}

#[actix_web::test]
async fn test_reset_change_with_session() {
    let backend = Arc::new(MemoryBackend::new());
    backend.add_user("qa@example.com", PASSWORD, Role::User).await;
    let session = backend.sign_in("qa@example.com", PASSWORD).await.unwrap();
    let app = test::init_service(create_app(state(&backend))).await;

    let req = test::TestRequest::post()
        .uri("/api/auth/reset-change")
        .set_json(json!({ "password": "brand-new-secret" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/api/auth/reset-change")
        .cookie(access_cookie(&session.access_token))
        .set_json(json!({ "password": PASSWORD }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json: Value = test::read_body_json(resp).await;
    assert_eq!(json["error"]["code"], "PASSWORD_UPDATE_FAILED");

    let req = test::TestRequest::post()
        .uri("/api/auth/reset-change")
        .cookie(access_cookie(&session.access_token))
        .set_json(json!({ "password": "brand-new-secret" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    assert!(backend.sign_in("qa@example.com", "brand-new-secret").await.is_ok());
}

#[actix_web::test]
async fn test_expired_access_token_is_refreshed() {
    let backend = Arc::new(MemoryBackend::new());
    backend.add_user("qa@example.com", PASSWORD, Role::User).await;
    let session = backend.sign_in("qa@example.com", PASSWORD).await.unwrap();
    backend.expire_access_token(&session.access_token).await;
    let app = test::init_service(create_app(state(&backend))).await;

    let req = test::TestRequest::get()
        .uri("/api/profile")
        .cookie(access_cookie(&session.access_token))
        .cookie(Cookie::new("sb-refresh-token", session.refresh_token.clone()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let access = response_cookie(&resp, "sb-access-token").expect("refreshed access cookie");
    let refresh = response_cookie(&resp, "sb-refresh-token").expect("rotated refresh cookie");
    assert_ne!(access.value(), session.access_token);
    assert_ne!(refresh.value(), session.refresh_token);
    assert!(backend.get_user(access.value()).await.is_ok());

    // The old refresh token was rotated away
    let req = test::TestRequest::get()
        .uri("/profile")
        .cookie(access_cookie(&session.access_token))
        .cookie(Cookie::new("sb-refresh-token", session.refresh_token.clone()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(resp.headers().get("location").unwrap(), "/auth/login?next=%2Fprofile");
    assert_eq!(response_cookie(&resp, "sb-refresh-token").unwrap().value(), "");
}

#[actix_web::test]
async fn test_missing_profile_falls_back_to_user_role() {
    let backend = Arc::new(MemoryBackend::new());
    let user = backend.add_user("admin@example.com", PASSWORD, Role::Admin).await;
    let session = backend.sign_in("admin@example.com", PASSWORD).await.unwrap();
    let app = test::init_service(create_app(state(&backend))).await;

    let req = test::TestRequest::get()
        .uri("/admin")
        .cookie(access_cookie(&session.access_token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    backend.remove_profile(user.id).await;

    let req = test::TestRequest::get()
        .uri("/admin")
        .cookie(access_cookie(&session.access_token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::get()
        .uri("/api/profile")
        .cookie(access_cookie(&session.access_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let json: Value = test::read_body_json(resp).await;
    assert_eq!(json["error"]["message"], "Profile not found");
}

#[actix_web::test]
async fn test_email_change_request() {
    let backend = Arc::new(MemoryBackend::new());
    let user = backend.add_user("qa@example.com", PASSWORD, Role::User).await;
    backend.add_user("taken@example.com", PASSWORD, Role::User).await;
    let session = backend.sign_in("qa@example.com", PASSWORD).await.unwrap();
    let app = test::init_service(create_app(state(&backend))).await;

    let req = test::TestRequest::put()
        .uri("/api/profile/email")
        .cookie(access_cookie(&session.access_token))
        .set_json(json!({ "email": "New@Example.com" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let json: Value = test::read_body_json(resp).await;
    assert_eq!(json["data"]["email"], "new@example.com");
    assert_eq!(json["data"]["pending_confirmation"], true);
    assert_eq!(
        backend.pending_email(user.id).await.as_deref(),
        Some("new@example.com")
    );

    let req = test::TestRequest::put()
        .uri("/api/profile/email")
        .cookie(access_cookie(&session.access_token))
        .set_json(json!({ "email": "taken@example.com" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json: Value = test::read_body_json(resp).await;
    assert_eq!(json["error"]["code"], "EMAIL_UPDATE_FAILED");
}

#[actix_web::test]
async fn test_admin_page_requires_admin_role() {
    let backend = Arc::new(MemoryBackend::new());
    backend.add_user("qa@example.com", PASSWORD, Role::User).await;
    let session = backend.sign_in("qa@example.com", PASSWORD).await.unwrap();
    let app = test::init_service(create_app(state(&backend))).await;

    let req = test::TestRequest::get().uri("/admin").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    let req = test::TestRequest::get()
        .uri("/admin")
        .cookie(access_cookie(&session.access_token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_signin_is_rate_limited() {
    let backend = Arc::new(MemoryBackend::new());
    let state = state(&backend).with_rate_limit(RateLimitConfig {
        max_requests: 2,
        window_seconds: 60,
    });
    let app = test::init_service(create_app(state)).await;

    let mut statuses = Vec::new();
    for _ in 0..3 {
        let req = test::TestRequest::post()
            .uri("/api/auth/signin")
            .insert_header(("X-Forwarded-For", "192.0.2.10"))
            .set_json(json!({ "email": "qa@example.com", "password": PASSWORD }))
            .to_request();
        statuses.push(test::call_service(&app, req).await.status());
    }
    assert_eq!(
        statuses,
        vec![
            StatusCode::UNAUTHORIZED,
            StatusCode::UNAUTHORIZED,
            StatusCode::TOO_MANY_REQUESTS
        ]
    );
}
