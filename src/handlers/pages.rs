//! Server-rendered HTML pages.
//!
//! `/profile` and `/admin` sit behind the session middleware, which
//! redirects anonymous visitors to the login page.

use crate::{
    backend::RequestClient,
    services::{APP_VERSION, build_timestamp},
    utils::{escape_html, safe_redirect_target},
};
use actix_web::{Error, HttpRequest, HttpResponse, Result, web};
use paperclip::actix::{Apiv2Schema, api_v2_operation};
use serde::Deserialize;

const STYLE: &str = r#"<style>
        body { font-family: Arial, sans-serif; margin: 0; padding: 0; background: #f5f5f5; color: #333; }
        .container { max-width: 800px; margin: 40px auto; padding: 20px; background: #fff;
            box-shadow: 0 2px 8px rgba(0,0,0,0.1); border-radius: 8px; }
        h1 { text-align: center; }
        label { display: block; margin-top: 12px; }
        input { width: 100%; padding: 8px; box-sizing: border-box; }
        button { margin-top: 16px; padding: 8px 16px; }
        .error { color: #b00020; }
        footer { margin-top: 24px; font-size: 0.8em; color: #777; text-align: center; }
    </style>"#;

/// Served from the app itself so `script-src 'self'` allows it
pub const LOGIN_SCRIPT_PATH: &str = "/auth/login.js";

const LOGIN_SCRIPT: &str = r#"document.addEventListener('DOMContentLoaded', () => {
    const form = document.getElementById('login');
    if (!form) return;
    form.addEventListener('submit', async (event) => {
        event.preventDefault();
        const error = document.getElementById('error');
        error.hidden = true;
        const response = await fetch(form.action, {
            method: 'POST',
            credentials: 'same-origin',
            headers: { 'Content-Type': 'application/json' },
            body: JSON.stringify({ email: form.email.value, password: form.password.value })
        });
        if (response.ok) {
            window.location.assign(form.dataset.next || '/');
        } else {
            error.textContent = response.status === 429
                ? 'Too many attempts. Please try again later.'
                : 'Invalid email or password';
            error.hidden = false;
        }
    });
});
"#;

fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{title} - QA Toolsmith</title>
    {STYLE}
</head>
<body>
    <div class="container">
{body}
        <footer>QA Toolsmith {APP_VERSION} (built {built})</footer>
    </div>
</body>
</html>"#,
        title = escape_html(title),
        built = escape_html(build_timestamp()),
    )
}

fn html(status: actix_web::http::StatusCode, body: String) -> HttpResponse {
    HttpResponse::build(status)
        .content_type("text/html; charset=utf-8")
        .body(body)
}

/// Query parameters for the login page
#[derive(Debug, Default, Deserialize, Apiv2Schema)]
pub struct LoginPageQuery {
    /// Same-site path to return to after signing in
    pub next: Option<String>,
}

#[api_v2_operation(
    summary = "Home Page",
    description = "Landing page with links to the tools.",
    tags("Pages"),
    responses((status = 200, description = "HTML page", content_type = "text/html"))
)]
pub async fn index() -> Result<HttpResponse, Error> {
    let body = r#"        <h1>QA Toolsmith</h1>
        <p>Everyday helpers for software testers.</p>
        <ul>
            <li><a href="/api/generators/iban?country=DE">Generate an IBAN</a></li>
            <li><a href="/api/kb/entries">Browse the knowledge base</a></li>
            <li><a href="/profile">Your profile</a></li>
            <li><a href="/api/spec/v2">OpenAPI specification</a></li>
        </ul>"#;
    Ok(html(actix_web::http::StatusCode::OK, page("Home", body)))
}

#[api_v2_operation(
    summary = "Login Page",
    description = "Sign-in form. `next` is kept when it is a same-site path.",
    tags("Pages"),
    responses((status = 200, description = "HTML page", content_type = "text/html"))
)]
pub async fn login(query: web::Query<LoginPageQuery>) -> Result<HttpResponse, Error> {
    let next = escape_html(&safe_redirect_target(query.next.as_deref()));
    let body = format!(
        r#"        <h1>Sign in</h1>
        <form id="login" method="post" action="/api/auth/signin" data-next="{next}">
            <label>Email <input type="email" name="email" required maxlength="254"></label>
            <label>Password <input type="password" name="password" required minlength="8" maxlength="72"></label>
            <button type="submit">Sign in</button>
            <p class="error" id="error" hidden></p>
        </form>
        <script src="{LOGIN_SCRIPT_PATH}" defer></script>"#
    );
    Ok(html(actix_web::http::StatusCode::OK, page("Sign in", &body)))
}

#[api_v2_operation(
    summary = "Login Script",
    description = "Submits the login form as JSON and follows `next` on success.",
    tags("Pages"),
    responses((status = 200, description = "JavaScript", content_type = "text/javascript"))
)]
pub async fn login_script() -> Result<HttpResponse, Error> {
    Ok(HttpResponse::Ok()
        .content_type("text/javascript; charset=utf-8")
        .insert_header((actix_web::http::header::CACHE_CONTROL, "public, max-age=3600"))
        .body(LOGIN_SCRIPT))
}

#[api_v2_operation(
    summary = "Profile Page",
    description = "Profile page for the signed-in user.",
    tags("Pages"),
    responses((status = 200, description = "HTML page", content_type = "text/html"))
)]
pub async fn profile(req: HttpRequest) -> Result<HttpResponse, Error> {
    let client = RequestClient::from_request(&req)?;
    let user = client.require_user()?;
    let email = user.email.as_deref().unwrap_or("(no email)");
    let role = if user.is_admin() { "admin" } else { "user" };

    let body = format!(
        r#"        <h1>Your profile</h1>
        <p>Email: {email}</p>
        <p>Role: {role}</p>
        <form method="post" action="/api/auth/signout"><button type="submit">Sign out</button></form>"#,
        email = escape_html(email),
    );
    Ok(html(actix_web::http::StatusCode::OK, page("Profile", &body)))
}

#[api_v2_operation(
    summary = "Admin Page",
    description = "Administration page; administrators only.",
    tags("Pages"),
    responses((status = 200, description = "HTML page", content_type = "text/html"))
)]
pub async fn admin(req: HttpRequest) -> Result<HttpResponse, Error> {
    let client = RequestClient::from_request(&req)?;
    let user = client.require_user()?;

    if !user.is_admin() {
        tracing::info!(user_id = %user.id, "Non-admin requested the admin page");
        let body = "        <h1>Forbidden</h1>\n        <p>This page is only available to administrators.</p>";
        return Ok(html(actix_web::http::StatusCode::FORBIDDEN, page("Forbidden", body)));
    }

    let body = "        <h1>Administration</h1>\n        <p>Public knowledge-base entries can be created, edited and deleted from the API by administrators.</p>";
    Ok(html(actix_web::http::StatusCode::OK, page("Administration", body)))
}
