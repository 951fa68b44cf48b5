//! Knowledge-base access rules exercised over HTTP against the in-memory backend.

use actix_web::{cookie::Cookie, http::StatusCode, test};
use qa_toolsmith::{
    AppState, Backend, MemoryBackend, create_app,
    models::{KbEntry, NewKbEntry, NewKbNote, Role},
};
use serde_json::{Value, json};
use std::sync::Arc;
use uuid::Uuid;

struct Fixture {
    backend: Arc<MemoryBackend>,
    admin: Account,
    alice: Account,
    bob: Account,
}

struct Account {
    id: Uuid,
    token: String,
}

impl Account {
    fn cookie(&self) -> Cookie<'static> {
        Cookie::new("sb-access-token", self.token.clone())
    }
}

async fn account(backend: &MemoryBackend, email: &str, role: Role) -> Account {
    let user = backend.add_user(email, "correct-horse", role).await;
    let session = backend.sign_in(email, "correct-horse").await.unwrap();
    Account {
        id: user.id,
        token: session.access_token,
    }
}

async fn fixture() -> Fixture {
    let backend = Arc::new(MemoryBackend::new());
    Fixture {
        admin: account(&backend, "admin@example.com", Role::Admin).await,
        alice: account(&backend, "alice@example.com", Role::User).await,
        bob: account(&backend, "bob@example.com", Role::User).await,
        backend,
    }
}

impl Fixture {
    fn state(&self) -> AppState {
        AppState::with_backend(self.backend.clone()).unwrap()
    }

    async fn seed(&self, owner: &Account, title: &str, is_public: bool, tags: &[&str]) -> KbEntry {
        self.backend
            .insert_entry(
                Some(&owner.token),
                &NewKbEntry {
                    user_id: owner.id,
                    title: title.to_string(),
                    url_original: format!("https://example.com/{}", title.replace(' ', "-")),
                    url_canonical: format!("https://example.com/{}", title.replace(' ', "-")),
                    tags: tags.iter().map(|t| t.to_string()).collect(),
                    is_public,
                },
            )
            .await
            .unwrap()
    }
}

fn titles(json: &Value) -> Vec<String> {
    json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["title"].as_str().unwrap().to_string())
        .collect()
}

#[actix_web::test]
async fn test_anonymous_reads_public_only() {
    let fx = fixture().await;
    let public = fx.seed(&fx.admin, "Public cheatsheet", true, &[]).await;
    let private = fx.seed(&fx.alice, "Alice private", false, &[]).await;
    let app = test::init_service(create_app(fx.state())).await;

    let req = test::TestRequest::get().uri("/api/kb/entries").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let json: Value = test::read_body_json(resp).await;
    assert_eq!(titles(&json), vec!["Public cheatsheet".to_string()]);
    assert!(json["data"][0].get("search_vector").is_none());

    let req = test::TestRequest::get()
        .uri(&format!("/api/kb/entries/{}", public.id))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/api/kb/entries/{}", private.id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let json: Value = test::read_body_json(resp).await;
    assert_eq!(json["error"]["code"], "NOT_FOUND");
    assert_eq!(json["error"]["message"], "Entry not found");
}

#[actix_web::test]
async fn test_private_entries_are_visible_to_owner_and_admin_only() {
    let fx = fixture().await;
    let private = fx.seed(&fx.alice, "Alice private", false, &[]).await;
    let app = test::init_service(create_app(fx.state())).await;
    let uri = format!("/api/kb/entries/{}", private.id);

    for (account, expected) in [
        (&fx.alice, StatusCode::OK),
        (&fx.admin, StatusCode::OK),
        (&fx.bob, StatusCode::NOT_FOUND),
    ] {
        let req = test::TestRequest::get()
            .uri(&uri)
            .cookie(account.cookie())
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), expected);
    }
}

#[actix_web::test]
async fn test_create_entry() {
    let fx = fixture().await;
    let app = test::init_service(create_app(fx.state())).await;

    let req = test::TestRequest::post()
        .uri("/api/kb/entries")
        .cookie(fx.alice.cookie())
        .set_json(json!({
            "title": "  Exploratory testing heuristics ",
            "url": "https://Example.com/heuristics/?utm_source=newsletter#intro",
            "tags": ["Exploratory", "heuristics", "exploratory"]
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let json: Value = test::read_body_json(resp).await;
    let entry = &json["data"];
    assert_eq!(entry["title"], "Exploratory testing heuristics");
    assert_eq!(entry["user_id"], fx.alice.id.to_string());
    assert_eq!(entry["url_canonical"], "https://example.com/heuristics");
    assert_eq!(entry["tags"], json!(["exploratory", "heuristics"]));
    assert_eq!(entry["is_public"], false);
}

#[actix_web::test]
async fn test_create_entry_requires_user_and_valid_body() {
    let fx = fixture().await;
    let app = test::init_service(create_app(fx.state())).await;

    let req = test::TestRequest::post()
        .uri("/api/kb/entries")
        .set_json(json!({ "title": "Anonymous", "url": "https://example.com" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/api/kb/entries")
        .cookie(fx.alice.cookie())
        .set_json(json!({ "title": "", "url": "javascript:alert(1)", "tags": ["-bad"] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json: Value = test::read_body_json(resp).await;
    assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
    let fields: Vec<&str> = json["error"]["details"]["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["title", "url", "tags"]);
}

#[actix_web::test]
async fn test_only_admins_create_public_entries() {
    let fx = fixture().await;
    let app = test::init_service(create_app(fx.state())).await;
    let body = json!({ "title": "Shared", "url": "https://example.com/shared", "is_public": true });

    let req = test::TestRequest::post()
        .uri("/api/kb/entries")
        .cookie(fx.alice.cookie())
        .set_json(&body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let json: Value = test::read_body_json(resp).await;
    assert_eq!(json["error"]["code"], "FORBIDDEN");

    let req = test::TestRequest::post()
        .uri("/api/kb/entries")
        .cookie(fx.admin.cookie())
        .set_json(&body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let json: Value = test::read_body_json(resp).await;
    assert_eq!(json["data"]["is_public"], true);
}

#[actix_web::test]
async fn test_owner_updates_and_deletes_private_entry() {
    let fx = fixture().await;
    let entry = fx.seed(&fx.alice, "Draft", false, &["api"]).await;
    let app = test::init_service(create_app(fx.state())).await;
    let uri = format!("/api/kb/entries/{}", entry.id);

    let req = test::TestRequest::put()
        .uri(&uri)
        .cookie(fx.alice.cookie())
        .set_json(json!({ "title": "Final", "tags": ["api", "contract"] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let json: Value = test::read_body_json(resp).await;
    assert_eq!(json["data"]["title"], "Final");
    assert_eq!(json["data"]["tags"], json!(["api", "contract"]));
    assert_eq!(json["data"]["url_original"], entry.url_original);

    let req = test::TestRequest::put()
        .uri(&uri)
        .cookie(fx.alice.cookie())
        .set_json(json!({}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::delete()
        .uri(&uri)
        .cookie(fx.alice.cookie())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let body = test::read_body(resp).await;
    assert!(body.is_empty());

    let req = test::TestRequest::get()
        .uri(&uri)
        .cookie(fx.alice.cookie())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_non_admins_cannot_change_visibility() {
    let fx = fixture().await;
    let entry = fx.seed(&fx.alice, "Mine", false, &[]).await;
    let app = test::init_service(create_app(fx.state())).await;
    let uri = format!("/api/kb/entries/{}", entry.id);

    let req = test::TestRequest::put()
        .uri(&uri)
        .cookie(fx.alice.cookie())
        .set_json(json!({ "is_public": true }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    // Repeating the current value is not a change
    let req = test::TestRequest::put()
        .uri(&uri)
        .cookie(fx.alice.cookie())
        .set_json(json!({ "is_public": false, "title": "Still mine" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::put()
        .uri(&uri)
        .cookie(fx.admin.cookie())
        .set_json(json!({ "is_public": true }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let json: Value = test::read_body_json(resp).await;
    assert_eq!(json["data"]["is_public"], true);
    assert_eq!(json["data"]["user_id"], fx.alice.id.to_string());
}

#[actix_web::test]
async fn test_public_entries_are_admin_managed() {
    let fx = fixture().await;
    let entry = fx.seed(&fx.admin, "Team wiki", true, &[]).await;
    let app = test::init_service(create_app(fx.state())).await;
    let uri = format!("/api/kb/entries/{}", entry.id);

    let req = test::TestRequest::put()
        .uri(&uri)
        .cookie(fx.alice.cookie())
        .set_json(json!({ "title": "Vandalized" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::delete()
        .uri(&uri)
        .cookie(fx.alice.cookie())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::put()
        .uri(&uri)
        .cookie(fx.admin.cookie())
        .set_json(json!({ "title": "Team wiki (updated)" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::delete()
        .uri(&uri)
        .cookie(fx.admin.cookie())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
}

#[actix_web::test]
async fn test_other_users_private_entry_is_not_found_for_writes() {
    let fx = fixture().await;
    let entry = fx.seed(&fx.alice, "Alice only", false, &[]).await;
    let app = test::init_service(create_app(fx.state())).await;
    let uri = format!("/api/kb/entries/{}", entry.id);

    let req = test::TestRequest::put()
        .uri(&uri)
        .cookie(fx.bob.cookie())
        .set_json(json!({ "title": "Bob was here" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::delete()
        .uri(&uri)
        .cookie(fx.bob.cookie())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_invalid_entry_id() {
    let fx = fixture().await;
    let app = test::init_service(create_app(fx.state())).await;

    let req = test::TestRequest::get()
        .uri("/api/kb/entries/not-a-uuid")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json: Value = test::read_body_json(resp).await;
    assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
}

#[actix_web::test]
async fn test_list_filters_and_paging() {
    let fx = fixture().await;
    fx.seed(&fx.admin, "Boundary value analysis", true, &["techniques"]).await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    fx.seed(&fx.admin, "Pairwise testing tools", true, &["tools"]).await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    fx.seed(&fx.alice, "Boundary notes", false, &["techniques"]).await;
    let app = test::init_service(create_app(fx.state())).await;

    let req = test::TestRequest::get()
        .uri("/api/kb/entries")
        .cookie(fx.alice.cookie())
        .to_request();
    let json: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(
        titles(&json),
        vec![
            "Boundary notes".to_string(),
            "Pairwise testing tools".to_string(),
            "Boundary value analysis".to_string(),
        ]
    );

    let req = test::TestRequest::get()
        .uri("/api/kb/entries?q=boundary")
        .to_request();
    let json: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(titles(&json), vec!["Boundary value analysis".to_string()]);

    let req = test::TestRequest::get()
        .uri("/api/kb/entries?tag=TECHNIQUES")
        .cookie(fx.alice.cookie())
        .to_request();
    let json: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 2);

    let req = test::TestRequest::get()
        .uri("/api/kb/entries?limit=1&offset=1")
        .cookie(fx.alice.cookie())
        .to_request();
    let json: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(titles(&json), vec!["Pairwise testing tools".to_string()]);

    let req = test::TestRequest::get()
        .uri("/api/kb/entries?limit=500")
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_notes_are_private_to_their_author() {
    let fx = fixture().await;
    let entry = fx.seed(&fx.admin, "Shared checklist", true, &[]).await;
    let app = test::init_service(create_app(fx.state())).await;
    let notes_uri = format!("/api/kb/entries/{}/notes", entry.id);

    let req = test::TestRequest::post()
        .uri(&notes_uri)
        .cookie(fx.alice.cookie())
        .set_json(json!({ "body": "Try this on the checkout flow" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let json: Value = test::read_body_json(resp).await;
    let note_id = json["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(json["data"]["entry_id"], entry.id.to_string());

    let req = test::TestRequest::get()
        .uri(&notes_uri)
        .cookie(fx.bob.cookie())
        .to_request();
    let json: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert!(json["data"].as_array().unwrap().is_empty());

    let req = test::TestRequest::get()
        .uri(&notes_uri)
        .cookie(fx.alice.cookie())
        .to_request();
    let json: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/kb/notes/{note_id}"))
        .cookie(fx.bob.cookie())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/kb/notes/{note_id}"))
        .cookie(fx.alice.cookie())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
}

#[actix_web::test]
async fn test_notes_require_readable_entry() {
    let fx = fixture().await;
    let private = fx.seed(&fx.alice, "Alice private", false, &[]).await;
    fx.backend
        .insert_note(
            Some(&fx.alice.token),
            &NewKbNote {
                entry_id: private.id,
                user_id: fx.alice.id,
                body: "mine".to_string(),
            },
        )
        .await
        .unwrap();
    let app = test::init_service(create_app(fx.state())).await;
    let notes_uri = format!("/api/kb/entries/{}/notes", private.id);

    let req = test::TestRequest::post()
        .uri(&notes_uri)
        .cookie(fx.bob.cookie())
        .set_json(json!({ "body": "sneaky" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get()
        .uri(&notes_uri)
        .cookie(fx.bob.cookie())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::post()
        .uri(&notes_uri)
        .cookie(fx.alice.cookie())
        .set_json(json!({ "body": "" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    // Note listing needs a session even on a public prefix
    let req = test::TestRequest::get().uri(&notes_uri).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
}
