use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use actix_web::{test, web::Data, App};
use anyhow::Result;
use serde_json::{json, Value};
use tera::Tera;
use uuid::Uuid;

use crate::chat::ChatBackend;
use crate::sessions::SessionStore;
use crate::web::models::Turn;
use crate::web::routes;
use crate::AppState;

// Replies with the number of turns it was handed, so continuity across
// exchanges is observable from the outside.
struct TurnCountBackend;

#[async_trait::async_trait]
impl ChatBackend for TurnCountBackend {
    async fn send(&self, history: &[Turn]) -> Result<String> {
        Ok(format!("turns:{}", history.len()))
    }
}

struct FailingBackend;

#[async_trait::async_trait]
impl ChatBackend for FailingBackend {
    async fn send(&self, _history: &[Turn]) -> Result<String> {
        Err(anyhow::anyhow!("quota exceeded"))
    }
}

fn app_state(chat: Arc<dyn ChatBackend>) -> Data<AppState> {
    let mut tera = Tera::new("templates/**/*").unwrap();
    tera.autoescape_on(vec![".html"]);
    Data::new(AppState {
        tera,
        chat,
        sessions: SessionStore::new(Duration::from_secs(60)),
        static_dir: PathBuf::from("static"),
    })
}

macro_rules! test_app {
    ($chat:expr) => {
        test::init_service(
            App::new()
                .app_data(app_state($chat))
                .configure(routes::configure),
        )
        .await
    };
}

#[actix_web::test]
async fn send_message_mints_a_session_id() {
    let app = test_app!(Arc::new(TurnCountBackend));

    let req = test::TestRequest::post()
        .uri("/send_message")
        .set_json(json!({ "content": "oi" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let body: Value = test::read_body_json(resp).await;
    // persona + greeting + the user turn
    assert_eq!(body["response"], "turns:3");
    let id = body["session_id"].as_str().expect("session_id missing");
    Uuid::parse_str(id).expect("session_id is not a UUID");
}

#[actix_web::test]
async fn reused_session_id_keeps_the_conversation() {
    let app = test_app!(Arc::new(TurnCountBackend));

    let req = test::TestRequest::post()
        .uri("/send_message")
        .set_json(json!({ "content": "oi" }))
        .to_request();
    let first: Value = test::call_and_read_body_json(&app, req).await;
    let id = first["session_id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/send_message")
        .set_json(json!({ "content": "e aí", "session_id": id }))
        .to_request();
    let second: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(second["session_id"].as_str().unwrap(), id);
    // the backend now also sees the first exchange (user + model turns)
    assert_eq!(second["response"], "turns:5");
}

#[actix_web::test]
async fn missing_content_is_a_client_error() {
    let app = test_app!(Arc::new(TurnCountBackend));

    let req = test::TestRequest::post()
        .uri("/send_message")
        .set_json(json!({ "session_id": null }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn backend_failure_surfaces_as_500_with_detail() {
    let app = test_app!(Arc::new(FailingBackend));

    let req = test::TestRequest::post()
        .uri("/send_message")
        .set_json(json!({ "content": "oi" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 500);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["detail"], "quota exceeded");
}

#[actix_web::test]
async fn known_static_asset_is_served_with_inferred_type() {
    let app = test_app!(Arc::new(TurnCountBackend));

    let req = test::TestRequest::get().uri("/static/script.js").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let content_type = resp
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.contains("javascript"), "got {}", content_type);
}

#[actix_web::test]
async fn unknown_static_path_is_not_found() {
    let app = test_app!(Arc::new(TurnCountBackend));

    let req = test::TestRequest::get().uri("/static/nope.css").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}

#[actix_web::test]
async fn traversal_outside_static_root_is_not_found() {
    let app = test_app!(Arc::new(TurnCountBackend));

    for uri in ["/static/../Cargo.toml", "/static/..%2FCargo.toml"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404, "uri {} escaped the static root", uri);
    }
}

#[actix_web::test]
async fn homepage_renders() {
    let app = test_app!(Arc::new(TurnCountBackend));

    let req = test::TestRequest::get().uri("/").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let content_type = resp
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/html"));
}

#[actix_web::test]
async fn health_check_reports_ok() {
    let app = test_app!(Arc::new(TurnCountBackend));

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
}
