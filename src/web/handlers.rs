use std::path::{Component, Path, PathBuf};

use actix_files::NamedFile;
use actix_web::{error, web, HttpResponse, Responder};
use log::{error, info};
use serde_json::json;
use tera::Context;

use crate::web::models::{MessageRequest, MessageResponse};
use crate::AppState;

// Homepage handler
pub async fn index(data: web::Data<AppState>) -> impl Responder {
    let context = Context::new();
    match data.tera.render("index.html", &context) {
        Ok(html) => HttpResponse::Ok().content_type("text/html").body(html),
        Err(e) => {
            error!("Template error: {}", e);
            HttpResponse::InternalServerError().body("Template error")
        }
    }
}

// Health check endpoint
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

// Static asset handler. Content type is inferred from the file extension;
// anything that does not resolve to a file under the static root is a 404,
// never a 500.
pub async fn serve_static(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> actix_web::Result<NamedFile> {
    let relative =
        sanitized(&path).ok_or_else(|| error::ErrorNotFound("File not found"))?;
    NamedFile::open(data.static_dir.join(relative))
        .map_err(|_| error::ErrorNotFound("File not found"))
}

// Rejects any path that could escape the static root: only plain segments
// survive, `..`, absolute paths and prefixes do not.
fn sanitized(requested: &str) -> Option<PathBuf> {
    let mut path = PathBuf::new();
    for component in Path::new(requested).components() {
        match component {
            Component::Normal(segment) => path.push(segment),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if path.as_os_str().is_empty() {
        None
    } else {
        Some(path)
    }
}

// Chat exchange endpoint
pub async fn send_message(
    data: web::Data<AppState>,
    req: web::Json<MessageRequest>,
) -> impl Responder {
    let (session_id, history) = data.sessions.append_user(req.session_id, &req.content);

    info!(
        "Message for session {} ({} turns in history)",
        session_id,
        history.len()
    );

    // The store's lock is already released; the remote call runs unlocked so
    // other sessions keep flowing.
    match data.chat.send(&history).await {
        Ok(reply) => {
            data.sessions.append_reply(session_id, &reply);
            HttpResponse::Ok().json(MessageResponse {
                response: reply,
                session_id,
            })
        }
        Err(e) => {
            error!("Chat backend error: {:#}", e);
            HttpResponse::InternalServerError().json(json!({
                "detail": e.to_string()
            }))
        }
    }
}
