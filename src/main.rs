mod chat;
mod sessions;
mod web;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{web::Data, App, HttpServer};
use dotenv::dotenv;
use log::{error, info};
use tera::Tera;

use chat::{ChatBackend, GeminiClient};
use sessions::SessionStore;
use web::routes;

// App state structure
pub struct AppState {
    pub tera: Tera,
    pub chat: Arc<dyn ChatBackend>,
    pub sessions: SessionStore,
    pub static_dir: PathBuf,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize environment
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting GerhAI web application");

    // Initialize the remote chat client; a missing credential is fatal
    let chat: Arc<dyn ChatBackend> = match GeminiClient::new() {
        Ok(client) => {
            info!("Chat client initialized");
            Arc::new(client)
        }
        Err(e) => {
            error!("Failed to initialize chat client: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize template engine
    let mut tera = match Tera::new("templates/**/*") {
        Ok(t) => t,
        Err(e) => {
            error!("Template parsing error: {}", e);
            std::process::exit(1);
        }
    };
    tera.autoescape_on(vec![".html"]);

    let session_ttl = std::env::var("SESSION_TTL_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(3600);

    // Create app state
    let app_state = Data::new(AppState {
        tera,
        chat,
        sessions: SessionStore::new(Duration::from_secs(session_ttl)),
        static_dir: PathBuf::from("static"),
    });

    // Evict idle sessions in the background
    {
        let state = app_state.clone();
        actix_web::rt::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_secs(60));
            loop {
                tick.tick().await;
                let evicted = state.sessions.sweep();
                if evicted > 0 {
                    info!(
                        "Evicted {} idle session(s), {} live",
                        evicted,
                        state.sessions.len()
                    );
                }
            }
        });
    }

    let bind_addr =
        std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    info!("Listening on {}", bind_addr);

    // Start web server
    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(Cors::permissive())
            .configure(routes::configure)
    })
    .bind(bind_addr)?
    .run()
    .await
}
