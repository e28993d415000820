use actix_web::web;

use crate::web::handlers;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::index))
        .route("/health", web::get().to(handlers::health_check))
        .route("/send_message", web::post().to(handlers::send_message))
        .route("/static/{path:.*}", web::get().to(handlers::serve_static));
}
