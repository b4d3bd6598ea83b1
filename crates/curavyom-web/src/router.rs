//! Route table: pages, forms, dashboard data, the chat relay and static assets.

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    services::ServeDir,
    cors::CorsLayer,
    trace::TraceLayer,
    compression::CompressionLayer,
};
use std::path::PathBuf;
use crate::state::SharedState;
use crate::handlers::{
    api::api_dashboard,
    chat::chat_socket,
    forms::{contact_submit, subscribe_submit},
    pages,
};

/// Build and return the full Axum router.
pub fn build_router(state: SharedState) -> Router {
    let static_dir = resolve_static_dir(&state.config.web.static_dir);

    Router::new()
        // Pages
        .route("/",             get(pages::home))
        .route("/features",     get(pages::features))
        .route("/architecture", get(pages::architecture))
        .route("/use-case",     get(pages::use_case))
        .route("/dashboard",    get(pages::dashboard))
        .route("/demo",         get(pages::demo))
        .route("/about",        get(pages::about))
        .route("/contact",      get(pages::contact).post(contact_submit))
        .route("/report",       get(pages::report))
        .route("/privacy",      get(pages::privacy))
        .route("/terms",        get(pages::terms))

        // Forms
        .route("/subscribe",    post(subscribe_submit))

        // API endpoints
        .route("/api/dashboard", get(api_dashboard))

        // Chat relay
        .route("/ws/chat",      get(chat_socket))

        // Static files
        .nest_service("/static", ServeDir::new(static_dir))
        .fallback(pages::not_found)

        // Middleware
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The configured directory if it exists, else the assets shipped with the crate.
fn resolve_static_dir(configured: &str) -> PathBuf {
    let configured = PathBuf::from(configured);
    if configured.is_dir() {
        configured
    } else {
        PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/static"))
    }
}
