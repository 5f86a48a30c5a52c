//! # Módulo Web — A Superfície HTTP do Motor
//!
//! API JSON + SSE construída com **Axum**. O motor em si não sabe nada de
//! rede: este módulo só traduz requisições em chamadas à [`rizoma::Simulation`].
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Frontend (canvas + EventSource)                         │
//! ├─────────────────────────────────────────────────────────┤
//! │ Axum Router (este módulo)                               │
//! │  ├── GET  /status         → contadores e parâmetros     │
//! │  ├── GET  /graph          → RenderFrame                 │
//! │  ├── GET  /analytics      → scores + caminho semântico  │
//! │  ├── GET  /events         → SSE (GraphEvent)            │
//! │  ├── POST /params         → atualização parcial         │
//! │  ├── POST /mode           → organic | query             │
//! │  ├── POST /nodes          → nó colocado pelo usuário    │
//! │  ├── POST /ingest         → corpo em streaming          │
//! │  ├── POST /ingest/cancel  → para a ingestão ativa       │
//! │  └── POST /snapshot       → salva em disco              │
//! ├─────────────────────────────────────────────────────────┤
//! │ CorsLayer::permissive()                                 │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod state;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use state::AppState;

/// Limite do corpo de `/ingest` (o resto das rotas usa o padrão do Axum).
const INGEST_BODY_LIMIT: usize = 64 * 1024 * 1024;

/// Cria o router Axum com todas as rotas.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // ── Leitura ───────────────────────────────────────────
        .route("/status", get(handlers::status))
        .route("/graph", get(handlers::graph))
        .route("/analytics", get(handlers::analytics))
        .route("/events", get(handlers::sse_events))
        // ── Controle ──────────────────────────────────────────
        .route("/params", post(handlers::update_params))
        .route("/mode", post(handlers::set_mode))
        .route("/nodes", post(handlers::place_node))
        .route(
            "/ingest",
            post(handlers::ingest).layer(DefaultBodyLimit::max(INGEST_BODY_LIMIT)),
        )
        .route("/ingest/cancel", post(handlers::cancel_ingest))
        .route("/snapshot", post(handlers::save_snapshot))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
