//! Router assembly

use axum::{
    routing::{get, put},
    Router,
};
use http::header::{HeaderValue, CACHE_CONTROL};
use tower_http::{
    cors::{Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::handlers::{documents, graph};
use crate::state::AppState;

/// Build the full application router
pub fn build_router(state: AppState) -> Router {
    // CORS for development; pollers and the viewer may run anywhere
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/stands", get(documents::list_stands))
        .route("/api/integrations/list", get(documents::list_documents))
        .route("/integration/:stand/:flow", get(documents::get_document))
        .route(
            "/api/integrations/:stand/:flow",
            put(documents::put_document),
        )
        .route(
            "/api/integrations/:stand/:flow/graph",
            get(graph::get_graph),
        )
        .with_state(state)
        // Pollers must always see fresh listings and documents
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static("no-store, no-cache, must-revalidate"),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
