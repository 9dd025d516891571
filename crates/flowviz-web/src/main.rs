//! flowviz document server
//!
//! Serves the integration YAML document tree over HTTP: stand and
//! document listings for the polling loader, raw document bodies, the
//! update endpoint used by editing forms, and a server-side laid-out
//! graph endpoint.

use std::net::SocketAddr;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flowviz_web::router::build_router;
use flowviz_web::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flowviz_web=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let docs_root = std::env::var("FLOWVIZ_DOCS").unwrap_or_else(|_| "integration".to_string());
    tracing::info!("Serving integration documents from: {}", docs_root);

    let app = build_router(AppState::new(&docs_root));

    let port: u16 = std::env::var("SERVER_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3001);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!("flowviz-web running on http://{}", addr);
    tracing::info!("API Endpoints:");
    tracing::info!("  /api/stands                              - List stands");
    tracing::info!("  /api/integrations/list?stand=X           - List documents");
    tracing::info!("  /integration/:stand/:flow                - Raw document YAML");
    tracing::info!("  /api/integrations/:stand/:flow           - Update document (PUT)");
    tracing::info!("  /api/integrations/:stand/:flow/graph     - Laid-out graph JSON");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind to {}: {}", addr, e);
            if e.kind() == std::io::ErrorKind::AddrInUse {
                tracing::error!("Port {} is already in use; set SERVER_PORT to change it", port);
            }
            return Err(format!("Failed to bind to {}: {}", addr, e).into());
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        return Err(format!("Server error: {}", e).into());
    }

    Ok(())
}
