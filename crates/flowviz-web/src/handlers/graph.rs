//! Server-side graph endpoint
//!
//! Runs the same build -> layout -> bounds pipeline the canvas runs
//! client-side and returns the positioned graph as JSON, for consumers
//! that only want the finished diagram data.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use flowviz::graph::{build_flow_graph, LayoutDirection};
use flowviz::loader::parse_integration;

use crate::state::AppState;

use super::validate_name;

#[derive(Debug, Deserialize)]
pub struct GraphQuery {
    /// Layout direction: LR (default) or TB
    pub direction: Option<String>,
    /// Node id to mark as selected
    pub selected: Option<String>,
}

pub async fn get_graph(
    State(state): State<AppState>,
    Path((stand, flow)): Path<(String, String)>,
    Query(params): Query<GraphQuery>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    validate_name(&stand)?;
    validate_name(&flow)?;

    let path = state
        .docs_root
        .join(&stand)
        .join(&flow)
        .join("integration.yaml");
    let body = tokio::fs::read_to_string(&path)
        .await
        .map_err(|_| StatusCode::NOT_FOUND)?;

    let integration = parse_integration(&body, &stand, &flow).map_err(|e| {
        tracing::error!(stand = %stand, flow = %flow, error = %e, "graph build error");
        StatusCode::UNPROCESSABLE_ENTITY
    })?;

    let direction = LayoutDirection::parse(params.direction.as_deref().unwrap_or("LR"));
    let graph = build_flow_graph(&integration, params.selected.as_deref(), direction);

    Ok(Json(serde_json::to_value(graph).unwrap_or_default()))
}
