//! Document listing, retrieval and persistence endpoints
//!
//! Documents live on disk at `<root>/<stand>/<flow>/integration.yaml`.
//! A document that fails to load never takes down a listing; the failure
//! is logged and the document is simply absent from the response.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    Json,
};
use serde::Deserialize;

use flowviz::loader::{parse_integration, DirSource, DocumentRef, DocumentSource};

use crate::state::AppState;

use super::validate_name;

/// List stand directories under the document root
pub async fn list_stands(State(state): State<AppState>) -> Result<Json<Vec<String>>, StatusCode> {
    let mut stands = Vec::new();
    let mut entries = tokio::fs::read_dir(&state.docs_root).await.map_err(|e| {
        tracing::error!(error = %e, root = %state.docs_root.display(), "cannot read document root");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    while let Ok(Some(entry)) = entries.next_entry().await {
        if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
            stands.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    stands.sort();
    Ok(Json(stands))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub stand: String,
}

/// Enumerate available documents for one stand
pub async fn list_documents(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<DocumentRef>>, StatusCode> {
    validate_name(&params.stand)?;

    let source = DirSource::new(&state.docs_root, params.stand.as_str());
    let refs = source.list().await.map_err(|e| {
        tracing::warn!(stand = %params.stand, error = %e, "listing failed");
        StatusCode::NOT_FOUND
    })?;

    // Clients address documents through the server, not the filesystem
    let refs = refs
        .into_iter()
        .map(|doc| DocumentRef {
            path: format!("/integration/{}/{}", doc.stand, doc.flow),
            ..doc
        })
        .collect();

    Ok(Json(refs))
}

/// Serve one document's raw YAML content
pub async fn get_document(
    State(state): State<AppState>,
    Path((stand, flow)): Path<(String, String)>,
) -> Result<(HeaderMap, String), StatusCode> {
    validate_name(&stand)?;
    validate_name(&flow)?;

    let path = state
        .docs_root
        .join(&stand)
        .join(&flow)
        .join("integration.yaml");
    let body = tokio::fs::read_to_string(&path).await.map_err(|e| {
        tracing::warn!(stand = %stand, flow = %flow, error = %e, "document not found");
        StatusCode::NOT_FOUND
    })?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/yaml; charset=utf-8"),
    );
    Ok((headers, body))
}

/// Persist an edited document after a parse check
pub async fn put_document(
    State(state): State<AppState>,
    Path((stand, flow)): Path<(String, String)>,
    body: String,
) -> Result<StatusCode, StatusCode> {
    validate_name(&stand)?;
    validate_name(&flow)?;

    if let Err(e) = parse_integration(&body, &stand, &flow) {
        tracing::warn!(stand = %stand, flow = %flow, error = %e, "rejecting invalid document");
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }

    let dir = state.docs_root.join(&stand).join(&flow);
    tokio::fs::create_dir_all(&dir).await.map_err(|e| {
        tracing::error!(error = %e, "cannot create flow directory");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    tokio::fs::write(dir.join("integration.yaml"), body)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "cannot write document");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    tracing::info!(stand = %stand, flow = %flow, "document updated");
    Ok(StatusCode::NO_CONTENT)
}
