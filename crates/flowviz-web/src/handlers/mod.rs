pub mod documents;
pub mod graph;

use axum::http::StatusCode;

/// Reject path segments that could escape the document root
pub(crate) fn validate_name(name: &str) -> Result<(), StatusCode> {
    let ok = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\');
    if ok {
        Ok(())
    } else {
        Err(StatusCode::BAD_REQUEST)
    }
}
