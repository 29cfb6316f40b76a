//! Headless block-to-source conversion endpoint
//!
//! Accepts a serialized workspace document and returns the generated action
//! source as plain text. It performs no validation beyond what the code
//! generator enforces; it exists so authoring tooling and the runtime share
//! one code-generation implementation.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tracing::debug;

use gambit_dsl::{generate_source, WorkspaceDocument};

use crate::state::AppState;

pub async fn convert_handler(
    State(_state): State<Arc<AppState>>,
    Json(raw): Json<serde_json::Value>,
) -> Result<String, (StatusCode, String)> {
    let document = WorkspaceDocument::from_json(&raw)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    let source =
        generate_source(&document).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    debug!(bytes = source.len(), "document converted");
    Ok(source)
}
