//! Document code inspection.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use serde::Serialize;
use uuid::Uuid;

use tessera_core::code::DocumentCode;

use crate::{AppState, error::ApiError, middleware::CurrentTenant};

/// Creates the code routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new().route("/codes/{code}", get(inspect_code))
}

/// A parsed code and the tenant's document carrying it, if any.
#[derive(Debug, Serialize)]
pub struct CodeResponse {
    /// Canonical form of the code.
    pub code: String,
    /// Parsed components.
    pub parsed: DocumentCode,
    /// Document of this tenant with that code.
    pub document_id: Option<Uuid>,
}

async fn inspect_code(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    Path(code): Path<String>,
) -> Result<Json<CodeResponse>, ApiError> {
    let parsed = DocumentCode::parse(code.trim())?;
    let canonical = parsed.to_string();
    let document = state.documents.find_by_code(tenant, &canonical).await?;

    Ok(Json(CodeResponse {
        code: canonical,
        parsed,
        document_id: document.map(|d| d.id),
    }))
}
