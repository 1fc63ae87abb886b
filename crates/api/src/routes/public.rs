//! Public share routes for anonymous recipients.
//!
//! The secret in the path is the only credential. The tenant comes from
//! the share itself, never from the request.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use tessera_core::share::{PermissionSet, ShareDecision};
use tessera_db::SharedAccess;

use super::documents::DocumentResponse;
use crate::{AppState, error::ApiError};

/// Creates the public share routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/public/shares/{secret}", get(open_share))
        .route("/public/shares/{secret}/decision", post(decide))
}

/// What a recipient sees when opening a link.
#[derive(Debug, Serialize)]
pub struct SharedDocumentResponse {
    /// The shared document.
    pub document: DocumentResponse,
    /// What the link allows.
    pub permissions: PermissionSet,
    /// Recipient name, for greeting.
    pub recipient_name: Option<String>,
    /// Message from the sender.
    pub message: Option<String>,
    /// Link expiry, if any.
    pub expires_at: Option<String>,
}

impl From<SharedAccess> for SharedDocumentResponse {
    fn from(access: SharedAccess) -> Self {
        Self {
            document: access.document.into(),
            permissions: access.permissions,
            recipient_name: access.share.recipient_name,
            message: access.share.message,
            expires_at: access.share.expires_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// Request body for a recipient's decision.
#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    /// approve or reject.
    pub decision: ShareDecision,
    /// Optional reason, kept in the history.
    pub comment: Option<String>,
}

async fn open_share(
    State(state): State<AppState>,
    Path(secret): Path<String>,
) -> Result<Json<SharedDocumentResponse>, ApiError> {
    let access = state.shares.validate(&secret).await?;
    Ok(Json(access.into()))
}

async fn decide(
    State(state): State<AppState>,
    Path(secret): Path<String>,
    Json(req): Json<DecisionRequest>,
) -> Result<Json<DocumentResponse>, ApiError> {
    let document = state
        .shares
        .decide(&secret, req.decision, req.comment.as_deref())
        .await?;
    Ok(Json(document.into()))
}
