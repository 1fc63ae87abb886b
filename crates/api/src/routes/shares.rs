//! Share management routes for authenticated tenants.
//!
//! Issuing and listing live under `/documents/{id}/shares`; this module
//! owns revocation, renewal, and tenant-wide statistics, plus the share
//! request/response types used by both.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use tessera_core::share::{ShareTtl, TokenRef};
use tessera_db::entities::share_tokens;
use tessera_db::{IssuedShare, ShareStats};
use tessera_shared::types::ShareTokenId;

use crate::{
    AppState,
    error::ApiError,
    middleware::{AuthUser, CurrentTenant},
};

/// Creates the share routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/shares/stats", get(share_stats))
        .route("/shares/{share_id}", delete(revoke_share))
        .route("/shares/{share_id}/renew", post(renew_share))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Requested lifetime of a share.
#[derive(Debug, Default, Deserialize)]
pub struct LifetimeRequest {
    /// Days until expiry; the configured default when absent.
    pub expires_in_days: Option<u32>,
    /// Ask for a link that never expires.
    #[serde(default)]
    pub no_expiry: bool,
}

impl LifetimeRequest {
    /// Maps the request onto a [`ShareTtl`].
    pub fn ttl(&self) -> Result<ShareTtl, ApiError> {
        match (self.no_expiry, self.expires_in_days) {
            (true, Some(_)) => Err(ApiError::validation(
                "expires_in_days and no_expiry are mutually exclusive",
            )),
            (true, None) => Ok(ShareTtl::NoExpiry),
            (false, Some(days)) => Ok(ShareTtl::Days(days)),
            (false, None) => Ok(ShareTtl::Default),
        }
    }
}

/// A stored share, without its digest.
#[derive(Debug, Serialize)]
pub struct ShareResponse {
    /// Share ID.
    pub id: Uuid,
    /// Kind of the shared document.
    pub resource_type: String,
    /// Shared document.
    pub resource_id: Uuid,
    /// Recipient e-mail.
    pub recipient_email: Option<String>,
    /// Recipient name.
    pub recipient_name: Option<String>,
    /// Message for the recipient.
    pub message: Option<String>,
    /// Granted permissions.
    pub permissions: serde_json::Value,
    /// Issued at timestamp.
    pub issued_at: String,
    /// Expiry timestamp, if any.
    pub expires_at: Option<String>,
    /// Whether the share is active.
    pub is_active: bool,
    /// Revocation timestamp, if revoked.
    pub revoked_at: Option<String>,
    /// Share that replaced this one on renewal.
    pub replaced_by: Option<Uuid>,
    /// Successful accesses.
    pub access_count: i64,
    /// Last successful access.
    pub last_accessed_at: Option<String>,
}

impl From<share_tokens::Model> for ShareResponse {
    fn from(share: share_tokens::Model) -> Self {
        Self {
            id: share.id,
            resource_type: share.resource_type,
            resource_id: share.resource_id,
            recipient_email: share.recipient_email,
            recipient_name: share.recipient_name,
            message: share.message,
            permissions: share.permissions,
            issued_at: share.issued_at.to_rfc3339(),
            expires_at: share.expires_at.map(|t| t.to_rfc3339()),
            is_active: share.is_active,
            revoked_at: share.revoked_at.map(|t| t.to_rfc3339()),
            replaced_by: share.replaced_by,
            access_count: share.access_count,
            last_accessed_at: share.last_accessed_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// A newly issued or renewed share with its one-time secret.
#[derive(Debug, Serialize)]
pub struct IssuedShareResponse {
    /// The stored share.
    pub share: ShareResponse,
    /// Bearer secret; shown only in this response.
    pub token: String,
    /// Public link embedding the secret.
    pub url: String,
    /// True if an existing share for the same recipient was rotated.
    pub reused: bool,
}

impl From<IssuedShare> for IssuedShareResponse {
    fn from(issued: IssuedShare) -> Self {
        Self {
            share: issued.share.into(),
            token: issued.token,
            url: issued.url,
            reused: issued.reused,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn revoke_share(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    user: AuthUser,
    Path(share_id): Path<ShareTokenId>,
) -> Result<StatusCode, ApiError> {
    if state
        .shares
        .revoke(tenant, &TokenRef::Id(share_id))
        .await?
    {
        info!(tenant_id = %tenant, user_id = %user.user_id(), share_id = %share_id, "share revoked via api");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(format!("share token {share_id} not found")))
    }
}

async fn renew_share(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    Path(share_id): Path<ShareTokenId>,
    Json(lifetime): Json<LifetimeRequest>,
) -> Result<(StatusCode, Json<IssuedShareResponse>), ApiError> {
    let issued = state
        .shares
        .renew(tenant, &TokenRef::Id(share_id), lifetime.ttl()?)
        .await?;
    Ok((StatusCode::CREATED, Json(issued.into())))
}

async fn share_stats(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
) -> Result<Json<ShareStats>, ApiError> {
    Ok(Json(state.shares.stats(tenant).await?))
}
