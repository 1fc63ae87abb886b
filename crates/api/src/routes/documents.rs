//! Document and lifecycle routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use tessera_core::lifecycle::{
    Actor, BulkOptions, BulkOutcome, DocumentKind, DocumentStatus, StatusMeta,
};
use tessera_core::share::PermissionSet;
use tessera_db::entities::{document_status_history, documents};
use tessera_db::{DocumentFilter, IssueShare, NewDocument};
use tessera_shared::types::{DocumentId, PageRequest, PageResponse};

use super::shares::{IssuedShareResponse, LifetimeRequest, ShareResponse};
use crate::{
    AppState,
    error::ApiError,
    middleware::{AuthUser, CurrentTenant},
};

/// Most documents one bulk request may name.
pub const MAX_BULK_DOCUMENTS: usize = 500;

const MAX_TITLE_LEN: usize = 200;

/// Creates the document routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/documents", get(list_documents).post(create_document))
        .route("/documents/bulk-transitions", post(bulk_transition))
        .route(
            "/documents/{document_id}",
            get(get_document).delete(delete_document),
        )
        .route("/documents/{document_id}/history", get(document_history))
        .route(
            "/documents/{document_id}/transitions",
            post(transition_document),
        )
        .route("/documents/{document_id}/duplicate", post(duplicate_document))
        .route(
            "/documents/{document_id}/shares",
            get(list_shares).post(issue_share),
        )
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for creating a document.
#[derive(Debug, Deserialize)]
pub struct CreateDocumentRequest {
    /// Kind: budget, invoice, service.
    pub kind: String,
    /// Title.
    pub title: String,
    /// Total amount.
    pub total_amount: Decimal,
    /// Customer reference.
    pub customer_reference: Option<String>,
    /// Code prefix; the kind's default when absent.
    pub prefix: Option<String>,
    /// Use a `<PREFIX>-<random>` code instead of a sequential one.
    #[serde(default)]
    pub custom_code: bool,
}

/// Query parameters for listing documents.
#[derive(Debug, Default, Deserialize)]
pub struct ListDocumentsQuery {
    /// Only this kind.
    pub kind: Option<String>,
    /// Only this status.
    pub status: Option<String>,
    /// Page number, from 1.
    pub page: Option<u32>,
    /// Page size.
    pub per_page: Option<u32>,
}

/// Request body for a status change.
#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    /// Target status.
    pub status: String,
    /// Optional reason, kept in the history.
    pub comment: Option<String>,
}

/// Request body for a bulk status change.
#[derive(Debug, Deserialize)]
pub struct BulkTransitionRequest {
    /// Documents to move.
    pub document_ids: Vec<DocumentId>,
    /// Target status.
    pub status: String,
    /// Optional reason, kept in every history entry.
    pub comment: Option<String>,
    /// Stop at the first failure.
    #[serde(default)]
    pub stop_on_first_error: bool,
}

/// Request body for issuing a share.
#[derive(Debug, Deserialize)]
pub struct IssueShareRequest {
    /// Permission names: view, download, approve, reject, pay.
    pub permissions: Vec<String>,
    /// Recipient e-mail.
    pub recipient_email: Option<String>,
    /// Recipient name.
    pub recipient_name: Option<String>,
    /// Message for the recipient.
    pub message: Option<String>,
    /// Requested lifetime.
    #[serde(flatten)]
    pub lifetime: LifetimeRequest,
}

/// Response for a document.
#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    /// Document ID.
    pub id: Uuid,
    /// Kind.
    pub kind: String,
    /// Human-readable code.
    pub code: String,
    /// Current status.
    pub status: String,
    /// Display metadata of the status.
    pub status_meta: Option<StatusMeta>,
    /// Statuses reachable from the current one.
    pub allowed_transitions: Vec<&'static str>,
    /// Title.
    pub title: String,
    /// Total amount.
    pub total_amount: Decimal,
    /// Customer reference.
    pub customer_reference: Option<String>,
    /// Document this one was duplicated from.
    pub source_document_id: Option<Uuid>,
    /// Creating user.
    pub created_by: Option<Uuid>,
    /// Created at timestamp.
    pub created_at: String,
    /// Updated at timestamp.
    pub updated_at: String,
}

impl From<documents::Model> for DocumentResponse {
    fn from(doc: documents::Model) -> Self {
        let status = DocumentKind::parse(&doc.kind)
            .and_then(|kind| DocumentStatus::parse(kind, &doc.status))
            .ok();

        Self {
            id: doc.id,
            kind: doc.kind,
            code: doc.code,
            status: doc.status,
            status_meta: status.map(|s| s.meta()),
            allowed_transitions: status
                .map(|s| s.allowed_targets().iter().map(DocumentStatus::as_str).collect())
                .unwrap_or_default(),
            title: doc.title,
            total_amount: doc.total_amount,
            customer_reference: doc.customer_reference,
            source_document_id: doc.source_document_id,
            created_by: doc.created_by,
            created_at: doc.created_at.to_rfc3339(),
            updated_at: doc.updated_at.to_rfc3339(),
        }
    }
}

/// One entry of a document's status history.
#[derive(Debug, Serialize)]
pub struct HistoryEntryResponse {
    /// Entry ID.
    pub id: Uuid,
    /// Status before.
    pub from_status: String,
    /// Status after.
    pub to_status: String,
    /// Who made the change.
    pub actor: Option<Actor>,
    /// Reason given.
    pub comment: Option<String>,
    /// When.
    pub created_at: String,
}

impl From<document_status_history::Model> for HistoryEntryResponse {
    fn from(entry: document_status_history::Model) -> Self {
        Self {
            id: entry.id,
            actor: Actor::from_parts(&entry.actor_type, entry.actor_id),
            from_status: entry.from_status,
            to_status: entry.to_status,
            comment: entry.comment,
            created_at: entry.created_at.to_rfc3339(),
        }
    }
}

// ============================================================================
// Validation
// ============================================================================

fn validate_create(req: &CreateDocumentRequest) -> Result<DocumentKind, ApiError> {
    let kind = DocumentKind::parse(&req.kind)?;
    let title = req.title.trim();
    if title.is_empty() {
        return Err(ApiError::validation("title must not be empty"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ApiError::validation(format!(
            "title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    if req.total_amount.is_sign_negative() {
        return Err(ApiError::validation("total_amount must not be negative"));
    }
    Ok(kind)
}

fn validate_bulk(req: &BulkTransitionRequest) -> Result<(), ApiError> {
    if req.document_ids.is_empty() {
        return Err(ApiError::validation("document_ids must not be empty"));
    }
    if req.document_ids.len() > MAX_BULK_DOCUMENTS {
        return Err(ApiError::validation(format!(
            "at most {MAX_BULK_DOCUMENTS} documents per request"
        )));
    }
    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

async fn create_document(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    user: AuthUser,
    Json(req): Json<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<DocumentResponse>), ApiError> {
    let kind = validate_create(&req)?;

    let document = state
        .documents
        .create(
            tenant,
            NewDocument {
                kind,
                title: req.title.trim().to_string(),
                total_amount: req.total_amount,
                customer_reference: req.customer_reference,
                prefix: req.prefix,
                custom_code: req.custom_code,
                created_by: Some(user.user_id()),
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(document.into())))
}

async fn list_documents(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    Query(query): Query<ListDocumentsQuery>,
) -> Result<Json<PageResponse<DocumentResponse>>, ApiError> {
    let filter = DocumentFilter {
        kind: query.kind.as_deref().map(DocumentKind::parse).transpose()?,
        status: query.status,
    };
    let page = PageRequest {
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or(20),
    }
    .clamped();

    let documents = state.documents.list(tenant, &filter, page).await?;
    Ok(Json(documents.map(DocumentResponse::from)))
}

async fn get_document(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    Path(document_id): Path<DocumentId>,
) -> Result<Json<DocumentResponse>, ApiError> {
    let document = state.documents.get(tenant, document_id).await?;
    Ok(Json(document.into()))
}

async fn delete_document(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    Path(document_id): Path<DocumentId>,
) -> Result<StatusCode, ApiError> {
    if state.documents.delete(tenant, document_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(format!("document {document_id} not found")))
    }
}

async fn document_history(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    Path(document_id): Path<DocumentId>,
) -> Result<Json<Vec<HistoryEntryResponse>>, ApiError> {
    let history = state.engine.history(tenant, document_id).await?;
    Ok(Json(history.into_iter().map(Into::into).collect()))
}

async fn transition_document(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    user: AuthUser,
    Path(document_id): Path<DocumentId>,
    Json(req): Json<TransitionRequest>,
) -> Result<Json<DocumentResponse>, ApiError> {
    let document = state
        .engine
        .transition(
            tenant,
            document_id,
            &req.status,
            Actor::User(user.user_id()),
            req.comment.as_deref(),
        )
        .await?;
    Ok(Json(document.into()))
}

async fn bulk_transition(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    user: AuthUser,
    Json(req): Json<BulkTransitionRequest>,
) -> Result<Json<BulkOutcome>, ApiError> {
    validate_bulk(&req)?;

    // Shutdown stops the run between documents.
    let cancel = state.shutdown.child_token();
    let outcome = state
        .engine
        .bulk_transition(
            tenant,
            &req.document_ids,
            &req.status,
            Actor::User(user.user_id()),
            req.comment.as_deref(),
            BulkOptions {
                stop_on_first_error: req.stop_on_first_error,
            },
            &cancel,
        )
        .await;
    Ok(Json(outcome))
}

async fn duplicate_document(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    user: AuthUser,
    Path(document_id): Path<DocumentId>,
) -> Result<(StatusCode, Json<DocumentResponse>), ApiError> {
    let copy = state
        .engine
        .duplicate(tenant, document_id, Some(user.user_id()))
        .await?;
    Ok((StatusCode::CREATED, Json(copy.into())))
}

async fn issue_share(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    user: AuthUser,
    Path(document_id): Path<DocumentId>,
    Json(req): Json<IssueShareRequest>,
) -> Result<(StatusCode, Json<IssuedShareResponse>), ApiError> {
    let permissions = PermissionSet::parse(&req.permissions)?;
    let ttl = req.lifetime.ttl()?;
    let document = state.documents.get(tenant, document_id).await?;
    let kind = DocumentKind::parse(&document.kind)?;

    let issued = state
        .shares
        .issue(
            tenant,
            IssueShare {
                resource_type: kind,
                resource_id: document_id,
                recipient_email: req.recipient_email,
                recipient_name: req.recipient_name,
                message: req.message,
                permissions,
                ttl,
            },
        )
        .await?;

    info!(
        tenant_id = %tenant,
        user_id = %user.user_id(),
        document_id = %document_id,
        share_id = %issued.share.id,
        "share issued via api"
    );
    Ok((StatusCode::CREATED, Json(issued.into())))
}

async fn list_shares(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    Path(document_id): Path<DocumentId>,
) -> Result<Json<Vec<ShareResponse>>, ApiError> {
    let document = state.documents.get(tenant, document_id).await?;
    let kind = DocumentKind::parse(&document.kind)?;
    let shares = state
        .shares
        .list_for_resource(tenant, kind, document_id)
        .await?;
    Ok(Json(shares.into_iter().map(Into::into).collect()))
}
