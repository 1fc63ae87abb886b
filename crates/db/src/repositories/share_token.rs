//! Share token service: public, revocable, time-limited document links.
//!
//! Only the SHA-256 digest of a secret is stored. The secret itself is
//! returned once, by `issue` or `renew`, inside the share URL.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait, Order, QueryFilter,
    QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use tessera_core::lifecycle::{Actor, DocumentKind, LifecycleError};
use tessera_core::share::{
    AccessCheck, PermissionSet, ShareDecision, ShareError, SharePolicy, ShareSecret, ShareTtl,
    TokenRef, hash_secret, looks_like_secret, share_url,
};
use tessera_core::code::RetryPolicy;
use tessera_core::tenant::{Tenant, TenantError};
use tessera_shared::config::ShareConfig;
use tessera_shared::error::AppError;
use tessera_shared::types::{DocumentId, ShareTokenId};

use crate::entities::{documents, share_tokens};

use super::lifecycle::{DOCUMENTS, EngineError, LifecycleEngine};
use super::retry::{RetryError, Retryable, is_transient, is_unique_violation, with_retry};
use super::scoped::{StoreError, TenantScopedStore};

const SHARES: TenantScopedStore<share_tokens::Entity> = TenantScopedStore::new();

/// Errors raised by the share token service.
#[derive(Debug, Error)]
pub enum ShareServiceError {
    /// Share rule violated or token unusable.
    #[error(transparent)]
    Share(#[from] ShareError),

    /// Isolation or lookup failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Decision could not be applied.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Stored tenant is unusable.
    #[error(transparent)]
    Tenant(#[from] TenantError),

    /// Stored kind or status is unusable.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Transient failures outlasted the retry budget.
    #[error("{operation} failed after {attempts} attempts")]
    Exhausted {
        /// Operation name.
        operation: &'static str,
        /// Attempts made.
        attempts: u32,
    },

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl ShareServiceError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Share(e) => e.status_code(),
            Self::Store(e) => e.status_code(),
            Self::Engine(e) => e.status_code(),
            Self::Tenant(e) => e.status_code(),
            Self::Lifecycle(e) => e.status_code(),
            Self::Exhausted { .. } => 409,
            Self::Database(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Share(e) => e.error_code(),
            Self::Store(e) => e.error_code(),
            Self::Engine(e) => e.error_code(),
            Self::Tenant(e) => e.error_code(),
            Self::Lifecycle(e) => e.error_code(),
            Self::Exhausted { .. } => "RETRIES_EXHAUSTED",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    fn from_retry(operation: &'static str, err: RetryError<Self>) -> Self {
        match err {
            RetryError::Fatal(e) => e,
            RetryError::Exhausted { attempts, last } => {
                warn!(operation, attempts, error = %last, "retries exhausted");
                Self::Exhausted {
                    operation,
                    attempts,
                }
            }
        }
    }
}

impl Retryable for ShareServiceError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Database(e) | Self::Store(StoreError::Database(e)) => {
                is_transient(e) || is_unique_violation(e)
            }
            _ => false,
        }
    }
}

impl From<ShareServiceError> for AppError {
    fn from(err: ShareServiceError) -> Self {
        match err {
            ShareServiceError::Share(e) => e.into(),
            ShareServiceError::Store(e) => e.into(),
            ShareServiceError::Engine(e) => e.into(),
            ShareServiceError::Tenant(e) => e.into(),
            ShareServiceError::Lifecycle(e) => e.into(),
            ShareServiceError::Exhausted { .. } => Self::Conflict(err.to_string()),
            ShareServiceError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

/// Input for issuing a share.
#[derive(Debug, Clone)]
pub struct IssueShare {
    /// Kind of the shared document.
    pub resource_type: DocumentKind,
    /// Shared document.
    pub resource_id: DocumentId,
    /// Recipient e-mail; an active share for the same address is reused.
    pub recipient_email: Option<String>,
    /// Recipient display name.
    pub recipient_name: Option<String>,
    /// Message shown to the recipient.
    pub message: Option<String>,
    /// Granted permissions.
    pub permissions: PermissionSet,
    /// Requested lifetime.
    pub ttl: ShareTtl,
}

/// A share together with its one-time secret.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedShare {
    /// Stored share.
    pub share: share_tokens::Model,
    /// Bearer secret. Not recoverable later.
    pub token: String,
    /// Public URL embedding the secret.
    pub url: String,
    /// Expiry, if any.
    pub expires_at: Option<DateTime<Utc>>,
    /// True when an existing active share was rotated instead of a new one minted.
    pub reused: bool,
}

/// What a valid secret grants.
#[derive(Debug, Clone, Serialize)]
pub struct SharedAccess {
    /// The share, with counters as of this access.
    pub share: share_tokens::Model,
    /// The shared document.
    pub document: documents::Model,
    /// Granted permissions.
    pub permissions: PermissionSet,
}

/// Share counts for a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShareStats {
    /// All shares.
    pub total: u64,
    /// Active and not past expiry.
    pub active: u64,
    /// Revoked, replaced, or expired.
    pub inactive: u64,
    /// Sum of access counts.
    pub total_accesses: i64,
}

/// Issues, validates, renews, and revokes share tokens.
#[derive(Debug, Clone)]
pub struct ShareTokenService {
    db: DatabaseConnection,
    engine: LifecycleEngine,
    policy: SharePolicy,
    retry: RetryPolicy,
    base_url: String,
}

impl ShareTokenService {
    /// Creates a new share token service.
    #[must_use]
    pub fn new(
        db: DatabaseConnection,
        engine: LifecycleEngine,
        config: &ShareConfig,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            db,
            engine,
            policy: SharePolicy::from_config(config),
            retry,
            base_url: config.public_base_url.clone(),
        }
    }

    /// Issues a share for a document of `tenant`.
    ///
    /// An active, unexpired share for the same document and recipient is
    /// rotated in place: it gets a new secret, permissions, expiry, and
    /// message, and its old secret stops working.
    ///
    /// # Errors
    ///
    /// - `Store(NotFound)` / `Store(Forbidden)` if the document is absent or foreign
    /// - `Share(InvalidTtl | NoExpiryNotAllowed | InvalidRecipient)` on bad input
    pub async fn issue(
        &self,
        tenant: Tenant,
        input: IssueShare,
    ) -> Result<IssuedShare, ShareServiceError> {
        let now = Utc::now();
        let expires_at = self.policy.expires_at(now, input.ttl)?;
        let recipient = SharePolicy::normalize_recipient(input.recipient_email.as_deref())?;
        let resource_id = input.resource_id.into_inner();

        DOCUMENTS.ensure_owned(&self.db, tenant, resource_id).await?;
        let document = DOCUMENTS.find_by_id(&self.db, tenant, resource_id).await?;
        if document.kind != input.resource_type.as_str() {
            return Err(StoreError::NotFound {
                entity: input.resource_type.as_str(),
                id: resource_id,
            }
            .into());
        }

        let input = &input;
        let recipient = recipient.as_deref();
        let (share, secret, reused) = with_retry(&self.retry, "share_issue", |_| async move {
            let txn = self.db.begin().await?;
            let secret = ShareSecret::generate();
            let now = Utc::now();

            let existing = match recipient {
                Some(email) => SHARES
                    .find_by(
                        &txn,
                        tenant,
                        live_condition(now)
                            .add(share_tokens::Column::ResourceType.eq(input.resource_type.as_str()))
                            .add(share_tokens::Column::ResourceId.eq(resource_id))
                            .add(share_tokens::Column::RecipientEmail.eq(email)),
                        &[(share_tokens::Column::CreatedAt, Order::Desc)],
                        Some(1),
                        None,
                    )
                    .await?
                    .pop(),
                None => None,
            };

            let (share, reused) = if let Some(existing) = existing {
                let share = SHARES
                    .update(
                        &txn,
                        tenant,
                        existing.id,
                        share_tokens::ActiveModel {
                            token_hash: Set(secret.hash()),
                            recipient_name: Set(input.recipient_name.clone()),
                            message: Set(input.message.clone()),
                            permissions: Set(input.permissions.to_json()),
                            issued_at: Set(now.into()),
                            expires_at: Set(expires_at.map(Into::into)),
                            access_count: Set(0),
                            last_accessed_at: Set(None),
                            updated_at: Set(now.into()),
                            ..Default::default()
                        },
                    )
                    .await?;
                (share, true)
            } else {
                let share = SHARES
                    .create(
                        &txn,
                        tenant,
                        share_tokens::ActiveModel {
                            id: Set(ShareTokenId::new().into_inner()),
                            resource_type: Set(input.resource_type.as_str().to_string()),
                            resource_id: Set(resource_id),
                            token_hash: Set(secret.hash()),
                            recipient_email: Set(recipient.map(ToString::to_string)),
                            recipient_name: Set(input.recipient_name.clone()),
                            message: Set(input.message.clone()),
                            permissions: Set(input.permissions.to_json()),
                            issued_at: Set(now.into()),
                            expires_at: Set(expires_at.map(Into::into)),
                            is_active: Set(true),
                            revoked_at: Set(None),
                            replaced_by: Set(None),
                            access_count: Set(0),
                            last_accessed_at: Set(None),
                            created_at: Set(now.into()),
                            updated_at: Set(now.into()),
                            ..Default::default()
                        },
                    )
                    .await?;
                (share, false)
            };

            txn.commit().await?;
            Ok::<_, ShareServiceError>((share, secret, reused))
        })
        .await
        .map_err(|err| ShareServiceError::from_retry("share_issue", err))?;

        info!(
            tenant_id = %tenant,
            share_id = %share.id,
            document_id = %resource_id,
            reused,
            "share issued"
        );

        Ok(self.issued(share, secret, reused))
    }

    /// Validates a secret and records the access.
    ///
    /// An active share found past its expiry is deactivated here and
    /// reported as expired; later calls keep failing.
    ///
    /// # Errors
    ///
    /// - `Share(NotFound)` for unknown secrets
    /// - `Share(Revoked)` for revoked shares
    /// - `Share(Expired)` for expired or renewed-away shares
    pub async fn validate(&self, secret: &str) -> Result<SharedAccess, ShareServiceError> {
        let share = self.lookup(secret).await?;
        let tenant = Tenant::new(share.tenant_id)?;
        let now = Utc::now();

        self.check_access(tenant, &share, now, true).await?;

        let result = SHARES
            .scoped_update(tenant)
            .col_expr(
                share_tokens::Column::AccessCount,
                Expr::col(share_tokens::Column::AccessCount).add(1),
            )
            .col_expr(share_tokens::Column::LastAccessedAt, Expr::value(now))
            .filter(share_tokens::Column::Id.eq(share.id))
            .filter(live_condition(now))
            .exec(&self.db)
            .await?;

        let share = SHARES.find_by_id(&self.db, tenant, share.id).await?;
        if result.rows_affected == 0 {
            // Revoked or expired between the read and the update.
            self.check_access(tenant, &share, now, true).await?;
            return Err(ShareError::Expired.into());
        }

        debug!(
            tenant_id = %tenant,
            share_id = %share.id,
            access_count = share.access_count,
            "share accessed"
        );
        self.access(tenant, share).await
    }

    /// Same checks as [`Self::validate`] without counting the access or
    /// deactivating an expired share.
    pub async fn peek(&self, secret: &str) -> Result<SharedAccess, ShareServiceError> {
        let share = self.lookup(secret).await?;
        let tenant = Tenant::new(share.tenant_id)?;
        self.check_access(tenant, &share, Utc::now(), false).await?;
        self.access(tenant, share).await
    }

    /// Revokes a share. Returns false if it does not exist.
    ///
    /// Idempotent; revoking twice keeps the first `revoked_at`.
    ///
    /// # Errors
    ///
    /// Returns `Store(Forbidden)` for a share of another tenant.
    pub async fn revoke(
        &self,
        tenant: Tenant,
        token: &TokenRef,
    ) -> Result<bool, ShareServiceError> {
        let Some(id) = self.resolve(tenant, token).await? else {
            return Ok(false);
        };

        let now = Utc::now();
        SHARES
            .scoped_update(tenant)
            .col_expr(share_tokens::Column::IsActive, Expr::value(false))
            .col_expr(share_tokens::Column::RevokedAt, Expr::value(now))
            .col_expr(share_tokens::Column::UpdatedAt, Expr::value(now))
            .filter(share_tokens::Column::Id.eq(id))
            .filter(share_tokens::Column::RevokedAt.is_null())
            .exec(&self.db)
            .await?;

        info!(tenant_id = %tenant, share_id = %id, "share revoked");
        Ok(true)
    }

    /// Replaces a share with a new secret and lifetime.
    ///
    /// The old row is deactivated and points at its replacement; the new
    /// row starts with zero accesses. A revoked share stays revoked.
    pub async fn renew(
        &self,
        tenant: Tenant,
        token: &TokenRef,
        ttl: ShareTtl,
    ) -> Result<IssuedShare, ShareServiceError> {
        let id = match (self.resolve(tenant, token).await?, token) {
            (Some(id), _) => id,
            (None, TokenRef::Id(id)) => {
                return Err(StoreError::NotFound {
                    entity: "share token",
                    id: id.into_inner(),
                }
                .into());
            }
            (None, TokenRef::Secret(_)) => return Err(ShareError::NotFound.into()),
        };
        let expires_at = self.policy.expires_at(Utc::now(), ttl)?;

        let (share, secret, previous) = with_retry(&self.retry, "share_renew", |_| async move {
            let txn = self.db.begin().await?;
            let old = SHARES.find_by_id_for_update(&txn, tenant, id).await?;
            let secret = ShareSecret::generate();
            let now = Utc::now();

            let share = SHARES
                .create(
                    &txn,
                    tenant,
                    share_tokens::ActiveModel {
                        id: Set(ShareTokenId::new().into_inner()),
                        resource_type: Set(old.resource_type.clone()),
                        resource_id: Set(old.resource_id),
                        token_hash: Set(secret.hash()),
                        recipient_email: Set(old.recipient_email.clone()),
                        recipient_name: Set(old.recipient_name.clone()),
                        message: Set(old.message.clone()),
                        permissions: Set(old.permissions.clone()),
                        issued_at: Set(now.into()),
                        expires_at: Set(expires_at.map(Into::into)),
                        is_active: Set(true),
                        revoked_at: Set(None),
                        replaced_by: Set(None),
                        access_count: Set(0),
                        last_accessed_at: Set(None),
                        created_at: Set(now.into()),
                        updated_at: Set(now.into()),
                        ..Default::default()
                    },
                )
                .await?;

            SHARES
                .update(
                    &txn,
                    tenant,
                    old.id,
                    share_tokens::ActiveModel {
                        is_active: Set(false),
                        replaced_by: Set(Some(share.id)),
                        updated_at: Set(now.into()),
                        ..Default::default()
                    },
                )
                .await?;

            txn.commit().await?;
            Ok::<_, ShareServiceError>((share, secret, old.id))
        })
        .await
        .map_err(|err| ShareServiceError::from_retry("share_renew", err))?;

        info!(
            tenant_id = %tenant,
            previous_id = %previous,
            share_id = %share.id,
            "share renewed"
        );
        Ok(self.issued(share, secret, false))
    }

    /// Lists the shares of a document, newest first.
    pub async fn list_for_resource(
        &self,
        tenant: Tenant,
        kind: DocumentKind,
        resource_id: DocumentId,
    ) -> Result<Vec<share_tokens::Model>, ShareServiceError> {
        let resource_id = resource_id.into_inner();
        DOCUMENTS.find_by_id(&self.db, tenant, resource_id).await?;

        Ok(SHARES
            .find_by(
                &self.db,
                tenant,
                Condition::all()
                    .add(share_tokens::Column::ResourceType.eq(kind.as_str()))
                    .add(share_tokens::Column::ResourceId.eq(resource_id)),
                &[
                    (share_tokens::Column::CreatedAt, Order::Desc),
                    (share_tokens::Column::Id, Order::Desc),
                ],
                None,
                None,
            )
            .await?)
    }

    /// Share counts for a tenant.
    pub async fn stats(&self, tenant: Tenant) -> Result<ShareStats, ShareServiceError> {
        let now = Utc::now();
        let total = SHARES.count(&self.db, tenant, Condition::all()).await?;
        let active = SHARES.count(&self.db, tenant, live_condition(now)).await?;
        let total_accesses = SHARES
            .scoped_select(tenant)
            .select_only()
            .column_as(
                Expr::cust("COALESCE(SUM(access_count), 0)::BIGINT"),
                "total_accesses",
            )
            .into_tuple::<i64>()
            .one(&self.db)
            .await?
            .unwrap_or(0);

        Ok(ShareStats {
            total,
            active,
            inactive: total.saturating_sub(active),
            total_accesses,
        })
    }

    /// Deletes every share whose expiry has passed, across all tenants.
    ///
    /// Maintenance task run as [`Actor::System`]; never on the request path.
    pub async fn cleanup_expired(&self) -> Result<u64, ShareServiceError> {
        let result = share_tokens::Entity::delete_many()
            .filter(share_tokens::Column::ExpiresAt.lt(Utc::now()))
            .exec(&self.db)
            .await?;

        info!(
            actor = Actor::System.actor_type(),
            deleted = result.rows_affected,
            "expired shares cleaned up"
        );
        Ok(result.rows_affected)
    }

    /// Applies a recipient's decision through a share.
    ///
    /// The share must grant the matching permission. The transition is
    /// recorded with the share as actor.
    pub async fn decide(
        &self,
        secret: &str,
        decision: ShareDecision,
        comment: Option<&str>,
    ) -> Result<documents::Model, ShareServiceError> {
        let access = self.validate(secret).await?;
        access
            .permissions
            .require(decision.required_permission())?;

        let tenant = Tenant::new(access.share.tenant_id)?;
        let kind = DocumentKind::parse(&access.document.kind)?;
        let target = decision.target_status(kind)?;
        let actor = Actor::Share(ShareTokenId::from_uuid(access.share.id));

        let document = self
            .engine
            .transition(
                tenant,
                DocumentId::from_uuid(access.document.id),
                target.as_str(),
                actor,
                comment,
            )
            .await?;

        info!(
            tenant_id = %tenant,
            share_id = %access.share.id,
            document_id = %document.id,
            status = %document.status,
            "share decision applied"
        );
        Ok(document)
    }

    // The secret is the capability: it alone determines the tenant.
    async fn lookup(&self, secret: &str) -> Result<share_tokens::Model, ShareServiceError> {
        if !looks_like_secret(secret) {
            return Err(ShareError::NotFound.into());
        }
        share_tokens::Entity::find()
            .filter(share_tokens::Column::TokenHash.eq(hash_secret(secret)))
            .one(&self.db)
            .await?
            .ok_or_else(|| ShareError::NotFound.into())
    }

    async fn resolve(
        &self,
        tenant: Tenant,
        token: &TokenRef,
    ) -> Result<Option<Uuid>, ShareServiceError> {
        match token {
            TokenRef::Id(id) => match SHARES.ensure_owned(&self.db, tenant, id.into_inner()).await {
                Ok(()) => Ok(Some(id.into_inner())),
                Err(StoreError::NotFound { .. }) => Ok(None),
                Err(err) => Err(err.into()),
            },
            TokenRef::Secret(secret) => match self.lookup(secret).await {
                Ok(share) if share.tenant_id == tenant.uuid() => Ok(Some(share.id)),
                Ok(share) => Err(StoreError::Forbidden {
                    entity: "share token",
                    id: share.id,
                }
                .into()),
                Err(ShareServiceError::Share(ShareError::NotFound)) => Ok(None),
                Err(err) => Err(err),
            },
        }
    }

    async fn check_access(
        &self,
        tenant: Tenant,
        share: &share_tokens::Model,
        now: DateTime<Utc>,
        deactivate_expired: bool,
    ) -> Result<(), ShareServiceError> {
        let check = AccessCheck::evaluate(
            share.is_active,
            share.revoked_at.is_some(),
            share.expires_at.map(|at| at.with_timezone(&Utc)),
            now,
        );

        if let AccessCheck::Expired { deactivate: true } = check
            && deactivate_expired
        {
            let result = SHARES
                .scoped_update(tenant)
                .col_expr(share_tokens::Column::IsActive, Expr::value(false))
                .col_expr(share_tokens::Column::UpdatedAt, Expr::value(now))
                .filter(share_tokens::Column::Id.eq(share.id))
                .filter(share_tokens::Column::IsActive.eq(true))
                .exec(&self.db)
                .await?;
            if result.rows_affected > 0 {
                info!(tenant_id = %tenant, share_id = %share.id, "expired share deactivated");
            }
        }

        Ok(check.into_result()?)
    }

    async fn access(
        &self,
        tenant: Tenant,
        share: share_tokens::Model,
    ) -> Result<SharedAccess, ShareServiceError> {
        let permissions = PermissionSet::from_json(&share.permissions)?;
        let document = DOCUMENTS
            .find_by_id(&self.db, tenant, share.resource_id)
            .await?;
        Ok(SharedAccess {
            share,
            document,
            permissions,
        })
    }

    fn issued(&self, share: share_tokens::Model, secret: ShareSecret, reused: bool) -> IssuedShare {
        let url = share_url(&self.base_url, &secret);
        IssuedShare {
            expires_at: share.expires_at.map(|at| at.with_timezone(&Utc)),
            share,
            token: secret.into_inner(),
            url,
            reused,
        }
    }
}

/// Active and not past expiry at `now`.
fn live_condition(now: DateTime<Utc>) -> Condition {
    Condition::all()
        .add(share_tokens::Column::IsActive.eq(true))
        .add(
            Condition::any()
                .add(share_tokens::Column::ExpiresAt.is_null())
                .add(share_tokens::Column::ExpiresAt.gt(now)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, QueryTrait};

    #[test]
    fn test_live_condition_checks_activity_and_expiry() {
        let sql = share_tokens::Entity::find()
            .filter(live_condition(Utc::now()))
            .build(DbBackend::Postgres)
            .to_string();
        assert!(sql.contains(r#""is_active" = TRUE"#));
        assert!(sql.contains(r#""expires_at" IS NULL"#));
        assert!(sql.contains(" OR "));
    }

    #[test]
    fn test_error_categories() {
        let gone: AppError = ShareServiceError::Share(ShareError::Expired).into();
        assert_eq!(gone.status_code(), 410);
        let revoked: AppError = ShareServiceError::Share(ShareError::Revoked).into();
        assert_eq!(revoked.status_code(), 410);
        let missing: AppError = ShareServiceError::Share(ShareError::NotFound).into();
        assert_eq!(missing.status_code(), 404);
        let denied = ShareServiceError::Share(ShareError::PermissionDenied(
            tessera_core::share::Permission::Approve,
        ));
        assert_eq!(denied.status_code(), 403);
    }

    #[test]
    fn test_only_database_errors_retry() {
        assert!(!ShareServiceError::Share(ShareError::Expired).is_retryable());
        assert!(!ShareServiceError::Database(DbErr::Custom("x".into())).is_retryable());
    }

    #[test]
    fn test_exhaustion_is_conflict() {
        let err = ShareServiceError::from_retry("share_issue", RetryError::Exhausted {
            attempts: 3,
            last: ShareServiceError::Database(DbErr::Custom("x".into())),
        });
        assert_eq!(err.status_code(), 409);
        assert_eq!(err.error_code(), "RETRIES_EXHAUSTED");
    }
}
