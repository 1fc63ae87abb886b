//! Lifecycle engine: the only writer of document status.
//!
//! A transition locks the document row, validates the move against the
//! kind's table, updates the status and appends one history entry, all in
//! one transaction. Transient failures restart the whole transaction.

use chrono::Utc;
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr, Order, Set,
    TransactionTrait,
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use tessera_core::code::{CodeError, CodePeriod, CodePrefix, DocumentCode, RetryPolicy};
use tessera_core::lifecycle::{
    Actor, BulkOptions, BulkOutcome, DocumentKind, DocumentStatus, LifecycleError,
    LifecycleService,
};
use tessera_core::tenant::Tenant;
use tessera_shared::error::AppError;
use tessera_shared::types::{DocumentId, StatusHistoryId, UserId};

use crate::entities::{document_status_history, documents};

use super::code_generator::{CodeGenError, CodeGenerator};
use super::retry::{RetryError, Retryable, is_transient, is_unique_violation, with_retry};
use super::scoped::{StoreError, TenantScopedStore};

pub(crate) const DOCUMENTS: TenantScopedStore<documents::Entity> = TenantScopedStore::new();
const HISTORY: TenantScopedStore<document_status_history::Entity> = TenantScopedStore::new();

/// Errors raised by the lifecycle engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Isolation or lookup failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Transition rule violated.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Code allocation failed.
    #[error(transparent)]
    CodeGen(#[from] CodeGenError),

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

impl From<CodeError> for EngineError {
    fn from(err: CodeError) -> Self {
        Self::CodeGen(CodeGenError::Code(err))
    }
}

impl EngineError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Store(e) => e.status_code(),
            Self::Lifecycle(e) => e.status_code(),
            Self::CodeGen(e) => e.status_code(),
            Self::Exhausted { .. } => 409,
            Self::Database(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Store(e) => e.error_code(),
            Self::Lifecycle(e) => e.error_code(),
            Self::CodeGen(e) => e.error_code(),
            Self::Exhausted { .. } => "RETRIES_EXHAUSTED",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    pub(crate) fn from_retry(operation: &'static str, err: RetryError<Self>) -> Self {
        match err {
            RetryError::Fatal(e) => e,
            RetryError::Exhausted { attempts, last } => {
                warn!(operation, attempts, error = %last, "retries exhausted");
                match last {
                    Self::CodeGen(e) => match e.scope() {
                        Some(scope) => Self::CodeGen(CodeGenError::Exhausted {
                            scope: scope.to_string(),
                            attempts,
                        }),
                        None => Self::Exhausted {
                            operation,
                            attempts,
                        },
                    },
                    _ => Self::Exhausted {
                        operation,
                        attempts,
                    },
                }
            }
        }
    }
}

impl Retryable for EngineError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::CodeGen(e) => e.is_retryable(),
            Self::Database(e) | Self::Store(StoreError::Database(e)) => {
                is_transient(e) || is_unique_violation(e)
            }
            _ => false,
        }
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Store(e) => e.into(),
            EngineError::Lifecycle(e) => e.into(),
            EngineError::CodeGen(e) => e.into(),
            EngineError::Exhausted { .. } => Self::Conflict(err.to_string()),
            EngineError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

/// Applies status transitions and duplicates documents.
#[derive(Debug, Clone)]
pub struct LifecycleEngine {
    db: DatabaseConnection,
    codes: CodeGenerator,
}

impl LifecycleEngine {
    /// Creates a new lifecycle engine.
    #[must_use]
    pub const fn new(db: DatabaseConnection, codes: CodeGenerator) -> Self {
        Self { db, codes }
    }

    fn policy(&self) -> &RetryPolicy {
        self.codes.policy()
    }

    /// Moves a document to `target` and returns the updated row.
    ///
    /// # Errors
    ///
    /// - `Store(NotFound)` if the document is not in the tenant
    /// - `Lifecycle(InvalidTransition)` if the table forbids the move
    /// - `Lifecycle(UnknownStatus)` if `target` is not a status of the kind
    pub async fn transition(
        &self,
        tenant: Tenant,
        document_id: DocumentId,
        target: &str,
        actor: Actor,
        comment: Option<&str>,
    ) -> Result<documents::Model, EngineError> {
        let result = with_retry(self.policy(), "lifecycle_transition", |_| async move {
            let txn = self.db.begin().await?;
            let document =
                Self::transition_in(&txn, tenant, document_id, target, actor, comment).await?;
            txn.commit().await?;
            Ok::<_, EngineError>(document)
        })
        .await;

        result.map_err(|err| EngineError::from_retry("lifecycle_transition", err))
    }

    /// Runs a transition on `conn`, which must be a transaction.
    pub async fn transition_in<C: ConnectionTrait>(
        conn: &C,
        tenant: Tenant,
        document_id: DocumentId,
        target: &str,
        actor: Actor,
        comment: Option<&str>,
    ) -> Result<documents::Model, EngineError> {
        let document = DOCUMENTS
            .find_by_id_for_update(conn, tenant, document_id.into_inner())
            .await?;

        let kind = DocumentKind::parse(&document.kind)?;
        let current = DocumentStatus::parse(kind, &document.status)?;
        let target = DocumentStatus::parse(kind, target)?;
        let record = LifecycleService::plan_transition(current, target, actor, comment)?;

        let updated = DOCUMENTS
            .update(
                conn,
                tenant,
                document.id,
                documents::ActiveModel {
                    status: Set(record.to.as_str().to_string()),
                    updated_at: Set(record.at.into()),
                    ..Default::default()
                },
            )
            .await?;

        HISTORY
            .create(
                conn,
                tenant,
                document_status_history::ActiveModel {
                    id: Set(StatusHistoryId::new().into_inner()),
                    document_id: Set(document.id),
                    from_status: Set(record.from.as_str().to_string()),
                    to_status: Set(record.to.as_str().to_string()),
                    actor_type: Set(record.actor.actor_type().to_string()),
                    actor_id: Set(record.actor.actor_id()),
                    comment: Set(record.comment.clone()),
                    created_at: Set(record.at.into()),
                    ..Default::default()
                },
            )
            .await?;

        info!(
            tenant_id = %tenant,
            document_id = %document.id,
            code = %document.code,
            from = %record.from,
            to = %record.to,
            actor = record.actor.actor_type(),
            "document status changed"
        );

        Ok(updated)
    }

    /// Applies the same transition to many documents, one transaction each.
    ///
    /// `cancel` is checked between documents; a document in flight always
    /// finishes.
    #[allow(clippy::too_many_arguments)]
    pub async fn bulk_transition(
        &self,
        tenant: Tenant,
        document_ids: &[DocumentId],
        target: &str,
        actor: Actor,
        comment: Option<&str>,
        options: BulkOptions,
        cancel: &CancellationToken,
    ) -> BulkOutcome {
        let mut outcome = BulkOutcome::new(document_ids.len());

        for &document_id in document_ids {
            if cancel.is_cancelled() {
                outcome.stop(true);
                info!(
                    tenant_id = %tenant,
                    updated = outcome.updated,
                    unprocessed = outcome.unprocessed,
                    "bulk transition cancelled"
                );
                return outcome;
            }

            match self
                .transition(tenant, document_id, target, actor, comment)
                .await
            {
                Ok(_) => outcome.record_success(document_id),
                Err(err) => {
                    warn!(
                        tenant_id = %tenant,
                        document_id = %document_id,
                        error = %err,
                        "bulk transition item failed"
                    );
                    outcome.record_failure(document_id, err.error_code(), err.to_string());
                    if options.stop_on_first_error {
                        outcome.stop(false);
                        return outcome;
                    }
                }
            }
        }

        info!(
            tenant_id = %tenant,
            total = outcome.total,
            updated = outcome.updated,
            failed = outcome.failed,
            "bulk transition finished"
        );
        outcome
    }

    /// Copies a document under a fresh code in the kind's initial status.
    ///
    /// Neither status nor history is carried over.
    pub async fn duplicate(
        &self,
        tenant: Tenant,
        document_id: DocumentId,
        created_by: Option<UserId>,
    ) -> Result<documents::Model, EngineError> {
        let result = with_retry(self.policy(), "document_duplicate", |_| async move {
            let txn = self.db.begin().await?;

            let source = DOCUMENTS
                .find_by_id(&txn, tenant, document_id.into_inner())
                .await?;
            let kind = DocumentKind::parse(&source.kind)?;
            let prefix = match DocumentCode::parse(&source.code) {
                Ok(code) => code.prefix().clone(),
                Err(_) => CodePrefix::new(kind.default_prefix())?,
            };
            let code = self
                .codes
                .generate_in(&txn, tenant, &prefix, CodePeriod::current()?)
                .await?;

            let now = Utc::now();
            let copy = DOCUMENTS
                .create(
                    &txn,
                    tenant,
                    documents::ActiveModel {
                        id: Set(DocumentId::new().into_inner()),
                        kind: Set(source.kind.clone()),
                        code: Set(code),
                        status: Set(LifecycleService::status_for_duplicate(kind)
                            .as_str()
                            .to_string()),
                        title: Set(source.title.clone()),
                        total_amount: Set(source.total_amount),
                        customer_reference: Set(source.customer_reference.clone()),
                        source_document_id: Set(Some(source.id)),
                        created_by: Set(created_by.map(UserId::into_inner)),
                        created_at: Set(now.into()),
                        updated_at: Set(now.into()),
                        ..Default::default()
                    },
                )
                .await?;

            txn.commit().await?;
            Ok::<_, EngineError>(copy)
        })
        .await
        .map_err(|err| EngineError::from_retry("document_duplicate", err))?;

        info!(
            tenant_id = %tenant,
            source_id = %document_id,
            document_id = %result.id,
            code = %result.code,
            "document duplicated"
        );
        Ok(result)
    }

    /// Returns the status history of a document, oldest first.
    pub async fn history(
        &self,
        tenant: Tenant,
        document_id: DocumentId,
    ) -> Result<Vec<document_status_history::Model>, EngineError> {
        let id: Uuid = document_id.into_inner();
        DOCUMENTS.find_by_id(&self.db, tenant, id).await?;

        Ok(HISTORY
            .find_by(
                &self.db,
                tenant,
                Condition::all().add(document_status_history::Column::DocumentId.eq(id)),
                &[
                    (document_status_history::Column::CreatedAt, Order::Asc),
                    (document_status_history::Column::Id, Order::Asc),
                ],
                None,
                None,
            )
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::lifecycle::BudgetStatus;

    fn invalid() -> EngineError {
        EngineError::Lifecycle(LifecycleError::InvalidTransition {
            kind: DocumentKind::Budget,
            from: BudgetStatus::Draft.to_string(),
            to: BudgetStatus::Approved.to_string(),
        })
    }

    #[test]
    fn test_invalid_transition_is_conflict_and_final() {
        let err = invalid();
        assert_eq!(err.status_code(), 409);
        assert!(!err.is_retryable());
        assert!(matches!(
            EngineError::from_retry("t", RetryError::Fatal(err)),
            EngineError::Lifecycle(_)
        ));
    }

    #[test]
    fn test_exhausted_duplicate_becomes_code_exhaustion() {
        let last = EngineError::CodeGen(CodeGenError::Duplicate {
            scope: "t:ORC:2025-11".into(),
            code: "ORC-2025-11-000004".into(),
        });
        assert!(last.is_retryable());

        let err = EngineError::from_retry("document_create", RetryError::Exhausted {
            attempts: 5,
            last,
        });
        assert_eq!(err.error_code(), "CODE_GENERATION_EXHAUSTED");
    }

    #[test]
    fn test_exhausted_database_error_is_generic() {
        let err = EngineError::from_retry("lifecycle_transition", RetryError::Exhausted {
            attempts: 5,
            last: EngineError::Database(DbErr::Custom("deadlock".into())),
        });
        assert!(matches!(err, EngineError::Exhausted { attempts: 5, .. }));
        let app: AppError = err.into();
        assert_eq!(app.status_code(), 409);
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let err = EngineError::Store(StoreError::NotFound {
            entity: "document",
            id: Uuid::nil(),
        });
        let app: AppError = err.into();
        assert_eq!(app.status_code(), 404);
    }
}
