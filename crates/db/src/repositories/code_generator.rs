//! Collision-free document code allocation.
//!
//! Sequential codes come from one counter row per `(tenant, prefix, period)`
//! in `code_sequences`. The row is bumped with an upsert inside the caller's
//! transaction, so its row lock serializes concurrent writers of the same
//! scope until commit. `lock_timeout` bounds the wait.

use std::time::Duration;

use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbBackend, DbErr, Statement,
    TransactionTrait,
};
use thiserror::Error;
use tracing::{debug, warn};

use tessera_core::code::{
    CUSTOM_SUFFIX_LEN, CodeError, CodePeriod, CodePrefix, RetryPolicy, ScopeKey,
    format_sequential, random_suffix,
};
use tessera_core::tenant::Tenant;
use tessera_shared::config::CodeGenConfig;
use tessera_shared::error::AppError;

use crate::entities::documents;

use super::retry::{RetryError, Retryable, is_transient, is_unique_violation, with_retry};
use super::scoped::{StoreError, TenantScopedStore};

const DOCUMENTS: TenantScopedStore<documents::Entity> = TenantScopedStore::new();

/// Bumps the scope counter past both its last value and the highest code
/// already used in the scope, so codes written outside the counter are skipped.
const NEXT_SEQUENCE_SQL: &str = r"
INSERT INTO code_sequences (tenant_id, prefix, period, last_value, updated_at)
VALUES (
    $1, $2, $3,
    COALESCE((
        SELECT MAX(CAST(RIGHT(code, 6) AS BIGINT))
        FROM documents
        WHERE tenant_id = $1 AND code ~ $4
    ), 0) + 1,
    NOW()
)
ON CONFLICT (tenant_id, prefix, period)
DO UPDATE SET
    last_value = GREATEST(code_sequences.last_value + 1, EXCLUDED.last_value),
    updated_at = NOW()
RETURNING last_value
";

/// Errors raised while generating codes.
#[derive(Debug, Error)]
pub enum CodeGenError {
    /// Invalid prefix, period, or sequence overflow.
    #[error(transparent)]
    Code(#[from] CodeError),

    /// The candidate code is already used in the tenant.
    #[error("code {code} already exists in scope {scope}")]
    Duplicate {
        /// Scope the code was drawn from.
        scope: String,
        /// The colliding code.
        code: String,
    },

    /// Every attempt failed.
    #[error("could not allocate a unique code for {scope} after {attempts} attempts")]
    Exhausted {
        /// Scope name.
        scope: String,
        /// Attempts made.
        attempts: u32,
    },

    /// Store error.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl CodeGenError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Code(e) => e.status_code(),
            Self::Duplicate { .. } | Self::Exhausted { .. } => 409,
            Self::Store(e) => e.status_code(),
            Self::Database(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Code(e) => e.error_code(),
            Self::Duplicate { .. } => "DUPLICATE_CODE",
            Self::Exhausted { .. } => "CODE_GENERATION_EXHAUSTED",
            Self::Store(e) => e.error_code(),
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Scope named by a duplicate or exhaustion error.
    #[must_use]
    pub fn scope(&self) -> Option<&str> {
        match self {
            Self::Duplicate { scope, .. } | Self::Exhausted { scope, .. } => Some(scope),
            _ => None,
        }
    }
}

impl Retryable for CodeGenError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Duplicate { .. } => true,
            Self::Database(e) | Self::Store(StoreError::Database(e)) => {
                is_transient(e) || is_unique_violation(e)
            }
            _ => false,
        }
    }
}

impl From<CodeGenError> for AppError {
    fn from(err: CodeGenError) -> Self {
        match err {
            CodeGenError::Code(e) => e.into(),
            CodeGenError::Duplicate { .. } | CodeGenError::Exhausted { .. } => {
                Self::Conflict(err.to_string())
            }
            CodeGenError::Store(e) => e.into(),
            CodeGenError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

/// Generates unique, human-readable document codes.
#[derive(Debug, Clone)]
pub struct CodeGenerator {
    db: DatabaseConnection,
    policy: RetryPolicy,
    lock_timeout: Duration,
}

impl CodeGenerator {
    /// Creates a new code generator.
    #[must_use]
    pub fn new(db: DatabaseConnection, config: &CodeGenConfig) -> Self {
        Self {
            db,
            policy: RetryPolicy::from_config(config),
            lock_timeout: Duration::from_millis(config.lock_timeout_ms),
        }
    }

    /// Retry policy shared with callers that wrap [`Self::generate_in`].
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Allocates the next sequential code for the current UTC month.
    ///
    /// The counter bump commits on its own; a code that is never used
    /// leaves a gap.
    ///
    /// # Errors
    ///
    /// Returns `CodeGenError::Exhausted` when no unique code was found
    /// within the retry budget.
    pub async fn generate(&self, tenant: Tenant, prefix: &CodePrefix) -> Result<String, CodeGenError> {
        self.generate_for_period(tenant, prefix, CodePeriod::current()?)
            .await
    }

    /// Allocates the next sequential code for `period`.
    ///
    /// # Errors
    ///
    /// Returns `CodeGenError::Exhausted` when no unique code was found
    /// within the retry budget.
    pub async fn generate_for_period(
        &self,
        tenant: Tenant,
        prefix: &CodePrefix,
        period: CodePeriod,
    ) -> Result<String, CodeGenError> {
        let scope = ScopeKey::new(tenant, prefix.clone(), period);

        let result = with_retry(&self.policy, "code_generate", |_| {
            let scope = &scope;
            async move {
                let txn = self.db.begin().await?;
                let code = self.allocate(&txn, scope).await?;
                txn.commit().await?;
                Ok::<_, CodeGenError>(code)
            }
        })
        .await;

        result.map_err(|err| exhausted(&scope.name(), err))
    }

    /// Allocates a sequential code inside the caller's transaction.
    ///
    /// Makes a single attempt. A failure aborts the transaction, so the
    /// caller retries the whole unit of work.
    pub async fn generate_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        tenant: Tenant,
        prefix: &CodePrefix,
        period: CodePeriod,
    ) -> Result<String, CodeGenError> {
        let scope = ScopeKey::new(tenant, prefix.clone(), period);
        self.allocate(conn, &scope).await
    }

    /// Draws a `<PREFIX>-<suffix>` code that is unused in the tenant.
    ///
    /// # Errors
    ///
    /// Returns `CodeGenError::Exhausted` when every draw collided.
    pub async fn generate_custom(
        &self,
        tenant: Tenant,
        prefix: &CodePrefix,
    ) -> Result<String, CodeGenError> {
        let result = with_retry(&self.policy, "code_generate_custom", |_| {
            self.generate_custom_in(&self.db, tenant, prefix)
        })
        .await;

        result.map_err(|err| exhausted(&custom_scope(tenant, prefix), err))
    }

    /// Draws one custom code candidate on `conn` and checks it is unused.
    pub async fn generate_custom_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        tenant: Tenant,
        prefix: &CodePrefix,
    ) -> Result<String, CodeGenError> {
        let suffix = random_suffix(&mut rand::rng(), CUSTOM_SUFFIX_LEN);
        let code = format!("{prefix}-{suffix}");
        if code_exists(conn, tenant, &code).await? {
            return Err(CodeGenError::Duplicate {
                scope: custom_scope(tenant, prefix),
                code,
            });
        }
        Ok(code)
    }

    async fn allocate<C: ConnectionTrait>(
        &self,
        conn: &C,
        scope: &ScopeKey,
    ) -> Result<String, CodeGenError> {
        let timeout_ms = self.lock_timeout.as_millis();
        conn.execute_unprepared(&format!("SET LOCAL lock_timeout = '{timeout_ms}ms'"))
            .await?;

        let row = conn
            .query_one(Statement::from_sql_and_values(
                DbBackend::Postgres,
                NEXT_SEQUENCE_SQL,
                [
                    scope.tenant.uuid().into(),
                    scope.prefix.as_str().into(),
                    scope.period.as_key().into(),
                    scope.sequence_regex().into(),
                ],
            ))
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("code sequence {}", scope.name())))?;
        let next: i64 = row.try_get("", "last_value")?;

        let code = format_sequential(&scope.prefix, scope.period, next)?;
        if code_exists(conn, scope.tenant, &code).await? {
            warn!(scope = %scope.name(), code = %code, "sequence produced a code already in use");
            return Err(CodeGenError::Duplicate {
                scope: scope.name(),
                code,
            });
        }

        debug!(scope = %scope.name(), code = %code, "allocated document code");
        Ok(code)
    }
}

async fn code_exists<C: ConnectionTrait>(
    conn: &C,
    tenant: Tenant,
    code: &str,
) -> Result<bool, StoreError> {
    let matches = DOCUMENTS
        .count(
            conn,
            tenant,
            Condition::all().add(documents::Column::Code.eq(code)),
        )
        .await?;
    Ok(matches > 0)
}

fn custom_scope(tenant: Tenant, prefix: &CodePrefix) -> String {
    format!("{tenant}:{prefix}:custom")
}

fn exhausted(scope: &str, err: RetryError<CodeGenError>) -> CodeGenError {
    match err {
        RetryError::Exhausted { attempts, last } => {
            warn!(scope, attempts, error = %last, "code generation exhausted");
            CodeGenError::Exhausted {
                scope: scope.to_string(),
                attempts,
            }
        }
        RetryError::Fatal(e) => e,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_duplicate_is_retryable_and_conflict() {
        let err = CodeGenError::Duplicate {
            scope: "t:ORC:2025-11".into(),
            code: "ORC-2025-11-000001".into(),
        };
        assert!(err.is_retryable());
        assert_eq!(err.status_code(), 409);
        assert_eq!(err.scope(), Some("t:ORC:2025-11"));
    }

    #[test]
    fn test_code_errors_are_not_retried() {
        let err = CodeGenError::Code(CodeError::SequenceOverflow {
            value: 1_000_000,
            max: 999_999,
        });
        assert!(!err.is_retryable());
        assert_eq!(err.status_code(), 409);
    }

    #[test]
    fn test_exhaustion_maps_to_conflict() {
        let err = exhausted(
            "t:ORC:2025-11",
            RetryError::Exhausted {
                attempts: 5,
                last: CodeGenError::Duplicate {
                    scope: "t:ORC:2025-11".into(),
                    code: "ORC-2025-11-000001".into(),
                },
            },
        );
        assert!(matches!(err, CodeGenError::Exhausted { attempts: 5, .. }));
        assert_eq!(err.error_code(), "CODE_GENERATION_EXHAUSTED");
        let app: AppError = err.into();
        assert_eq!(app.status_code(), 409);
    }

    #[test]
    fn test_fatal_passes_through() {
        let err = exhausted(
            "scope",
            RetryError::Fatal(CodeGenError::Code(CodeError::InvalidPrefix("x".into()))),
        );
        assert!(matches!(err, CodeGenError::Code(_)));
    }

    #[test]
    fn test_custom_scope_name() {
        let tenant = Tenant::new(Uuid::from_u128(3)).unwrap();
        let prefix = CodePrefix::new("ORC").unwrap();
        assert_eq!(
            custom_scope(tenant, &prefix),
            "00000000-0000-0000-0000-000000000003:ORC:custom"
        );
    }

    #[test]
    fn test_next_sequence_sql_is_an_upsert() {
        assert!(NEXT_SEQUENCE_SQL.contains("ON CONFLICT (tenant_id, prefix, period)"));
        assert!(NEXT_SEQUENCE_SQL.contains("RETURNING last_value"));
        assert!(NEXT_SEQUENCE_SQL.contains("GREATEST(code_sequences.last_value + 1, EXCLUDED.last_value)"));
    }
}
