//! Bounded retry for transient database failures.

use std::fmt;
use std::future::Future;

use sea_orm::{DbErr, RuntimeErr, SqlErr};
use tracing::warn;

use tessera_core::code::RetryPolicy;

/// `serialization_failure`
pub const SERIALIZATION_FAILURE: &str = "40001";
/// `deadlock_detected`
pub const DEADLOCK_DETECTED: &str = "40P01";
/// `lock_not_available`, raised when `lock_timeout` elapses.
pub const LOCK_NOT_AVAILABLE: &str = "55P03";

/// Extracts the Postgres SQLSTATE from a database error, if any.
pub fn sqlstate(err: &DbErr) -> Option<String> {
    let (DbErr::Exec(runtime) | DbErr::Query(runtime) | DbErr::Conn(runtime)) = err else {
        return None;
    };
    let RuntimeErr::SqlxError(sqlx::Error::Database(db)) = runtime else {
        return None;
    };
    db.code().map(|code| code.into_owned())
}

/// Returns true for errors worth retrying at the transaction boundary.
pub fn is_transient(err: &DbErr) -> bool {
    sqlstate(err).is_some_and(|code| {
        matches!(
            code.as_str(),
            SERIALIZATION_FAILURE | DEADLOCK_DETECTED | LOCK_NOT_AVAILABLE
        )
    })
}

/// Returns true if the error is a unique constraint violation.
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Errors that know whether another attempt could succeed.
pub trait Retryable {
    /// True if the same operation may succeed when run again.
    fn is_retryable(&self) -> bool;
}

impl Retryable for DbErr {
    fn is_retryable(&self) -> bool {
        is_transient(self)
    }
}

/// Outcome of a retried operation that did not succeed.
#[derive(Debug)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error.
    Exhausted {
        /// Attempts made.
        attempts: u32,
        /// Error of the final attempt.
        last: E,
    },
    /// A non-retryable error stopped the loop.
    Fatal(E),
}

impl<E> RetryError<E> {
    /// Returns the underlying error.
    pub fn into_inner(self) -> E {
        match self {
            Self::Exhausted { last, .. } => last,
            Self::Fatal(e) => e,
        }
    }
}

/// Runs `op` until it succeeds, fails fatally, or the policy runs out.
///
/// `op` receives the 1-based attempt number and must start a fresh
/// transaction on every call.
pub async fn with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + fmt::Display,
{
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() => {
                if !policy.should_retry(attempt) {
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: err,
                    });
                }
                let delay = policy.backoff(attempt, &mut rand::rng());
                warn!(
                    operation = label,
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "retrying after transient failure"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(RetryError::Fatal(err)),
        }
    }
}
