//! Lifecycle service for document status transitions.

use std::collections::HashSet;

use chrono::Utc;

use crate::lifecycle::error::LifecycleError;
use crate::lifecycle::status::{BudgetStatus, InvoiceStatus, LifecycleStatus, ServiceStatus};
use crate::lifecycle::types::{Actor, DocumentKind, DocumentStatus, TransitionRecord};

/// Longest comment stored with a history entry.
pub const MAX_COMMENT_LEN: usize = 2000;

/// Stateless service validating document status changes.
///
/// The database engine calls [`LifecycleService::plan_transition`] while
/// holding the document row lock and persists the returned record.
pub struct LifecycleService;

impl LifecycleService {
    /// Validates a move from `current` to `target` and builds its history record.
    ///
    /// Blank comments are dropped.
    ///
    /// # Returns
    /// * `Err(LifecycleError::KindMismatch)` if `target` belongs to another kind
    /// * `Err(LifecycleError::InvalidTransition)` if the table forbids the move
    /// * `Err(LifecycleError::CommentTooLong)` if the comment exceeds the limit
    pub fn plan_transition(
        current: DocumentStatus,
        target: DocumentStatus,
        actor: Actor,
        comment: Option<&str>,
    ) -> Result<TransitionRecord, LifecycleError> {
        if current.kind() != target.kind() {
            return Err(LifecycleError::KindMismatch {
                expected: current.kind(),
                found: target.kind(),
            });
        }

        if !current.can_transition_to(target) {
            return Err(LifecycleError::InvalidTransition {
                kind: current.kind(),
                from: current.as_str().to_string(),
                to: target.as_str().to_string(),
            });
        }

        let comment = comment.map(str::trim).filter(|c| !c.is_empty());
        if let Some(c) = comment
            && c.chars().count() > MAX_COMMENT_LEN
        {
            return Err(LifecycleError::CommentTooLong {
                max: MAX_COMMENT_LEN,
            });
        }

        Ok(TransitionRecord {
            from: current,
            to: target,
            actor,
            comment: comment.map(ToString::to_string),
            at: Utc::now(),
        })
    }

    /// Check if a status transition is valid.
    #[must_use]
    pub fn is_valid_transition(from: DocumentStatus, to: DocumentStatus) -> bool {
        from.can_transition_to(to)
    }

    /// Status a duplicated document starts in.
    ///
    /// Never the source's status.
    #[must_use]
    pub const fn status_for_duplicate(kind: DocumentKind) -> DocumentStatus {
        kind.initial_status()
    }

    /// Checks every transition table once at startup.
    ///
    /// A table is rejected if a status maps to itself, lists a target
    /// twice, has an initial status that is final, or does not parse back
    /// from its stored form.
    pub fn validate_tables() -> Result<(), LifecycleError> {
        check_table::<BudgetStatus>()?;
        check_table::<InvoiceStatus>()?;
        check_table::<ServiceStatus>()?;
        Ok(())
    }
}

fn check_table<S: LifecycleStatus + std::hash::Hash>() -> Result<(), LifecycleError> {
    let kind = S::KIND;

    if S::INITIAL.is_final() {
        return Err(LifecycleError::InvalidTable(format!(
            "{kind}: initial status {} is final",
            S::INITIAL
        )));
    }

    for status in S::ALL {
        if S::parse(status.as_str()) != Some(*status) {
            return Err(LifecycleError::InvalidTable(format!(
                "{kind}: status {status} does not parse back"
            )));
        }

        let mut seen = HashSet::new();
        for target in status.next() {
            if target == status {
                return Err(LifecycleError::InvalidTable(format!(
                    "{kind}: {status} maps to itself"
                )));
            }
            if !seen.insert(*target) {
                return Err(LifecycleError::InvalidTable(format!(
                    "{kind}: {status} lists {target} twice"
                )));
            }
        }
    }

    Ok(())
}
