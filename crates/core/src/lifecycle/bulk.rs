//! Bulk transition accounting.

use serde::Serialize;

use tessera_shared::types::DocumentId;

/// Options for a bulk transition.
#[derive(Debug, Clone, Copy, Default)]
pub struct BulkOptions {
    /// Abort on the first failed document.
    pub stop_on_first_error: bool,
}

/// One document that could not be moved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkFailure {
    /// The document.
    pub document_id: DocumentId,
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable reason.
    pub message: String,
}

/// Result of a bulk transition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkOutcome {
    /// Documents requested.
    pub total: usize,
    /// Documents moved.
    pub updated: usize,
    /// Documents that failed.
    pub failed: usize,
    /// Documents never attempted (early stop or cancellation).
    pub unprocessed: usize,
    /// True if the run was cancelled between documents.
    pub cancelled: bool,
    /// Ids that were moved, in processing order.
    pub updated_ids: Vec<DocumentId>,
    /// Failure details, in processing order.
    pub failures: Vec<BulkFailure>,
}

impl BulkOutcome {
    /// Starts accounting for `total` documents.
    #[must_use]
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    /// Records a moved document.
    pub fn record_success(&mut self, document_id: DocumentId) {
        self.updated += 1;
        self.updated_ids.push(document_id);
    }

    /// Records a failed document.
    pub fn record_failure(&mut self, document_id: DocumentId, error: &str, message: String) {
        self.failed += 1;
        self.failures.push(BulkFailure {
            document_id,
            error: error.to_string(),
            message,
        });
    }

    /// Marks the remaining documents as skipped.
    pub fn stop(&mut self, cancelled: bool) {
        self.unprocessed = self.total - self.updated - self.failed;
        self.cancelled = cancelled;
    }

    /// Returns true if every document was moved.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.updated == self.total
    }
}
