//! Repository abstractions for data access.
//!
//! Tenant-owned rows are only reached through [`TenantScopedStore`]; the
//! services here compose it with transactions, locking, and retry.

pub mod code_generator;
pub mod document;
pub mod lifecycle;
pub mod retry;
pub mod scoped;
pub mod share_token;
pub mod tenant;

pub use code_generator::{CodeGenError, CodeGenerator};
pub use document::{DocumentFilter, DocumentRepository, NewDocument};
pub use lifecycle::{EngineError, LifecycleEngine};
pub use retry::{RetryError, Retryable, with_retry};
pub use scoped::{StoreError, TenantOwned, TenantScopedStore};
pub use share_token::{
    IssueShare, IssuedShare, ShareServiceError, ShareStats, ShareTokenService, SharedAccess,
};
pub use tenant::TenantRepository;
