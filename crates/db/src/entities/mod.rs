//! `SeaORM` entity definitions.
//!
//! Every table except `tenants` and `code_sequences` is tenant-owned and is
//! read and written through `repositories::scoped::TenantScopedStore`.

pub mod code_sequences;
pub mod document_status_history;
pub mod documents;
pub mod share_tokens;
pub mod tenants;

pub mod prelude {
    //! Entity re-exports.
    pub use super::code_sequences::Entity as CodeSequences;
    pub use super::document_status_history::Entity as DocumentStatusHistory;
    pub use super::documents::Entity as Documents;
    pub use super::share_tokens::Entity as ShareTokens;
    pub use super::tenants::Entity as Tenants;
}
