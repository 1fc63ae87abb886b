//! Document repository: creation, lookup, and listing.
//!
//! Status changes go through [`super::lifecycle::LifecycleEngine`]; this
//! repository only ever writes a document's initial status.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, Order, Set, TransactionTrait,
};
use tracing::info;

use tessera_core::code::{CodePeriod, CodePrefix};
use tessera_core::lifecycle::{DocumentKind, DocumentStatus};
use tessera_core::tenant::Tenant;
use tessera_shared::types::{DocumentId, PageRequest, PageResponse, UserId};

use crate::entities::documents;

use super::code_generator::CodeGenerator;
use super::lifecycle::{DOCUMENTS, EngineError};
use super::retry::with_retry;

/// Input for creating a document.
#[derive(Debug, Clone)]
pub struct NewDocument {
    /// Document kind.
    pub kind: DocumentKind,
    /// Title.
    pub title: String,
    /// Total amount.
    pub total_amount: Decimal,
    /// Customer reference, if any.
    pub customer_reference: Option<String>,
    /// Code prefix; the kind's default when absent.
    pub prefix: Option<String>,
    /// Draw a `<PREFIX>-<suffix>` code instead of a sequential one.
    pub custom_code: bool,
    /// Creating user.
    pub created_by: Option<UserId>,
}

/// Filter for listing documents.
#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    /// Only this kind.
    pub kind: Option<DocumentKind>,
    /// Only this status; checked against `kind` when both are given.
    pub status: Option<String>,
}

/// Document repository.
#[derive(Debug, Clone)]
pub struct DocumentRepository {
    db: DatabaseConnection,
    codes: CodeGenerator,
}

impl DocumentRepository {
    /// Creates a new document repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, codes: CodeGenerator) -> Self {
        Self { db, codes }
    }

    /// Creates a document in its kind's initial status under a fresh code.
    ///
    /// Code allocation and insert share one transaction; a collision or
    /// transient failure restarts both.
    pub async fn create(
        &self,
        tenant: Tenant,
        input: NewDocument,
    ) -> Result<documents::Model, EngineError> {
        let prefix = match input.prefix.as_deref() {
            Some(prefix) => CodePrefix::normalize(prefix)?,
            None => CodePrefix::new(input.kind.default_prefix())?,
        };
        let title = input.title.trim().to_string();

        let input = &input;
        let prefix = &prefix;
        let title = title.as_str();
        let document = with_retry(self.codes.policy(), "document_create", |_| async move {
            let txn = self.db.begin().await?;

            let code = if input.custom_code {
                self.codes.generate_custom_in(&txn, tenant, prefix).await?
            } else {
                self.codes
                    .generate_in(&txn, tenant, prefix, CodePeriod::current()?)
                    .await?
            };

            let now = Utc::now();
            let document = DOCUMENTS
                .create(
                    &txn,
                    tenant,
                    documents::ActiveModel {
                        id: Set(DocumentId::new().into_inner()),
                        kind: Set(input.kind.as_str().to_string()),
                        code: Set(code),
                        status: Set(input.kind.initial_status().as_str().to_string()),
                        title: Set(title.to_string()),
                        total_amount: Set(input.total_amount),
                        customer_reference: Set(input.customer_reference.clone()),
                        source_document_id: Set(None),
                        created_by: Set(input.created_by.map(UserId::into_inner)),
                        created_at: Set(now.into()),
                        updated_at: Set(now.into()),
                        ..Default::default()
                    },
                )
                .await?;

            txn.commit().await?;
            Ok::<_, EngineError>(document)
        })
        .await
        .map_err(|err| EngineError::from_retry("document_create", err))?;

        info!(
            tenant_id = %tenant,
            document_id = %document.id,
            kind = %document.kind,
            code = %document.code,
            "document created"
        );
        Ok(document)
    }

    /// Loads a document.
    pub async fn get(
        &self,
        tenant: Tenant,
        id: DocumentId,
    ) -> Result<documents::Model, EngineError> {
        Ok(DOCUMENTS
            .find_by_id(&self.db, tenant, id.into_inner())
            .await?)
    }

    /// Looks a document up by its code.
    pub async fn find_by_code(
        &self,
        tenant: Tenant,
        code: &str,
    ) -> Result<Option<documents::Model>, EngineError> {
        let mut found = DOCUMENTS
            .find_by(
                &self.db,
                tenant,
                Condition::all().add(documents::Column::Code.eq(code)),
                &[],
                Some(1),
                None,
            )
            .await?;
        Ok(found.pop())
    }

    /// Lists documents, newest first.
    pub async fn list(
        &self,
        tenant: Tenant,
        filter: &DocumentFilter,
        page: PageRequest,
    ) -> Result<PageResponse<documents::Model>, EngineError> {
        let mut criteria = Condition::all();
        if let Some(kind) = filter.kind {
            criteria = criteria.add(documents::Column::Kind.eq(kind.as_str()));
        }
        if let Some(status) = filter.status.as_deref() {
            let status = match filter.kind {
                Some(kind) => DocumentStatus::parse(kind, status)?.as_str().to_string(),
                None => status.trim().to_ascii_lowercase(),
            };
            criteria = criteria.add(documents::Column::Status.eq(status));
        }

        Ok(DOCUMENTS
            .paginate(
                &self.db,
                tenant,
                criteria,
                &[
                    (documents::Column::CreatedAt, Order::Desc),
                    (documents::Column::Id, Order::Desc),
                ],
                page,
            )
            .await?)
    }

    /// Counts documents of the tenant.
    pub async fn count(&self, tenant: Tenant) -> Result<u64, EngineError> {
        Ok(DOCUMENTS.count(&self.db, tenant, Condition::all()).await?)
    }

    /// Deletes a document together with its history and shares.
    pub async fn delete(&self, tenant: Tenant, id: DocumentId) -> Result<bool, EngineError> {
        let deleted = DOCUMENTS.delete(&self.db, tenant, id.into_inner()).await?;
        if deleted {
            info!(tenant_id = %tenant, document_id = %id, "document deleted");
        }
        Ok(deleted)
    }
}
