//! Tenant-scoped data access.
//!
//! [`TenantScopedStore`] is the only path to tenant-owned rows. Every query
//! it builds starts from [`TenantScopedStore::scoped_select`], which ANDs the
//! tenant predicate in before any caller criteria are applied.

use std::marker::PhantomData;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait,
    IntoActiveModel, Iterable, Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    Select, UpdateMany, Value,
};
use thiserror::Error;
use uuid::Uuid;

use tessera_core::tenant::Tenant;
use tessera_shared::error::AppError;
use tessera_shared::types::{PageRequest, PageResponse};

use crate::entities::{document_status_history, documents, share_tokens};

/// An entity whose rows belong to exactly one tenant.
pub trait TenantOwned: EntityTrait<Model: Sync, ActiveModel: Send + Sync> {
    /// Name used in error messages.
    const NAME: &'static str;

    /// Column holding the owning tenant.
    fn tenant_column() -> Self::Column;

    /// Primary key column.
    fn id_column() -> Self::Column;
}

impl TenantOwned for documents::Entity {
    const NAME: &'static str = "document";

    fn tenant_column() -> Self::Column {
        documents::Column::TenantId
    }

    fn id_column() -> Self::Column {
        documents::Column::Id
    }
}

impl TenantOwned for document_status_history::Entity {
    const NAME: &'static str = "status history entry";

    fn tenant_column() -> Self::Column {
        document_status_history::Column::TenantId
    }

    fn id_column() -> Self::Column {
        document_status_history::Column::Id
    }
}

impl TenantOwned for share_tokens::Entity {
    const NAME: &'static str = "share token";

    fn tenant_column() -> Self::Column {
        share_tokens::Column::TenantId
    }

    fn id_column() -> Self::Column {
        share_tokens::Column::Id
    }
}

/// Errors raised by the tenant-scoped store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No row with that id exists in the tenant.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Entity name.
        entity: &'static str,
        /// Requested id.
        id: Uuid,
    },

    /// The row exists but belongs to another tenant.
    #[error("{entity} {id} belongs to another tenant")]
    Forbidden {
        /// Entity name.
        entity: &'static str,
        /// Requested id.
        id: Uuid,
    },

    /// The attributes carry a tenant other than the one operated on.
    #[error("tenant mismatch: operating on {expected}, attributes carry {found}")]
    TenantMismatch {
        /// Tenant of the operation.
        expected: Uuid,
        /// Tenant found in the attributes (nil when null).
        found: Uuid,
    },

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl StoreError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::Forbidden { .. } | Self::TenantMismatch { .. } => 403,
            Self::Database(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::TenantMismatch { .. } => "TENANT_MISMATCH",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => Self::NotFound(err.to_string()),
            StoreError::Forbidden { .. } | StoreError::TenantMismatch { .. } => {
                Self::Forbidden(err.to_string())
            }
            StoreError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

/// Generic data access that never leaves the given tenant.
///
/// Every method takes the tenant explicitly and a connection, so it runs
/// equally on the pool or inside a caller's transaction.
pub struct TenantScopedStore<E> {
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for TenantScopedStore<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for TenantScopedStore<E> {}

impl<E> Default for TenantScopedStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for TenantScopedStore<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantScopedStore")
            .field("entity", &std::any::type_name::<E>())
            .finish()
    }
}

impl<E> TenantScopedStore<E> {
    /// Creates a store.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _entity: PhantomData,
        }
    }
}

impl<E> TenantScopedStore<E>
where
    E: TenantOwned,
    E::Model: IntoActiveModel<E::ActiveModel>,
{
    /// Base query for the tenant. All reads start here.
    pub fn scoped_select(&self, tenant: Tenant) -> Select<E> {
        E::find().filter(E::tenant_column().eq(tenant.uuid()))
    }

    /// Base bulk update for the tenant.
    ///
    /// Callers add their own filters and column expressions; the tenant
    /// predicate is already in place.
    pub fn scoped_update(&self, tenant: Tenant) -> UpdateMany<E> {
        E::update_many().filter(E::tenant_column().eq(tenant.uuid()))
    }

    /// Loads a row by id.
    ///
    /// Rows of other tenants read as absent.
    pub async fn find_by_id<C: ConnectionTrait>(
        &self,
        conn: &C,
        tenant: Tenant,
        id: Uuid,
    ) -> Result<E::Model, StoreError> {
        self.scoped_select(tenant)
            .filter(E::id_column().eq(id))
            .one(conn)
            .await?
            .ok_or(StoreError::NotFound {
                entity: E::NAME,
                id,
            })
    }

    /// Loads a row by id and locks it until the surrounding transaction ends.
    pub async fn find_by_id_for_update<C: ConnectionTrait>(
        &self,
        conn: &C,
        tenant: Tenant,
        id: Uuid,
    ) -> Result<E::Model, StoreError> {
        self.scoped_select(tenant)
            .filter(E::id_column().eq(id))
            .lock_exclusive()
            .one(conn)
            .await?
            .ok_or(StoreError::NotFound {
                entity: E::NAME,
                id,
            })
    }

    /// Lists rows matching `criteria`.
    pub async fn find_by<C: ConnectionTrait>(
        &self,
        conn: &C,
        tenant: Tenant,
        criteria: Condition,
        order: &[(E::Column, Order)],
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<Vec<E::Model>, StoreError> {
        let mut query = self.scoped_select(tenant).filter(criteria);
        for (column, direction) in order {
            query = query.order_by(*column, direction.clone());
        }
        if let Some(limit) = limit {
            query = query.limit(limit);
        }
        if let Some(offset) = offset {
            query = query.offset(offset);
        }
        Ok(query.all(conn).await?)
    }

    /// Counts rows matching `criteria`.
    pub async fn count<C: ConnectionTrait>(
        &self,
        conn: &C,
        tenant: Tenant,
        criteria: Condition,
    ) -> Result<u64, StoreError> {
        Ok(self.scoped_select(tenant).filter(criteria).count(conn).await?)
    }

    /// Returns one page of rows matching `criteria`.
    pub async fn paginate<C: ConnectionTrait>(
        &self,
        conn: &C,
        tenant: Tenant,
        criteria: Condition,
        order: &[(E::Column, Order)],
        page: PageRequest,
    ) -> Result<PageResponse<E::Model>, StoreError> {
        let page = page.clamped();
        let total = self.count(conn, tenant, criteria.clone()).await?;
        let data = self
            .find_by(
                conn,
                tenant,
                criteria,
                order,
                Some(page.limit()),
                Some(page.offset()),
            )
            .await?;
        Ok(PageResponse::new(data, page.page, page.per_page, total))
    }

    /// Inserts a row owned by `tenant`.
    ///
    /// A tenant already set on `model` must equal `tenant`.
    pub async fn create<C: ConnectionTrait>(
        &self,
        conn: &C,
        tenant: Tenant,
        mut model: E::ActiveModel,
    ) -> Result<E::Model, StoreError> {
        check_tenant_value(tenant, model.get(E::tenant_column()).into_value())?;
        model.set(E::tenant_column(), tenant.uuid().into());
        Ok(model.insert(conn).await?)
    }

    /// Applies the set columns of `model` to row `id` and returns the new row.
    ///
    /// Fails `NotFound` or `Forbidden` before touching anything if the row
    /// is not owned by `tenant`. Id and tenant columns are never rewritten.
    pub async fn update<C: ConnectionTrait>(
        &self,
        conn: &C,
        tenant: Tenant,
        id: Uuid,
        mut model: E::ActiveModel,
    ) -> Result<E::Model, StoreError> {
        self.ensure_owned(conn, tenant, id).await?;
        check_tenant_value(tenant, model.get(E::tenant_column()).into_value())?;

        model.not_set(E::tenant_column());
        model.not_set(E::id_column());

        let has_changes = E::Column::iter().any(|column| model.get(column).is_set());
        if has_changes {
            let result = self
                .scoped_update(tenant)
                .set(model)
                .filter(E::id_column().eq(id))
                .exec(conn)
                .await?;
            if result.rows_affected == 0 {
                return Err(StoreError::NotFound {
                    entity: E::NAME,
                    id,
                });
            }
        }

        self.find_by_id(conn, tenant, id).await
    }

    /// Deletes row `id`. Returns false if it did not exist anywhere.
    ///
    /// A row of another tenant fails `Forbidden` and is left untouched.
    pub async fn delete<C: ConnectionTrait>(
        &self,
        conn: &C,
        tenant: Tenant,
        id: Uuid,
    ) -> Result<bool, StoreError> {
        let result = E::delete_many()
            .filter(E::id_column().eq(id))
            .filter(E::tenant_column().eq(tenant.uuid()))
            .exec(conn)
            .await?;
        if result.rows_affected > 0 {
            return Ok(true);
        }

        match self.owner_of(conn, id).await? {
            Some(_) => Err(StoreError::Forbidden {
                entity: E::NAME,
                id,
            }),
            None => Ok(false),
        }
    }

    /// Fails unless row `id` exists and belongs to `tenant`.
    ///
    /// Distinguishes "absent" (`NotFound`) from "owned by someone else"
    /// (`Forbidden`) for write paths.
    pub async fn ensure_owned<C: ConnectionTrait>(
        &self,
        conn: &C,
        tenant: Tenant,
        id: Uuid,
    ) -> Result<(), StoreError> {
        match self.owner_of(conn, id).await? {
            None => Err(StoreError::NotFound {
                entity: E::NAME,
                id,
            }),
            Some(owner) if owner == tenant.uuid() => Ok(()),
            Some(_) => Err(StoreError::Forbidden {
                entity: E::NAME,
                id,
            }),
        }
    }

    // Reads only the owning tenant column, never row data.
    async fn owner_of<C: ConnectionTrait>(&self, conn: &C, id: Uuid) -> Result<Option<Uuid>, DbErr> {
        E::find()
            .select_only()
            .column(E::tenant_column())
            .filter(E::id_column().eq(id))
            .into_tuple::<Uuid>()
            .one(conn)
            .await
    }
}

fn check_tenant_value(tenant: Tenant, value: Option<Value>) -> Result<(), StoreError> {
    match value {
        None => Ok(()),
        Some(Value::Uuid(Some(found))) if *found == tenant.uuid() => Ok(()),
        Some(Value::Uuid(Some(found))) => Err(StoreError::TenantMismatch {
            expected: tenant.uuid(),
            found: *found,
        }),
        Some(_) => Err(StoreError::TenantMismatch {
            expected: tenant.uuid(),
            found: Uuid::nil(),
        }),
    }
}

impl<E> TenantScopedStore<E>
where
    E: TenantOwned,
{
    /// Name of the entity this store serves.
    #[must_use]
    pub const fn entity_name(&self) -> &'static str {
        E::NAME
    }
}
