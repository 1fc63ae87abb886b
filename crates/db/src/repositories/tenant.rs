//! Tenant repository for database operations.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, Set,
};

use tessera_shared::types::TenantId;

use crate::entities::tenants;

/// Tenant repository.
#[derive(Debug, Clone)]
pub struct TenantRepository {
    db: DatabaseConnection,
}

impl TenantRepository {
    /// Creates a new tenant repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails (duplicate slug included).
    pub async fn create(&self, name: &str, slug: &str) -> Result<tenants::Model, DbErr> {
        tenants::ActiveModel {
            id: Set(TenantId::new().into_inner()),
            name: Set(name.to_string()),
            slug: Set(slug.to_string()),
            created_at: Set(chrono::Utc::now().into()),
        }
        .insert(&self.db)
        .await
    }

    /// Finds a tenant by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: TenantId) -> Result<Option<tenants::Model>, DbErr> {
        tenants::Entity::find_by_id(id.into_inner()).one(&self.db).await
    }

    /// Finds a tenant by slug.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<tenants::Model>, DbErr> {
        tenants::Entity::find()
            .filter(tenants::Column::Slug.eq(slug))
            .one(&self.db)
            .await
    }

    /// Checks if a slug is already taken.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn slug_exists(&self, slug: &str) -> Result<bool, DbErr> {
        let count = tenants::Entity::find()
            .filter(tenants::Column::Slug.eq(slug))
            .count(&self.db)
            .await?;

        Ok(count > 0)
    }
}
