//! `SeaORM` Entity for documents table.
//!
//! One table backs budgets, invoices, and services; `kind` selects the
//! status set that `status` is checked against.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "documents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub kind: String,
    pub code: String,
    pub status: String,
    pub title: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub total_amount: Decimal,
    pub customer_reference: Option<String>,
    pub source_document_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tenants::Entity",
        from = "Column::TenantId",
        to = "super::tenants::Column::Id"
    )]
    Tenants,
    #[sea_orm(has_many = "super::document_status_history::Entity")]
    DocumentStatusHistory,
    #[sea_orm(has_many = "super::share_tokens::Entity")]
    ShareTokens,
}

impl Related<super::tenants::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tenants.def()
    }
}

impl Related<super::document_status_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DocumentStatusHistory.def()
    }
}

impl Related<super::share_tokens::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ShareTokens.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
