//! Database-level guarantees that hold even if application code misbehaves.

#![allow(clippy::uninlined_format_args)]

mod common;

use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

use tessera_core::lifecycle::{Actor, DocumentKind};
use tessera_core::share::{PermissionSet, ShareTtl, TokenRef};
use tessera_db::IssueShare;
use tessera_db::entities::{document_status_history, documents, share_tokens};
use tessera_shared::types::{DocumentId, ShareTokenId};

#[tokio::test]
async fn test_status_history_rejects_update_and_delete() {
    let Some(ctx) = common::setup().await else {
        return;
    };
    let tenant = ctx.tenant().await;
    let budget = ctx.document(tenant, DocumentKind::Budget).await;
    ctx.engine
        .transition(
            tenant,
            DocumentId::from_uuid(budget.id),
            "pending",
            Actor::System,
            None,
        )
        .await
        .unwrap();

    let update = document_status_history::Entity::update_many()
        .col_expr(
            document_status_history::Column::ToStatus,
            Expr::value("approved"),
        )
        .filter(document_status_history::Column::DocumentId.eq(budget.id))
        .exec(&ctx.db)
        .await;
    assert!(update.is_err(), "history rows must not be updated");

    let delete = document_status_history::Entity::delete_many()
        .filter(document_status_history::Column::DocumentId.eq(budget.id))
        .exec(&ctx.db)
        .await;
    assert!(delete.is_err(), "history rows must not be deleted on their own");

    let history = ctx
        .engine
        .history(tenant, DocumentId::from_uuid(budget.id))
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].to_status, "pending");
}

#[tokio::test]
async fn test_deleting_document_cascades_history_and_shares() {
    let Some(ctx) = common::setup().await else {
        return;
    };
    let tenant = ctx.tenant().await;
    let budget = ctx.document(tenant, DocumentKind::Budget).await;
    let id = DocumentId::from_uuid(budget.id);
    ctx.engine
        .transition(tenant, id, "pending", Actor::System, None)
        .await
        .unwrap();
    ctx.shares
        .issue(
            tenant,
            IssueShare {
                resource_type: DocumentKind::Budget,
                resource_id: id,
                recipient_email: None,
                recipient_name: None,
                message: None,
                permissions: PermissionSet::view_only(),
                ttl: ShareTtl::Default,
            },
        )
        .await
        .unwrap();

    assert!(ctx.documents.delete(tenant, id).await.unwrap());

    let history = document_status_history::Entity::find()
        .filter(document_status_history::Column::DocumentId.eq(budget.id))
        .count(&ctx.db)
        .await
        .unwrap();
    let shares = share_tokens::Entity::find()
        .filter(share_tokens::Column::ResourceId.eq(budget.id))
        .count(&ctx.db)
        .await
        .unwrap();
    assert_eq!((history, shares), (0, 0));
}

#[tokio::test]
async fn test_revoked_share_cannot_be_reactivated() {
    let Some(ctx) = common::setup().await else {
        return;
    };
    let tenant = ctx.tenant().await;
    let budget = ctx.document(tenant, DocumentKind::Budget).await;
    let issued = ctx
        .shares
        .issue(
            tenant,
            IssueShare {
                resource_type: DocumentKind::Budget,
                resource_id: DocumentId::from_uuid(budget.id),
                recipient_email: None,
                recipient_name: None,
                message: None,
                permissions: PermissionSet::view_only(),
                ttl: ShareTtl::Days(1),
            },
        )
        .await
        .unwrap();
    ctx.shares
        .revoke(
            tenant,
            &TokenRef::Id(ShareTokenId::from_uuid(issued.share.id)),
        )
        .await
        .unwrap();

    let reactivate = share_tokens::Entity::update_many()
        .col_expr(share_tokens::Column::IsActive, Expr::value(true))
        .col_expr(share_tokens::Column::RevokedAt, Expr::value(Option::<chrono::DateTime<chrono::Utc>>::None))
        .filter(share_tokens::Column::Id.eq(issued.share.id))
        .exec(&ctx.db)
        .await;
    assert!(reactivate.is_err());
}

#[tokio::test]
async fn test_document_code_is_immutable() {
    let Some(ctx) = common::setup().await else {
        return;
    };
    let tenant = ctx.tenant().await;
    let budget = ctx.document(tenant, DocumentKind::Budget).await;

    let rewrite = documents::Entity::update_many()
        .col_expr(documents::Column::Code, Expr::value("ORC-REWRITTEN"))
        .filter(documents::Column::Id.eq(budget.id))
        .exec(&ctx.db)
        .await;
    assert!(rewrite.is_err());
}
