//! Lifecycle engine integration tests.

#![allow(clippy::uninlined_format_args)]

mod common;

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Barrier;
use tokio_util::sync::CancellationToken;

use tessera_core::lifecycle::{Actor, BulkOptions, DocumentKind, LifecycleError};
use tessera_db::{EngineError, StoreError};
use tessera_shared::types::{DocumentId, UserId};

fn id(model: &tessera_db::entities::documents::Model) -> DocumentId {
    DocumentId::from_uuid(model.id)
}

#[tokio::test]
async fn test_budget_must_pass_through_pending() {
    let Some(ctx) = common::setup().await else {
        return;
    };
    let tenant = ctx.tenant().await;
    let budget = ctx.document(tenant, DocumentKind::Budget).await;
    let actor = Actor::User(UserId::new());
    assert_eq!(budget.status, "draft");

    let err = ctx
        .engine
        .transition(tenant, id(&budget), "approved", actor, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Lifecycle(LifecycleError::InvalidTransition { .. })
    ));
    assert_eq!(err.status_code(), 409);
    assert!(ctx.engine.history(tenant, id(&budget)).await.unwrap().is_empty());

    let pending = ctx
        .engine
        .transition(tenant, id(&budget), "pending", actor, Some("ready for review"))
        .await
        .unwrap();
    assert_eq!(pending.status, "pending");

    let approved = ctx
        .engine
        .transition(tenant, id(&budget), "approved", actor, None)
        .await
        .unwrap();
    assert_eq!(approved.status, "approved");
    assert_eq!(approved.code, budget.code);

    let history = ctx.engine.history(tenant, id(&budget)).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(
        (history[0].from_status.as_str(), history[0].to_status.as_str()),
        ("draft", "pending")
    );
    assert_eq!(history[0].comment.as_deref(), Some("ready for review"));
    assert_eq!(history[0].actor_type, "user");
    assert_eq!(
        (history[1].from_status.as_str(), history[1].to_status.as_str()),
        ("pending", "approved")
    );
}

#[tokio::test]
async fn test_rejected_transitions_leave_document_untouched() {
    let Some(ctx) = common::setup().await else {
        return;
    };
    let tenant = ctx.tenant().await;
    let invoice = ctx.document(tenant, DocumentKind::Invoice).await;
    assert_eq!(invoice.status, "pending");

    for target in ["pending", "draft", "approved", "bogus"] {
        let err = ctx
            .engine
            .transition(tenant, id(&invoice), target, Actor::System, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Lifecycle(_)), "{}: {:?}", target, err);
    }

    let reloaded = ctx.documents.get(tenant, id(&invoice)).await.unwrap();
    assert_eq!(reloaded.status, "pending");
    assert_eq!(reloaded.updated_at, invoice.updated_at);
    assert!(ctx.engine.history(tenant, id(&invoice)).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_transition_in_other_tenant_is_not_found() {
    let Some(ctx) = common::setup().await else {
        return;
    };
    let owner = ctx.tenant().await;
    let other = ctx.tenant().await;
    let budget = ctx.document(owner, DocumentKind::Budget).await;

    let err = ctx
        .engine
        .transition(other, id(&budget), "pending", Actor::System, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Store(StoreError::NotFound { .. })));
    assert_eq!(
        ctx.documents.get(owner, id(&budget)).await.unwrap().status,
        "draft"
    );
}

#[tokio::test]
async fn test_concurrent_transitions_serialize() {
    let Some(ctx) = common::setup().await else {
        return;
    };
    let tenant = ctx.tenant().await;
    let budget = ctx.document(tenant, DocumentKind::Budget).await;
    ctx.engine
        .transition(tenant, id(&budget), "pending", Actor::System, None)
        .await
        .unwrap();

    let barrier = Arc::new(Barrier::new(2));
    let targets = ["approved", "rejected"];
    let handles = targets.iter().map(|target| {
        let engine = ctx.engine.clone();
        let barrier = Arc::clone(&barrier);
        let document_id = id(&budget);
        let target = (*target).to_string();
        tokio::spawn(async move {
            barrier.wait().await;
            engine
                .transition(tenant, document_id, &target, Actor::System, None)
                .await
        })
    });

    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|r| r.expect("task panicked"))
        .collect();
    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one of two racing transitions may win");

    let history = ctx.engine.history(tenant, id(&budget)).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].from_status, "pending");
}

#[tokio::test]
async fn test_bulk_transition_tallies_failures() {
    let Some(ctx) = common::setup().await else {
        return;
    };
    let tenant = ctx.tenant().await;
    let first = ctx.document(tenant, DocumentKind::Budget).await;
    let second = ctx.document(tenant, DocumentKind::Budget).await;
    let third = ctx.document(tenant, DocumentKind::Budget).await;
    ctx.engine
        .transition(tenant, id(&second), "pending", Actor::System, None)
        .await
        .unwrap();

    let ids = [id(&first), id(&second), DocumentId::new(), id(&third)];
    let outcome = ctx
        .engine
        .bulk_transition(
            tenant,
            &ids,
            "pending",
            Actor::System,
            None,
            BulkOptions::default(),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(outcome.total, 4);
    assert_eq!(outcome.updated, 2);
    assert_eq!(outcome.failed, 2);
    assert_eq!(outcome.unprocessed, 0);
    assert_eq!(outcome.updated_ids, vec![id(&first), id(&third)]);
    assert_eq!(outcome.failures[0].error, "INVALID_TRANSITION");
    assert_eq!(outcome.failures[1].error, "NOT_FOUND");
}

#[tokio::test]
async fn test_bulk_transition_stops_on_first_error() {
    let Some(ctx) = common::setup().await else {
        return;
    };
    let tenant = ctx.tenant().await;
    let first = ctx.document(tenant, DocumentKind::Budget).await;
    let second = ctx.document(tenant, DocumentKind::Budget).await;

    let ids = [id(&first), DocumentId::new(), id(&second)];
    let outcome = ctx
        .engine
        .bulk_transition(
            tenant,
            &ids,
            "pending",
            Actor::System,
            None,
            BulkOptions {
                stop_on_first_error: true,
            },
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(outcome.updated, 1);
    assert_eq!(outcome.failed, 1);
    assert_eq!(outcome.unprocessed, 1);
    assert!(!outcome.cancelled);
    assert_eq!(
        ctx.documents.get(tenant, id(&second)).await.unwrap().status,
        "draft"
    );
}

#[tokio::test]
async fn test_cancelled_bulk_transition_processes_nothing() {
    let Some(ctx) = common::setup().await else {
        return;
    };
    let tenant = ctx.tenant().await;
    let doc = ctx.document(tenant, DocumentKind::Service).await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = ctx
        .engine
        .bulk_transition(
            tenant,
            &[id(&doc)],
            "pending",
            Actor::System,
            None,
            BulkOptions::default(),
            &cancel,
        )
        .await;

    assert!(outcome.cancelled);
    assert_eq!(outcome.unprocessed, 1);
    assert_eq!(outcome.updated, 0);
}

#[tokio::test]
async fn test_duplicate_resets_status_and_code() {
    let Some(ctx) = common::setup().await else {
        return;
    };
    let tenant = ctx.tenant().await;
    let budget = ctx.document(tenant, DocumentKind::Budget).await;
    for target in ["pending", "rejected"] {
        ctx.engine
            .transition(tenant, id(&budget), target, Actor::System, None)
            .await
            .unwrap();
    }

    let user = UserId::new();
    let copy = ctx
        .engine
        .duplicate(tenant, id(&budget), Some(user))
        .await
        .unwrap();

    assert_ne!(copy.id, budget.id);
    assert_ne!(copy.code, budget.code);
    assert!(copy.code.starts_with("ORC-"));
    assert_eq!(copy.status, "draft");
    assert_eq!(copy.title, budget.title);
    assert_eq!(copy.total_amount, budget.total_amount);
    assert_eq!(copy.source_document_id, Some(budget.id));
    assert_eq!(copy.created_by, Some(user.into_inner()));
    assert!(ctx.engine.history(tenant, id(&copy)).await.unwrap().is_empty());
    assert_eq!(ctx.engine.history(tenant, id(&budget)).await.unwrap().len(), 2);
}
