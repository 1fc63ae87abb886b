//! Property-based tests for LifecycleService.
//!
//! - Every pair outside a kind's table is rejected
//! - Every pair inside a kind's table is accepted and recorded once
//! - Walks through the table never leave the kind's status set

use proptest::prelude::*;

use super::error::LifecycleError;
use super::service::LifecycleService;
use super::types::{Actor, DocumentKind, DocumentStatus};

fn kind_strategy() -> impl Strategy<Value = DocumentKind> {
    prop_oneof![
        Just(DocumentKind::Budget),
        Just(DocumentKind::Invoice),
        Just(DocumentKind::Service),
    ]
}

/// Strategy producing a kind and two of its statuses.
fn status_pair() -> impl Strategy<Value = (DocumentStatus, DocumentStatus)> {
    kind_strategy().prop_flat_map(|kind| {
        let statuses = kind.statuses();
        let n = statuses.len();
        (0..n, 0..n).prop_map(move |(a, b)| (statuses[a], statuses[b]))
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_plan_agrees_with_table((from, to) in status_pair()) {
        let result = LifecycleService::plan_transition(from, to, Actor::System, None);

        if from.allowed_targets().contains(&to) {
            let record = result.unwrap();
            prop_assert_eq!(record.from, from);
            prop_assert_eq!(record.to, to);
        } else {
            let is_invalid_transition = matches!(result, Err(LifecycleError::InvalidTransition { .. }));
            prop_assert!(is_invalid_transition);
        }
    }

    #[test]
    fn prop_no_self_transitions((from, _) in status_pair()) {
        prop_assert!(!LifecycleService::is_valid_transition(from, from));
    }

    #[test]
    fn prop_random_walk_stays_in_kind(kind in kind_strategy(), picks in prop::collection::vec(0usize..8, 0..30)) {
        let mut current = kind.initial_status();
        for pick in picks {
            let targets = current.allowed_targets();
            if targets.is_empty() {
                prop_assert!(current.is_final());
                break;
            }
            let next = targets[pick % targets.len()];
            prop_assert_eq!(next.kind(), kind);
            current = LifecycleService::plan_transition(current, next, Actor::System, None)
                .unwrap()
                .to;
        }
    }
}
