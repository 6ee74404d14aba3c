/// Deletion closure properties over random graphs
///
/// Whatever the selection, an executed deletion plan leaves no short path
/// and no live reference to a deleted entity, and undo restores the store.
mod common;

use common::graph::{build, graph_recipe, pick};
use common::new_session;
use geoedit_core::policy::AlwaysConfirm;
use geoedit_core::rules::invariants::{find_dangling_references, find_short_paths};
use geoedit_core::rules::validate_store;
use geoedit_core::{plan_deletion, DeletionPolicy};
use proptest::prelude::*;

proptest! {
    #[test]
    fn test_executed_plan_leaves_closed_store(
        recipe in graph_recipe(),
        raw_selection in prop::collection::vec(0usize..64, 1..4),
        delete_orphaned_points in any::<bool>(),
    ) {
        let mut session = new_session();
        let graph = build(&mut session, &recipe);
        let selection = pick(&graph, &raw_selection);
        let before = session.store().dump();
        let policy = DeletionPolicy {
            delete_orphaned_points,
            ..DeletionPolicy::default()
        };

        let plan = plan_deletion(&session, &selection, policy, &AlwaysConfirm).unwrap();
        let mut cmd = plan.expect("live selection always yields a plan");
        prop_assert!(cmd.execute(&mut session).unwrap());

        for id in &selection {
            prop_assert!(session.store().entity(*id).unwrap().deleted);
        }
        prop_assert!(find_short_paths(session.store()).is_empty());
        prop_assert!(find_dangling_references(session.store()).is_empty());
        prop_assert!(validate_store(session.store()).is_ok());

        cmd.undo(&mut session).unwrap();
        prop_assert_eq!(session.store().dump(), before);
    }

    #[test]
    fn test_deleting_with_references_removes_every_referrer(
        recipe in graph_recipe(),
        raw_selection in prop::collection::vec(0usize..64, 1..3),
    ) {
        let mut session = new_session();
        let graph = build(&mut session, &recipe);
        let selection = pick(&graph, &raw_selection);

        let plan = geoedit_core::planner::plan_deletion_with_references(
            &session,
            &selection,
            &AlwaysConfirm,
        )
        .unwrap();
        let mut cmd = plan.expect("live selection always yields a plan");
        prop_assert!(cmd.execute(&mut session).unwrap());

        prop_assert!(find_dangling_references(session.store()).is_empty());
        for id in &selection {
            prop_assert!(session.store().live_referrers(*id).is_empty());
        }
    }
}
