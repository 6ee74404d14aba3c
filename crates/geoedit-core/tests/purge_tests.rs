/// Purge tests
///
/// Purging removes entities from the store instead of flagging them deleted.
mod common;

use common::{add_group, add_line, add_point, assert_store_valid, mark_downloaded, new_session};
use geoedit_core::commands::PurgeCommand;
use geoedit_core::config::PurgeOptions;
use geoedit_core::{Command, EditConfig, EditSession, UndoRedoHistory};

#[test]
fn test_purge_new_path_with_options_takes_points_and_group() {
    // GIVEN a new path in a new group, with purge options enabled
    let mut session = EditSession::with_config(EditConfig {
        purge: PurgeOptions {
            add_untagged_path_points: true,
            add_groups_with_only_incomplete_members: true,
        },
        ..EditConfig::default()
    });
    let (path, points) = add_line(&mut session, 3);
    let group = add_group(&mut session, &[("outer", path)]);
    let before = session.store().dump();

    // WHEN purging the path
    let (cmd, additionally) = PurgeCommand::build(&session, &[path]).unwrap();

    // THEN the group and the untagged points join the purge
    assert!(additionally.contains(&group));
    for p in &points {
        assert!(additionally.contains(p));
    }
    assert!(cmd.make_incomplete().is_empty());

    // AND executing removes all of them
    let mut history = UndoRedoHistory::default();
    assert!(history.submit(&mut session, Box::new(cmd)).unwrap());
    assert!(session.store().is_empty());

    // WHEN undoing
    history.undo_last(&mut session).unwrap();

    // THEN everything comes back unchanged
    assert_eq!(session.store().dump(), before);
}

#[test]
fn test_purge_downloaded_member_keeps_placeholder() {
    // GIVEN a downloaded point referenced by a surviving group
    let mut session = new_session();
    let a = add_point(&mut session, 0.0, 0.0);
    mark_downloaded(&mut session, a, 100);
    let group = add_group(&mut session, &[("label", a)]);
    mark_downloaded(&mut session, group, 200);
    let before = session.store().dump();

    // WHEN purging the point
    let (mut cmd, additionally) = PurgeCommand::build(&session, &[a]).unwrap();
    assert!(additionally.is_empty());
    assert!(cmd.make_incomplete().contains(&a));
    assert!(cmd.execute(&mut session).unwrap());

    // THEN the point stays as an incomplete placeholder with its identities
    let placeholder = session.store().entity(a).unwrap();
    assert!(placeholder.incomplete);
    assert_eq!(placeholder.external_id, 100);
    assert!(placeholder.coor().is_none());

    // AND the group still references it
    assert_eq!(session.store().entity(group).unwrap().members()[0].id, a);
    assert_store_valid(&session);

    // WHEN undoing
    cmd.undo(&mut session).unwrap();

    // THEN the point is whole again
    assert_eq!(session.store().dump(), before);
}

#[test]
fn test_purge_description_counts_objects() {
    // GIVEN a two-point path
    let mut session = new_session();
    let (path, _) = add_line(&mut session, 2);

    // WHEN building a purge of the path alone
    let (cmd, _) = PurgeCommand::build(&session, &[path]).unwrap();

    // THEN the description counts what it purges
    assert_eq!(cmd.description(), "Purge 1 object");
}
