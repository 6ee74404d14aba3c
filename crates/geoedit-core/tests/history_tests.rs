/// Undo/redo history tests
mod common;

use common::{add_line, add_point, assert_store_valid, new_session};
use geoedit_core::commands::{ChangeTagsCommand, MoveCommand};
use geoedit_core::config::HistoryConfig;
use geoedit_core::policy::AlwaysConfirm;
use geoedit_core::{plan_deletion, Command, DeletionPolicy, EditSession, EntityId, UndoRedoHistory};

/// Three unrelated edits on a fresh line: tag, move, delete
fn edits(session: &EditSession, path: EntityId, points: &[EntityId]) -> Vec<Box<dyn Command>> {
    let tag =
        ChangeTagsCommand::single(session.store(), &[path], "highway", Some("track".into())).unwrap();
    let mv = MoveCommand::new(session.store(), &[path], 0.01, 0.0).unwrap();
    let delete = plan_deletion(session, &[points[1]], DeletionPolicy::default(), &AlwaysConfirm)
        .unwrap()
        .unwrap();
    vec![Box::new(tag), Box::new(mv), delete]
}

#[test]
fn test_undo_walks_back_through_every_state() {
    // GIVEN a line of four points and a history
    let mut session = new_session();
    let (path, points) = add_line(&mut session, 4);
    let mut history = UndoRedoHistory::default();
    let mut states = vec![session.store().dump()];

    // WHEN submitting three edits
    for cmd in edits(&session, path, &points) {
        assert!(history.submit(&mut session, cmd).unwrap());
        states.push(session.store().dump());
    }
    assert_eq!(history.undo_depth(), 3);

    // THEN each undo lands exactly on the previous state
    for expected in states.iter().rev().skip(1) {
        assert!(history.undo_last(&mut session).unwrap());
        assert_eq!(&session.store().dump(), expected);
        assert_store_valid(&session);
    }
    assert!(!history.can_undo());
    assert!(!history.undo_last(&mut session).unwrap());

    // AND each redo lands exactly on the next state
    for expected in states.iter().skip(1) {
        assert!(history.redo_last(&mut session).unwrap());
        assert_eq!(&session.store().dump(), expected);
    }
    assert!(!history.can_redo());
}

#[test]
fn test_repeated_undo_redo_is_idempotent() {
    // GIVEN an executed move
    let mut session = new_session();
    let (path, _) = add_line(&mut session, 3);
    let mut history = UndoRedoHistory::default();
    let before = session.store().dump();
    let mv = MoveCommand::new(session.store(), &[path], 1.0, 1.0).unwrap();
    history.submit(&mut session, Box::new(mv)).unwrap();
    let after = session.store().dump();

    // WHEN cycling undo and redo several times
    for _ in 0..5 {
        history.undo_last(&mut session).unwrap();
        assert_eq!(session.store().dump(), before);
        history.redo_last(&mut session).unwrap();
        // THEN every redo yields the same store
        assert_eq!(session.store().dump(), after);
    }
}

#[test]
fn test_new_command_clears_redo() {
    // GIVEN an undone tag edit
    let mut session = new_session();
    let a = add_point(&mut session, 0.0, 0.0);
    let mut history = UndoRedoHistory::default();
    let tag = ChangeTagsCommand::single(session.store(), &[a], "k", Some("1".into())).unwrap();
    history.submit(&mut session, Box::new(tag)).unwrap();
    history.undo_last(&mut session).unwrap();
    assert!(history.can_redo());

    // WHEN submitting a different edit
    let tag = ChangeTagsCommand::single(session.store(), &[a], "k", Some("2".into())).unwrap();
    history.submit(&mut session, Box::new(tag)).unwrap();

    // THEN the redo stack is gone
    assert!(!history.can_redo());
    assert!(!history.redo_last(&mut session).unwrap());
    let tags = &session.store().entity(a).unwrap().tags;
    assert_eq!(tags.get("k").map(String::as_str), Some("2"));
}

#[test]
fn test_depth_bound_drops_oldest() {
    // GIVEN a history bounded to two entries
    let mut session = new_session();
    let a = add_point(&mut session, 0.0, 0.0);
    let mut history = UndoRedoHistory::new(&HistoryConfig { max_undo_depth: 2 });

    // WHEN submitting three edits
    let mut descriptions = Vec::new();
    for value in ["1", "2", "3"] {
        let tag = ChangeTagsCommand::single(session.store(), &[a], "k", Some(value.into())).unwrap();
        descriptions.push(tag.description());
        history.submit(&mut session, Box::new(tag)).unwrap();
    }

    // THEN only the two newest remain, newest first
    assert_eq!(history.undo_depth(), 2);
    assert_eq!(
        history.undo_descriptions(),
        vec![descriptions[2].clone(), descriptions[1].clone()]
    );

    // AND undoing both leaves the oldest edit in place
    history.undo_last(&mut session).unwrap();
    history.undo_last(&mut session).unwrap();
    assert!(!history.can_undo());
    let tags = &session.store().entity(a).unwrap().tags;
    assert_eq!(tags.get("k").map(String::as_str), Some("1"));
}

#[test]
fn test_redo_that_no_longer_applies_drops_redo_stack() {
    // GIVEN an undone move of a point
    let mut session = new_session();
    let a = add_point(&mut session, 0.0, 0.0);
    let mut history = UndoRedoHistory::default();
    let mv = MoveCommand::new(session.store(), &[a], 1.0, 0.0).unwrap();
    history.submit(&mut session, Box::new(mv)).unwrap();
    history.undo_last(&mut session).unwrap();

    // WHEN the point is deleted behind the history's back
    session.store_mut().update(a, |p| p.deleted = true).unwrap();

    // THEN redo reports nothing applied and forgets the entry
    assert!(!history.redo_last(&mut session).unwrap());
    assert!(!history.can_redo());
    assert!(!history.can_undo());
}
