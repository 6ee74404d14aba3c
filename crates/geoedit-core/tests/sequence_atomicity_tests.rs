/// Sequence atomicity properties
///
/// Whichever sub-command fails, and whether it soft-fails or errors, a
/// sequence undoes everything applied before it in reverse order and leaves
/// the store as it found it.
mod common;

use common::{add_group, add_line, new_session};
use geoedit_core::commands::{
    AddCommand, AddMemberCommand, ChangeMemberRoleCommand, ChangeTagsCommand, MoveCommand,
};
use geoedit_core::{
    Command, EditError, EditSession, Entity, EntityId, EntityKind, LatLon, Member,
    SequenceCommand,
};
use proptest::prelude::*;

/// A sub-command that applies against the fixture
#[derive(Debug, Clone, Copy)]
enum Step {
    Move(usize),
    Tag(usize),
    Role(usize),
    AddPoint,
}

#[derive(Debug, Clone, Copy)]
enum Failure {
    Soft,
    Error,
}

fn step() -> impl Strategy<Value = Step> {
    // Narrow index ranges so several steps hit the same entity.
    prop_oneof![
        (0usize..3).prop_map(Step::Move),
        (0usize..3).prop_map(Step::Tag),
        (0usize..2).prop_map(Step::Role),
        Just(Step::AddPoint),
    ]
}

fn failure() -> impl Strategy<Value = Failure> {
    prop_oneof![Just(Failure::Soft), Just(Failure::Error)]
}

struct Fixture {
    session: EditSession,
    points: Vec<EntityId>,
    group: EntityId,
    dead_group: EntityId,
    taken: Entity,
}

impl Fixture {
    fn new() -> Self {
        let mut session = new_session();
        let (path, points) = add_line(&mut session, 3);
        let group = add_group(&mut session, &[("outer", path), ("stop", points[0])]);
        let dead_group = add_group(&mut session, &[]);
        Self {
            session,
            points,
            group,
            dead_group,
            taken: Entity::point(LatLon::new(5.0, 5.0)),
        }
    }

    fn command(&self, position: usize, step: Step) -> Box<dyn Command> {
        let store = self.session.store();
        match step {
            Step::Move(i) => {
                Box::new(MoveCommand::new(store, &[self.points[i]], 0.25, -0.25).unwrap())
            }
            Step::Tag(i) => Box::new(
                ChangeTagsCommand::single(
                    store,
                    &[self.points[i]],
                    "note",
                    Some(format!("v{position}")),
                )
                .unwrap(),
            ),
            Step::Role(i) => Box::new(
                ChangeMemberRoleCommand::new(store, self.group, i, format!("r{position}"))
                    .unwrap(),
            ),
            Step::AddPoint => Box::new(
                AddCommand::new(store, Entity::point(LatLon::new(position as f64, 1.0)))
                    .unwrap(),
            ),
        }
    }

    /// Built while it would still apply; [`Fixture::arm`] breaks it
    fn failing_command(&self, failure: Failure) -> Box<dyn Command> {
        let store = self.session.store();
        match failure {
            Failure::Soft => Box::new(
                AddMemberCommand::new(
                    store,
                    self.dead_group,
                    Member::new("", EntityKind::Point, self.points[0]),
                    None,
                )
                .unwrap(),
            ),
            Failure::Error => Box::new(AddCommand::new(store, self.taken.clone()).unwrap()),
        }
    }

    fn arm(&mut self) {
        self.session
            .store_mut()
            .update(self.dead_group, |g| g.deleted = true)
            .unwrap();
        self.session.store_mut().add(self.taken.clone()).unwrap();
    }
}

proptest! {
    #[test]
    fn test_failure_at_any_position_leaves_store_untouched(
        steps in prop::collection::vec(step(), 0..6),
        position in any::<prop::sample::Index>(),
        failure in failure(),
    ) {
        let mut fixture = Fixture::new();
        let k = position.index(steps.len() + 1);
        let mut commands: Vec<Box<dyn Command>> = steps
            .iter()
            .enumerate()
            .map(|(i, s)| fixture.command(i, *s))
            .collect();
        commands.insert(k, fixture.failing_command(failure));
        fixture.arm();
        let before = fixture.session.store().dump();

        let mut seq = SequenceCommand::new("Atomic", commands);
        let outcome = seq.execute(&mut fixture.session);

        match (failure, outcome) {
            (Failure::Soft, Ok(applied)) => prop_assert!(!applied),
            (Failure::Error, Err(EditError::SequenceFailed { index, source, rollback_error, .. })) => {
                prop_assert_eq!(index, k);
                prop_assert!(matches!(*source, EditError::EntityAlreadyExists { .. }), "expected EntityAlreadyExists source");
                prop_assert!(rollback_error.is_none());
            }
            (failure, outcome) => {
                prop_assert!(false, "{:?} failure gave {:?}", failure, outcome);
            }
        }
        prop_assert!(!seq.is_complete());
        prop_assert_eq!(fixture.session.store().dump(), before);
    }
}

#[test]
fn test_explicit_inverses_roll_back_in_reverse_order() {
    // GIVEN two role changes and two moves of the same targets, then a
    // sub-command that will not apply
    let mut fixture = Fixture::new();
    let commands = vec![
        fixture.command(0, Step::Role(0)),
        fixture.command(1, Step::Move(1)),
        fixture.command(2, Step::Role(0)),
        fixture.command(3, Step::Move(1)),
        fixture.failing_command(Failure::Soft),
    ];
    fixture.arm();
    let before = fixture.session.store().dump();

    // WHEN the sequence executes
    let mut seq = SequenceCommand::new("Retag and nudge", commands);
    let applied = seq.execute(&mut fixture.session).unwrap();

    // THEN the first role and the first coordinate are back
    assert!(!applied);
    let group = fixture.session.store().entity(fixture.group).unwrap();
    assert_eq!(group.members()[0].role, "outer");
    assert_eq!(fixture.session.store().dump(), before);
}

#[test]
fn test_failure_at_first_position_applies_nothing() {
    // GIVEN a sequence whose first sub-command errors
    let mut fixture = Fixture::new();
    let commands = vec![
        fixture.failing_command(Failure::Error),
        fixture.command(1, Step::Tag(0)),
    ];
    fixture.arm();
    let before = fixture.session.store().dump();

    // WHEN the sequence executes
    let mut seq = SequenceCommand::new("Add then tag", commands);
    let err = seq.execute(&mut fixture.session).unwrap_err();

    // THEN the failure is at index 0 and the later step never ran
    assert!(matches!(err, EditError::SequenceFailed { index: 0, .. }));
    assert_eq!(fixture.session.store().dump(), before);
}
