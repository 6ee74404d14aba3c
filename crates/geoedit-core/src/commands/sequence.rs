use std::collections::BTreeSet;

use crate::commands::{Command, CommandCategory};
use crate::errors::{EditError, Result};
use crate::model::EntityId;
use crate::ops::EditSession;

/// Ordered list of commands executed as one atomic unit
///
/// Sub-commands run strictly in order and are undone strictly in reverse.
/// A sub-command that does not apply makes the sequence undo everything
/// applied so far, unless `continue_on_error` is set; a sub-command error is
/// rolled back the same way and reported as `SequenceFailed`. When the
/// rollback after a soft failure itself errors, that error is reported as
/// `SequenceFailed` at the index that did not apply, with `rollback_error`
/// set.
#[derive(Debug)]
pub struct SequenceCommand {
    name: String,
    commands: Vec<Box<dyn Command>>,
    continue_on_error: bool,
    applied: Vec<usize>,
    sequence_complete: bool,
}

impl SequenceCommand {
    pub fn new(name: impl Into<String>, commands: Vec<Box<dyn Command>>) -> Self {
        Self {
            name: name.into(),
            commands,
            continue_on_error: false,
            applied: Vec::new(),
            sequence_complete: false,
        }
    }

    /// Keep going past sub-commands that do not apply
    pub fn continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    /// The single command itself, or a sequence of all of them
    pub fn wrap(name: impl Into<String>, mut commands: Vec<Box<dyn Command>>) -> Box<dyn Command> {
        if commands.len() == 1 {
            if let Some(single) = commands.pop() {
                return single;
            }
        }
        Box::new(Self::new(name, commands))
    }

    pub fn commands(&self) -> &[Box<dyn Command>] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.sequence_complete
    }

    fn descriptions(&self) -> Vec<String> {
        self.commands.iter().map(|c| c.description()).collect()
    }

    fn failed(&self, index: usize, source: EditError, rollback_error: Option<String>) -> EditError {
        EditError::SequenceFailed {
            description: self.description(),
            index,
            commands: self.descriptions(),
            source: Box::new(source),
            rollback_error,
        }
    }

    /// Undo applied sub-commands in reverse order
    fn rollback(&mut self, session: &mut EditSession) -> Result<()> {
        while let Some(index) = self.applied.pop() {
            self.commands[index].undo(session)?;
        }
        Ok(())
    }
}

impl Command for SequenceCommand {
    fn description(&self) -> String {
        self.name.clone()
    }

    fn category(&self) -> CommandCategory {
        CommandCategory::Sequence
    }

    fn affected_entities(&self) -> Vec<EntityId> {
        let all: BTreeSet<EntityId> = self
            .commands
            .iter()
            .flat_map(|c| c.affected_entities())
            .collect();
        all.into_iter().collect()
    }

    fn apply(&mut self, session: &mut EditSession) -> Result<bool> {
        if self.sequence_complete {
            return Err(EditError::AlreadyExecuted {
                description: self.description(),
            });
        }
        self.applied.clear();

        for index in 0..self.commands.len() {
            match self.commands[index].execute(session) {
                Ok(true) => self.applied.push(index),
                Ok(false) if self.continue_on_error => {
                    tracing::warn!(
                        sequence = %self.name,
                        index,
                        command = %self.commands[index].description(),
                        "sub-command did not apply; continuing"
                    );
                }
                Ok(false) => {
                    tracing::warn!(
                        sequence = %self.name,
                        index,
                        command = %self.commands[index].description(),
                        rolled_back = self.applied.len(),
                        "sub-command did not apply; rolling back"
                    );
                    if let Err(rollback) = self.rollback(session) {
                        let message = rollback.to_string();
                        return Err(self.failed(index, rollback, Some(message)));
                    }
                    return Ok(false);
                }
                Err(source) => {
                    tracing::warn!(
                        sequence = %self.name,
                        index,
                        error = %source,
                        "sub-command failed; rolling back"
                    );
                    let rollback_error = self.rollback(session).err().map(|e| e.to_string());
                    return Err(self.failed(index, source, rollback_error));
                }
            }
        }

        self.sequence_complete = true;
        Ok(true)
    }

    fn undo(&mut self, session: &mut EditSession) -> Result<()> {
        if !self.sequence_complete {
            return Err(EditError::SequenceIncomplete {
                description: self.description(),
            });
        }
        self.rollback(session)?;
        self.sequence_complete = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{AddCommand, AddMemberCommand, ChangeTagsCommand};
    use crate::model::{Entity, EntityKind, LatLon, Member};

    /// Applies or not as told; its undo always errors
    #[derive(Debug)]
    struct Stuck {
        applies: bool,
    }

    impl Command for Stuck {
        fn description(&self) -> String {
            format!("Stuck({})", self.applies)
        }

        fn category(&self) -> CommandCategory {
            CommandCategory::Change
        }

        fn affected_entities(&self) -> Vec<EntityId> {
            Vec::new()
        }

        fn apply(&mut self, _session: &mut EditSession) -> Result<bool> {
            Ok(self.applies)
        }

        fn undo(&mut self, _session: &mut EditSession) -> Result<()> {
            Err(EditError::Internal {
                message: "cannot undo".to_string(),
            })
        }
    }

    #[test]
    fn test_rollback_when_a_sub_command_does_not_apply() {
        let mut session = EditSession::new();
        let group = Entity::group(vec![]);
        let group_id = group.id;
        session.store_mut().add(group).unwrap();

        let point = Entity::point(LatLon::new(0.0, 0.0));
        let point_id = point.id;
        let add = AddCommand::new(session.store(), point).unwrap();
        let link = AddMemberCommand::new(
            session.store(),
            group_id,
            Member::new("", EntityKind::Point, point_id),
            None,
        )
        .unwrap();
        session
            .store_mut()
            .update(group_id, |g| g.deleted = true)
            .unwrap();
        let before = session.store().dump();

        let mut seq = SequenceCommand::new("Add and link", vec![Box::new(add), Box::new(link)]);

        assert!(!seq.execute(&mut session).unwrap());
        assert_eq!(session.store().dump(), before);
        assert!(matches!(
            seq.undo(&mut session),
            Err(EditError::SequenceIncomplete { .. })
        ));
    }

    #[test]
    fn test_continue_on_error_skips_failures() {
        let mut session = EditSession::new();
        let group = Entity::group(vec![]);
        let group_id = group.id;
        session.store_mut().add(group).unwrap();
        let point = Entity::point(LatLon::new(0.0, 0.0));
        let point_id = point.id;
        let before = session.store().dump();

        let link_missing = AddMemberCommand::new(
            session.store(),
            group_id,
            Member::new("", EntityKind::Point, point_id),
            None,
        )
        .unwrap();
        let add = AddCommand::new(session.store(), point).unwrap();
        let mut seq = SequenceCommand::new(
            "Best effort",
            vec![Box::new(link_missing), Box::new(add)],
        )
        .continue_on_error(true);

        assert!(seq.execute(&mut session).unwrap());
        assert!(session.store().contains(point_id));
        assert!(session.store().entity(group_id).unwrap().members().is_empty());

        seq.undo(&mut session).unwrap();
        assert_eq!(session.store().dump(), before);
    }

    #[test]
    fn test_error_is_tagged_with_index_and_command_list() {
        let mut session = EditSession::new();
        let point = Entity::point(LatLon::new(0.0, 0.0));
        let point_id = point.id;
        let add = AddCommand::new(session.store(), point.clone()).unwrap();
        let add_again = AddCommand::new(session.store(), point).unwrap();

        let mut seq = SequenceCommand::new("Twice", vec![Box::new(add), Box::new(add_again)]);
        let err = seq.execute(&mut session).unwrap_err();

        match err {
            EditError::SequenceFailed {
                description,
                index,
                commands,
                source,
                rollback_error,
            } => {
                assert_eq!(description, "Twice");
                assert_eq!(index, 1);
                assert_eq!(commands.len(), 2);
                assert!(matches!(*source, EditError::EntityAlreadyExists { .. }));
                assert!(rollback_error.is_none());
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(!session.store().contains(point_id));
    }

    #[test]
    fn test_failed_rollback_after_soft_failure_is_tagged() {
        let mut session = EditSession::new();
        let mut seq = SequenceCommand::new(
            "Stuck pair",
            vec![
                Box::new(Stuck { applies: true }),
                Box::new(Stuck { applies: false }),
            ],
        );

        let err = seq.execute(&mut session).unwrap_err();

        match err {
            EditError::SequenceFailed {
                description,
                index,
                commands,
                source,
                rollback_error,
            } => {
                assert_eq!(description, "Stuck pair");
                assert_eq!(index, 1);
                assert_eq!(commands, vec!["Stuck(true)", "Stuck(false)"]);
                assert!(matches!(*source, EditError::Internal { .. }));
                assert!(rollback_error.is_some_and(|m| m.contains("cannot undo")));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(!seq.is_complete());
    }

    #[test]
    fn test_wrap_single_command() {
        let mut session = EditSession::new();
        let point = Entity::point(LatLon::new(0.0, 0.0));
        let id = point.id;
        session.store_mut().add(point).unwrap();
        let tags = ChangeTagsCommand::single(session.store(), &[id], "k", Some("v".into())).unwrap();

        let wrapped = SequenceCommand::wrap("Tags", vec![Box::new(tags)]);

        assert_eq!(wrapped.category(), CommandCategory::Tags);
    }

    #[test]
    fn test_undo_redo_cycle() {
        let mut session = EditSession::new();
        let point = Entity::point(LatLon::new(0.0, 0.0));
        let id = point.id;
        session.store_mut().add(point).unwrap();
        let before = session.store().dump();
        let tags = ChangeTagsCommand::single(session.store(), &[id], "k", Some("v".into())).unwrap();
        let mut seq = SequenceCommand::new("Tag", vec![Box::new(tags)]);

        assert!(seq.execute(&mut session).unwrap());
        let after = session.store().dump();
        for _ in 0..3 {
            seq.undo(&mut session).unwrap();
            assert_eq!(session.store().dump(), before);
            assert!(seq.execute(&mut session).unwrap());
            assert_eq!(session.store().dump(), after);
        }
    }
}
