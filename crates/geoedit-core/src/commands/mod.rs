//! Undoable editing commands
//!
//! Every mutation of an [`EditSession`] goes through a [`Command`]. A command
//! is executed once, may be undone once, and may then be executed again
//! (redo). Commands either snapshot the entities they touch through a
//! [`SavedState`] or keep an explicit inverse of their own.

pub mod add;
pub mod change;
pub mod conflict;
pub mod delete;
pub mod members;
pub mod move_points;
pub mod purge;
pub mod sequence;
pub mod tags;

use std::collections::HashSet;
use std::fmt;

use crate::errors::{EditError, Result};
use crate::model::{EntityId, Snapshot};
use crate::ops::{EditSession, Store};

pub use add::AddCommand;
pub use change::{ChangeCommand, ChangeNodesCommand, RemoveNodesCommand};
pub use conflict::{
    CoordinateConflictResolver, DeletedStateConflictResolver, GroupMembersConflictResolver,
    ListMergeEntry, ModifiedConflictResolver, PathPointsConflictResolver, TagConflictResolver,
    TagMergeItem, VersionConflictResolver,
};
pub use delete::DeleteCommand;
pub use members::{AddMemberCommand, ChangeMemberRoleCommand, RemoveMemberCommand};
pub use move_points::MoveCommand;
pub use purge::PurgeCommand;
pub use sequence::SequenceCommand;
pub use tags::ChangeTagsCommand;

/// Category tag shown next to a command in a history view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandCategory {
    Add,
    Change,
    Delete,
    Purge,
    Move,
    Tags,
    Members,
    Sequence,
    ConflictResolution,
}

impl CommandCategory {
    /// Icon identifier for presentation layers
    pub fn icon_name(self) -> &'static str {
        match self {
            CommandCategory::Add => "add",
            CommandCategory::Change => "change",
            CommandCategory::Delete => "delete",
            CommandCategory::Purge => "purge",
            CommandCategory::Move => "move",
            CommandCategory::Tags => "tags",
            CommandCategory::Members => "members",
            CommandCategory::Sequence => "sequence",
            CommandCategory::ConflictResolution => "conflict",
        }
    }
}

impl fmt::Display for CommandCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.icon_name())
    }
}

/// Snapshots taken by a command before it mutates the store
#[derive(Debug, Clone, Default)]
pub struct SavedState {
    snapshots: Vec<Snapshot>,
    captured: bool,
}

impl SavedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot each listed entity once, in first-seen order
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExecuted` if snapshots are already held, or
    /// `EntityNotFound` if an entity is missing (nothing is captured then).
    pub fn capture(&mut self, store: &Store, ids: &[EntityId], description: &str) -> Result<()> {
        if self.captured {
            return Err(EditError::AlreadyExecuted {
                description: description.to_string(),
            });
        }
        let mut seen = HashSet::new();
        let mut snapshots = Vec::with_capacity(ids.len());
        for id in ids {
            if seen.insert(*id) {
                snapshots.push(Snapshot::capture(store.entity(*id)?));
            }
        }
        self.snapshots = snapshots;
        self.captured = true;
        Ok(())
    }

    /// Load every snapshot back into the store inside one batch scope
    ///
    /// # Errors
    ///
    /// Returns `NotExecuted` if nothing was captured, or the store error
    /// raised by a snapshot that no longer fits.
    pub fn restore(&mut self, store: &mut Store, description: &str) -> Result<()> {
        if !self.captured {
            return Err(EditError::NotExecuted {
                description: description.to_string(),
            });
        }
        let snapshots = std::mem::take(&mut self.snapshots);
        self.captured = false;
        store.batch(|s| {
            snapshots
                .into_iter()
                .try_for_each(|snapshot| s.load(snapshot.into_state()))
        })
    }

    pub fn is_captured(&self) -> bool {
        self.captured
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }
}

/// An undoable unit of change
///
/// Implementors provide [`Command::apply`], the mutation itself. The default
/// [`Command::execute`] snapshots [`Command::affected_entities`] into
/// [`Command::saved_state`] first and restores them when `apply` reports a
/// soft failure (`Ok(false)`) or an error, so a failed execute leaves the
/// store unchanged. Commands that keep an explicit inverse return `None`
/// from `saved_state` and override [`Command::undo`].
pub trait Command: fmt::Debug {
    /// One-line human-readable description
    fn description(&self) -> String;

    fn category(&self) -> CommandCategory;

    /// Entities this command reads or writes
    fn affected_entities(&self) -> Vec<EntityId>;

    /// Perform the mutation
    ///
    /// # Errors
    ///
    /// Returns an error on a violated precondition. Returns `Ok(false)` for
    /// a recoverable failure, in which case nothing must remain applied.
    fn apply(&mut self, session: &mut EditSession) -> Result<bool>;

    /// Snapshot storage used by the default execute and undo
    fn saved_state(&mut self) -> Option<&mut SavedState> {
        None
    }

    /// Apply the command
    ///
    /// # Errors
    ///
    /// Returns the error raised by `apply`, or `AlreadyExecuted` when called
    /// twice without an undo in between. When the snapshot cannot be loaded
    /// back after a failed `apply`, returns `RestoreFailed` carrying the
    /// `apply` error as its source.
    fn execute(&mut self, session: &mut EditSession) -> Result<bool> {
        let description = self.description();
        let affected = self.affected_entities();
        if let Some(saved) = self.saved_state() {
            saved.capture(session.store(), &affected, &description)?;
        }

        let outcome = self.apply(session);
        if !matches!(outcome, Ok(true)) {
            if let Some(saved) = self.saved_state() {
                if let Err(restore_err) = saved.restore(session.store_mut(), &description) {
                    return Err(match outcome {
                        Err(source) => EditError::RestoreFailed {
                            description,
                            source: Box::new(source),
                            restore_error: restore_err.to_string(),
                        },
                        Ok(_) => restore_err,
                    });
                }
            }
            if matches!(outcome, Ok(false)) {
                tracing::warn!(command = %description, "command did not apply");
            }
        }
        outcome
    }

    /// Reverse a successful execute
    ///
    /// # Errors
    ///
    /// Returns `NotExecuted` if there is nothing to undo, or
    /// `UndoUnsupported` for a command with neither snapshots nor an inverse.
    fn undo(&mut self, session: &mut EditSession) -> Result<()> {
        let description = self.description();
        match self.saved_state() {
            Some(saved) => saved.restore(session.store_mut(), &description),
            None => Err(EditError::UndoUnsupported { description }),
        }
    }
}

/// First referenced entity that is missing or flagged deleted
pub(crate) fn dead_reference(
    store: &Store,
    ids: impl IntoIterator<Item = EntityId>,
) -> Option<EntityId> {
    ids.into_iter().find(|id| !store.is_live(*id))
}

/// Plural-aware object count used in descriptions
pub(crate) fn count_text(n: usize, singular: &str, plural: &str) -> String {
    if n == 1 {
        format!("1 {}", singular)
    } else {
        format!("{} {}", n, plural)
    }
}
