use crate::commands::conflict::{require_decided, undo_resolution, ConflictMemory};
use crate::commands::{dead_reference, Command, CommandCategory, SavedState};
use crate::conflict::{MergeDecision, Side};
use crate::errors::{EditError, Result};
use crate::model::{EntityData, EntityId, EntityKind, Member};
use crate::ops::EditSession;

/// One element of a merged list, taken from mine or theirs by index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListMergeEntry {
    pub decision: MergeDecision,
    pub index: usize,
}

impl ListMergeEntry {
    pub fn mine(index: usize) -> Self {
        Self {
            decision: MergeDecision::KeepMine,
            index,
        }
    }

    pub fn theirs(index: usize) -> Self {
        Self {
            decision: MergeDecision::KeepTheirs,
            index,
        }
    }
}

/// Build the merged list; every entry must be decided and in range
fn merge_list<T: Clone>(
    owner: EntityId,
    mine: &[T],
    theirs: &[T],
    entries: &[ListMergeEntry],
) -> Result<Vec<T>> {
    entries
        .iter()
        .map(|entry| {
            let (side, name) = match require_decided(owner, entry.decision)? {
                Side::Theirs => (theirs, "theirs"),
                Side::Mine => (mine, "mine"),
            };
            side.get(entry.index).cloned().ok_or_else(|| EditError::InvalidInput {
                reason: format!(
                    "merge index {} out of range for {} list of {} with {} elements",
                    entry.index,
                    name,
                    owner,
                    side.len()
                ),
            })
        })
        .collect()
}

/// Replace a conflicted Path's point list with a merged one
#[derive(Debug)]
pub struct PathPointsConflictResolver {
    memory: ConflictMemory,
    merged: Vec<EntityId>,
    state: SavedState,
}

impl PathPointsConflictResolver {
    /// # Errors
    ///
    /// Returns `ConflictNotFound`, `KindMismatch` when `mine` is not a Path,
    /// `UndecidedMergeDecision` or `InvalidInput` for a bad entry, and
    /// `InvalidPath` when the merged list has exactly one point.
    pub fn new(session: &EditSession, mine: EntityId, entries: &[ListMergeEntry]) -> Result<Self> {
        let memory = ConflictMemory::lookup(session, mine, Some(EntityKind::Path))?;
        let local = session.store().entity(mine)?;
        let merged = merge_list(mine, local.nodes(), memory.theirs().nodes(), entries)?;
        if merged.len() == 1 {
            return Err(EditError::InvalidPath { id: mine, len: 1 });
        }
        Ok(Self {
            memory,
            merged,
            state: SavedState::new(),
        })
    }

    pub fn merged(&self) -> &[EntityId] {
        &self.merged
    }
}

impl Command for PathPointsConflictResolver {
    fn description(&self) -> String {
        format!("Resolve point list conflict for path {}", self.memory.mine())
    }

    fn category(&self) -> CommandCategory {
        CommandCategory::ConflictResolution
    }

    fn affected_entities(&self) -> Vec<EntityId> {
        vec![self.memory.mine()]
    }

    fn apply(&mut self, session: &mut EditSession) -> Result<bool> {
        if !session.store().contains(self.memory.mine()) {
            return Ok(false);
        }
        if let Some(dead) = dead_reference(session.store(), self.merged.iter().copied()) {
            tracing::warn!(path = %self.memory.mine(), point = %dead, "merged point is gone");
            return Ok(false);
        }
        let nodes = self.merged.clone();
        session.store_mut().update(self.memory.mine(), |p| {
            p.data = EntityData::Path { nodes };
            p.modified = true;
        })?;
        self.memory.consume(session);
        Ok(true)
    }

    fn saved_state(&mut self) -> Option<&mut SavedState> {
        Some(&mut self.state)
    }

    fn undo(&mut self, session: &mut EditSession) -> Result<()> {
        let description = self.description();
        undo_resolution(session, &mut self.state, &mut self.memory, &description)
    }
}

/// Replace a conflicted Group's member list with a merged one
#[derive(Debug)]
pub struct GroupMembersConflictResolver {
    memory: ConflictMemory,
    merged: Vec<Member>,
    state: SavedState,
}

impl GroupMembersConflictResolver {
    /// # Errors
    ///
    /// Returns `ConflictNotFound`, `KindMismatch` when `mine` is not a
    /// Group, and `UndecidedMergeDecision` or `InvalidInput` for a bad entry.
    pub fn new(session: &EditSession, mine: EntityId, entries: &[ListMergeEntry]) -> Result<Self> {
        let memory = ConflictMemory::lookup(session, mine, Some(EntityKind::Group))?;
        let local = session.store().entity(mine)?;
        let merged = merge_list(mine, local.members(), memory.theirs().members(), entries)?;
        Ok(Self {
            memory,
            merged,
            state: SavedState::new(),
        })
    }

    pub fn merged(&self) -> &[Member] {
        &self.merged
    }
}

impl Command for GroupMembersConflictResolver {
    fn description(&self) -> String {
        format!("Resolve member list conflict for group {}", self.memory.mine())
    }

    fn category(&self) -> CommandCategory {
        CommandCategory::ConflictResolution
    }

    fn affected_entities(&self) -> Vec<EntityId> {
        vec![self.memory.mine()]
    }

    fn apply(&mut self, session: &mut EditSession) -> Result<bool> {
        if !session.store().contains(self.memory.mine()) {
            return Ok(false);
        }
        if dead_reference(session.store(), self.merged.iter().map(|m| m.id)).is_some() {
            return Ok(false);
        }
        let members = self.merged.clone();
        session.store_mut().update(self.memory.mine(), |g| {
            g.data = EntityData::Group { members };
            g.modified = true;
        })?;
        self.memory.consume(session);
        Ok(true)
    }

    fn saved_state(&mut self) -> Option<&mut SavedState> {
        Some(&mut self.state)
    }

    fn undo(&mut self, session: &mut EditSession) -> Result<()> {
        let description = self.description();
        undo_resolution(session, &mut self.state, &mut self.memory, &description)
    }
}
