use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{EditError, Result};
use crate::model::{Entity, EntityId};

/// Merge decision for one contested field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeDecision {
    KeepMine,
    KeepTheirs,
    Undecided,
}

/// Version a decided [`MergeDecision`] keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Mine,
    Theirs,
}

impl MergeDecision {
    /// Chosen side, `None` while undecided
    pub fn side(self) -> Option<Side> {
        match self {
            MergeDecision::KeepMine => Some(Side::Mine),
            MergeDecision::KeepTheirs => Some(Side::Theirs),
            MergeDecision::Undecided => None,
        }
    }

    pub fn is_decided(self) -> bool {
        self.side().is_some()
    }
}

/// Identity of one conflict, stable across resolve/undo cycles
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConflictId(String);

impl ConflictId {
    /// Generate a new ConflictId using UUIDv7
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConflictId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConflictId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A local entity paired with a diverging version obtained elsewhere
#[derive(Debug, Clone, PartialEq)]
pub struct Conflict {
    id: ConflictId,
    mine: EntityId,
    theirs: Entity,
}

impl Conflict {
    /// Pair the local entity `mine` with the remote version `theirs`
    ///
    /// # Errors
    ///
    /// Returns `KindMismatch` if `theirs` is not of the same kind as `mine`.
    pub fn new(mine: &Entity, theirs: Entity) -> Result<Self> {
        if mine.kind() != theirs.kind() {
            return Err(EditError::KindMismatch {
                id: theirs.id,
                expected: mine.kind(),
                actual: theirs.kind(),
            });
        }
        Ok(Self {
            id: ConflictId::new(),
            mine: mine.id,
            theirs,
        })
    }

    pub fn id(&self) -> &ConflictId {
        &self.id
    }

    /// Local entity
    pub fn mine(&self) -> EntityId {
        self.mine
    }

    /// Remote version
    pub fn theirs(&self) -> &Entity {
        &self.theirs
    }
}

/// Conflicts of one editing session, at most one per local entity
#[derive(Debug, Clone, Default)]
pub struct ConflictCollection {
    conflicts: Vec<Conflict>,
}

impl ConflictCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a conflict
    ///
    /// # Errors
    ///
    /// Returns `ConflictAlreadyExists` if the local entity already has one.
    pub fn add(&mut self, conflict: Conflict) -> Result<()> {
        if self.has_conflict_for(conflict.mine) {
            return Err(EditError::ConflictAlreadyExists { id: conflict.mine });
        }
        self.conflicts.push(conflict);
        Ok(())
    }

    /// Add a conflict unless the local entity already has one; never overwrites
    pub fn add_if_absent(&mut self, conflict: Conflict) -> bool {
        if self.has_conflict_for(conflict.mine) {
            return false;
        }
        self.conflicts.push(conflict);
        true
    }

    pub fn remove(&mut self, id: &ConflictId) -> Option<Conflict> {
        let pos = self.conflicts.iter().position(|c| &c.id == id)?;
        Some(self.conflicts.remove(pos))
    }

    pub fn remove_for_mine(&mut self, mine: EntityId) -> Option<Conflict> {
        let pos = self.conflicts.iter().position(|c| c.mine == mine)?;
        Some(self.conflicts.remove(pos))
    }

    pub fn get_for_mine(&self, mine: EntityId) -> Option<&Conflict> {
        self.conflicts.iter().find(|c| c.mine == mine)
    }

    pub fn has_conflict_for(&self, mine: EntityId) -> bool {
        self.conflicts.iter().any(|c| c.mine == mine)
    }

    pub fn contains(&self, id: &ConflictId) -> bool {
        self.conflicts.iter().any(|c| &c.id == id)
    }

    pub fn len(&self) -> usize {
        self.conflicts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Conflict> {
        self.conflicts.iter()
    }
}
