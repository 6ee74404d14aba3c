use crate::commands::conflict::{require_decided, undo_resolution, ConflictMemory};
use crate::commands::{dead_reference, Command, CommandCategory, SavedState};
use crate::conflict::{MergeDecision, Side};
use crate::errors::Result;
use crate::model::{EntityData, EntityId, EntityKind};
use crate::ops::EditSession;

/// Resolve a coordinate conflict of a Point
#[derive(Debug)]
pub struct CoordinateConflictResolver {
    memory: ConflictMemory,
    side: Side,
    state: SavedState,
}

impl CoordinateConflictResolver {
    /// # Errors
    ///
    /// Returns `UndecidedMergeDecision`, `ConflictNotFound` when `mine` has
    /// no conflict, and `KindMismatch` when it is not a Point.
    pub fn new(session: &EditSession, mine: EntityId, decision: MergeDecision) -> Result<Self> {
        let side = require_decided(mine, decision)?;
        Ok(Self {
            memory: ConflictMemory::lookup(session, mine, Some(EntityKind::Point))?,
            side,
            state: SavedState::new(),
        })
    }
}

impl Command for CoordinateConflictResolver {
    fn description(&self) -> String {
        format!("Resolve coordinate conflict for point {}", self.memory.mine())
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
        if self.side == Side::Theirs {
            let coor = self.memory.theirs().coor();
            session.store_mut().update(self.memory.mine(), |p| {
                p.data = EntityData::Point { coor };
                p.modified = true;
            })?;
        }
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

/// Resolve a conflict between a deleted and a live version of an entity
///
/// Taking their deletion soft-fails while live entities still refer to the
/// local one; taking their undeletion soft-fails while the local entity
/// refers to deleted entities.
#[derive(Debug)]
pub struct DeletedStateConflictResolver {
    memory: ConflictMemory,
    side: Side,
    state: SavedState,
}

impl DeletedStateConflictResolver {
    /// # Errors
    ///
    /// Returns `UndecidedMergeDecision` or `ConflictNotFound`.
    pub fn new(session: &EditSession, mine: EntityId, decision: MergeDecision) -> Result<Self> {
        let side = require_decided(mine, decision)?;
        Ok(Self {
            memory: ConflictMemory::lookup(session, mine, None)?,
            side,
            state: SavedState::new(),
        })
    }
}

impl Command for DeletedStateConflictResolver {
    fn description(&self) -> String {
        format!("Resolve deleted-state conflict for {}", self.memory.mine())
    }

    fn category(&self) -> CommandCategory {
        CommandCategory::ConflictResolution
    }

    fn affected_entities(&self) -> Vec<EntityId> {
        vec![self.memory.mine()]
    }

    fn apply(&mut self, session: &mut EditSession) -> Result<bool> {
        let mine = self.memory.mine();
        let Some(local) = session.store().get(mine) else {
            return Ok(false);
        };
        if self.side == Side::Theirs {
            let deleted = self.memory.theirs().deleted;
            if deleted && !session.store().live_referrers(mine).is_empty() {
                tracing::warn!(entity = %mine, "cannot take deletion of a referenced entity");
                return Ok(false);
            }
            if !deleted && dead_reference(session.store(), local.referenced_ids()).is_some() {
                tracing::warn!(entity = %mine, "cannot undelete an entity with dead references");
                return Ok(false);
            }
            if local.deleted != deleted {
                session.store_mut().update(mine, |e| {
                    e.deleted = deleted;
                    e.modified = true;
                })?;
                if deleted {
                    session.deselect(&[mine]);
                }
            }
        }
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

/// Resolve the version number of a conflicted entity
///
/// Keeping mine raises the local version to the larger of both versions so
/// that the local edit supersedes theirs; taking theirs adopts their version.
#[derive(Debug)]
pub struct VersionConflictResolver {
    memory: ConflictMemory,
    side: Side,
    state: SavedState,
}

impl VersionConflictResolver {
    /// # Errors
    ///
    /// Returns `UndecidedMergeDecision` or `ConflictNotFound`.
    pub fn new(session: &EditSession, mine: EntityId, decision: MergeDecision) -> Result<Self> {
        let side = require_decided(mine, decision)?;
        Ok(Self {
            memory: ConflictMemory::lookup(session, mine, None)?,
            side,
            state: SavedState::new(),
        })
    }
}

impl Command for VersionConflictResolver {
    fn description(&self) -> String {
        format!("Resolve version conflict for {}", self.memory.mine())
    }

    fn category(&self) -> CommandCategory {
        CommandCategory::ConflictResolution
    }

    fn affected_entities(&self) -> Vec<EntityId> {
        vec![self.memory.mine()]
    }

    fn apply(&mut self, session: &mut EditSession) -> Result<bool> {
        let Some(local) = session.store().get(self.memory.mine()) else {
            return Ok(false);
        };
        let theirs = self.memory.theirs().version;
        let version = match self.side {
            Side::Theirs => theirs,
            Side::Mine => local.version.max(theirs),
        };
        session
            .store_mut()
            .update(self.memory.mine(), |e| e.version = version)?;
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

/// Resolve the modified flag of a conflicted entity
#[derive(Debug)]
pub struct ModifiedConflictResolver {
    memory: ConflictMemory,
    side: Side,
    state: SavedState,
}

impl ModifiedConflictResolver {
    /// # Errors
    ///
    /// Returns `UndecidedMergeDecision` or `ConflictNotFound`.
    pub fn new(session: &EditSession, mine: EntityId, decision: MergeDecision) -> Result<Self> {
        let side = require_decided(mine, decision)?;
        Ok(Self {
            memory: ConflictMemory::lookup(session, mine, None)?,
            side,
            state: SavedState::new(),
        })
    }
}

impl Command for ModifiedConflictResolver {
    fn description(&self) -> String {
        format!("Resolve modified flag for {}", self.memory.mine())
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
        if self.side == Side::Theirs {
            let modified = self.memory.theirs().modified;
            session
                .store_mut()
                .update(self.memory.mine(), |e| e.modified = modified)?;
        }
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::conflict::fixtures::conflicted_point;
    use crate::errors::EditError;
    use crate::model::{Entity, LatLon};

    #[test]
    fn test_coordinate_keep_theirs_round_trip() {
        let (mut session, mine) = conflicted_point();
        let before = session.store().dump();
        let conflict_id = session.conflicts().get_for_mine(mine).unwrap().id().clone();

        let mut cmd =
            CoordinateConflictResolver::new(&session, mine, MergeDecision::KeepTheirs).unwrap();
        assert!(cmd.execute(&mut session).unwrap());

        let point = session.store().entity(mine).unwrap();
        assert_eq!(point.coor(), Some(LatLon::new(2.0, 2.0)));
        assert!(point.modified);
        assert!(session.conflicts().is_empty());

        cmd.undo(&mut session).unwrap();
        assert_eq!(session.store().dump(), before);
        assert!(session.conflicts().contains(&conflict_id));
    }

    #[test]
    fn test_keep_mine_leaves_fields() {
        let (mut session, mine) = conflicted_point();
        let before = session.store().dump();

        let mut cmd =
            CoordinateConflictResolver::new(&session, mine, MergeDecision::KeepMine).unwrap();
        assert!(cmd.execute(&mut session).unwrap());

        assert_eq!(session.store().dump(), before);
        assert!(session.conflicts().is_empty());
    }

    #[test]
    fn test_undecided_is_rejected() {
        let (session, mine) = conflicted_point();
        assert!(matches!(
            CoordinateConflictResolver::new(&session, mine, MergeDecision::Undecided),
            Err(EditError::UndecidedMergeDecision { .. })
        ));
        assert!(matches!(
            VersionConflictResolver::new(&session, EntityId::generate(), MergeDecision::KeepMine),
            Err(EditError::ConflictNotFound { .. })
        ));
    }

    #[test]
    fn test_undo_never_overwrites_newer_conflict() {
        let (mut session, mine) = conflicted_point();
        let mut cmd =
            ModifiedConflictResolver::new(&session, mine, MergeDecision::KeepMine).unwrap();
        assert!(cmd.execute(&mut session).unwrap());

        let local = session.store().entity(mine).unwrap().clone();
        let mut newer = local.clone();
        newer.id = EntityId::generate();
        let newer = crate::conflict::Conflict::new(&local, newer).unwrap();
        let newer_id = newer.id().clone();
        session.conflicts_mut().add(newer).unwrap();

        cmd.undo(&mut session).unwrap();
        assert_eq!(session.conflicts().len(), 1);
        assert!(session.conflicts().contains(&newer_id));
    }

    #[test]
    fn test_deleted_state_refuses_referenced_entity() {
        let (mut session, mine) = conflicted_point();
        let other = Entity::point(LatLon::new(0.0, 0.0));
        let other_id = other.id;
        session.store_mut().add(other).unwrap();
        session
            .store_mut()
            .add(Entity::path(vec![mine, other_id]))
            .unwrap();
        let before = session.store().dump();

        let mut cmd =
            DeletedStateConflictResolver::new(&session, mine, MergeDecision::KeepTheirs).unwrap();

        assert!(!cmd.execute(&mut session).unwrap());
        assert_eq!(session.store().dump(), before);
        assert_eq!(session.conflicts().len(), 1);
    }

    #[test]
    fn test_deleted_state_takes_deletion() {
        let (mut session, mine) = conflicted_point();
        let mut cmd =
            DeletedStateConflictResolver::new(&session, mine, MergeDecision::KeepTheirs).unwrap();

        assert!(cmd.execute(&mut session).unwrap());
        assert!(session.store().entity(mine).unwrap().deleted);

        cmd.undo(&mut session).unwrap();
        assert!(!session.store().entity(mine).unwrap().deleted);
    }

    #[test]
    fn test_version_resolution() {
        let (mut session, mine) = conflicted_point();
        let mut keep_mine =
            VersionConflictResolver::new(&session, mine, MergeDecision::KeepMine).unwrap();
        assert!(keep_mine.execute(&mut session).unwrap());
        assert_eq!(session.store().entity(mine).unwrap().version, 5);
        keep_mine.undo(&mut session).unwrap();
        assert_eq!(session.store().entity(mine).unwrap().version, 3);

        session.store_mut().update(mine, |e| e.version = 9).unwrap();
        let mut keep_theirs =
            VersionConflictResolver::new(&session, mine, MergeDecision::KeepTheirs).unwrap();
        assert!(keep_theirs.execute(&mut session).unwrap());
        assert_eq!(session.store().entity(mine).unwrap().version, 5);
    }

    #[test]
    fn test_modified_keep_theirs_copies_flag() {
        let (mut session, mine) = conflicted_point();
        session.store_mut().update(mine, |e| e.modified = true).unwrap();

        let mut cmd =
            ModifiedConflictResolver::new(&session, mine, MergeDecision::KeepTheirs).unwrap();
        assert!(cmd.execute(&mut session).unwrap());

        assert!(!session.store().entity(mine).unwrap().modified);
    }
}
