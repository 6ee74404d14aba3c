//! Commands resolving one [`Conflict`]
//!
//! A resolver applies a merge decision to the local entity and takes the
//! conflict out of the session's collection. Undo restores the entity and
//! puts the same conflict back, unless another conflict for that entity has
//! been filed in the meantime.

mod fields;
mod lists;
mod tags;

use crate::commands::SavedState;
use crate::conflict::{Conflict, MergeDecision, Side};
use crate::errors::{EditError, Result};
use crate::model::{Entity, EntityId, EntityKind};
use crate::ops::EditSession;

pub use fields::{
    CoordinateConflictResolver, DeletedStateConflictResolver, ModifiedConflictResolver,
    VersionConflictResolver,
};
pub use lists::{GroupMembersConflictResolver, ListMergeEntry, PathPointsConflictResolver};
pub use tags::{TagConflictResolver, TagMergeItem};

/// Conflict held by a resolver while it is applied
#[derive(Debug, Clone)]
pub(crate) struct ConflictMemory {
    conflict: Conflict,
    consumed: bool,
}

impl ConflictMemory {
    /// Conflict filed for `mine`, provided the local entity is of `kind`
    pub(crate) fn lookup(session: &EditSession, mine: EntityId, kind: Option<EntityKind>) -> Result<Self> {
        let conflict = session
            .conflicts()
            .get_for_mine(mine)
            .ok_or(EditError::ConflictNotFound { id: mine })?;
        let local = session.store().entity(mine)?;
        if let Some(expected) = kind {
            if local.kind() != expected {
                return Err(EditError::KindMismatch {
                    id: mine,
                    expected,
                    actual: local.kind(),
                });
            }
        }
        Ok(Self {
            conflict: conflict.clone(),
            consumed: false,
        })
    }

    pub(crate) fn mine(&self) -> EntityId {
        self.conflict.mine()
    }

    pub(crate) fn theirs(&self) -> &Entity {
        self.conflict.theirs()
    }

    /// Take the conflict out of the session; a no-op when an earlier
    /// resolver of the same conflict already did
    pub(crate) fn consume(&mut self, session: &mut EditSession) {
        self.consumed = session.conflicts.remove(self.conflict.id()).is_some();
    }

    /// Put the conflict back if this resolver took it out
    pub(crate) fn reconstitute(&mut self, session: &mut EditSession) {
        if self.consumed {
            if !session.conflicts.add_if_absent(self.conflict.clone()) {
                tracing::debug!(
                    entity = %self.mine(),
                    "newer conflict present; not reconstituting"
                );
            }
            self.consumed = false;
        }
    }
}

pub(crate) fn require_decided(mine: EntityId, decision: MergeDecision) -> Result<Side> {
    decision
        .side()
        .ok_or(EditError::UndecidedMergeDecision { id: mine })
}

/// Shared undo of snapshot-based resolvers
pub(crate) fn undo_resolution(
    session: &mut EditSession,
    state: &mut SavedState,
    memory: &mut ConflictMemory,
    description: &str,
) -> Result<()> {
    state.restore(session.store_mut(), description)?;
    memory.reconstitute(session);
    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::model::LatLon;

    /// Session with one conflicted Point; theirs differs in every field
    pub(crate) fn conflicted_point() -> (EditSession, EntityId) {
        let mut session = EditSession::new();
        let mine = Entity::point(LatLon::new(1.0, 1.0))
            .with_external_id(7, 3)
            .with_tag("name", "Oak")
            .with_tag("shop", "bakery");
        let mut theirs = Entity::point(LatLon::new(2.0, 2.0))
            .with_external_id(7, 5)
            .with_tag("name", "Elm")
            .with_tag("opening_hours", "24/7");
        theirs.deleted = true;
        let id = mine.id;
        let conflict = Conflict::new(&mine, theirs).unwrap();
        session.store_mut().add(mine).unwrap();
        session.conflicts_mut().add(conflict).unwrap();
        (session, id)
    }
}
