use crate::model::{Entity, EntityId};

/// Immutable copy of one entity taken before a command mutates it
///
/// Owned by the command that captured it and consumed once on undo.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    state: Entity,
}

impl Snapshot {
    pub fn capture(entity: &Entity) -> Self {
        Self {
            state: entity.clone(),
        }
    }

    pub fn id(&self) -> EntityId {
        self.state.id
    }

    /// Captured state
    pub fn state(&self) -> &Entity {
        &self.state
    }

    pub fn into_state(self) -> Entity {
        self.state
    }
}
