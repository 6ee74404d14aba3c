use crate::commands::{dead_reference, Command, CommandCategory};
use crate::errors::{EditError, Result};
use crate::model::{Entity, EntityId};
use crate::ops::{EditSession, Store};

/// Add a new entity to the store; undo removes it again
#[derive(Debug)]
pub struct AddCommand {
    entity: Entity,
    executed: bool,
}

impl AddCommand {
    /// # Errors
    ///
    /// Returns `EntityAlreadyExists` if the store already holds the identity.
    pub fn new(store: &Store, entity: Entity) -> Result<Self> {
        if store.contains(entity.id) {
            return Err(EditError::EntityAlreadyExists { id: entity.id });
        }
        Ok(Self {
            entity,
            executed: false,
        })
    }

    pub fn entity(&self) -> &Entity {
        &self.entity
    }
}

impl Command for AddCommand {
    fn description(&self) -> String {
        format!("Add {}", self.entity.label())
    }

    fn category(&self) -> CommandCategory {
        CommandCategory::Add
    }

    fn affected_entities(&self) -> Vec<EntityId> {
        vec![self.entity.id]
    }

    fn apply(&mut self, session: &mut EditSession) -> Result<bool> {
        if self.executed {
            return Err(EditError::AlreadyExecuted {
                description: self.description(),
            });
        }
        let store = session.store();
        if store.contains(self.entity.id) {
            return Err(EditError::EntityAlreadyExists { id: self.entity.id });
        }
        if let Some(target) = dead_reference(store, self.entity.referenced_ids()) {
            tracing::warn!(entity = %self.entity.id, %target, "add references a missing or deleted entity");
            return Ok(false);
        }

        let mut entity = self.entity.clone();
        entity.modified = true;
        session.store_mut().add(entity)?;
        self.executed = true;
        Ok(true)
    }

    fn undo(&mut self, session: &mut EditSession) -> Result<()> {
        if !self.executed {
            return Err(EditError::NotExecuted {
                description: self.description(),
            });
        }
        session.store_mut().remove(self.entity.id)?;
        session.deselect(&[self.entity.id]);
        self.executed = false;
        Ok(())
    }
}
