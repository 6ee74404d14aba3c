use std::collections::BTreeSet;

use crate::commands::{count_text, dead_reference, Command, CommandCategory, SavedState};
use crate::errors::{EditError, Result};
use crate::model::{Entity, EntityData, EntityId, EntityKind};
use crate::ops::{EditSession, Store};

/// Look up a Path that may be edited
fn editable_path(store: &Store, id: EntityId) -> Result<&Entity> {
    let path = store.live(id)?;
    if path.kind() != EntityKind::Path {
        return Err(EditError::KindMismatch {
            id,
            expected: EntityKind::Path,
            actual: path.kind(),
        });
    }
    if path.incomplete {
        return Err(EditError::IncompleteEntity { id });
    }
    Ok(path)
}

/// True when the Path is still present, live and complete at execution time
fn path_still_editable(store: &Store, id: EntityId) -> bool {
    store
        .get(id)
        .is_some_and(|p| p.is_usable() && p.kind() == EntityKind::Path)
}

/// Replace the contents of an entity wholesale
#[derive(Debug)]
pub struct ChangeCommand {
    target: EntityId,
    label: String,
    new_state: Entity,
    state: SavedState,
}

impl ChangeCommand {
    /// # Errors
    ///
    /// Returns `EntityNotFound` for an unknown target, `KindMismatch` if the
    /// replacement is of another kind, `IncompleteEntity` for an incomplete
    /// replacement, and `InvalidPath` for a Path replacement with one point.
    pub fn new(store: &Store, target: EntityId, mut new_state: Entity) -> Result<Self> {
        let current = store.entity(target)?;
        if current.kind() != new_state.kind() {
            return Err(EditError::KindMismatch {
                id: target,
                expected: current.kind(),
                actual: new_state.kind(),
            });
        }
        if new_state.incomplete {
            return Err(EditError::IncompleteEntity { id: target });
        }
        if new_state.nodes().len() == 1 {
            return Err(EditError::InvalidPath { id: target, len: 1 });
        }
        new_state.id = target;
        Ok(Self {
            target,
            label: current.label(),
            new_state,
            state: SavedState::new(),
        })
    }

    pub fn new_state(&self) -> &Entity {
        &self.new_state
    }
}

impl Command for ChangeCommand {
    fn description(&self) -> String {
        format!("Change {}", self.label)
    }

    fn category(&self) -> CommandCategory {
        CommandCategory::Change
    }

    fn affected_entities(&self) -> Vec<EntityId> {
        vec![self.target]
    }

    fn apply(&mut self, session: &mut EditSession) -> Result<bool> {
        let store = session.store();
        if !store.contains(self.target) {
            return Ok(false);
        }
        if let Some(dead) = dead_reference(store, self.new_state.referenced_ids()) {
            tracing::warn!(entity = %self.target, %dead, "replacement references a missing or deleted entity");
            return Ok(false);
        }
        let mut state = self.new_state.clone();
        state.modified = true;
        session.store_mut().load(state)?;
        Ok(true)
    }

    fn saved_state(&mut self) -> Option<&mut SavedState> {
        Some(&mut self.state)
    }
}

/// Replace the point list of a Path
#[derive(Debug)]
pub struct ChangeNodesCommand {
    path: EntityId,
    nodes: Vec<EntityId>,
    state: SavedState,
}

impl ChangeNodesCommand {
    /// # Errors
    ///
    /// Returns `EmptyCollection` for an empty list, `InvalidPath` for a single
    /// point, and lookup errors if `path` is not a live, complete Path.
    pub fn new(store: &Store, path: EntityId, nodes: Vec<EntityId>) -> Result<Self> {
        if nodes.is_empty() {
            return Err(EditError::EmptyCollection {
                what: "ChangeNodesCommand nodes".to_string(),
            });
        }
        if nodes.len() == 1 {
            return Err(EditError::InvalidPath { id: path, len: 1 });
        }
        editable_path(store, path)?;
        Ok(Self {
            path,
            nodes,
            state: SavedState::new(),
        })
    }

    pub fn path(&self) -> EntityId {
        self.path
    }

    pub fn nodes(&self) -> &[EntityId] {
        &self.nodes
    }
}

impl Command for ChangeNodesCommand {
    fn description(&self) -> String {
        format!("Change points of path {}", self.path)
    }

    fn category(&self) -> CommandCategory {
        CommandCategory::Change
    }

    fn affected_entities(&self) -> Vec<EntityId> {
        vec![self.path]
    }

    fn apply(&mut self, session: &mut EditSession) -> Result<bool> {
        let store = session.store();
        if !path_still_editable(store, self.path) {
            return Ok(false);
        }
        if dead_reference(store, self.nodes.iter().copied()).is_some() {
            return Ok(false);
        }
        let nodes = self.nodes.clone();
        session.store_mut().update(self.path, |p| {
            p.data = EntityData::Path { nodes };
            p.modified = true;
        })?;
        Ok(true)
    }

    fn saved_state(&mut self) -> Option<&mut SavedState> {
        Some(&mut self.state)
    }
}

/// Strip points from a Path
#[derive(Debug)]
pub struct RemoveNodesCommand {
    path: EntityId,
    points: BTreeSet<EntityId>,
    state: SavedState,
}

impl RemoveNodesCommand {
    /// # Errors
    ///
    /// Returns `EmptyCollection` when no point is given, and lookup errors if
    /// `path` is not a live, complete Path.
    pub fn new(store: &Store, path: EntityId, points: BTreeSet<EntityId>) -> Result<Self> {
        if points.is_empty() {
            return Err(EditError::EmptyCollection {
                what: "RemoveNodesCommand points".to_string(),
            });
        }
        editable_path(store, path)?;
        Ok(Self {
            path,
            points,
            state: SavedState::new(),
        })
    }
}

impl Command for RemoveNodesCommand {
    fn description(&self) -> String {
        format!(
            "Remove {} from path {}",
            count_text(self.points.len(), "point", "points"),
            self.path
        )
    }

    fn category(&self) -> CommandCategory {
        CommandCategory::Change
    }

    fn affected_entities(&self) -> Vec<EntityId> {
        vec![self.path]
    }

    fn apply(&mut self, session: &mut EditSession) -> Result<bool> {
        let store = session.store();
        if !path_still_editable(store, self.path) {
            return Ok(false);
        }
        let remaining: Vec<EntityId> = store
            .entity(self.path)?
            .nodes()
            .iter()
            .copied()
            .filter(|n| !self.points.contains(n))
            .collect();
        if remaining.len() == 1 {
            tracing::warn!(path = %self.path, "removing points would leave a single-point path");
            return Ok(false);
        }
        session.store_mut().update(self.path, |p| {
            p.data = EntityData::Path { nodes: remaining };
            p.modified = true;
        })?;
        Ok(true)
    }

    fn saved_state(&mut self) -> Option<&mut SavedState> {
        Some(&mut self.state)
    }
}
