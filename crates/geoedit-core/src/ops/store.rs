use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use crate::errors::{EditError, Result};
use crate::model::{Entity, EntityData, EntityId, EntityKind};

/// Coalesced structural changes published when a batch scope closes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub added: BTreeSet<EntityId>,
    pub removed: BTreeSet<EntityId>,
    pub changed: BTreeSet<EntityId>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }

    fn record_added(&mut self, id: EntityId) {
        if self.removed.remove(&id) {
            self.changed.insert(id);
        } else {
            self.added.insert(id);
        }
    }

    fn record_removed(&mut self, id: EntityId) {
        self.changed.remove(&id);
        if !self.added.remove(&id) {
            self.removed.insert(id);
        }
    }

    fn record_changed(&mut self, id: EntityId) {
        if !self.added.contains(&id) {
            self.changed.insert(id);
        }
    }
}

/// Observer of structural changes to a [`Store`]
pub trait StoreListener {
    /// Called once per outermost batch scope, or once per change outside a scope
    fn data_changed(&self, changes: &ChangeSet);
}

/// Arena of entities keyed by identity
///
/// Single-threaded by construction. Every structural change goes through
/// [`Store::add`], [`Store::remove`] or [`Store::load`], which keep the
/// referrer index (referenced id -> referring ids) in step with the arena.
#[derive(Default)]
pub struct Store {
    entities: BTreeMap<EntityId, Entity>,
    referrers: HashMap<EntityId, BTreeSet<EntityId>>,
    update_depth: usize,
    pending: ChangeSet,
    listeners: Vec<Box<dyn StoreListener>>,
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("entities", &self.entities.len())
            .field("update_depth", &self.update_depth)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Get an entity by ID, deleted or not
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` if the entity is not in the store.
    pub fn entity(&self, id: EntityId) -> Result<&Entity> {
        self.entities
            .get(&id)
            .ok_or(EditError::EntityNotFound { id })
    }

    /// Get an entity that is not flagged deleted
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` if the entity is not in the store, or
    /// `EntityDeleted` if it is flagged deleted.
    pub fn live(&self, id: EntityId) -> Result<&Entity> {
        let entity = self.entity(id)?;
        if entity.deleted {
            return Err(EditError::EntityDeleted { id });
        }
        Ok(entity)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// True when the entity is present and not flagged deleted
    pub fn is_live(&self, id: EntityId) -> bool {
        self.entities.get(&id).is_some_and(|e| !e.deleted)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// All entities in identity order
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Owned copy of every entity, in identity order
    pub fn dump(&self) -> Vec<Entity> {
        self.entities.values().cloned().collect()
    }

    /// Entities referring to `id`, deleted referrers included
    pub fn referrers(&self, id: EntityId) -> Vec<EntityId> {
        self.referrers
            .get(&id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Entities referring to `id` that are not flagged deleted
    pub fn live_referrers(&self, id: EntityId) -> Vec<EntityId> {
        self.referrers
            .get(&id)
            .map(|set| {
                set.iter()
                    .copied()
                    .filter(|r| self.is_live(*r))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Find the entity carrying an external identity
    ///
    /// New entities (external id <= 0) are never matched.
    pub fn find_by_external_id(&self, kind: EntityKind, external_id: i64) -> Option<&Entity> {
        if external_id <= 0 {
            return None;
        }
        self.entities
            .values()
            .find(|e| e.kind() == kind && e.external_id == external_id)
    }

    /// Add a new entity
    ///
    /// # Errors
    ///
    /// Returns `EntityAlreadyExists` if the identity is taken, or
    /// `MissingReference` / `KindMismatch` if the entity references an
    /// unknown entity or one of the wrong kind.
    pub fn add(&mut self, entity: Entity) -> Result<()> {
        if self.entities.contains_key(&entity.id) {
            return Err(EditError::EntityAlreadyExists { id: entity.id });
        }
        self.check_references(&entity)?;

        let id = entity.id;
        self.index(&entity);
        self.entities.insert(id, entity);
        self.record(|c| c.record_added(id));
        Ok(())
    }

    /// Remove an entity from the store entirely
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` if the entity is not in the store, or
    /// `StillReferenced` if any entity (deleted or not) still refers to it.
    pub fn remove(&mut self, id: EntityId) -> Result<Entity> {
        if !self.entities.contains_key(&id) {
            return Err(EditError::EntityNotFound { id });
        }
        let referrers = self.referrers(id);
        if !referrers.is_empty() {
            return Err(EditError::StillReferenced { id, referrers });
        }

        let entity = self
            .entities
            .remove(&id)
            .ok_or(EditError::EntityNotFound { id })?;
        self.unindex(&entity);
        self.referrers.remove(&id);
        self.record(|c| c.record_removed(id));
        Ok(entity)
    }

    /// Replace an entity's contents wholesale with `state`
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` if no entity has `state.id`, `KindMismatch`
    /// if the kinds differ, or the reference errors of [`Store::add`].
    pub fn load(&mut self, state: Entity) -> Result<()> {
        let id = state.id;
        let current_kind = self.entity(id)?.kind();
        if current_kind != state.kind() {
            return Err(EditError::KindMismatch {
                id,
                expected: current_kind,
                actual: state.kind(),
            });
        }
        self.check_references(&state)?;

        if let Some(old) = self.entities.remove(&id) {
            self.unindex(&old);
        }
        self.index(&state);
        self.entities.insert(id, state);
        self.record(|c| c.record_changed(id));
        Ok(())
    }

    /// Copy, modify and reload one entity
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Store::load`].
    pub fn update<F>(&mut self, id: EntityId, f: F) -> Result<()>
    where
        F: FnOnce(&mut Entity),
    {
        let mut state = self.entity(id)?.clone();
        f(&mut state);
        self.load(state)
    }

    fn check_references(&self, entity: &Entity) -> Result<()> {
        match &entity.data {
            EntityData::Point { .. } => Ok(()),
            EntityData::Path { nodes } => nodes
                .iter()
                .try_for_each(|n| self.check_reference(entity.id, *n, EntityKind::Point)),
            EntityData::Group { members } => members
                .iter()
                .try_for_each(|m| self.check_reference(entity.id, m.id, m.kind)),
        }
    }

    fn check_reference(&self, id: EntityId, target: EntityId, expected: EntityKind) -> Result<()> {
        let referenced = self
            .entities
            .get(&target)
            .ok_or(EditError::MissingReference {
                id,
                missing: target,
            })?;
        if referenced.kind() != expected {
            return Err(EditError::KindMismatch {
                id: target,
                expected,
                actual: referenced.kind(),
            });
        }
        Ok(())
    }

    fn index(&mut self, entity: &Entity) {
        for target in entity.referenced_ids() {
            self.referrers.entry(target).or_default().insert(entity.id);
        }
    }

    fn unindex(&mut self, entity: &Entity) {
        for target in entity.referenced_ids() {
            if let Some(set) = self.referrers.get_mut(&target) {
                set.remove(&entity.id);
                if set.is_empty() {
                    self.referrers.remove(&target);
                }
            }
        }
    }

    // ===== Batch scope =====

    /// Open a batch scope; scopes nest
    pub fn begin_update(&mut self) {
        self.update_depth += 1;
    }

    /// Close a batch scope, publishing coalesced changes when the outermost one closes
    pub fn end_update(&mut self) {
        match self.update_depth {
            0 => tracing::warn!("end_update called without a matching begin_update"),
            1 => {
                self.update_depth = 0;
                self.publish();
            }
            _ => self.update_depth -= 1,
        }
    }

    /// Run `f` inside a batch scope
    pub fn batch<F, R>(&mut self, f: F) -> R
    where
        F: FnOnce(&mut Store) -> R,
    {
        self.begin_update();
        let result = f(self);
        self.end_update();
        result
    }

    pub fn is_updating(&self) -> bool {
        self.update_depth > 0
    }

    pub fn add_listener(&mut self, listener: Box<dyn StoreListener>) {
        self.listeners.push(listener);
    }

    fn record<F>(&mut self, f: F)
    where
        F: FnOnce(&mut ChangeSet),
    {
        f(&mut self.pending);
        if self.update_depth == 0 {
            self.publish();
        }
    }

    fn publish(&mut self) {
        let changes = std::mem::take(&mut self.pending);
        if changes.is_empty() {
            return;
        }
        tracing::debug!(
            added = changes.added.len(),
            removed = changes.removed.len(),
            changed = changes.changed.len(),
            "store changes published"
        );
        for listener in &self.listeners {
            listener.data_changed(&changes);
        }
    }
}
