use std::collections::BTreeSet;

use geoedit_core_types::SessionId;

use crate::config::EditConfig;
use crate::conflict::ConflictCollection;
use crate::model::{EntityId, WorkingArea};
use crate::ops::Store;

/// Editing context passed explicitly into commands, planners and resolvers
///
/// Owns the entity store, the conflict collection and the current selection
/// of one edited data layer.
#[derive(Debug, Default)]
pub struct EditSession {
    id: SessionId,
    pub(crate) store: Store,
    pub(crate) conflicts: ConflictCollection,
    selection: BTreeSet<EntityId>,
    working_area: Option<WorkingArea>,
    config: EditConfig,
}

impl EditSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EditConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn with_store(store: Store) -> Self {
        Self {
            store,
            ..Self::default()
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    pub fn conflicts(&self) -> &ConflictCollection {
        &self.conflicts
    }

    pub fn conflicts_mut(&mut self) -> &mut ConflictCollection {
        &mut self.conflicts
    }

    pub fn config(&self) -> &EditConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: EditConfig) {
        self.config = config;
    }

    // ===== Selection =====

    pub fn selection(&self) -> &BTreeSet<EntityId> {
        &self.selection
    }

    pub fn set_selection(&mut self, ids: impl IntoIterator<Item = EntityId>) {
        self.selection = ids.into_iter().collect();
    }

    pub fn select(&mut self, id: EntityId) {
        self.selection.insert(id);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Drop the given entities from the selection
    pub fn deselect(&mut self, ids: &[EntityId]) {
        for id in ids {
            self.selection.remove(id);
        }
    }

    // ===== Working area =====

    pub fn working_area(&self) -> Option<&WorkingArea> {
        self.working_area.as_ref()
    }

    pub fn set_working_area(&mut self, area: Option<WorkingArea>) {
        self.working_area = area;
    }
}
