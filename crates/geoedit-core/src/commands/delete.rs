use std::collections::BTreeSet;

use crate::commands::{count_text, Command, CommandCategory, SavedState};
use crate::errors::{EditError, Result};
use crate::model::{EntityId, EntityKind};
use crate::ops::{EditSession, Store};
use crate::traversal::topo_sort;

/// Flag a closed set of entities deleted
///
/// The set must be closed under live references: when executed, no live
/// entity outside the set may still refer to a member of it. The planner in
/// [`crate::planner`] builds such sets together with the edits that detach
/// surviving referrers.
#[derive(Debug)]
pub struct DeleteCommand {
    order: Vec<EntityId>,
    members: BTreeSet<EntityId>,
    label: String,
    state: SavedState,
}

impl DeleteCommand {
    /// # Errors
    ///
    /// Returns `EmptyCollection` for an empty set, `EntityNotFound` or
    /// `EntityDeleted` for an entity that cannot be deleted, and the
    /// structural errors of [`topo_sort`].
    pub fn new(store: &Store, ids: impl IntoIterator<Item = EntityId>) -> Result<Self> {
        let members: BTreeSet<EntityId> = ids.into_iter().collect();
        if members.is_empty() {
            return Err(EditError::EmptyCollection {
                what: "DeleteCommand entities".to_string(),
            });
        }
        for id in &members {
            store.live(*id)?;
        }
        let order = topo_sort(store, &members)?;
        let label = describe(store, &order);
        Ok(Self {
            order,
            members,
            label,
            state: SavedState::new(),
        })
    }

    /// Entities in referential order, referenced before referrers
    pub fn order(&self) -> &[EntityId] {
        &self.order
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.members.contains(&id)
    }
}

fn describe(store: &Store, order: &[EntityId]) -> String {
    if let [single] = order {
        if let Some(entity) = store.get(*single) {
            return format!("Delete {}", entity.label());
        }
    }
    let kinds: BTreeSet<EntityKind> = order
        .iter()
        .filter_map(|id| store.get(*id).map(|e| e.kind()))
        .collect();
    match kinds.iter().next() {
        Some(kind) if kinds.len() == 1 => {
            format!("Delete {}", count_text(order.len(), kind.name(), kind.plural()))
        }
        _ => format!("Delete {}", count_text(order.len(), "object", "objects")),
    }
}

impl Command for DeleteCommand {
    fn description(&self) -> String {
        self.label.clone()
    }

    fn category(&self) -> CommandCategory {
        CommandCategory::Delete
    }

    fn affected_entities(&self) -> Vec<EntityId> {
        self.order.clone()
    }

    fn apply(&mut self, session: &mut EditSession) -> Result<bool> {
        let store = session.store();
        for id in &self.order {
            if !store.is_live(*id) {
                tracing::warn!(entity = %id, "entity vanished before delete");
                return Ok(false);
            }
            if let Some(referrer) = store
                .live_referrers(*id)
                .into_iter()
                .find(|r| !self.members.contains(r))
            {
                tracing::warn!(entity = %id, %referrer, "entity still referenced outside delete set");
                return Ok(false);
            }
        }

        let order = &self.order;
        session.store_mut().batch(|store| {
            order.iter().rev().try_for_each(|id| {
                store.update(*id, |e| {
                    e.deleted = true;
                    e.modified = true;
                })
            })
        })?;
        session.deselect(&self.order);
        Ok(true)
    }

    fn saved_state(&mut self) -> Option<&mut SavedState> {
        Some(&mut self.state)
    }
}
