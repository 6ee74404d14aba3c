use std::collections::HashSet;

use crate::model::{EntityId, EntityKind};
use crate::ops::Store;

/// Live Paths with exactly one point
pub fn find_short_paths(store: &Store) -> Vec<EntityId> {
    store
        .iter()
        .filter(|e| !e.deleted && e.kind() == EntityKind::Path && e.nodes().len() == 1)
        .map(|e| e.id)
        .collect()
}

/// Live entities referring to a deleted entity
///
/// Returns list of (referrer, target) tuples
pub fn find_dangling_references(store: &Store) -> Vec<(EntityId, EntityId)> {
    let mut dangling = Vec::new();
    for entity in store.iter().filter(|e| !e.deleted) {
        for target in entity.referenced_ids() {
            if !store.is_live(target) && !dangling.contains(&(entity.id, target)) {
                dangling.push((entity.id, target));
            }
        }
    }
    dangling
}

/// Incomplete entities that nevertheless carry tags or content
pub fn find_invalid_incomplete(store: &Store) -> Vec<EntityId> {
    store
        .iter()
        .filter(|e| e.incomplete && (e.is_tagged() || !e.data.is_empty()))
        .map(|e| e.id)
        .collect()
}

/// Check if a Group contains itself, directly or through member Groups
///
/// Uses DFS over Group members.
pub fn has_group_cycle(store: &Store, group: EntityId) -> bool {
    let mut stack = vec![(group, 0usize)];
    let mut on_path = HashSet::from([group]);
    let mut done = HashSet::new();

    while let Some((id, next)) = stack.pop() {
        let children: Vec<EntityId> = store
            .get(id)
            .map(|g| {
                g.members()
                    .iter()
                    .filter(|m| m.kind == EntityKind::Group)
                    .map(|m| m.id)
                    .collect()
            })
            .unwrap_or_default();

        match children.get(next) {
            Some(child) => {
                stack.push((id, next + 1));
                if on_path.contains(child) {
                    return true;
                }
                if !done.contains(child) {
                    on_path.insert(*child);
                    stack.push((*child, 0));
                }
            }
            None => {
                on_path.remove(&id);
                done.insert(id);
            }
        }
    }

    false
}
