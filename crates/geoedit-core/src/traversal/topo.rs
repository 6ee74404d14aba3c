use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::errors::{EditError, Result};
use crate::model::{EntityData, EntityId, EntityKind};
use crate::ops::Store;

/// Order `ids` so that every entity's referrers within the set come after it
///
/// Three passes in fixed order:
/// 1. Points with no Path referrer in the set.
/// 2. Each Path, preceded by its not-yet-emitted Points in node order.
/// 3. Groups, children before parents, by draining a ready set of Groups
///    with no unplaced child Group.
///
/// Output is deterministic for a given store and set.
///
/// # Errors
///
/// Returns `EntityNotFound` for an id missing from the store,
/// `ReferenceCycle` when Group references form a cycle, and
/// `TopologicalSortFailed` if any entity could not be placed.
pub fn topo_sort(store: &Store, ids: &BTreeSet<EntityId>) -> Result<Vec<EntityId>> {
    let mut points = BTreeSet::new();
    let mut paths = BTreeSet::new();
    let mut groups = BTreeSet::new();
    for &id in ids {
        match store.entity(id)?.kind() {
            EntityKind::Point => points.insert(id),
            EntityKind::Path => paths.insert(id),
            EntityKind::Group => groups.insert(id),
        };
    }

    let mut out = Vec::with_capacity(ids.len());

    // Pass 1: free-standing points
    let free: Vec<EntityId> = points
        .iter()
        .copied()
        .filter(|p| !store.referrers(*p).iter().any(|r| paths.contains(r)))
        .collect();
    for p in free {
        points.remove(&p);
        out.push(p);
    }

    // Pass 2: paths, each preceded by its points
    while let Some(path) = paths.pop_first() {
        for node in store.entity(path)?.nodes() {
            if points.remove(node) {
                out.push(*node);
            }
        }
        out.push(path);
    }

    // Pass 3: groups
    let mut child_count: BTreeMap<EntityId, usize> = BTreeMap::new();
    let mut parents: HashMap<EntityId, BTreeSet<EntityId>> = HashMap::new();
    for &g in &groups {
        let children: BTreeSet<EntityId> = match &store.entity(g)?.data {
            EntityData::Group { members } => members
                .iter()
                .filter(|m| groups.contains(&m.id))
                .map(|m| m.id)
                .collect(),
            EntityData::Point { .. } | EntityData::Path { .. } => BTreeSet::new(),
        };
        for child in &children {
            parents.entry(*child).or_default().insert(g);
        }
        child_count.insert(g, children.len());
    }

    let mut ready: BTreeSet<EntityId> = child_count
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(id, _)| *id)
        .collect();
    while let Some(g) = ready.pop_first() {
        groups.remove(&g);
        out.push(g);
        if let Some(ps) = parents.get(&g) {
            for parent in ps {
                if let Some(count) = child_count.get_mut(parent) {
                    *count = count.saturating_sub(1);
                    if *count == 0 && groups.contains(parent) {
                        ready.insert(*parent);
                    }
                }
            }
        }
    }

    if !groups.is_empty() {
        return Err(EditError::ReferenceCycle {
            remaining: groups.into_iter().collect(),
        });
    }
    if !points.is_empty() || out.len() != ids.len() {
        let placed: BTreeSet<EntityId> = out.iter().copied().collect();
        return Err(EditError::TopologicalSortFailed {
            remaining: ids.difference(&placed).copied().collect(),
        });
    }

    Ok(out)
}

/// True when every entity's in-sequence referrers appear strictly later
pub fn is_topologically_ordered(store: &Store, order: &[EntityId]) -> bool {
    let position: HashMap<EntityId, usize> =
        order.iter().enumerate().map(|(i, id)| (*id, i)).collect();
    order.iter().enumerate().all(|(i, id)| {
        store
            .referrers(*id)
            .iter()
            .all(|r| position.get(r).map_or(true, |&j| j > i))
    })
}
