use crate::errors::{EditError, Result};
use crate::model::EntityKind;
use crate::ops::Store;

use super::invariants;

/// Validate the structural invariants of the whole store
///
/// 1. No live Path has exactly one point
/// 2. No live entity refers to a deleted one
/// 3. Incomplete entities carry no tags or content
/// 4. Group membership is acyclic
///
/// # Errors
/// Returns the first violation encountered. For exhaustive reporting, call
/// the individual invariant functions directly.
pub fn validate_store(store: &Store) -> Result<()> {
    if let Some(id) = invariants::find_short_paths(store).first() {
        return Err(EditError::ShortPath { id: *id });
    }

    if let Some((id, target)) = invariants::find_dangling_references(store).first() {
        return Err(EditError::DanglingReference {
            id: *id,
            target: *target,
        });
    }

    if let Some(id) = invariants::find_invalid_incomplete(store).first() {
        return Err(EditError::IncompleteEntity { id: *id });
    }

    for group in store.iter().filter(|e| e.kind() == EntityKind::Group) {
        if invariants::has_group_cycle(store, group.id) {
            return Err(EditError::ReferenceCycle {
                remaining: vec![group.id],
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Entity, LatLon};

    #[test]
    fn test_reports_first_violation() {
        let mut store = Store::new();
        let a = Entity::point(LatLon::new(0.0, 0.0));
        let a_id = a.id;
        store.add(a).unwrap();
        assert!(validate_store(&store).is_ok());

        let short = Entity::path(vec![a_id]);
        let short_id = short.id;
        store.add(short).unwrap();

        assert_eq!(
            validate_store(&store),
            Err(EditError::ShortPath { id: short_id })
        );
    }
}
