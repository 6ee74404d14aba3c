use std::collections::{BTreeSet, HashMap};
use std::time::Instant;

use crate::commands::{count_text, Command, CommandCategory};
use crate::conflict::Conflict;
use crate::errors::{EditError, Result};
use crate::model::{Entity, EntityId, EntityKind};
use crate::ops::{EditSession, Store};
use crate::traversal::topo_sort;
use crate::{log_op_end, log_op_error, log_op_start};

/// Remove entities from the store entirely
///
/// Unlike [`DeleteCommand`](crate::commands::DeleteCommand), purged entities
/// leave no deleted record behind. Entities listed in `make_incomplete` keep
/// their identity as incomplete placeholders instead, so that Groups outside
/// the purge still have something to reference. Conflicts of removed
/// entities travel with the command and come back on undo.
#[derive(Debug)]
pub struct PurgeCommand {
    to_purge: Vec<EntityId>,
    members: BTreeSet<EntityId>,
    make_incomplete: BTreeSet<EntityId>,
    removed: HashMap<EntityId, Entity>,
    saved_incomplete: HashMap<EntityId, Entity>,
    purged_conflicts: Vec<Conflict>,
    executed: bool,
}

impl PurgeCommand {
    /// # Errors
    ///
    /// Returns `EmptyCollection` for an empty set, `InvalidInput` when
    /// `make_incomplete` is not a subset of `to_purge`, and the errors of
    /// [`topo_sort`].
    pub fn new(
        store: &Store,
        to_purge: impl IntoIterator<Item = EntityId>,
        make_incomplete: impl IntoIterator<Item = EntityId>,
    ) -> Result<Self> {
        let members: BTreeSet<EntityId> = to_purge.into_iter().collect();
        if members.is_empty() {
            return Err(EditError::EmptyCollection {
                what: "PurgeCommand entities".to_string(),
            });
        }
        let make_incomplete: BTreeSet<EntityId> = make_incomplete.into_iter().collect();
        if let Some(stray) = make_incomplete.difference(&members).next() {
            return Err(EditError::InvalidInput {
                reason: format!("{} is marked incomplete but not purged", stray),
            });
        }
        let to_purge = topo_sort(store, &members)?;
        Ok(Self {
            to_purge,
            members,
            make_incomplete,
            removed: HashMap::new(),
            saved_incomplete: HashMap::new(),
            purged_conflicts: Vec::new(),
            executed: false,
        })
    }

    /// Compute the purge closure of `selection`
    ///
    /// Path referrers of purged entities always join the purge; Group
    /// referrers join only when the purged child is new. Depending on the
    /// session's purge options, untagged Points used only by purged Paths and
    /// Groups left with only purged or incomplete members join as well.
    /// Entities that are not new and still referenced by a surviving Group
    /// become incomplete placeholders.
    ///
    /// Returns the command and the entities purged beyond the selection.
    ///
    /// # Errors
    ///
    /// Returns `EmptyCollection` for an empty selection and `EntityNotFound`
    /// for an unknown entity.
    pub fn build(session: &EditSession, selection: &[EntityId]) -> Result<(Self, Vec<EntityId>)> {
        let start = Instant::now();
        log_op_start!("purge_build", selection_len = selection.len());
        match Self::build_inner(session, selection) {
            Ok((cmd, additionally)) => {
                log_op_end!(
                    "purge_build",
                    duration_ms = start.elapsed().as_millis() as u64,
                    affected_len = cmd.to_purge.len()
                );
                Ok((cmd, additionally))
            }
            Err(err) => {
                log_op_error!(
                    "purge_build",
                    err.clone(),
                    duration_ms = start.elapsed().as_millis() as u64
                );
                Err(err)
            }
        }
    }

    fn build_inner(session: &EditSession, selection: &[EntityId]) -> Result<(Self, Vec<EntityId>)> {
        let store = session.store();
        let options = session.config().purge;
        if selection.is_empty() {
            return Err(EditError::EmptyCollection {
                what: "purge selection".to_string(),
            });
        }

        let mut checked: BTreeSet<EntityId> = BTreeSet::new();
        let mut additionally: Vec<EntityId> = Vec::new();
        let mut frontier: BTreeSet<EntityId> = selection.iter().copied().collect();
        while !frontier.is_empty() {
            let mut next = BTreeSet::new();
            for id in &frontier {
                let is_new = store.entity(*id)?.is_new();
                for parent in store.referrers(*id) {
                    if frontier.contains(&parent)
                        || checked.contains(&parent)
                        || next.contains(&parent)
                    {
                        continue;
                    }
                    let joins = match store.entity(parent)?.kind() {
                        EntityKind::Path => true,
                        EntityKind::Group => is_new,
                        EntityKind::Point => false,
                    };
                    if joins {
                        additionally.push(parent);
                        next.insert(parent);
                    }
                }
                checked.insert(*id);
            }
            frontier = next;
        }

        if options.add_untagged_path_points {
            let mut path_points = BTreeSet::new();
            for id in &checked {
                let path = store.entity(*id)?;
                for node in path.nodes() {
                    if checked.contains(node) || path_points.contains(node) {
                        continue;
                    }
                    if store.entity(*node)?.is_tagged() {
                        continue;
                    }
                    if store
                        .referrers(*node)
                        .iter()
                        .all(|r| r == id || checked.contains(r))
                    {
                        path_points.insert(*node);
                    }
                }
            }
            additionally.extend(path_points.iter().copied());
            checked.extend(path_points);
        }

        if options.add_groups_with_only_incomplete_members {
            let mut groups: Vec<EntityId> = Vec::new();
            let consider = |parent: EntityId, groups: &mut Vec<EntityId>| -> Result<()> {
                if checked.contains(&parent) || groups.contains(&parent) {
                    return Ok(());
                }
                let group = store.entity(parent)?;
                if group.kind() == EntityKind::Group
                    && has_only_incomplete_members(store, group, &checked, groups)
                {
                    groups.push(parent);
                }
                Ok(())
            };
            for id in &checked {
                for parent in store.referrers(*id) {
                    consider(parent, &mut groups)?;
                }
            }
            let mut i = 0;
            while i < groups.len() {
                for parent in store.referrers(groups[i]) {
                    consider(parent, &mut groups)?;
                }
                i += 1;
            }
            additionally.extend(groups.iter().copied());
            checked.extend(groups);
        }

        let mut make_incomplete = BTreeSet::new();
        for id in &checked {
            if store.entity(*id)?.is_new() {
                continue;
            }
            let mut parents = store.referrers(*id).into_iter();
            if parents.any(|p| {
                !checked.contains(&p)
                    && store.get(p).is_some_and(|e| e.kind() == EntityKind::Group)
            }) {
                make_incomplete.insert(*id);
            }
        }

        let cmd = Self::new(store, checked, make_incomplete)?;
        Ok((cmd, additionally))
    }

    pub fn to_purge(&self) -> &[EntityId] {
        &self.to_purge
    }

    pub fn make_incomplete(&self) -> &BTreeSet<EntityId> {
        &self.make_incomplete
    }
}

fn has_only_incomplete_members(
    store: &Store,
    group: &Entity,
    purged: &BTreeSet<EntityId>,
    more: &[EntityId],
) -> bool {
    group.members().iter().all(|m| {
        purged.contains(&m.id)
            || more.contains(&m.id)
            || store.get(m.id).is_some_and(|e| e.incomplete)
    })
}

impl Command for PurgeCommand {
    fn description(&self) -> String {
        format!(
            "Purge {}",
            count_text(self.to_purge.len(), "object", "objects")
        )
    }

    fn category(&self) -> CommandCategory {
        CommandCategory::Purge
    }

    fn affected_entities(&self) -> Vec<EntityId> {
        self.to_purge.clone()
    }

    fn apply(&mut self, session: &mut EditSession) -> Result<bool> {
        if self.executed {
            return Err(EditError::AlreadyExecuted {
                description: self.description(),
            });
        }
        let store = session.store();
        for id in &self.to_purge {
            if !store.contains(*id) {
                return Ok(false);
            }
            if self.make_incomplete.contains(id) {
                continue;
            }
            if let Some(outside) = store
                .referrers(*id)
                .into_iter()
                .find(|r| !self.members.contains(r))
            {
                tracing::warn!(entity = %id, referrer = %outside, "purge would leave a dangling reference");
                return Ok(false);
            }
        }

        session.deselect(&self.to_purge);
        let to_purge = &self.to_purge;
        let make_incomplete = &self.make_incomplete;
        let removed = &mut self.removed;
        let saved_incomplete = &mut self.saved_incomplete;
        let purged_conflicts = &mut self.purged_conflicts;
        let conflicts = &mut session.conflicts;
        removed.clear();
        saved_incomplete.clear();
        purged_conflicts.clear();

        session.store.batch(|store| -> Result<()> {
            for id in to_purge.iter().rev() {
                if make_incomplete.contains(id) {
                    let entity = store.entity(*id)?.clone();
                    store.load(entity.to_placeholder())?;
                    saved_incomplete.insert(*id, entity);
                } else {
                    let entity = store.remove(*id)?;
                    removed.insert(*id, entity);
                    if let Some(conflict) = conflicts.remove_for_mine(*id) {
                        purged_conflicts.push(conflict);
                    }
                }
            }
            Ok(())
        })?;
        self.executed = true;
        Ok(true)
    }

    fn undo(&mut self, session: &mut EditSession) -> Result<()> {
        if !self.executed {
            return Err(EditError::NotExecuted {
                description: self.description(),
            });
        }
        let to_purge = &self.to_purge;
        let removed = &mut self.removed;
        let saved_incomplete = &mut self.saved_incomplete;
        session.store.batch(|store| -> Result<()> {
            for id in to_purge {
                if let Some(state) = saved_incomplete.remove(id) {
                    if !store.contains(*id) {
                        return Err(EditError::Internal {
                            message: format!(
                                "{} was made incomplete when purging but is missing on undo",
                                id
                            ),
                        });
                    }
                    store.load(state)?;
                } else if let Some(entity) = removed.remove(id) {
                    if store.contains(*id) {
                        return Err(EditError::Internal {
                            message: format!(
                                "{} was removed when purging but is still present on undo",
                                id
                            ),
                        });
                    }
                    store.add(entity)?;
                }
            }
            Ok(())
        })?;
        for conflict in self.purged_conflicts.drain(..) {
            session.conflicts.add_if_absent(conflict);
        }
        self.executed = false;
        Ok(())
    }
}
