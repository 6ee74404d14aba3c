use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use crate::commands::{ChangeCommand, ChangeNodesCommand, Command, DeleteCommand, SequenceCommand};
use crate::config::{DeletionPolicy, GroupMemberPolicy};
use crate::errors::Result;
use crate::log_op_start;
use crate::model::{Entity, EntityData, EntityId, EntityKind};
use crate::ops::{EditSession, Store};
use crate::planner::{log_outcome, Plan};
use crate::policy::{ConfirmationGate, ConfirmationKind};

/// Plan the deletion of `selection`
///
/// Paths losing points keep the remaining ones, or are deleted as well when
/// fewer than two distinct points remain; a closed Path whose closing point
/// goes stays closed. Groups referencing deleted entities are replaced by a
/// copy without those members, or, under [`GroupMemberPolicy::Refuse`],
/// nothing is planned. With `delete_orphaned_points`, untagged Points whose
/// every live referrer is deleted go too.
///
/// Returns `None` when nothing is left to delete or a gate declined.
///
/// # Errors
///
/// Returns `EntityNotFound` for an unknown id and the construction errors of
/// the planned commands.
///
/// # Example
///
/// ```
/// use geoedit_core::config::DeletionPolicy;
/// use geoedit_core::model::{Entity, LatLon};
/// use geoedit_core::ops::EditSession;
/// use geoedit_core::planner::plan_deletion;
/// use geoedit_core::policy::AlwaysConfirm;
///
/// let mut session = EditSession::new();
/// let point = Entity::point(LatLon::new(0.0, 0.0));
/// let id = point.id;
/// session.store_mut().add(point).unwrap();
///
/// let mut cmd = plan_deletion(&session, &[id], DeletionPolicy::default(), &AlwaysConfirm)
///     .unwrap()
///     .unwrap();
/// assert!(cmd.execute(&mut session).unwrap());
/// assert!(session.store().entity(id).unwrap().deleted);
/// ```
pub fn plan_deletion(
    session: &EditSession,
    selection: &[EntityId],
    policy: DeletionPolicy,
    gate: &dyn ConfirmationGate,
) -> Plan {
    let start = Instant::now();
    log_op_start!(
        "plan_deletion",
        selection_len = selection.len(),
        delete_orphaned_points = policy.delete_orphaned_points
    );
    let result = plan(session, selection, policy, gate);
    log_outcome("plan_deletion", start, &result);
    result
}

pub(crate) fn plan(
    session: &EditSession,
    selection: &[EntityId],
    policy: DeletionPolicy,
    gate: &dyn ConfirmationGate,
) -> Plan {
    let store = session.store();
    let mut doomed = live_selection(store, selection)?;
    if doomed.is_empty() {
        return Ok(None);
    }

    let groups = of_kind(store, &doomed, EntityKind::Group);
    if !groups.is_empty() && !gate.confirm(ConfirmationKind::DeleteGroups, &groups) {
        tracing::info!(groups = groups.len(), "deleting groups declined");
        return Ok(None);
    }

    if policy.delete_orphaned_points {
        let paths = of_kind(store, &doomed, EntityKind::Path);
        collect_orphans(store, &mut doomed, &paths);
    }

    let mut path_changes: BTreeMap<EntityId, Vec<EntityId>> = BTreeMap::new();
    let mut too_short = Vec::new();
    for path_id in outside_referrers(store, &doomed, EntityKind::Path) {
        match remaining_nodes(store.entity(path_id)?, &doomed) {
            Some(nodes) => {
                path_changes.insert(path_id, nodes);
            }
            None => too_short.push(path_id),
        }
    }
    if !too_short.is_empty() {
        doomed.extend(too_short.iter().copied());
        if policy.delete_orphaned_points {
            collect_orphans(store, &mut doomed, &too_short);
        }
    }

    if !confirm_working_area(session, &doomed, gate) {
        return Ok(None);
    }

    let groups = outside_referrers(store, &doomed, EntityKind::Group);
    let mut group_changes = Vec::with_capacity(groups.len());
    if !groups.is_empty() {
        if policy.group_members == GroupMemberPolicy::Refuse {
            tracing::warn!(groups = groups.len(), "surviving groups would lose members; nothing planned");
            return Ok(None);
        }
        let affected: Vec<EntityId> = groups.iter().copied().collect();
        if !gate.confirm(ConfirmationKind::RemoveFromGroups, &affected) {
            tracing::info!(groups = affected.len(), "removing members from groups declined");
            return Ok(None);
        }
        for group_id in groups {
            let stripped = without_members(store.entity(group_id)?, &doomed);
            group_changes.push(ChangeCommand::new(store, group_id, stripped)?);
        }
    }

    let mut commands: Vec<Box<dyn Command>> = Vec::new();
    for (path_id, nodes) in path_changes {
        commands.push(Box::new(ChangeNodesCommand::new(store, path_id, nodes)?));
    }
    for change in group_changes {
        commands.push(Box::new(change));
    }
    let delete = DeleteCommand::new(store, doomed)?;
    let name = delete.description();
    commands.push(Box::new(delete));
    Ok(Some(SequenceCommand::wrap(name, commands)))
}

/// Plan the deletion of `selection` together with everything referring to it
///
/// Returns `None` when nothing is left to delete or a gate declined.
///
/// # Errors
///
/// Returns `EntityNotFound` for an unknown id.
pub fn plan_deletion_with_references(
    session: &EditSession,
    selection: &[EntityId],
    gate: &dyn ConfirmationGate,
) -> Plan {
    let start = Instant::now();
    log_op_start!("plan_deletion_with_references", selection_len = selection.len());
    let result = plan_with_references(session, selection, gate);
    log_outcome("plan_deletion_with_references", start, &result);
    result
}

fn plan_with_references(
    session: &EditSession,
    selection: &[EntityId],
    gate: &dyn ConfirmationGate,
) -> Plan {
    let store = session.store();
    let mut frontier: Vec<EntityId> = live_selection(store, selection)?.into_iter().collect();
    let mut doomed = BTreeSet::new();
    while let Some(id) = frontier.pop() {
        if doomed.insert(id) {
            frontier.extend(
                store
                    .live_referrers(id)
                    .into_iter()
                    .filter(|r| !doomed.contains(r)),
            );
        }
    }
    if doomed.is_empty() || !confirm_working_area(session, &doomed, gate) {
        return Ok(None);
    }
    Ok(Some(Box::new(DeleteCommand::new(store, doomed)?)))
}

/// Selected entities that are not deleted yet
fn live_selection(store: &Store, selection: &[EntityId]) -> Result<BTreeSet<EntityId>> {
    let mut live = BTreeSet::new();
    for id in selection {
        if !store.entity(*id)?.deleted {
            live.insert(*id);
        }
    }
    Ok(live)
}

fn of_kind(store: &Store, ids: &BTreeSet<EntityId>, kind: EntityKind) -> Vec<EntityId> {
    ids.iter()
        .copied()
        .filter(|id| store.get(*id).is_some_and(|e| e.kind() == kind))
        .collect()
}

/// Live entities of `kind` outside `doomed` that refer into it
fn outside_referrers(
    store: &Store,
    doomed: &BTreeSet<EntityId>,
    kind: EntityKind,
) -> BTreeSet<EntityId> {
    doomed
        .iter()
        .flat_map(|id| store.live_referrers(*id))
        .filter(|r| !doomed.contains(r))
        .filter(|r| store.get(*r).is_some_and(|e| e.kind() == kind))
        .collect()
}

/// Add the untagged Points of `paths` that only doomed entities refer to
fn collect_orphans(store: &Store, doomed: &mut BTreeSet<EntityId>, paths: &[EntityId]) {
    let mut orphans = BTreeSet::new();
    for path in paths.iter().filter_map(|id| store.get(*id)) {
        for node in path.nodes() {
            if doomed.contains(node) || orphans.contains(node) {
                continue;
            }
            let Some(point) = store.get(*node) else {
                continue;
            };
            if point.deleted || point.is_tagged() {
                continue;
            }
            if store
                .live_referrers(*node)
                .iter()
                .all(|r| doomed.contains(r))
            {
                orphans.insert(*node);
            }
        }
    }
    doomed.extend(orphans);
}

/// Point list of `path` without doomed points, or `None` if it gets too short
fn remaining_nodes(path: &Entity, doomed: &BTreeSet<EntityId>) -> Option<Vec<EntityId>> {
    let mut nodes: Vec<EntityId> = path
        .nodes()
        .iter()
        .copied()
        .filter(|n| !doomed.contains(n))
        .collect();
    nodes.dedup();
    if path.is_closed() {
        if let (Some(first), Some(last)) = (nodes.first().copied(), nodes.last().copied()) {
            if first != last {
                nodes.push(first);
            }
        }
    }
    let distinct: BTreeSet<&EntityId> = nodes.iter().collect();
    (distinct.len() >= 2).then_some(nodes)
}

fn without_members(group: &Entity, doomed: &BTreeSet<EntityId>) -> Entity {
    let mut stripped = group.clone();
    if let EntityData::Group { members } = &mut stripped.data {
        members.retain(|m| !doomed.contains(&m.id));
    }
    stripped
}

/// Ask before flagging Points outside the working area; true when allowed
pub(crate) fn confirm_working_area(
    session: &EditSession,
    doomed: &BTreeSet<EntityId>,
    gate: &dyn ConfirmationGate,
) -> bool {
    let Some(area) = session.working_area() else {
        return true;
    };
    let outside: Vec<EntityId> = doomed
        .iter()
        .filter_map(|id| session.store().get(*id))
        .filter(|e| !e.is_new())
        .filter(|e| e.coor().is_some_and(|c| !area.contains(c)))
        .map(|e| e.id)
        .collect();
    if outside.is_empty() || gate.confirm(ConfirmationKind::OutsideWorkingArea, &outside) {
        return true;
    }
    tracing::info!(outside = outside.len(), "editing outside the working area declined");
    false
}
