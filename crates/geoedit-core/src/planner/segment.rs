use std::time::Instant;

use crate::commands::{AddCommand, ChangeNodesCommand, Command, SequenceCommand};
use crate::errors::{EditError, Result};
use crate::log_op_start;
use crate::model::{Entity, EntityId, EntityKind};
use crate::ops::EditSession;
use crate::planner::deletion::plan;
use crate::planner::{log_outcome, Plan};
use crate::policy::ConfirmationGate;

/// Plan the removal of the segment between points `lower_index` and
/// `lower_index + 1` of `path`
///
/// An open Path is cut in two: the side with fewer than two points is
/// dropped, and when both sides keep two or more the second one becomes a
/// new Path carrying the same tags. A closed Path is opened at the segment
/// instead. When nothing usable remains the whole Path is deleted through
/// [`plan_deletion`](crate::planner::plan_deletion) with the session's
/// deletion policy.
///
/// # Errors
///
/// Returns lookup errors if `path` is not a live, complete Path, and
/// `InvalidInput` when `lower_index` is not the start of a segment.
pub fn plan_segment_deletion(
    session: &EditSession,
    path: EntityId,
    lower_index: usize,
    gate: &dyn ConfirmationGate,
) -> Plan {
    let start = Instant::now();
    log_op_start!("plan_segment_deletion", entity_id = %path, index = lower_index);
    let result = plan_segment(session, path, lower_index, gate);
    log_outcome("plan_segment_deletion", start, &result);
    result
}

fn plan_segment(
    session: &EditSession,
    path_id: EntityId,
    lower_index: usize,
    gate: &dyn ConfirmationGate,
) -> Plan {
    let store = session.store();
    let path = segment_path(session, path_id)?;
    let nodes = path.nodes();
    if lower_index >= nodes.len().saturating_sub(1) {
        return Err(EditError::InvalidInput {
            reason: format!(
                "segment {} out of range for path {} with {} points",
                lower_index,
                path_id,
                nodes.len()
            ),
        });
    }

    if path.is_closed() {
        let ring = &nodes[..nodes.len() - 1];
        let mut opened: Vec<EntityId> = ring[lower_index + 1..].to_vec();
        opened.extend_from_slice(&ring[..=lower_index]);
        if opened.len() < 2 {
            return plan(session, &[path_id], session.config().deletion, gate);
        }
        return Ok(Some(Box::new(ChangeNodesCommand::new(store, path_id, opened)?)));
    }

    let first = nodes[..=lower_index].to_vec();
    let second = nodes[lower_index + 1..].to_vec();
    match (first.len() >= 2, second.len() >= 2) {
        (false, false) => plan(session, &[path_id], session.config().deletion, gate),
        (true, false) => Ok(Some(Box::new(ChangeNodesCommand::new(store, path_id, first)?))),
        (false, true) => Ok(Some(Box::new(ChangeNodesCommand::new(store, path_id, second)?))),
        (true, true) => {
            let mut split = Entity::path(second);
            split.tags = path.tags.clone();
            let commands: Vec<Box<dyn Command>> = vec![
                Box::new(ChangeNodesCommand::new(store, path_id, first)?),
                Box::new(AddCommand::new(store, split)?),
            ];
            Ok(Some(Box::new(SequenceCommand::new(
                "Split path segment",
                commands,
            ))))
        }
    }
}

fn segment_path(session: &EditSession, id: EntityId) -> Result<&Entity> {
    let path = session.store().live(id)?;
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
