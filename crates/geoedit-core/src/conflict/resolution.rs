use std::time::Instant;

use crate::commands::{
    Command, CoordinateConflictResolver, DeletedStateConflictResolver,
    GroupMembersConflictResolver, ListMergeEntry, ModifiedConflictResolver,
    PathPointsConflictResolver, SequenceCommand, TagConflictResolver, TagMergeItem,
    VersionConflictResolver,
};
use crate::conflict::MergeDecision;
use crate::errors::{EditError, Result};
use crate::model::EntityId;
use crate::ops::EditSession;
use crate::{log_op_end, log_op_error, log_op_start};

/// Decisions taken for one conflict
///
/// Unset fields are left alone. `finalize` settles the version and the
/// modified flag too, which closes the conflict for good.
#[derive(Debug, Clone, Default)]
pub struct ResolutionPlan {
    pub deleted_state: Option<MergeDecision>,
    pub coordinates: Option<MergeDecision>,
    pub tags: Vec<TagMergeItem>,
    pub nodes: Option<Vec<ListMergeEntry>>,
    pub members: Option<Vec<ListMergeEntry>>,
    pub finalize: Option<MergeDecision>,
}

impl ResolutionPlan {
    pub fn is_empty(&self) -> bool {
        self.deleted_state.is_none()
            && self.coordinates.is_none()
            && self.tags.is_empty()
            && self.nodes.is_none()
            && self.members.is_none()
            && self.finalize.is_none()
    }
}

/// Assemble the resolvers of `plan` into one "Conflict Resolution" sequence
///
/// # Errors
///
/// Returns `EmptyCollection` for an empty plan and the construction errors
/// of the individual resolvers.
pub fn build_resolution(
    session: &EditSession,
    mine: EntityId,
    plan: ResolutionPlan,
) -> Result<SequenceCommand> {
    let start = Instant::now();
    log_op_start!("build_resolution", entity_id = %mine);
    let result = assemble(session, mine, plan);
    match &result {
        Ok(seq) => {
            log_op_end!(
                "build_resolution",
                duration_ms = start.elapsed().as_millis() as u64,
                command_count = seq.len()
            );
        }
        Err(err) => {
            log_op_error!(
                "build_resolution",
                err.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
        }
    }
    result
}

fn assemble(session: &EditSession, mine: EntityId, plan: ResolutionPlan) -> Result<SequenceCommand> {
    if plan.is_empty() {
        return Err(EditError::EmptyCollection {
            what: "resolution plan".to_string(),
        });
    }
    let mut commands: Vec<Box<dyn Command>> = Vec::new();
    if let Some(decision) = plan.deleted_state {
        commands.push(Box::new(DeletedStateConflictResolver::new(session, mine, decision)?));
    }
    if let Some(decision) = plan.coordinates {
        commands.push(Box::new(CoordinateConflictResolver::new(session, mine, decision)?));
    }
    if !plan.tags.is_empty() {
        commands.push(Box::new(TagConflictResolver::new(session, mine, plan.tags)?));
    }
    if let Some(entries) = plan.nodes {
        commands.push(Box::new(PathPointsConflictResolver::new(session, mine, &entries)?));
    }
    if let Some(entries) = plan.members {
        commands.push(Box::new(GroupMembersConflictResolver::new(session, mine, &entries)?));
    }
    if let Some(decision) = plan.finalize {
        commands.push(Box::new(VersionConflictResolver::new(session, mine, decision)?));
        commands.push(Box::new(ModifiedConflictResolver::new(session, mine, decision)?));
    }
    Ok(SequenceCommand::new("Conflict Resolution", commands))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::CommandCategory;
    use crate::conflict::Conflict;
    use crate::model::{Entity, LatLon};

    fn conflicted() -> (EditSession, EntityId) {
        let mut session = EditSession::new();
        let mut mine = Entity::point(LatLon::new(0.0, 0.0))
            .with_external_id(3, 1)
            .with_tag("name", "Oak");
        mine.modified = true;
        let mut theirs = Entity::point(LatLon::new(1.0, 1.0))
            .with_external_id(3, 2)
            .with_tag("name", "Elm");
        theirs.modified = false;
        let id = mine.id;
        let conflict = Conflict::new(&mine, theirs).unwrap();
        session.store_mut().add(mine).unwrap();
        session.conflicts_mut().add(conflict).unwrap();
        (session, id)
    }

    #[test]
    fn test_final_plan_settles_version_and_flag() {
        let (mut session, mine) = conflicted();
        let before = session.store().dump();
        let theirs = session.conflicts().get_for_mine(mine).unwrap().theirs().clone();
        let local = session.store().entity(mine).unwrap().clone();
        let plan = ResolutionPlan {
            coordinates: Some(MergeDecision::KeepTheirs),
            tags: TagMergeItem::diff(&local, &theirs)
                .into_iter()
                .map(|i| i.with_decision(MergeDecision::KeepTheirs))
                .collect(),
            finalize: Some(MergeDecision::KeepTheirs),
            ..ResolutionPlan::default()
        };

        let mut seq = build_resolution(&session, mine, plan).unwrap();
        assert_eq!(seq.description(), "Conflict Resolution");
        assert_eq!(seq.len(), 4);
        assert_eq!(seq.commands()[0].category(), CommandCategory::ConflictResolution);
        assert!(seq.execute(&mut session).unwrap());

        let resolved = session.store().entity(mine).unwrap();
        assert!(resolved.has_equal_semantic_attributes(&theirs));
        assert_eq!(resolved.version, 2);
        assert!(!resolved.modified);
        assert!(session.conflicts().is_empty());

        seq.undo(&mut session).unwrap();
        assert_eq!(session.store().dump(), before);
        assert!(session.conflicts().has_conflict_for(mine));
    }

    #[test]
    fn test_empty_plan_is_rejected() {
        let (session, mine) = conflicted();
        assert!(matches!(
            build_resolution(&session, mine, ResolutionPlan::default()),
            Err(EditError::EmptyCollection { .. })
        ));
    }
}
