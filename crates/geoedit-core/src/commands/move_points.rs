use crate::commands::{count_text, Command, CommandCategory};
use crate::errors::{EditError, Result};
use crate::model::{EntityData, EntityId, EntityKind, LatLon};
use crate::ops::{EditSession, Store};

/// Offset Points, and every Point of the given Paths, by a lat/lon delta
///
/// Keeps the previous coordinate and modified flag of each moved Point as
/// its inverse instead of snapshotting whole entities.
#[derive(Debug)]
pub struct MoveCommand {
    points: Vec<EntityId>,
    dlat: f64,
    dlon: f64,
    previous: Vec<(EntityId, LatLon, bool)>,
    executed: bool,
}

impl MoveCommand {
    /// # Errors
    ///
    /// Returns `EmptyCollection` for an empty selection, `EntityNotFound`
    /// for an unknown entity, and `InvalidInput` for a non-finite delta.
    pub fn new(store: &Store, ids: &[EntityId], dlat: f64, dlon: f64) -> Result<Self> {
        if ids.is_empty() {
            return Err(EditError::EmptyCollection {
                what: "MoveCommand entities".to_string(),
            });
        }
        if !dlat.is_finite() || !dlon.is_finite() {
            return Err(EditError::InvalidInput {
                reason: "move delta must be finite".to_string(),
            });
        }

        let mut points = Vec::new();
        let push = |id: EntityId, points: &mut Vec<EntityId>| -> Result<()> {
            let point = store.entity(id)?;
            if point.coor().is_some() && !points.contains(&id) {
                points.push(id);
            }
            Ok(())
        };
        for id in ids {
            let entity = store.entity(*id)?;
            match &entity.data {
                EntityData::Point { .. } => push(*id, &mut points)?,
                EntityData::Path { nodes } => {
                    for node in nodes {
                        push(*node, &mut points)?;
                    }
                }
                EntityData::Group { .. } => {}
            }
        }

        Ok(Self {
            points,
            dlat,
            dlon,
            previous: Vec::new(),
            executed: false,
        })
    }

    /// Points that will move
    pub fn points(&self) -> &[EntityId] {
        &self.points
    }
}

impl Command for MoveCommand {
    fn description(&self) -> String {
        format!("Move {}", count_text(self.points.len(), "point", "points"))
    }

    fn category(&self) -> CommandCategory {
        CommandCategory::Move
    }

    fn affected_entities(&self) -> Vec<EntityId> {
        self.points.clone()
    }

    fn apply(&mut self, session: &mut EditSession) -> Result<bool> {
        if self.executed {
            return Err(EditError::AlreadyExecuted {
                description: self.description(),
            });
        }

        let mut previous = Vec::with_capacity(self.points.len());
        for id in &self.points {
            match session.store().get(*id) {
                Some(p) if !p.deleted && p.kind() == EntityKind::Point => match p.coor() {
                    Some(coor) => previous.push((*id, coor, p.modified)),
                    None => return Ok(false),
                },
                _ => return Ok(false),
            }
        }

        let (dlat, dlon) = (self.dlat, self.dlon);
        session.store_mut().batch(|store| {
            previous.iter().try_for_each(|(id, coor, _)| {
                store.update(*id, |p| {
                    p.data = EntityData::Point {
                        coor: Some(coor.offset(dlat, dlon)),
                    };
                    p.modified = true;
                })
            })
        })?;
        self.previous = previous;
        self.executed = true;
        Ok(true)
    }

    fn undo(&mut self, session: &mut EditSession) -> Result<()> {
        if !self.executed {
            return Err(EditError::NotExecuted {
                description: self.description(),
            });
        }
        let previous = std::mem::take(&mut self.previous);
        session.store_mut().batch(|store| {
            previous.iter().rev().try_for_each(|(id, coor, modified)| {
                store.update(*id, |p| {
                    p.data = EntityData::Point { coor: Some(*coor) };
                    p.modified = *modified;
                })
            })
        })?;
        self.executed = false;
        Ok(())
    }
}
