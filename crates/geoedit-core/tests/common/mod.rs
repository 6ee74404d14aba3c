pub mod graph;

use geoedit_core::rules::validate_store;
use geoedit_core::{EditSession, Entity, EntityId, EntityKind, LatLon, Member};

/// Create a new empty EditSession for testing
#[allow(dead_code)]
pub fn new_session() -> EditSession {
    EditSession::new()
}

/// Add a new Point at the given coordinate
#[allow(dead_code)]
pub fn add_point(session: &mut EditSession, lat: f64, lon: f64) -> EntityId {
    let point = Entity::point(LatLon::new(lat, lon));
    let id = point.id;
    session.store_mut().add(point).unwrap();
    id
}

/// Add a new tagged Point, which the deletion planner never treats as an orphan
#[allow(dead_code)]
pub fn add_tagged_point(session: &mut EditSession, lat: f64, lon: f64, name: &str) -> EntityId {
    let point = Entity::point(LatLon::new(lat, lon)).with_tag("name", name);
    let id = point.id;
    session.store_mut().add(point).unwrap();
    id
}

/// Add a new Path over existing points
#[allow(dead_code)]
pub fn add_path(session: &mut EditSession, nodes: &[EntityId]) -> EntityId {
    let path = Entity::path(nodes.to_vec());
    let id = path.id;
    session.store_mut().add(path).unwrap();
    id
}

/// Add a Path together with `count` fresh points laid out along a line
///
/// Returns the path id followed by its point ids in order.
#[allow(dead_code)]
pub fn add_line(session: &mut EditSession, count: usize) -> (EntityId, Vec<EntityId>) {
    let points: Vec<EntityId> = (0..count)
        .map(|i| add_point(session, 0.0, i as f64 * 0.001))
        .collect();
    let path = add_path(session, &points);
    (path, points)
}

/// Add a new Group with the given `(role, id)` members
///
/// Member kinds are read back from the store.
#[allow(dead_code)]
pub fn add_group(session: &mut EditSession, members: &[(&str, EntityId)]) -> EntityId {
    let members: Vec<Member> = members
        .iter()
        .map(|(role, id)| {
            let kind = session.store().entity(*id).unwrap().kind();
            Member::new(*role, kind, *id)
        })
        .collect();
    let group = Entity::group(members);
    let id = group.id;
    session.store_mut().add(group).unwrap();
    id
}

/// Mark an entity as loaded from a remote source
#[allow(dead_code)]
pub fn mark_downloaded(session: &mut EditSession, id: EntityId, external_id: i64) {
    session
        .store_mut()
        .update(id, |e| {
            e.external_id = external_id;
            e.version = 1;
        })
        .unwrap();
}

#[allow(dead_code)]
pub fn is_deleted(session: &EditSession, id: EntityId) -> bool {
    session.store().entity(id).unwrap().deleted
}

#[allow(dead_code)]
pub fn kind_of(session: &EditSession, id: EntityId) -> EntityKind {
    session.store().entity(id).unwrap().kind()
}

/// Assert the store satisfies every structural invariant
#[allow(dead_code)]
pub fn assert_store_valid(session: &EditSession) {
    if let Err(err) = validate_store(session.store()) {
        panic!("store invariant violated: {err}");
    }
}
