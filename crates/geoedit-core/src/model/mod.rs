pub mod area;
pub mod entity;
pub mod snapshot;

pub use area::{BBox, WorkingArea};
pub use entity::{Entity, EntityData, EntityId, EntityKind, LatLon, Member, Tags};
pub use snapshot::Snapshot;
