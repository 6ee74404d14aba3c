use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Tag map of an entity (key -> value), kept sorted for deterministic output
pub type Tags = BTreeMap<String, String>;

static NEXT_ENTITY_ID: AtomicU64 = AtomicU64::new(1);

/// Process-local identity of an entity
///
/// Unique for the lifetime of the process, independent of the external
/// identity assigned by a remote data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Allocate a fresh process-local identity
    pub fn generate() -> Self {
        Self(NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The three kinds of entity in the edited graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Point,
    Path,
    Group,
}

impl EntityKind {
    /// Singular display name
    pub fn name(self) -> &'static str {
        match self {
            EntityKind::Point => "point",
            EntityKind::Path => "path",
            EntityKind::Group => "group",
        }
    }

    /// Plural display name
    pub fn plural(self) -> &'static str {
        match self {
            EntityKind::Point => "points",
            EntityKind::Path => "paths",
            EntityKind::Group => "groups",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Geographic coordinate in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Coordinate shifted by the given deltas
    pub fn offset(self, dlat: f64, dlon: f64) -> Self {
        Self {
            lat: self.lat + dlat,
            lon: self.lon + dlon,
        }
    }
}

/// Typed, roled reference from a Group to another entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Member {
    pub role: String,
    pub kind: EntityKind,
    pub id: EntityId,
}

impl Member {
    pub fn new(role: impl Into<String>, kind: EntityKind, id: EntityId) -> Self {
        Self {
            role: role.into(),
            kind,
            id,
        }
    }
}

/// Kind-specific content of an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityData {
    /// A point; coordinates are absent only while incomplete
    Point { coor: Option<LatLon> },
    /// Ordered point references; a closed path has first == last
    Path { nodes: Vec<EntityId> },
    /// Ordered, roled references to entities of any kind
    Group { members: Vec<Member> },
}

impl EntityData {
    /// Empty content for the given kind
    pub fn empty(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Point => EntityData::Point { coor: None },
            EntityKind::Path => EntityData::Path { nodes: Vec::new() },
            EntityKind::Group => EntityData::Group {
                members: Vec::new(),
            },
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            EntityData::Point { .. } => EntityKind::Point,
            EntityData::Path { .. } => EntityKind::Path,
            EntityData::Group { .. } => EntityKind::Group,
        }
    }

    /// True when the content carries no geometry and no references
    pub fn is_empty(&self) -> bool {
        match self {
            EntityData::Point { coor } => coor.is_none(),
            EntityData::Path { nodes } => nodes.is_empty(),
            EntityData::Group { members } => members.is_empty(),
        }
    }
}

/// An entity of the edited graph
///
/// Entities are plain values. The [`Store`](crate::ops::Store) owns the live
/// copy of each one and keeps the referrer index consistent; commands read a
/// copy, modify it and hand it back to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Process-local identity
    pub id: EntityId,

    /// Stable external identity; zero or negative means "new", never uploaded
    pub external_id: i64,

    /// Version counter of the external identity
    pub version: u32,

    pub tags: Tags,

    /// Deleted flag; a deleted entity stays in the store until purged
    pub deleted: bool,

    /// Modified since it was loaded from its source
    pub modified: bool,

    /// Placeholder with known identity but unknown content
    pub incomplete: bool,

    pub data: EntityData,
}

impl Entity {
    fn with_data(data: EntityData) -> Self {
        Self {
            id: EntityId::generate(),
            external_id: 0,
            version: 0,
            tags: Tags::new(),
            deleted: false,
            modified: false,
            incomplete: false,
            data,
        }
    }

    /// New point at the given coordinate
    pub fn point(coor: LatLon) -> Self {
        Self::with_data(EntityData::Point { coor: Some(coor) })
    }

    /// New path over the given points
    pub fn path(nodes: Vec<EntityId>) -> Self {
        Self::with_data(EntityData::Path { nodes })
    }

    /// New group with the given members
    pub fn group(members: Vec<Member>) -> Self {
        Self::with_data(EntityData::Group { members })
    }

    /// Incomplete placeholder of the given kind with a fresh identity
    pub fn incomplete(kind: EntityKind, external_id: i64) -> Self {
        let mut entity = Self::with_data(EntityData::empty(kind));
        entity.external_id = external_id;
        entity.incomplete = true;
        entity
    }

    /// Incomplete placeholder that keeps this entity's identities
    pub fn to_placeholder(&self) -> Self {
        Self {
            id: self.id,
            external_id: self.external_id,
            version: 0,
            tags: Tags::new(),
            deleted: false,
            modified: false,
            incomplete: true,
            data: EntityData::empty(self.kind()),
        }
    }

    /// Set the external identity and version
    pub fn with_external_id(mut self, external_id: i64, version: u32) -> Self {
        self.external_id = external_id;
        self.version = version;
        self
    }

    /// Add a tag
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn kind(&self) -> EntityKind {
        self.data.kind()
    }

    /// True when the entity was never assigned an external identity
    pub fn is_new(&self) -> bool {
        self.external_id <= 0
    }

    pub fn is_tagged(&self) -> bool {
        !self.tags.is_empty()
    }

    /// Neither deleted nor incomplete
    pub fn is_usable(&self) -> bool {
        !self.deleted && !self.incomplete
    }

    pub fn coor(&self) -> Option<LatLon> {
        match &self.data {
            EntityData::Point { coor } => *coor,
            EntityData::Path { .. } | EntityData::Group { .. } => None,
        }
    }

    /// Point references of a path; empty for other kinds
    pub fn nodes(&self) -> &[EntityId] {
        match &self.data {
            EntityData::Path { nodes } => nodes,
            EntityData::Point { .. } | EntityData::Group { .. } => &[],
        }
    }

    /// Members of a group; empty for other kinds
    pub fn members(&self) -> &[Member] {
        match &self.data {
            EntityData::Group { members } => members,
            EntityData::Point { .. } | EntityData::Path { .. } => &[],
        }
    }

    /// True for a path with at least two points whose first point equals its last
    pub fn is_closed(&self) -> bool {
        match self.nodes() {
            [first, .., last] => first == last,
            _ => false,
        }
    }

    /// Every entity referenced by this one, in order, duplicates included
    pub fn referenced_ids(&self) -> Vec<EntityId> {
        match &self.data {
            EntityData::Point { .. } => Vec::new(),
            EntityData::Path { nodes } => nodes.clone(),
            EntityData::Group { members } => members.iter().map(|m| m.id).collect(),
        }
    }

    /// Compare tags, content and deleted state, ignoring identity and flags
    pub fn has_equal_semantic_attributes(&self, other: &Entity) -> bool {
        self.kind() == other.kind()
            && self.tags == other.tags
            && self.data == other.data
            && self.deleted == other.deleted
    }

    /// Short label used in command descriptions
    pub fn label(&self) -> String {
        match self.tags.get("name") {
            Some(name) => format!("{} \"{}\"", self.kind(), name),
            None => format!("{} {}", self.kind(), self.id),
        }
    }
}
