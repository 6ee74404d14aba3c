use serde::{Deserialize, Serialize};

use crate::model::LatLon;

/// Axis-aligned lat/lon rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min: LatLon,
    pub max: LatLon,
}

impl BBox {
    /// Bounding box spanning the two corners in any order
    pub fn new(a: LatLon, b: LatLon) -> Self {
        Self {
            min: LatLon::new(a.lat.min(b.lat), a.lon.min(b.lon)),
            max: LatLon::new(a.lat.max(b.lat), a.lon.max(b.lon)),
        }
    }

    /// Inclusive containment test
    pub fn contains(&self, coor: LatLon) -> bool {
        coor.lat >= self.min.lat
            && coor.lat <= self.max.lat
            && coor.lon >= self.min.lon
            && coor.lon <= self.max.lon
    }
}

/// Region for which data was downloaded into the session
///
/// Editing entities outside of it is allowed but gated by a confirmation,
/// since the user cannot see what else references them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkingArea {
    boxes: Vec<BBox>,
}

impl WorkingArea {
    pub fn new(boxes: Vec<BBox>) -> Self {
        Self { boxes }
    }

    pub fn add(&mut self, bbox: BBox) {
        self.boxes.push(bbox);
    }

    pub fn boxes(&self) -> &[BBox] {
        &self.boxes
    }

    pub fn contains(&self, coor: LatLon) -> bool {
        self.boxes.iter().any(|b| b.contains(coor))
    }
}
