//! Conflicts between local entities and versions obtained elsewhere
//!
//! [`detect_divergence`] files a [`Conflict`] when a remote version and a
//! local edit cannot both be kept; [`build_resolution`] turns the user's
//! decisions for one conflict into a single undoable command.

pub mod collection;
pub mod divergence;
pub mod resolution;

pub use collection::{Conflict, ConflictCollection, ConflictId, MergeDecision, Side};
pub use divergence::{detect_divergence, Divergence};
pub use resolution::{build_resolution, ResolutionPlan};
