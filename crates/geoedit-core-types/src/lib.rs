//! Identifiers and log schema shared by the geoedit crates
//!
//! Kept apart from `geoedit-core` so that anything consuming the engine's
//! structured logs can match on the same keys without depending on the engine.
//!
//! - [`CommandId`] and [`SessionId`] correlate log events
//! - [`schema`] names the structured fields and boundary events

pub mod correlation;
pub mod schema;

pub use correlation::{CommandId, SessionId};
