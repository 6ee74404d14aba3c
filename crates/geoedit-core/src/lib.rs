//! geoedit Core - undoable editing of a geodata graph
//!
//! This crate provides the editing engine for a graph of Points, Paths and
//! Groups, including:
//! - Entity model, arena store with referrer index and batch notification
//! - Undoable commands with snapshot or explicit-inverse undo
//! - Atomic command sequences with rollback on partial failure
//! - Dependency-aware deletion planning and purging
//! - Topological ordering of entity sets
//! - Conflict detection and per-field conflict resolution
//! - Undo/redo history and store invariant validation
//!
//! ## Example
//!
//! ```
//! use geoedit_core::{plan_deletion, DeletionPolicy, EditSession, Entity, LatLon, UndoRedoHistory};
//! use geoedit_core::policy::AlwaysConfirm;
//!
//! let mut session = EditSession::new();
//! let a = Entity::point(LatLon::new(0.0, 0.0));
//! let b = Entity::point(LatLon::new(0.0, 1.0));
//! let path = Entity::path(vec![a.id, b.id]);
//! let (a_id, path_id) = (a.id, path.id);
//! session.store_mut().add(a).unwrap();
//! session.store_mut().add(b).unwrap();
//! session.store_mut().add(path).unwrap();
//!
//! let mut history = UndoRedoHistory::default();
//! let cmd = plan_deletion(&session, &[a_id], DeletionPolicy::default(), &AlwaysConfirm)
//!     .unwrap()
//!     .unwrap();
//! assert!(history.submit(&mut session, cmd).unwrap());
//! assert!(session.store().entity(path_id).unwrap().deleted);
//!
//! history.undo_last(&mut session).unwrap();
//! assert!(!session.store().entity(path_id).unwrap().deleted);
//! ```

pub mod commands;
pub mod config;
pub mod conflict;
pub mod errors;
pub mod history;
pub mod logging_facility;
pub mod model;
pub mod ops;
pub mod planner;
pub mod policy;
pub mod rules;
pub mod traversal;

// Re-export commonly used types
pub use commands::{Command, CommandCategory, SequenceCommand};
pub use config::{DeletionPolicy, EditConfig};
pub use conflict::{Conflict, ConflictCollection, MergeDecision};
pub use errors::{EditError, ExError, ExErrorKind, Result};
pub use history::UndoRedoHistory;
pub use model::{Entity, EntityId, EntityKind, LatLon, Member};
pub use ops::{EditSession, Store};
pub use planner::plan_deletion;
pub use policy::{ConfirmationGate, ConfirmationKind};
pub use traversal::topo_sort;

// Used by the logging macros
#[doc(hidden)]
pub use geoedit_core_types as __types;
#[doc(hidden)]
pub use tracing as __tracing;
