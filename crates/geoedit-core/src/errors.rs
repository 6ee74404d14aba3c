use thiserror::Error;

use crate::model::{EntityId, EntityKind};

/// Result type alias using EditError
pub type Result<T> = std::result::Result<T, EditError>;

/// Coarse classification of [`EditError`]
///
/// Several `EditError` variants can share a kind. The code returned by
/// [`ExErrorKind::code`] is what logs and callers match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Precondition
    InvalidInput,
    NotFound,
    AlreadyExists,
    Deleted,
    KindMismatch,
    MissingReference,
    StillReferenced,
    InvalidPath,
    IncompleteEntity,
    UndecidedMerge,

    // Command lifecycle
    NotExecuted,
    AlreadyExecuted,
    UndoUnsupported,
    RestoreFailed,

    // Composite
    SequenceFailed,

    // Structural consistency
    CycleDetected,
    SortIncomplete,
    InvariantViolation,

    // Conflicts
    ConflictExists,
    ConflictNotFound,

    // Integration
    Serialization,

    // Internal
    Internal,
}

impl ExErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::AlreadyExists => "ERR_ALREADY_EXISTS",
            ExErrorKind::Deleted => "ERR_DELETED",
            ExErrorKind::KindMismatch => "ERR_KIND_MISMATCH",
            ExErrorKind::MissingReference => "ERR_MISSING_REFERENCE",
            ExErrorKind::StillReferenced => "ERR_STILL_REFERENCED",
            ExErrorKind::InvalidPath => "ERR_INVALID_PATH",
            ExErrorKind::IncompleteEntity => "ERR_INCOMPLETE_ENTITY",
            ExErrorKind::UndecidedMerge => "ERR_UNDECIDED_MERGE",
            ExErrorKind::NotExecuted => "ERR_NOT_EXECUTED",
            ExErrorKind::AlreadyExecuted => "ERR_ALREADY_EXECUTED",
            ExErrorKind::UndoUnsupported => "ERR_UNDO_UNSUPPORTED",
            ExErrorKind::RestoreFailed => "ERR_RESTORE_FAILED",
            ExErrorKind::SequenceFailed => "ERR_SEQUENCE_FAILED",
            ExErrorKind::CycleDetected => "ERR_CYCLE_DETECTED",
            ExErrorKind::SortIncomplete => "ERR_SORT_INCOMPLETE",
            ExErrorKind::InvariantViolation => "ERR_INVARIANT_VIOLATION",
            ExErrorKind::ConflictExists => "ERR_CONFLICT_EXISTS",
            ExErrorKind::ConflictNotFound => "ERR_CONFLICT_NOT_FOUND",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Flattened view of an [`EditError`] for logs and callers across a boundary
///
/// Built with `From<EditError>`; sequence failures keep their failing
/// sub-command as `source` and its position as `index`.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    index: Option<usize>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_id: None,
            index: None,
            message: String::new(),
            source: None,
        }
    }

    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Position of the failing sub-command
    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " {op}")?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        match (&self.entity_id, self.index) {
            (Some(id), Some(index)) => write!(f, " [{id} at #{index}]"),
            (Some(id), None) => write!(f, " [{id}]"),
            (None, Some(index)) => write!(f, " [at #{index}]"),
            (None, None) => Ok(()),
        }
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|s| s as &(dyn std::error::Error + 'static))
    }
}

/// Error taxonomy for editing operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditError {
    // ===== Preconditions =====
    /// Entity is not in the store
    #[error("Entity not found: {id}")]
    EntityNotFound { id: EntityId },

    /// Entity identity is already taken
    #[error("Entity already exists: {id}")]
    EntityAlreadyExists { id: EntityId },

    /// Entity is flagged deleted and cannot take part in the operation
    #[error("Entity was deleted: {id}")]
    EntityDeleted { id: EntityId },

    /// Entity has a different kind than required
    #[error("Entity {id} is a {actual}, expected a {expected}")]
    KindMismatch {
        id: EntityId,
        expected: EntityKind,
        actual: EntityKind,
    },

    /// Entity references an identity that is not in the store
    #[error("Entity {id} references missing entity {missing}")]
    MissingReference { id: EntityId, missing: EntityId },

    /// Entity cannot be removed while other entities refer to it
    #[error("Entity {id} is still referenced by {referrers:?}")]
    StillReferenced {
        id: EntityId,
        referrers: Vec<EntityId>,
    },

    /// A command was constructed with an empty collection
    #[error("Empty collection passed to {what}")]
    EmptyCollection { what: String },

    /// A path would be left with exactly one point
    #[error("Path {id} would have {len} point(s); a path needs 0 or at least 2")]
    InvalidPath { id: EntityId, len: usize },

    /// Incomplete entities may only be replaced wholesale
    #[error("Entity {id} is incomplete")]
    IncompleteEntity { id: EntityId },

    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    /// A resolver was asked to apply an undecided merge decision
    #[error("Cannot resolve conflict on {id} with an undecided decision")]
    UndecidedMergeDecision { id: EntityId },

    // ===== Conflicts =====
    #[error("A conflict for entity {id} already exists")]
    ConflictAlreadyExists { id: EntityId },

    #[error("No conflict recorded for entity {id}")]
    ConflictNotFound { id: EntityId },

    // ===== Command lifecycle =====
    /// Undo called on a command that has not been executed
    #[error("Command '{description}' has not been executed")]
    NotExecuted { description: String },

    /// Execute called twice without undo in between
    #[error("Command '{description}' was already executed")]
    AlreadyExecuted { description: String },

    #[error("Command '{description}' does not support undo")]
    UndoUnsupported { description: String },

    /// Execute failed and its snapshot could not be loaded back either
    #[error("Command '{description}' failed and could not be restored ({restore_error}): {source}")]
    RestoreFailed {
        description: String,
        source: Box<EditError>,
        restore_error: String,
    },

    /// Undo called on a composite whose execute did not complete
    #[error("Sequence '{description}' did not complete; nothing to undo")]
    SequenceIncomplete { description: String },

    /// A sub-command of a composite raised an error
    #[error("Sequence '{description}' failed at command {index} of {commands:?}: {source}")]
    SequenceFailed {
        description: String,
        index: usize,
        commands: Vec<String>,
        source: Box<EditError>,
        rollback_error: Option<String>,
    },

    // ===== Structural consistency =====
    /// Group references form a cycle
    #[error("Reference cycle among groups {remaining:?}")]
    ReferenceCycle { remaining: Vec<EntityId> },

    /// The sorter could not place every entity
    #[error("Topological sort left {remaining:?} unplaced")]
    TopologicalSortFailed { remaining: Vec<EntityId> },

    /// A live entity references a deleted entity
    #[error("Entity {id} references deleted entity {target}")]
    DanglingReference { id: EntityId, target: EntityId },

    #[error("Path {id} has exactly one point")]
    ShortPath { id: EntityId },

    // ===== Integration =====
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<EditError> for ExError {
    fn from(err: EditError) -> Self {
        match err {
            EditError::EntityNotFound { id } => ExError::new(ExErrorKind::NotFound)
                .with_entity_id(id.to_string())
                .with_message("Entity not found"),

            EditError::EntityAlreadyExists { id } => ExError::new(ExErrorKind::AlreadyExists)
                .with_entity_id(id.to_string())
                .with_message("Entity already exists"),

            EditError::EntityDeleted { id } => ExError::new(ExErrorKind::Deleted)
                .with_entity_id(id.to_string())
                .with_message("Entity was deleted"),

            EditError::KindMismatch {
                id,
                expected,
                actual,
            } => ExError::new(ExErrorKind::KindMismatch)
                .with_entity_id(id.to_string())
                .with_message(format!("Expected {}, found {}", expected, actual)),

            EditError::MissingReference { id, missing } => {
                ExError::new(ExErrorKind::MissingReference)
                    .with_entity_id(id.to_string())
                    .with_message(format!("References missing entity {}", missing))
            }

            EditError::StillReferenced { id, referrers } => {
                ExError::new(ExErrorKind::StillReferenced)
                    .with_entity_id(id.to_string())
                    .with_message(format!("Still referenced by {} entities", referrers.len()))
            }

            EditError::EmptyCollection { what } => ExError::new(ExErrorKind::InvalidInput)
                .with_op(what)
                .with_message("Empty collection"),

            EditError::InvalidPath { id, len } => ExError::new(ExErrorKind::InvalidPath)
                .with_entity_id(id.to_string())
                .with_message(format!("Path would have {} point(s)", len)),

            EditError::IncompleteEntity { id } => ExError::new(ExErrorKind::IncompleteEntity)
                .with_entity_id(id.to_string())
                .with_message("Entity is incomplete"),

            EditError::InvalidInput { reason } => {
                ExError::new(ExErrorKind::InvalidInput).with_message(reason)
            }

            EditError::UndecidedMergeDecision { id } => ExError::new(ExErrorKind::UndecidedMerge)
                .with_entity_id(id.to_string())
                .with_message("Merge decision is undecided"),

            EditError::ConflictAlreadyExists { id } => ExError::new(ExErrorKind::ConflictExists)
                .with_entity_id(id.to_string())
                .with_message("Conflict already exists"),

            EditError::ConflictNotFound { id } => ExError::new(ExErrorKind::ConflictNotFound)
                .with_entity_id(id.to_string())
                .with_message("Conflict not found"),

            EditError::NotExecuted { description } => ExError::new(ExErrorKind::NotExecuted)
                .with_op(description)
                .with_message("Command has not been executed"),

            EditError::AlreadyExecuted { description } => {
                ExError::new(ExErrorKind::AlreadyExecuted)
                    .with_op(description)
                    .with_message("Command was already executed")
            }

            EditError::UndoUnsupported { description } => {
                ExError::new(ExErrorKind::UndoUnsupported)
                    .with_op(description)
                    .with_message("Command does not support undo")
            }

            EditError::RestoreFailed {
                description,
                source,
                restore_error,
            } => ExError::new(ExErrorKind::RestoreFailed)
                .with_op(description)
                .with_message(format!("Restore failed: {restore_error}"))
                .with_source(ExError::from(*source)),

            EditError::SequenceIncomplete { description } => {
                ExError::new(ExErrorKind::NotExecuted)
                    .with_op(description)
                    .with_message("Sequence did not complete")
            }

            EditError::SequenceFailed {
                description,
                index,
                commands,
                source,
                rollback_error,
            } => {
                let mut message = format!("Failed command list: {}", commands.join(", "));
                if let Some(rollback) = rollback_error {
                    message.push_str(&format!("; rollback failed: {}", rollback));
                }
                ExError::new(ExErrorKind::SequenceFailed)
                    .with_op(description)
                    .with_index(index)
                    .with_message(message)
                    .with_source(ExError::from(*source))
            }

            EditError::ReferenceCycle { remaining } => ExError::new(ExErrorKind::CycleDetected)
                .with_message(format!("Cycle among {} groups", remaining.len())),

            EditError::TopologicalSortFailed { remaining } => {
                ExError::new(ExErrorKind::SortIncomplete)
                    .with_message(format!("{} entities left unplaced", remaining.len()))
            }

            EditError::DanglingReference { id, target } => {
                ExError::new(ExErrorKind::InvariantViolation)
                    .with_entity_id(id.to_string())
                    .with_message(format!("References deleted entity {}", target))
            }

            EditError::ShortPath { id } => ExError::new(ExErrorKind::InvariantViolation)
                .with_entity_id(id.to_string())
                .with_message("Path has exactly one point"),

            EditError::Serialization { message } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }

            EditError::Internal { message } => {
                ExError::new(ExErrorKind::Internal).with_message(message)
            }
        }
    }
}

impl From<serde_json::Error> for EditError {
    fn from(err: serde_json::Error) -> Self {
        EditError::Serialization {
            message: err.to_string(),
        }
    }
}
