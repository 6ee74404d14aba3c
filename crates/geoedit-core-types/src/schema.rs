//! Field keys and event names shared by the logging and error facilities
//!
//! Every operation boundary logs `op` plus one of the three `EVENT_*` names;
//! the remaining keys are the context fields the editing engine attaches.

/// Module path of the emitting code
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";

// Correlation
pub const FIELD_COMMAND_ID: &str = "command_id";
pub const FIELD_SESSION_ID: &str = "session_id";

// Edited graph
pub const FIELD_ENTITY_ID: &str = "entity_id";
pub const FIELD_CONFLICT_ID: &str = "conflict_id";
/// Number of entities a planned or executed command touches
pub const FIELD_AFFECTED_LEN: &str = "affected_len";

// History
pub const FIELD_UNDO_DEPTH: &str = "undo_depth";
pub const FIELD_REDO_DEPTH: &str = "redo_depth";

// Failures, as written by `log_op_error!`
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_are_distinct() {
        let events = [EVENT_START, EVENT_END, EVENT_END_ERROR];
        for (i, a) in events.iter().enumerate() {
            for b in &events[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_field_keys_are_identifiers() {
        let keys = [
            FIELD_COMPONENT,
            FIELD_OP,
            FIELD_EVENT,
            FIELD_DURATION_MS,
            FIELD_COMMAND_ID,
            FIELD_SESSION_ID,
            FIELD_ENTITY_ID,
            FIELD_CONFLICT_ID,
            FIELD_AFFECTED_LEN,
            FIELD_UNDO_DEPTH,
            FIELD_REDO_DEPTH,
            FIELD_ERR_KIND,
            FIELD_ERR_CODE,
        ];
        for key in keys {
            assert!(key.chars().all(|c| c.is_ascii_lowercase() || c == '_'), "{key}");
        }
    }
}
