//! Dependency-aware deletion planning
//!
//! Planning reads the session and produces a command; it never mutates
//! anything itself. Surviving dependents are edited first and the closed
//! deletion set is flagged deleted last, so that executing the plan, and
//! undoing it in reverse, never exposes a Path with fewer than two points or
//! a live reference to a deleted entity.

pub mod deletion;
pub mod segment;

pub use deletion::{plan_deletion, plan_deletion_with_references};
pub use segment::plan_segment_deletion;

use std::time::Instant;

use crate::commands::Command;
use crate::errors::Result;
use crate::{log_op_end, log_op_error};

pub(crate) type Plan = Result<Option<Box<dyn Command>>>;

pub(crate) fn log_outcome(op: &'static str, start: Instant, result: &Plan) {
    let duration_ms = start.elapsed().as_millis() as u64;
    match result {
        Ok(Some(cmd)) => {
            log_op_end!(
                op,
                duration_ms = duration_ms,
                planned = true,
                affected_len = cmd.affected_entities().len()
            );
        }
        Ok(None) => {
            log_op_end!(op, duration_ms = duration_ms, planned = false);
        }
        Err(err) => {
            log_op_error!(op, err.clone(), duration_ms = duration_ms);
        }
    }
}
