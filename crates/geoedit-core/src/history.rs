//! Undo/redo history
//!
//! The history is the entry point through which interactive callers submit
//! commands. It owns every submitted command and replays them against the
//! session in strict stack order.
//!
//! ## Contract
//!
//! - `submit` executes the command; only a command that applied is recorded,
//!   and recording one clears the redo stack
//! - `undo_last` moves the newest command to the redo stack
//! - `redo_last` re-executes the newest undone command
//! - The undo stack is bounded; the oldest entries are dropped first
//!
//! Each submitted command receives a [`CommandId`] that tags every log event
//! emitted for it, across undo and redo.

use std::collections::VecDeque;
use std::time::Instant;

use geoedit_core_types::CommandId;

use crate::commands::Command;
use crate::config::HistoryConfig;
use crate::errors::Result;
use crate::ops::EditSession;
use crate::{log_op_end, log_op_error, log_op_start};

#[derive(Debug)]
struct HistoryEntry {
    id: CommandId,
    command: Box<dyn Command>,
}

/// Undo and redo stacks of one editing session
#[derive(Debug)]
pub struct UndoRedoHistory {
    undo: VecDeque<HistoryEntry>,
    redo: Vec<HistoryEntry>,
    max_depth: usize,
}

impl Default for UndoRedoHistory {
    fn default() -> Self {
        Self::new(&HistoryConfig::default())
    }
}

impl UndoRedoHistory {
    pub fn new(config: &HistoryConfig) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            max_depth: config.max_undo_depth,
        }
    }

    /// Execute `command` and record it when it applied
    ///
    /// Returns whether the command applied. A command that did not apply is
    /// dropped and leaves both stacks untouched.
    ///
    /// # Errors
    ///
    /// Returns the error raised by the command; nothing is recorded then.
    pub fn submit(&mut self, session: &mut EditSession, mut command: Box<dyn Command>) -> Result<bool> {
        let id = CommandId::new();
        let start = Instant::now();
        log_op_start!(
            "history_submit",
            command_id = %id,
            session_id = %session.id(),
            description = %command.description()
        );

        match command.execute(session) {
            Ok(applied) => {
                if applied {
                    self.redo.clear();
                    self.undo.push_back(HistoryEntry { id, command });
                    self.trim();
                }
                log_op_end!(
                    "history_submit",
                    duration_ms = start.elapsed().as_millis() as u64,
                    command_id = %id,
                    applied = applied,
                    undo_depth = self.undo.len()
                );
                Ok(applied)
            }
            Err(err) => {
                log_op_error!(
                    "history_submit",
                    err.clone(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    command_id = %id
                );
                Err(err)
            }
        }
    }

    /// Undo the newest command
    ///
    /// Returns `false` when there is nothing to undo.
    ///
    /// # Errors
    ///
    /// Returns the error raised by the command's undo. The command is then
    /// dropped together with the redo stack, since the session no longer
    /// matches what either stack expects.
    pub fn undo_last(&mut self, session: &mut EditSession) -> Result<bool> {
        let Some(mut entry) = self.undo.pop_back() else {
            return Ok(false);
        };
        let start = Instant::now();
        log_op_start!("history_undo", command_id = %entry.id);

        match entry.command.undo(session) {
            Ok(()) => {
                log_op_end!(
                    "history_undo",
                    duration_ms = start.elapsed().as_millis() as u64,
                    command_id = %entry.id,
                    redo_depth = self.redo.len() + 1
                );
                self.redo.push(entry);
                Ok(true)
            }
            Err(err) => {
                self.redo.clear();
                log_op_error!(
                    "history_undo",
                    err.clone(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    command_id = %entry.id
                );
                Err(err)
            }
        }
    }

    /// Re-execute the newest undone command
    ///
    /// Returns `false` when there is nothing to redo or the command no longer
    /// applies; in the latter case the remaining redo entries are dropped as
    /// they build on it.
    ///
    /// # Errors
    ///
    /// Returns the error raised by the command; the redo stack is dropped.
    pub fn redo_last(&mut self, session: &mut EditSession) -> Result<bool> {
        let Some(mut entry) = self.redo.pop() else {
            return Ok(false);
        };
        let start = Instant::now();
        log_op_start!("history_redo", command_id = %entry.id);

        match entry.command.execute(session) {
            Ok(applied) => {
                log_op_end!(
                    "history_redo",
                    duration_ms = start.elapsed().as_millis() as u64,
                    command_id = %entry.id,
                    applied = applied
                );
                if applied {
                    self.undo.push_back(entry);
                    self.trim();
                } else {
                    self.redo.clear();
                }
                Ok(applied)
            }
            Err(err) => {
                self.redo.clear();
                log_op_error!(
                    "history_redo",
                    err.clone(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    command_id = %entry.id
                );
                Err(err)
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    /// Undo stack descriptions, newest first
    pub fn undo_descriptions(&self) -> Vec<String> {
        self.undo
            .iter()
            .rev()
            .map(|e| e.command.description())
            .collect()
    }

    /// Redo stack descriptions, newest first
    pub fn redo_descriptions(&self) -> Vec<String> {
        self.redo
            .iter()
            .rev()
            .map(|e| e.command.description())
            .collect()
    }

    /// Forget both stacks; the session is left as it is
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    fn trim(&mut self) {
        while self.undo.len() > self.max_depth {
            if let Some(dropped) = self.undo.pop_front() {
                tracing::debug!(command_id = %dropped.id, "dropping oldest undo entry");
            }
        }
    }
}
