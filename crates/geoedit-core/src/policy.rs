//! Confirmation gate trait and implementations
//!
//! Destructive or outlying edits are checked with an injected
//! [`ConfirmationGate`] before any command is built. A declined gate is not an
//! error: the planner simply returns nothing to do.

use std::collections::HashSet;
use std::fmt;

use crate::model::EntityId;

/// Checkpoint at which the planner asks for confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfirmationKind {
    /// Deleting Groups, a common user error
    DeleteGroups,
    /// Touching entities outside the downloaded working area
    OutsideWorkingArea,
    /// Removing entities from the Groups that reference them
    RemoveFromGroups,
}

impl fmt::Display for ConfirmationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ConfirmationKind::DeleteGroups => "delete groups",
            ConfirmationKind::OutsideWorkingArea => "edit outside the working area",
            ConfirmationKind::RemoveFromGroups => "remove from groups",
        };
        f.write_str(text)
    }
}

/// Gate consulted before destructive operations
///
/// # Returns
/// * `true` - proceed
/// * `false` - abort planning before any mutation
pub trait ConfirmationGate {
    fn confirm(&self, kind: ConfirmationKind, affected: &[EntityId]) -> bool;
}

/// Gate that accepts everything (non-interactive callers and tests)
///
/// # Example
/// ```
/// use geoedit_core::policy::{AlwaysConfirm, ConfirmationGate, ConfirmationKind};
///
/// assert!(AlwaysConfirm.confirm(ConfirmationKind::DeleteGroups, &[]));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

impl ConfirmationGate for AlwaysConfirm {
    fn confirm(&self, _kind: ConfirmationKind, _affected: &[EntityId]) -> bool {
        true
    }
}

/// Gate that declines everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverConfirm;

impl ConfirmationGate for NeverConfirm {
    fn confirm(&self, _kind: ConfirmationKind, _affected: &[EntityId]) -> bool {
        false
    }
}

/// Gate that declines only the listed checkpoints
#[derive(Debug, Clone, Default)]
pub struct SelectiveGate {
    declined: HashSet<ConfirmationKind>,
}

impl SelectiveGate {
    pub fn declining(kinds: impl IntoIterator<Item = ConfirmationKind>) -> Self {
        Self {
            declined: kinds.into_iter().collect(),
        }
    }
}

impl ConfirmationGate for SelectiveGate {
    fn confirm(&self, kind: ConfirmationKind, _affected: &[EntityId]) -> bool {
        !self.declined.contains(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_gates() {
        let ids = [EntityId::generate()];
        assert!(AlwaysConfirm.confirm(ConfirmationKind::RemoveFromGroups, &ids));
        assert!(!NeverConfirm.confirm(ConfirmationKind::RemoveFromGroups, &ids));
    }

    #[test]
    fn test_selective_gate() {
        let gate = SelectiveGate::declining([ConfirmationKind::DeleteGroups]);

        assert!(!gate.confirm(ConfirmationKind::DeleteGroups, &[]));
        assert!(gate.confirm(ConfirmationKind::OutsideWorkingArea, &[]));
        assert!(gate.confirm(ConfirmationKind::RemoveFromGroups, &[]));
    }
}
