use std::fmt;

use crate::conflict::Conflict;
use crate::errors::{EditError, Result};
use crate::model::Entity;
use crate::ops::EditSession;

/// How a remote version relates to the local entity with the same external id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Divergence {
    /// Same tags, content and deleted state
    Identical,
    /// The local entity already supersedes the remote version
    MineIsNewer,
    /// The local entity is unmodified and may be replaced by the remote version
    TheirsSupersedes,
    /// Both sides changed; a conflict was filed
    Diverged,
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Divergence::Identical => "identical",
            Divergence::MineIsNewer => "mine_is_newer",
            Divergence::TheirsSupersedes => "theirs_supersedes",
            Divergence::Diverged => "diverged",
        };
        f.write_str(s)
    }
}

/// Classify `theirs` against the local entity sharing its external id
///
/// References inside `theirs` must already be expressed as local ids. When
/// the two versions diverge a [`Conflict`] is filed in the session, unless
/// the local entity already has one.
///
/// # Errors
///
/// Returns `InvalidInput` if `theirs` has no external id or no local entity
/// shares it.
pub fn detect_divergence(session: &mut EditSession, theirs: Entity) -> Result<Divergence> {
    if theirs.is_new() {
        return Err(EditError::InvalidInput {
            reason: format!("remote {} has no external id", theirs.kind()),
        });
    }
    let mine = session
        .store()
        .find_by_external_id(theirs.kind(), theirs.external_id)
        .ok_or_else(|| EditError::InvalidInput {
            reason: format!(
                "no local {} with external id {}",
                theirs.kind(),
                theirs.external_id
            ),
        })?;

    let divergence = if mine.has_equal_semantic_attributes(&theirs) {
        Divergence::Identical
    } else if theirs.version < mine.version || (theirs.version == mine.version && mine.modified) {
        Divergence::MineIsNewer
    } else if !mine.modified {
        Divergence::TheirsSupersedes
    } else {
        Divergence::Diverged
    };

    if divergence == Divergence::Diverged {
        let conflict = Conflict::new(mine, theirs)?;
        let mine_id = conflict.mine();
        if session.conflicts_mut().add_if_absent(conflict) {
            tracing::info!(entity = %mine_id, "conflict filed");
        } else {
            tracing::debug!(entity = %mine_id, "conflict already filed");
        }
    }
    Ok(divergence)
}
