//! Editing configuration
//!
//! Loaded from JSON or built in code and owned by the
//! [`EditSession`](crate::ops::EditSession). Every field has a default, so a
//! partial document only overrides what it names.

use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Default bound on the number of undoable commands
pub const DEFAULT_MAX_UNDO_DEPTH: usize = 100;

/// What the deletion planner does with Groups that reference deleted entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupMemberPolicy {
    /// Replace the Group with a copy lacking the deleted members
    #[default]
    Strip,
    /// Plan nothing when a surviving Group would lose members
    Refuse,
}

/// The single switch governing cascading behavior of deletion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeletionPolicy {
    /// Also delete untagged Points left without a live referrer
    pub delete_orphaned_points: bool,
    pub group_members: GroupMemberPolicy,
}

impl Default for DeletionPolicy {
    fn default() -> Self {
        Self {
            delete_orphaned_points: true,
            group_members: GroupMemberPolicy::Strip,
        }
    }
}

impl DeletionPolicy {
    /// Policy that leaves orphaned points in place
    pub fn keep_points() -> Self {
        Self {
            delete_orphaned_points: false,
            ..Self::default()
        }
    }
}

/// Closure options of [`PurgeCommand::build`](crate::commands::PurgeCommand::build)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PurgeOptions {
    /// Also purge untagged Points used only by purged Paths
    pub add_untagged_path_points: bool,
    /// Also purge Groups whose members are all purged or incomplete
    pub add_groups_with_only_incomplete_members: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub max_undo_depth: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_undo_depth: DEFAULT_MAX_UNDO_DEPTH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EditConfig {
    pub deletion: DeletionPolicy,
    pub purge: PurgeOptions,
    pub history: HistoryConfig,
}

impl EditConfig {
    /// Parse a configuration document
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if the document is not valid JSON for this shape.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Render the configuration as pretty JSON
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if serialization fails.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::EditError;

    #[test]
    fn test_defaults() {
        let config = EditConfig::default();
        assert!(config.deletion.delete_orphaned_points);
        assert_eq!(config.deletion.group_members, GroupMemberPolicy::Strip);
        assert!(!config.purge.add_untagged_path_points);
        assert_eq!(config.history.max_undo_depth, 100);
    }

    #[test]
    fn test_partial_document_overrides_named_fields_only() {
        let config = EditConfig::from_json_str(
            r#"{ "deletion": { "group_members": "refuse" }, "history": { "max_undo_depth": 5 } }"#,
        )
        .unwrap();

        assert!(config.deletion.delete_orphaned_points);
        assert_eq!(config.deletion.group_members, GroupMemberPolicy::Refuse);
        assert_eq!(config.history.max_undo_depth, 5);
    }

    #[test]
    fn test_json_round_trip() {
        let config = EditConfig {
            deletion: DeletionPolicy::keep_points(),
            purge: PurgeOptions {
                add_untagged_path_points: true,
                add_groups_with_only_incomplete_members: true,
            },
            history: HistoryConfig { max_undo_depth: 3 },
        };

        let json = config.to_json_string().unwrap();
        assert_eq!(EditConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_invalid_document() {
        let err = EditConfig::from_json_str(r#"{ "deletion": { "group_members": "explode" } }"#)
            .unwrap_err();
        assert!(matches!(err, EditError::Serialization { .. }));
    }
}
