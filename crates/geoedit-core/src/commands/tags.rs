use std::collections::BTreeMap;

use crate::commands::{count_text, Command, CommandCategory, SavedState};
use crate::errors::{EditError, Result};
use crate::model::{Entity, EntityId};
use crate::ops::{EditSession, Store};

/// Set or remove tags on many entities at once
///
/// A value of `None` (or an empty string) removes the key. Only entities
/// whose tags would actually change are recorded as affected, so undo and
/// change notification touch nothing else.
#[derive(Debug)]
pub struct ChangeTagsCommand {
    tags: BTreeMap<String, Option<String>>,
    affected: Vec<EntityId>,
    state: SavedState,
}

impl ChangeTagsCommand {
    /// # Errors
    ///
    /// Returns `EmptyCollection` if `ids` or `tags` is empty, `InvalidInput`
    /// for an empty key, and `EntityNotFound` for an unknown entity.
    pub fn new(
        store: &Store,
        ids: &[EntityId],
        tags: BTreeMap<String, Option<String>>,
    ) -> Result<Self> {
        if ids.is_empty() {
            return Err(EditError::EmptyCollection {
                what: "ChangeTagsCommand entities".to_string(),
            });
        }
        if tags.is_empty() {
            return Err(EditError::EmptyCollection {
                what: "ChangeTagsCommand tags".to_string(),
            });
        }
        if tags.keys().any(|k| k.trim().is_empty()) {
            return Err(EditError::InvalidInput {
                reason: "tag key must not be empty".to_string(),
            });
        }
        let tags: BTreeMap<String, Option<String>> = tags
            .into_iter()
            .map(|(k, v)| (k, v.filter(|v| !v.is_empty())))
            .collect();

        let mut affected = Vec::new();
        for id in ids {
            let entity = store.entity(*id)?;
            if entity.is_usable() && would_change(entity, &tags) && !affected.contains(id) {
                affected.push(*id);
            }
        }

        Ok(Self {
            tags,
            affected,
            state: SavedState::new(),
        })
    }

    /// Convenience constructor for a single key
    ///
    /// # Errors
    ///
    /// See [`ChangeTagsCommand::new`].
    pub fn single(
        store: &Store,
        ids: &[EntityId],
        key: impl Into<String>,
        value: Option<String>,
    ) -> Result<Self> {
        Self::new(store, ids, BTreeMap::from([(key.into(), value)]))
    }

    /// True when no entity would change
    pub fn is_noop(&self) -> bool {
        self.affected.is_empty()
    }
}

fn would_change(entity: &Entity, tags: &BTreeMap<String, Option<String>>) -> bool {
    tags.iter().any(|(k, v)| match v {
        Some(value) => entity.tags.get(k) != Some(value),
        None => entity.tags.contains_key(k),
    })
}

impl Command for ChangeTagsCommand {
    fn description(&self) -> String {
        let target = count_text(self.affected.len(), "object", "objects");
        match self.tags.iter().next() {
            Some((key, value)) if self.tags.len() == 1 => match value {
                Some(value) => format!("Set {}={} for {}", key, value, target),
                None => format!("Remove \"{}\" for {}", key, target),
            },
            _ => format!("Set {} tags for {}", self.tags.len(), target),
        }
    }

    fn category(&self) -> CommandCategory {
        CommandCategory::Tags
    }

    fn affected_entities(&self) -> Vec<EntityId> {
        self.affected.clone()
    }

    fn apply(&mut self, session: &mut EditSession) -> Result<bool> {
        if self
            .affected
            .iter()
            .any(|id| !session.store().get(*id).is_some_and(Entity::is_usable))
        {
            return Ok(false);
        }
        let tags = &self.tags;
        let affected = &self.affected;
        session.store_mut().batch(|store| {
            affected.iter().try_for_each(|id| {
                store.update(*id, |e| {
                    for (key, value) in tags {
                        match value {
                            Some(value) => {
                                e.tags.insert(key.clone(), value.clone());
                            }
                            None => {
                                e.tags.remove(key);
                            }
                        }
                    }
                    e.modified = true;
                })
            })
        })?;
        Ok(true)
    }

    fn saved_state(&mut self) -> Option<&mut SavedState> {
        Some(&mut self.state)
    }
}
