use crate::commands::conflict::{require_decided, undo_resolution, ConflictMemory};
use crate::commands::{count_text, Command, CommandCategory, SavedState};
use crate::conflict::{MergeDecision, Side};
use crate::errors::{EditError, Result};
use crate::model::{Entity, EntityId};
use crate::ops::EditSession;

/// One contested tag key with its decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagMergeItem {
    pub key: String,
    pub mine: Option<String>,
    pub theirs: Option<String>,
    pub decision: MergeDecision,
}

impl TagMergeItem {
    /// Undecided items for every key whose value differs between the two versions
    pub fn diff(mine: &Entity, theirs: &Entity) -> Vec<TagMergeItem> {
        let mut keys: Vec<&String> = mine.tags.keys().chain(theirs.tags.keys()).collect();
        keys.sort();
        keys.dedup();
        keys.into_iter()
            .filter_map(|key| {
                let m = mine.tags.get(key);
                let t = theirs.tags.get(key);
                (m != t).then(|| TagMergeItem {
                    key: key.clone(),
                    mine: m.cloned(),
                    theirs: t.cloned(),
                    decision: MergeDecision::Undecided,
                })
            })
            .collect()
    }

    pub fn with_decision(mut self, decision: MergeDecision) -> Self {
        self.decision = decision;
        self
    }

    /// Value the key ends up with on `owner`
    ///
    /// # Errors
    ///
    /// Returns `UndecidedMergeDecision` while the item is undecided.
    pub fn resolved_value(&self, owner: EntityId) -> Result<Option<&String>> {
        Ok(match require_decided(owner, self.decision)? {
            Side::Theirs => self.theirs.as_ref(),
            Side::Mine => self.mine.as_ref(),
        })
    }
}

/// Apply per-key tag decisions to the local entity
#[derive(Debug)]
pub struct TagConflictResolver {
    memory: ConflictMemory,
    items: Vec<TagMergeItem>,
    state: SavedState,
}

impl TagConflictResolver {
    /// # Errors
    ///
    /// Returns `EmptyCollection` without items, `UndecidedMergeDecision` if
    /// any item is undecided, and `ConflictNotFound` when `mine` has no
    /// conflict.
    pub fn new(session: &EditSession, mine: EntityId, items: Vec<TagMergeItem>) -> Result<Self> {
        if items.is_empty() {
            return Err(EditError::EmptyCollection {
                what: "tag merge items".to_string(),
            });
        }
        for item in &items {
            require_decided(mine, item.decision)?;
        }
        Ok(Self {
            memory: ConflictMemory::lookup(session, mine, None)?,
            items,
            state: SavedState::new(),
        })
    }

    pub fn items(&self) -> &[TagMergeItem] {
        &self.items
    }
}

impl Command for TagConflictResolver {
    fn description(&self) -> String {
        format!(
            "Resolve {} for {}",
            count_text(self.items.len(), "tag conflict", "tag conflicts"),
            self.memory.mine()
        )
    }

    fn category(&self) -> CommandCategory {
        CommandCategory::ConflictResolution
    }

    fn affected_entities(&self) -> Vec<EntityId> {
        vec![self.memory.mine()]
    }

    fn apply(&mut self, session: &mut EditSession) -> Result<bool> {
        let Some(local) = session.store().get(self.memory.mine()) else {
            return Ok(false);
        };
        let mut tags = local.tags.clone();
        for item in &self.items {
            match item.resolved_value(self.memory.mine())? {
                Some(value) => tags.insert(item.key.clone(), value.clone()),
                None => tags.remove(&item.key),
            };
        }
        if tags != local.tags {
            session.store_mut().update(self.memory.mine(), |e| {
                e.tags = tags;
                e.modified = true;
            })?;
        }
        self.memory.consume(session);
        Ok(true)
    }

    fn saved_state(&mut self) -> Option<&mut SavedState> {
        Some(&mut self.state)
    }

    fn undo(&mut self, session: &mut EditSession) -> Result<()> {
        let description = self.description();
        undo_resolution(session, &mut self.state, &mut self.memory, &description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::conflict::fixtures::conflicted_point;

    fn items_for(session: &EditSession, mine: EntityId) -> Vec<TagMergeItem> {
        let local = session.store().entity(mine).unwrap();
        let theirs = session.conflicts().get_for_mine(mine).unwrap().theirs();
        TagMergeItem::diff(local, theirs)
    }

    #[test]
    fn test_diff_lists_differing_keys() {
        let (session, mine) = conflicted_point();

        let items = items_for(&session, mine);

        let keys: Vec<&str> = items.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, vec!["name", "opening_hours", "shop"]);
        assert!(items.iter().all(|i| i.decision == MergeDecision::Undecided));
    }

    #[test]
    fn test_per_key_decisions() {
        let (mut session, mine) = conflicted_point();
        let before = session.store().dump();
        let items = items_for(&session, mine)
            .into_iter()
            .map(|i| {
                let d = if i.key == "shop" {
                    MergeDecision::KeepMine
                } else {
                    MergeDecision::KeepTheirs
                };
                i.with_decision(d)
            })
            .collect();

        let mut cmd = TagConflictResolver::new(&session, mine, items).unwrap();
        assert!(cmd.execute(&mut session).unwrap());

        let tags = &session.store().entity(mine).unwrap().tags;
        assert_eq!(tags.get("name").map(String::as_str), Some("Elm"));
        assert_eq!(tags.get("shop").map(String::as_str), Some("bakery"));
        assert_eq!(tags.get("opening_hours").map(String::as_str), Some("24/7"));

        cmd.undo(&mut session).unwrap();
        assert_eq!(session.store().dump(), before);
        assert!(session.conflicts().has_conflict_for(mine));
    }

    #[test]
    fn test_resolved_value_follows_explicit_side() {
        let (session, mine) = conflicted_point();
        let item = items_for(&session, mine)
            .into_iter()
            .find(|i| i.key == "shop")
            .unwrap();

        assert!(matches!(
            item.resolved_value(mine),
            Err(EditError::UndecidedMergeDecision { id }) if id == mine
        ));
        let kept = item.clone().with_decision(MergeDecision::KeepMine);
        assert_eq!(kept.resolved_value(mine).unwrap(), item.mine.as_ref());
        let taken = item.clone().with_decision(MergeDecision::KeepTheirs);
        assert_eq!(taken.resolved_value(mine).unwrap(), item.theirs.as_ref());
    }

    #[test]
    fn test_one_undecided_item_rejects_all() {
        let (session, mine) = conflicted_point();
        let mut items = items_for(&session, mine);
        items[0].decision = MergeDecision::KeepMine;

        assert!(matches!(
            TagConflictResolver::new(&session, mine, items),
            Err(EditError::UndecidedMergeDecision { .. })
        ));
    }
}
