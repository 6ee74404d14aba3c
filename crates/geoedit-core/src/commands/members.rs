use crate::commands::{Command, CommandCategory, SavedState};
use crate::errors::{EditError, Result};
use crate::model::{EntityData, EntityId, EntityKind, Member};
use crate::ops::{EditSession, Store};

fn require_group(store: &Store, id: EntityId) -> Result<()> {
    let group = store.entity(id)?;
    if group.kind() != EntityKind::Group {
        return Err(EditError::KindMismatch {
            id,
            expected: EntityKind::Group,
            actual: group.kind(),
        });
    }
    Ok(())
}

/// Members of a group that is still live and complete, or `None`
fn live_members(store: &Store, group: EntityId) -> Option<&[Member]> {
    store
        .get(group)
        .filter(|g| g.is_usable() && g.kind() == EntityKind::Group)
        .map(|g| g.members())
}

/// Insert a member into a Group
#[derive(Debug)]
pub struct AddMemberCommand {
    group: EntityId,
    member: Member,
    position: Option<usize>,
    state: SavedState,
}

impl AddMemberCommand {
    /// Append `member`, or insert it at `position`
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` or `KindMismatch` if `group` is not a Group.
    pub fn new(
        store: &Store,
        group: EntityId,
        member: Member,
        position: Option<usize>,
    ) -> Result<Self> {
        require_group(store, group)?;
        Ok(Self {
            group,
            member,
            position,
            state: SavedState::new(),
        })
    }
}

impl Command for AddMemberCommand {
    fn description(&self) -> String {
        format!(
            "Add {} {} to group {}",
            self.member.kind, self.member.id, self.group
        )
    }

    fn category(&self) -> CommandCategory {
        CommandCategory::Members
    }

    fn affected_entities(&self) -> Vec<EntityId> {
        vec![self.group]
    }

    fn apply(&mut self, session: &mut EditSession) -> Result<bool> {
        let store = session.store();
        let Some(members) = live_members(store, self.group) else {
            tracing::warn!(group = %self.group, "group no longer exists");
            return Ok(false);
        };
        let member_ok = store
            .get(self.member.id)
            .is_some_and(|m| !m.deleted && m.kind() == self.member.kind);
        let position = self.position.unwrap_or(members.len());
        if !member_ok || position > members.len() {
            return Ok(false);
        }

        let member = self.member.clone();
        session.store_mut().update(self.group, |g| {
            if let EntityData::Group { members } = &mut g.data {
                members.insert(position, member);
            }
            g.modified = true;
        })?;
        Ok(true)
    }

    fn saved_state(&mut self) -> Option<&mut SavedState> {
        Some(&mut self.state)
    }
}

/// Remove the member at an index, provided it is still the expected one
#[derive(Debug)]
pub struct RemoveMemberCommand {
    group: EntityId,
    index: usize,
    expected: Member,
    state: SavedState,
}

impl RemoveMemberCommand {
    /// # Errors
    ///
    /// Returns `EntityNotFound` or `KindMismatch` if `group` is not a Group.
    pub fn new(store: &Store, group: EntityId, index: usize, expected: Member) -> Result<Self> {
        require_group(store, group)?;
        Ok(Self {
            group,
            index,
            expected,
            state: SavedState::new(),
        })
    }
}

impl Command for RemoveMemberCommand {
    fn description(&self) -> String {
        format!(
            "Remove {} {} from group {}",
            self.expected.kind, self.expected.id, self.group
        )
    }

    fn category(&self) -> CommandCategory {
        CommandCategory::Members
    }

    fn affected_entities(&self) -> Vec<EntityId> {
        vec![self.group]
    }

    fn apply(&mut self, session: &mut EditSession) -> Result<bool> {
        let Some(members) = live_members(session.store(), self.group) else {
            return Ok(false);
        };
        if members.get(self.index) != Some(&self.expected) {
            tracing::warn!(
                group = %self.group,
                index = self.index,
                "member moved before it could be removed"
            );
            return Ok(false);
        }

        let index = self.index;
        session.store_mut().update(self.group, |g| {
            if let EntityData::Group { members } = &mut g.data {
                members.remove(index);
            }
            g.modified = true;
        })?;
        Ok(true)
    }

    fn saved_state(&mut self) -> Option<&mut SavedState> {
        Some(&mut self.state)
    }
}

/// Change the role of one Group member, keeping the previous role as its inverse
#[derive(Debug)]
pub struct ChangeMemberRoleCommand {
    group: EntityId,
    index: usize,
    new_role: String,
    previous: Option<(String, bool)>,
    executed: bool,
}

impl ChangeMemberRoleCommand {
    /// # Errors
    ///
    /// Returns `EntityNotFound` or `KindMismatch` if `group` is not a Group,
    /// `IncompleteEntity` for an incomplete Group, and `InvalidInput` for an
    /// index past the member list.
    pub fn new(
        store: &Store,
        group: EntityId,
        index: usize,
        new_role: impl Into<String>,
    ) -> Result<Self> {
        require_group(store, group)?;
        let entity = store.entity(group)?;
        if entity.incomplete {
            return Err(EditError::IncompleteEntity { id: group });
        }
        if index >= entity.members().len() {
            return Err(EditError::InvalidInput {
                reason: format!(
                    "member index {} out of range for group {} with {} members",
                    index,
                    group,
                    entity.members().len()
                ),
            });
        }
        Ok(Self {
            group,
            index,
            new_role: new_role.into(),
            previous: None,
            executed: false,
        })
    }

    fn set_role(
        session: &mut EditSession,
        group: EntityId,
        index: usize,
        role: String,
        modified: bool,
    ) -> Result<()> {
        session.store_mut().update(group, |g| {
            if let EntityData::Group { members } = &mut g.data {
                if let Some(member) = members.get_mut(index) {
                    member.role = role;
                }
            }
            g.modified = modified;
        })
    }
}

impl Command for ChangeMemberRoleCommand {
    fn description(&self) -> String {
        format!(
            "Change role of member {} of group {} to \"{}\"",
            self.index, self.group, self.new_role
        )
    }

    fn category(&self) -> CommandCategory {
        CommandCategory::Members
    }

    fn affected_entities(&self) -> Vec<EntityId> {
        vec![self.group]
    }

    fn apply(&mut self, session: &mut EditSession) -> Result<bool> {
        if self.executed {
            return Err(EditError::AlreadyExecuted {
                description: self.description(),
            });
        }
        let Some(group) = session.store().get(self.group).filter(|g| g.is_usable()) else {
            return Ok(false);
        };
        let Some(member) = group.members().get(self.index) else {
            return Ok(false);
        };

        if member.role == self.new_role {
            self.previous = None;
        } else {
            self.previous = Some((member.role.clone(), group.modified));
            Self::set_role(session, self.group, self.index, self.new_role.clone(), true)?;
        }
        self.executed = true;
        Ok(true)
    }

    fn undo(&mut self, session: &mut EditSession) -> Result<()> {
        if !self.executed {
            return Err(EditError::NotExecuted {
                description: self.description(),
            });
        }
        if let Some((role, modified)) = self.previous.take() {
            Self::set_role(session, self.group, self.index, role, modified)?;
        }
        self.executed = false;
        Ok(())
    }
}
