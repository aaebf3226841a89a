//! Activity log - append-only record of lifecycle events.
//!
//! Engines write an entry for every member creation, state change and
//! membership change so administrators can reconstruct who held what and
//! when it changed.

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::{LogEntryId, MemberId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Create,
    StateChange,
    MembershipChange,
    SystemAction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: LogEntryId,
    pub at: DateTime<Utc>,
    pub kind: ActivityKind,
    pub member: MemberId,
    pub description: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

/// In-memory activity log, newest entries last.
pub struct ActivityLog {
    entries: RwLock<Vec<ActivityEntry>>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    pub fn record(
        &self,
        kind: ActivityKind,
        member: MemberId,
        description: impl Into<String>,
        old_value: Option<String>,
        new_value: Option<String>,
        at: DateTime<Utc>,
    ) {
        let entry = ActivityEntry {
            id: LogEntryId::new(),
            at,
            kind,
            member,
            description: description.into(),
            old_value,
            new_value,
        };
        self.entries
            .write()
            .expect("activity log lock poisoned")
            .push(entry);
    }

    /// All entries for one member, oldest first.
    pub fn entries_for(&self, member: MemberId) -> Vec<ActivityEntry> {
        self.entries
            .read()
            .expect("activity log lock poisoned")
            .iter()
            .filter(|e| e.member == member)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("activity log lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all entries for a member. Only used when a unit of work rolls
    /// back a freshly created member.
    pub fn remove_member(&self, member: MemberId) {
        self.entries
            .write()
            .expect("activity log lock poisoned")
            .retain(|e| e.member != member);
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}
