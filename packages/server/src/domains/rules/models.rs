use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::RuleId;

/// When a rule is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyOn {
    /// Once, synchronously, right after a member is created.
    Registration,
    /// On a recurring schedule against every member.
    Periodic,
}

/// An admin-configured state transition rule.
///
/// `condition` (and the optional `starts_at` / `ends_at`) are expression
/// source texts in the whitelisted predicate language; they are parsed and
/// validated when the rule is saved.
///
/// A periodic rule owns exactly one recurring schedule registration,
/// tracked through `schedule_handle`. Deactivating the rule or switching
/// `apply_on` away from periodic releases that schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRule {
    pub id: RuleId,
    pub name: String,
    pub sequence: i32,
    pub active: bool,
    pub apply_on: ApplyOn,
    /// State code to transition matching members to
    pub target_state: String,
    pub condition: String,
    pub starts_at: Option<String>,
    pub ends_at: Option<String>,
    pub reason: Option<String>,
    /// Scheduler job id, present while a periodic schedule is registered
    pub schedule_handle: Option<Uuid>,
}

/// Result of evaluating a rule's predicate against one member: whether to
/// apply, and the optional start/end instants for the new interval
/// (defaulting to "now" / open-ended).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleOutcome {
    pub apply: bool,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl RuleOutcome {
    pub fn skip() -> Self {
        Self {
            apply: false,
            start: None,
            end: None,
        }
    }
}
