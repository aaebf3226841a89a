//! Member state engine: the state catalog, the transition primitive, and
//! the days-in-state / attention-color derivations.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::common::MemberId;
use crate::domains::audit::{ActivityKind, ActivityLog};
use crate::domains::intervals::{Interval, IntervalError, IntervalLedger, TransitionOutcome};

/// Broad classification of a state, used for fallbacks and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateCategory {
    Pending,
    Active,
    Inactive,
    Blocked,
    Archived,
    Deleted,
}

/// A configurable member state (e.g. "pending", "active", "blocked_club").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDefinition {
    pub code: String,
    pub label: String,
    pub sequence: i32,
    pub category: StateCategory,
}

#[derive(Error, Debug)]
pub enum StateError {
    #[error("unknown state code '{0}'")]
    UnknownState(String),

    #[error("no state of category 'pending' is configured; configure a registration state")]
    MissingRegistrationState,

    #[error(transparent)]
    Interval(#[from] IntervalError),
}

/// Catalog of configured states.
pub struct StateCatalog {
    states: RwLock<Vec<StateDefinition>>,
}

impl StateCatalog {
    pub fn new() -> Self {
        Self {
            states: RwLock::new(Vec::new()),
        }
    }

    /// Catalog pre-seeded with the default state set.
    pub fn with_defaults() -> Self {
        let catalog = Self::new();
        let defaults = [
            ("pending", "Pending", 10, StateCategory::Pending),
            ("joining", "Joining", 20, StateCategory::Active),
            ("active", "Active", 30, StateCategory::Active),
            ("inactive", "Inactive", 40, StateCategory::Inactive),
            ("blocked_club", "Blocked (Club)", 50, StateCategory::Blocked),
            (
                "blocked_official",
                "Blocked (Official)",
                60,
                StateCategory::Blocked,
            ),
            ("left", "Left", 70, StateCategory::Archived),
        ];
        for (code, label, sequence, category) in defaults {
            catalog.add(StateDefinition {
                code: code.to_string(),
                label: label.to_string(),
                sequence,
                category,
            });
        }
        catalog
    }

    pub fn add(&self, state: StateDefinition) {
        let mut states = self.states.write().expect("state catalog lock poisoned");
        states.retain(|s| s.code != state.code);
        states.push(state);
        states.sort_by_key(|s| s.sequence);
    }

    pub fn find(&self, code: &str) -> Option<StateDefinition> {
        self.states
            .read()
            .expect("state catalog lock poisoned")
            .iter()
            .find(|s| s.code == code)
            .cloned()
    }

    pub fn all(&self) -> Vec<StateDefinition> {
        self.states
            .read()
            .expect("state catalog lock poisoned")
            .clone()
    }

    /// The state new registrations fall back to when no registration rule
    /// applies: the pending-category state with the lowest sequence.
    ///
    /// # Errors
    ///
    /// `MissingRegistrationState` when no pending-category state exists.
    /// This is a fatal configuration error, not something to self-heal.
    pub fn registration_default(&self) -> Result<StateDefinition, StateError> {
        self.states
            .read()
            .expect("state catalog lock poisoned")
            .iter()
            .filter(|s| s.category == StateCategory::Pending)
            .min_by_key(|s| s.sequence)
            .cloned()
            .ok_or(StateError::MissingRegistrationState)
    }
}

impl Default for StateCatalog {
    fn default() -> Self {
        Self::new()
    }
}

/// How urgently a member's current state needs staff attention, based on
/// how long they have been in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttentionLevel {
    Normal,
    Warning,
    Critical,
}

/// Day thresholds for the attention derivation. Deployment configuration,
/// not business law.
#[derive(Debug, Clone, Copy)]
pub struct AttentionThresholds {
    pub warning_days: i64,
    pub critical_days: i64,
}

impl Default for AttentionThresholds {
    fn default() -> Self {
        Self {
            warning_days: 10,
            critical_days: 28,
        }
    }
}

/// State history engine for members.
///
/// Wraps the interval ledger with the state-specific policy: transitions to
/// the state the member already holds are skipped (idempotent), and every
/// applied transition is written to the activity log.
pub struct MemberStateEngine {
    catalog: Arc<StateCatalog>,
    ledger: IntervalLedger<String, DateTime<Utc>>,
    log: Arc<ActivityLog>,
    thresholds: AttentionThresholds,
}

impl MemberStateEngine {
    pub fn new(
        catalog: Arc<StateCatalog>,
        log: Arc<ActivityLog>,
        thresholds: AttentionThresholds,
    ) -> Self {
        Self {
            catalog,
            ledger: IntervalLedger::new(),
            log,
            thresholds,
        }
    }

    pub fn catalog(&self) -> &StateCatalog {
        &self.catalog
    }

    /// Transition a member to a new state.
    ///
    /// Returns `Ok(None)` when the member already holds the target state;
    /// repeating a state assignment writes nothing.
    pub fn set_state(
        &self,
        member: MemberId,
        state_code: &str,
        reason: Option<String>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Option<TransitionOutcome>, StateError> {
        let state = self
            .catalog
            .find(state_code)
            .ok_or_else(|| StateError::UnknownState(state_code.to_string()))?;

        let previous = self.ledger.current_value(member, now);
        if previous.as_deref() == Some(state_code) {
            return Ok(None);
        }

        let outcome = self.ledger.transition(
            member,
            state.code.clone(),
            start,
            end,
            reason.clone(),
            now,
        )?;

        info!(
            member = %member,
            from = previous.as_deref().unwrap_or("<none>"),
            to = %state.code,
            "member state changed"
        );
        self.log.record(
            ActivityKind::StateChange,
            member,
            format!(
                "Member state changed from '{}' to '{}'",
                previous.as_deref().unwrap_or("<none>"),
                state.code
            ),
            previous,
            Some(state.code),
            now,
        );

        Ok(Some(outcome))
    }

    /// The state a member holds as of `at`.
    pub fn current_state(&self, member: MemberId, at: DateTime<Utc>) -> Option<StateDefinition> {
        self.ledger
            .current_value(member, at)
            .and_then(|code| self.catalog.find(&code))
    }

    /// Whole days the member has spent in their current state.
    pub fn days_in_current_state(&self, member: MemberId, now: DateTime<Utc>) -> Option<i64> {
        self.ledger
            .current_interval(member, now)
            .map(|interval| (now - interval.start).num_days())
    }

    /// Attention color for a member, derived from days-in-state.
    pub fn attention(&self, member: MemberId, now: DateTime<Utc>) -> AttentionLevel {
        match self.days_in_current_state(member, now) {
            Some(days) if days > self.thresholds.critical_days => AttentionLevel::Critical,
            Some(days) if days >= self.thresholds.warning_days => AttentionLevel::Warning,
            _ => AttentionLevel::Normal,
        }
    }

    pub fn history(&self, member: MemberId) -> Vec<Interval<String, DateTime<Utc>>> {
        self.ledger.history(member)
    }

    /// Rollback support for the registration unit of work.
    pub fn discard_member(&self, member: MemberId) {
        self.ledger.remove_subject(member);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn engine() -> MemberStateEngine {
        MemberStateEngine::new(
            Arc::new(StateCatalog::with_defaults()),
            Arc::new(ActivityLog::new()),
            AttentionThresholds::default(),
        )
    }

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, h, 0, 0).unwrap()
    }

    #[test]
    fn set_state_opens_first_interval() {
        let engine = engine();
        let member = MemberId::new();

        let outcome = engine
            .set_state(member, "pending", None, None, None, at(8))
            .unwrap();

        assert!(outcome.is_some());
        assert_eq!(
            engine.current_state(member, at(9)).map(|s| s.code),
            Some("pending".to_string())
        );
    }

    #[test]
    fn repeated_set_state_is_a_noop() {
        let engine = engine();
        let member = MemberId::new();

        engine
            .set_state(member, "active", None, None, None, at(8))
            .unwrap();
        let second = engine
            .set_state(member, "active", None, None, None, at(10))
            .unwrap();

        assert!(second.is_none());
        assert_eq!(engine.history(member).len(), 1);
    }

    #[test]
    fn unknown_state_is_rejected() {
        let engine = engine();
        let err = engine
            .set_state(MemberId::new(), "nonsense", None, None, None, at(8))
            .unwrap_err();
        assert!(matches!(err, StateError::UnknownState(_)));
    }

    #[test]
    fn attention_thresholds() {
        let engine = engine();
        let member = MemberId::new();
        let start = at(8);

        engine
            .set_state(member, "pending", None, None, None, start)
            .unwrap();

        assert_eq!(
            engine.attention(member, start + Duration::days(3)),
            AttentionLevel::Normal
        );
        assert_eq!(
            engine.attention(member, start + Duration::days(10)),
            AttentionLevel::Warning
        );
        assert_eq!(
            engine.attention(member, start + Duration::days(28)),
            AttentionLevel::Warning
        );
        assert_eq!(
            engine.attention(member, start + Duration::days(29)),
            AttentionLevel::Critical
        );
    }

    #[test]
    fn registration_default_requires_pending_state() {
        let catalog = StateCatalog::new();
        assert!(matches!(
            catalog.registration_default(),
            Err(StateError::MissingRegistrationState)
        ));

        let catalog = StateCatalog::with_defaults();
        assert_eq!(catalog.registration_default().unwrap().code, "pending");
    }

    #[test]
    fn state_changes_are_logged() {
        let log = Arc::new(ActivityLog::new());
        let engine = MemberStateEngine::new(
            Arc::new(StateCatalog::with_defaults()),
            log.clone(),
            AttentionThresholds::default(),
        );
        let member = MemberId::new();

        engine
            .set_state(member, "pending", None, None, None, at(8))
            .unwrap();
        engine
            .set_state(member, "active", None, None, None, at(10))
            .unwrap();

        let entries = log.entries_for(member);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].old_value.as_deref(), Some("pending"));
        assert_eq!(entries[1].new_value.as_deref(), Some("active"));
    }
}
