//! Membership history engine.
//!
//! Unlike the state engine, assigning the plan a member already holds is NOT
//! skipped: a re-assignment is a loggable business event in its own right
//! (typically a renewal), so every `set_membership` call writes a new
//! interval.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use tracing::info;

use super::models::{MembershipInterval, MembershipPlan};
use crate::common::{IntervalId, MemberId};
use crate::domains::audit::{ActivityKind, ActivityLog};
use crate::domains::intervals::{IntervalError, IntervalLedger, TransitionOutcome};

#[derive(Error, Debug)]
pub enum MembershipError {
    #[error("unknown membership plan '{0}'")]
    UnknownPlan(String),

    #[error(transparent)]
    Interval(#[from] IntervalError),
}

/// Outcome of a plan delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanRemoval {
    /// No history referenced the plan; it is gone.
    Removed,
    /// History references the plan; it was deactivated instead.
    Deactivated,
}

/// Catalog of bookable membership plans.
pub struct PlanCatalog {
    plans: RwLock<Vec<MembershipPlan>>,
}

impl PlanCatalog {
    pub fn new() -> Self {
        Self {
            plans: RwLock::new(Vec::new()),
        }
    }

    pub fn add(&self, plan: MembershipPlan) {
        let mut plans = self.plans.write().expect("plan catalog lock poisoned");
        plans.retain(|p| p.code != plan.code);
        plans.push(plan);
    }

    pub fn find(&self, code: &str) -> Option<MembershipPlan> {
        self.plans
            .read()
            .expect("plan catalog lock poisoned")
            .iter()
            .find(|p| p.code == code)
            .cloned()
    }

    pub fn all(&self) -> Vec<MembershipPlan> {
        self.plans.read().expect("plan catalog lock poisoned").clone()
    }

    fn deactivate(&self, code: &str) {
        let mut plans = self.plans.write().expect("plan catalog lock poisoned");
        if let Some(plan) = plans.iter_mut().find(|p| p.code == code) {
            plan.active = false;
        }
    }

    fn remove(&self, code: &str) {
        let mut plans = self.plans.write().expect("plan catalog lock poisoned");
        plans.retain(|p| p.code != code);
    }
}

impl Default for PlanCatalog {
    fn default() -> Self {
        Self::new()
    }
}

/// Membership history engine for members, on a calendar-date axis.
pub struct MembershipEngine {
    plans: Arc<PlanCatalog>,
    ledger: IntervalLedger<String, NaiveDate>,
    log: Arc<ActivityLog>,
}

impl MembershipEngine {
    pub fn new(plans: Arc<PlanCatalog>, log: Arc<ActivityLog>) -> Self {
        Self {
            plans,
            ledger: IntervalLedger::new(),
            log,
        }
    }

    pub fn plans(&self) -> &PlanCatalog {
        &self.plans
    }

    /// Assign a membership plan starting at `date_start` (default: today).
    ///
    /// The interval covering `date_start` is closed at `date_start`; a new
    /// interval `[date_start, date_end)` is opened. This always executes,
    /// even when the new plan equals the old one.
    pub fn set_membership(
        &self,
        member: MemberId,
        plan_code: &str,
        date_start: Option<NaiveDate>,
        date_end: Option<NaiveDate>,
        note: Option<String>,
        today: NaiveDate,
    ) -> Result<TransitionOutcome, MembershipError> {
        let plan = self
            .plans
            .find(plan_code)
            .ok_or_else(|| MembershipError::UnknownPlan(plan_code.to_string()))?;

        let previous = self.ledger.current_value(member, today);
        let outcome =
            self.ledger
                .transition(member, plan.code.clone(), date_start, date_end, note, today)?;

        info!(member = %member, plan = %plan.code, "membership assigned");
        self.log.record(
            ActivityKind::MembershipChange,
            member,
            format!("Membership '{}' assigned", plan.code),
            previous,
            Some(plan.code),
            timestamp(today),
        );

        Ok(outcome)
    }

    /// Close the member's running membership at `date_end` (default: today)
    /// without opening a replacement.
    pub fn end_current_membership(
        &self,
        member: MemberId,
        date_end: Option<NaiveDate>,
        note: Option<String>,
        today: NaiveDate,
    ) -> Result<Option<IntervalId>, MembershipError> {
        let at = date_end.unwrap_or(today);
        let previous = self.ledger.current_value(member, today);
        let closed = self.ledger.close_open_interval(member, at, note)?;

        if closed.is_some() {
            info!(member = %member, "membership ended");
            self.log.record(
                ActivityKind::MembershipChange,
                member,
                "Membership ended".to_string(),
                previous,
                None,
                timestamp(today),
            );
        }
        Ok(closed)
    }

    /// The plan a member holds as of `today`.
    pub fn current_membership(&self, member: MemberId, today: NaiveDate) -> Option<MembershipPlan> {
        self.ledger
            .current_value(member, today)
            .and_then(|code| self.plans.find(&code))
    }

    /// Full membership history, newest first.
    pub fn history(&self, member: MemberId) -> Vec<MembershipInterval> {
        self.ledger
            .history(member)
            .into_iter()
            .map(|i| MembershipInterval {
                id: i.id,
                member: i.subject,
                plan_code: i.value,
                date_start: i.start,
                date_end: i.end,
                active: i.end.is_none(),
                note: i.note,
            })
            .collect()
    }

    /// Total days of membership accrued up to `today`, across all intervals.
    pub fn days_in_club(&self, member: MemberId, today: NaiveDate) -> i64 {
        self.ledger
            .history(member)
            .into_iter()
            .filter(|i| i.start <= today)
            .map(|i| {
                let end = i.end.map_or(today, |e| e.min(today));
                (end - i.start).num_days().max(0)
            })
            .sum()
    }

    /// Delete a plan, or deactivate it when history still references it.
    /// History preservation wins over hard deletes.
    pub fn delete_plan(&self, plan_code: &str) -> Result<PlanRemoval, MembershipError> {
        if self.plans.find(plan_code).is_none() {
            return Err(MembershipError::UnknownPlan(plan_code.to_string()));
        }

        if self.ledger.references_value(&plan_code.to_string()) {
            self.plans.deactivate(plan_code);
            info!(plan = plan_code, "plan referenced by history, deactivated");
            Ok(PlanRemoval::Deactivated)
        } else {
            self.plans.remove(plan_code);
            Ok(PlanRemoval::Removed)
        }
    }

    /// Rollback support for the registration unit of work.
    pub fn discard_member(&self, member: MemberId) {
        self.ledger.remove_subject(member);
    }
}

/// Log timestamps live on the instant axis; date-axis events are pinned to
/// midnight UTC.
fn timestamp(date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_hms_opt(0, 0, 0).expect("midnight is a valid time");
    DateTime::from_naive_utc_and_offset(midnight, Utc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn plan(code: &str) -> MembershipPlan {
        MembershipPlan {
            name: code.to_uppercase(),
            code: code.to_string(),
            price_components: vec![crate::domains::membership::PriceComponent {
                label: "Base fee".to_string(),
                amount: Decimal::new(2500, 2),
            }],
            active: true,
        }
    }

    fn engine() -> MembershipEngine {
        let plans = Arc::new(PlanCatalog::new());
        plans.add(plan("basic"));
        plans.add(plan("premium"));
        MembershipEngine::new(plans, Arc::new(ActivityLog::new()))
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    #[test]
    fn assignment_and_current_membership() {
        let engine = engine();
        let member = MemberId::new();

        engine
            .set_membership(member, "basic", None, None, None, d(1))
            .unwrap();

        assert_eq!(
            engine.current_membership(member, d(10)).map(|p| p.code),
            Some("basic".to_string())
        );
    }

    #[test]
    fn reassigning_same_plan_writes_a_new_interval() {
        let engine = engine();
        let member = MemberId::new();

        engine
            .set_membership(member, "basic", None, None, None, d(1))
            .unwrap();
        engine
            .set_membership(member, "basic", None, None, None, d(15))
            .unwrap();

        // renewal: two consecutive intervals, not one
        let history = engine.history(member);
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].date_end, Some(d(15)));
        assert!(history[0].active);
    }

    #[test]
    fn end_current_membership_closes_without_replacement() {
        let engine = engine();
        let member = MemberId::new();

        engine
            .set_membership(member, "basic", None, None, None, d(1))
            .unwrap();
        let closed = engine
            .end_current_membership(member, Some(d(20)), None, d(15))
            .unwrap();

        assert!(closed.is_some());
        assert!(engine.current_membership(member, d(25)).is_none());
    }

    #[test]
    fn ending_without_membership_is_a_noop() {
        let engine = engine();
        let closed = engine
            .end_current_membership(MemberId::new(), None, None, d(15))
            .unwrap();
        assert!(closed.is_none());
    }

    #[test]
    fn plan_with_history_is_deactivated_not_deleted() {
        let engine = engine();
        let member = MemberId::new();

        engine
            .set_membership(member, "basic", None, None, None, d(1))
            .unwrap();

        let removal = engine.delete_plan("basic").unwrap();
        assert_eq!(removal, PlanRemoval::Deactivated);

        let plan = engine.plans().find("basic").unwrap();
        assert!(!plan.active);
    }

    #[test]
    fn unreferenced_plan_is_removed() {
        let engine = engine();
        let removal = engine.delete_plan("premium").unwrap();
        assert_eq!(removal, PlanRemoval::Removed);
        assert!(engine.plans().find("premium").is_none());
    }

    #[test]
    fn days_in_club_clamps_to_today() {
        let engine = engine();
        let member = MemberId::new();

        engine
            .set_membership(member, "basic", Some(d(1)), Some(d(11)), None, d(1))
            .unwrap();
        engine
            .set_membership(member, "premium", Some(d(20)), None, None, d(20))
            .unwrap();

        // 10 closed days + 5 running days
        assert_eq!(engine.days_in_club(member, d(25)), 15);
    }
}
