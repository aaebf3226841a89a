//! Rule evaluation engine.
//!
//! Rules are independent: within one tick, later rules (by sequence) may
//! further transition a member an earlier rule already moved. No
//! convergence or fixed-point guarantee is made - each rule makes at most
//! one pass per tick. A failing predicate is isolated to its member/rule
//! pair: it is logged and the batch continues.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, TimeZone, Utc};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::expr::{EvalError, Expr, ParseError, Scope, Value};
use super::models::{ApplyOn, RuleOutcome, TransitionRule};
use crate::common::{MemberId, RuleId};
use crate::domains::fields::FieldValue;
use crate::domains::member::{Member, MemberStateEngine, MemberStore, StateError};
use crate::domains::membership::MembershipEngine;

#[derive(Error, Debug)]
pub enum RuleError {
    #[error("invalid expression '{source_text}': {source}")]
    InvalidExpression {
        source_text: String,
        #[source]
        source: ParseError,
    },

    #[error("unknown rule {0}")]
    UnknownRule(RuleId),

    #[error("tick for rule {0} is already running")]
    TickAlreadyRunning(RuleId),

    #[error(transparent)]
    Evaluation(#[from] EvalError),

    #[error(transparent)]
    State(#[from] StateError),
}

/// Counters for one periodic tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickReport {
    pub evaluated: usize,
    pub applied: usize,
    pub failed: usize,
}

/// Read-only view of one member as seen by rule predicates.
struct MemberScope<'a> {
    member: &'a Member,
    states: &'a MemberStateEngine,
    memberships: &'a MembershipEngine,
    now: DateTime<Utc>,
}

impl Scope for MemberScope<'_> {
    fn lookup(&self, path: &str) -> Option<Value> {
        let attribute = path.strip_prefix("member.")?;
        match attribute {
            "age" => self.member.age(self.now.date_naive()).map(Value::Int),
            "active" => Some(Value::Bool(self.member.active)),
            "state" => self
                .states
                .current_state(self.member.id, self.now)
                .map(|s| Value::Str(s.code)),
            "days_in_state" => self
                .states
                .days_in_current_state(self.member.id, self.now)
                .map(Value::Int),
            "membership" => self
                .memberships
                .current_membership(self.member.id, self.now.date_naive())
                .map(|p| Value::Str(p.code)),
            "days_in_club" => Some(Value::Int(
                self.memberships
                    .days_in_club(self.member.id, self.now.date_naive()),
            )),
            "created_at" => Some(Value::DateTime(self.member.created_at)),
            other => self.member.field(other).and_then(field_to_value),
        }
    }
}

fn field_to_value(field: FieldValue) -> Option<Value> {
    match field {
        FieldValue::Text(s) => Some(Value::Str(s)),
        FieldValue::Integer(i) => Some(Value::Int(i)),
        FieldValue::Decimal(d) => Some(Value::Decimal(d)),
        FieldValue::Boolean(b) => Some(Value::Bool(b)),
        FieldValue::Date(d) => Some(Value::Date(d)),
        FieldValue::DateTime(dt) => Some(Value::DateTime(Utc.from_utc_datetime(&dt))),
        FieldValue::Reference(id) => Some(Value::Int(id)),
        FieldValue::Empty => Some(Value::Null),
        FieldValue::ReferenceList(_) | FieldValue::Raw(_) => None,
    }
}

/// Evaluates configured rules against members and drives state transitions.
pub struct RuleEngine {
    rules: RwLock<Vec<TransitionRule>>,
    members: Arc<MemberStore>,
    states: Arc<MemberStateEngine>,
    memberships: Arc<MembershipEngine>,
    /// Rule ids with a tick currently in flight (re-entrancy guard)
    running: Mutex<HashSet<RuleId>>,
}

impl RuleEngine {
    pub fn new(
        members: Arc<MemberStore>,
        states: Arc<MemberStateEngine>,
        memberships: Arc<MembershipEngine>,
    ) -> Self {
        Self {
            rules: RwLock::new(Vec::new()),
            members,
            states,
            memberships,
            running: Mutex::new(HashSet::new()),
        }
    }

    pub fn states(&self) -> &MemberStateEngine {
        &self.states
    }

    /// Save a rule after validating its expressions.
    pub fn add_rule(&self, rule: TransitionRule) -> Result<RuleId, RuleError> {
        validate_expression(&rule.condition)?;
        if let Some(starts_at) = &rule.starts_at {
            validate_expression(starts_at)?;
        }
        if let Some(ends_at) = &rule.ends_at {
            validate_expression(ends_at)?;
        }

        let id = rule.id;
        let mut rules = self.rules.write().expect("rule store lock poisoned");
        rules.retain(|r| r.id != id);
        rules.push(rule);
        rules.sort_by(|a, b| a.sequence.cmp(&b.sequence).then(a.id.cmp(&b.id)));
        Ok(id)
    }

    pub fn rule(&self, id: RuleId) -> Option<TransitionRule> {
        self.rules
            .read()
            .expect("rule store lock poisoned")
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    /// All rules, in (sequence, id) order.
    pub fn rules(&self) -> Vec<TransitionRule> {
        self.rules.read().expect("rule store lock poisoned").clone()
    }

    /// Active periodic rules that should own a schedule registration.
    pub fn schedulable_rules(&self) -> Vec<TransitionRule> {
        self.rules()
            .into_iter()
            .filter(|r| r.active && r.apply_on == ApplyOn::Periodic)
            .collect()
    }

    /// Flip a rule's active flag. Returns the updated rule.
    pub fn set_rule_active(&self, id: RuleId, active: bool) -> Result<TransitionRule, RuleError> {
        let mut rules = self.rules.write().expect("rule store lock poisoned");
        let rule = rules
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(RuleError::UnknownRule(id))?;
        rule.active = active;
        Ok(rule.clone())
    }

    /// Record (or clear) the schedule registration a periodic rule owns.
    pub fn set_schedule_handle(
        &self,
        id: RuleId,
        handle: Option<uuid::Uuid>,
    ) -> Result<(), RuleError> {
        let mut rules = self.rules.write().expect("rule store lock poisoned");
        let rule = rules
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(RuleError::UnknownRule(id))?;
        rule.schedule_handle = handle;
        Ok(())
    }

    /// Evaluate one rule against one member without applying it.
    pub fn evaluate(
        &self,
        rule: &TransitionRule,
        member: &Member,
        now: DateTime<Utc>,
    ) -> Result<RuleOutcome, RuleError> {
        let scope = MemberScope {
            member,
            states: &self.states,
            memberships: &self.memberships,
            now,
        };

        let condition = validate_expression(&rule.condition)?;
        if !condition.eval_bool(&scope, now)? {
            return Ok(RuleOutcome::skip());
        }

        let start = match &rule.starts_at {
            Some(src) => Some(validate_expression(src)?.eval_instant(&scope, now)?),
            None => None,
        };
        let end = match &rule.ends_at {
            Some(src) => Some(validate_expression(src)?.eval_instant(&scope, now)?),
            None => None,
        };

        Ok(RuleOutcome {
            apply: true,
            start,
            end,
        })
    }

    /// Registration-time evaluation for a batch of freshly created members.
    ///
    /// With no active registration rule configured, every member falls back
    /// to the pending-category registration state - and a deployment without
    /// one is a fatal configuration error.
    pub fn apply_registration_rules(
        &self,
        member_ids: &[MemberId],
        now: DateTime<Utc>,
    ) -> Result<(), RuleError> {
        let rules: Vec<TransitionRule> = self
            .rules()
            .into_iter()
            .filter(|r| r.active && r.apply_on == ApplyOn::Registration)
            .collect();

        if rules.is_empty() {
            let fallback = self.states.catalog().registration_default()?;
            for &member_id in member_ids {
                self.states
                    .set_state(member_id, &fallback.code, None, None, None, now)?;
            }
            debug!(
                state = %fallback.code,
                members = member_ids.len(),
                "no registration rules, default state applied"
            );
            return Ok(());
        }

        for rule in &rules {
            for &member_id in member_ids {
                self.apply_rule_to_member(rule, member_id, now);
            }
        }
        Ok(())
    }

    /// One periodic tick for one rule: evaluate its predicate against every
    /// member and apply matching transitions.
    ///
    /// Re-entrant calls for the same rule while a tick is in flight are
    /// rejected; the scheduler logs and skips.
    pub fn run_tick(&self, rule_id: RuleId, now: DateTime<Utc>) -> Result<TickReport, RuleError> {
        let rule = self.rule(rule_id).ok_or(RuleError::UnknownRule(rule_id))?;
        if !rule.active {
            debug!(rule = %rule.name, "skipping tick for inactive rule");
            return Ok(TickReport::default());
        }

        {
            let mut running = self.running.lock().expect("tick guard lock poisoned");
            if !running.insert(rule_id) {
                return Err(RuleError::TickAlreadyRunning(rule_id));
            }
        }

        let report = self.tick_inner(&rule, now);

        self.running
            .lock()
            .expect("tick guard lock poisoned")
            .remove(&rule_id);

        info!(
            rule = %rule.name,
            evaluated = report.evaluated,
            applied = report.applied,
            failed = report.failed,
            "periodic rule tick finished"
        );
        Ok(report)
    }

    fn tick_inner(&self, rule: &TransitionRule, now: DateTime<Utc>) -> TickReport {
        let mut report = TickReport::default();
        for member in self.members.all() {
            report.evaluated += 1;
            match self.apply_rule_to_member(rule, member.id, now) {
                Applied::Yes => report.applied += 1,
                Applied::No => {}
                Applied::Failed => report.failed += 1,
            }
        }
        report
    }

    /// Evaluate and apply one rule for one member. Any failure is logged
    /// and contained here so the surrounding batch keeps going.
    fn apply_rule_to_member(
        &self,
        rule: &TransitionRule,
        member_id: MemberId,
        now: DateTime<Utc>,
    ) -> Applied {
        let Some(member) = self.members.get(member_id) else {
            warn!(member = %member_id, rule = %rule.name, "member vanished during evaluation");
            return Applied::Failed;
        };

        let outcome = match self.evaluate(rule, &member, now) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    rule = %rule.name,
                    member = %member_id,
                    error = %e,
                    "rule predicate evaluation failed"
                );
                return Applied::Failed;
            }
        };

        if !outcome.apply {
            return Applied::No;
        }

        match self.states.set_state(
            member_id,
            &rule.target_state,
            rule.reason.clone(),
            outcome.start,
            outcome.end,
            now,
        ) {
            Ok(Some(_)) => Applied::Yes,
            Ok(None) => Applied::No,
            Err(e) => {
                error!(
                    rule = %rule.name,
                    member = %member_id,
                    error = %e,
                    "state transition failed"
                );
                Applied::Failed
            }
        }
    }
}

enum Applied {
    Yes,
    No,
    Failed,
}

fn validate_expression(source: &str) -> Result<Expr, RuleError> {
    Expr::parse(source).map_err(|e| RuleError::InvalidExpression {
        source_text: source.to_string(),
        source: e,
    })
}
