//! Append-only interval ledger with current-value derivation.
//!
//! Invariants per subject:
//! - at most one interval with `end = None` at any time
//! - for any time point `t`, at most one interval covers `t`
//!   (`start <= t < end`, or open-ended)
//!
//! Intervals are created and closed only through `transition` /
//! `open_interval` / `close_open_interval`; violations abort the operation
//! instead of self-healing.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::RwLock;

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::common::{IntervalId, MemberId};

/// Time axis of a ledger: instants for state history, calendar dates for
/// membership history.
pub trait TimePoint: Copy + Ord + Debug + Send + Sync + 'static {}

impl TimePoint for DateTime<Utc> {}
impl TimePoint for NaiveDate {}

#[derive(Error, Debug)]
pub enum IntervalError {
    #[error("interval for {subject} would overlap an existing interval")]
    Overlapping { subject: MemberId },

    #[error("interval end must not precede its start")]
    EndBeforeStart,
}

/// One `[start, end)` entry of a subject's history.
#[derive(Debug, Clone, PartialEq)]
pub struct Interval<V, T> {
    pub id: IntervalId,
    pub subject: MemberId,
    pub value: V,
    pub start: T,
    pub end: Option<T>,
    pub note: Option<String>,
}

impl<V, T: TimePoint> Interval<V, T> {
    /// Whether this interval covers the given time point (`start <= at < end`,
    /// open-ended intervals cover everything from `start`).
    pub fn covers(&self, at: T) -> bool {
        self.start <= at && self.end.map_or(true, |end| at < end)
    }

    fn overlaps(&self, start: T, end: Option<T>) -> bool {
        let starts_before_other_ends = match self.end {
            Some(self_end) => start < self_end,
            None => true,
        };
        let other_starts_before_self_ends = match end {
            Some(end) => self.start < end,
            None => true,
        };
        starts_before_other_ends && other_starts_before_self_ends
    }
}

/// Result of a `transition` call: the interval that was closed (if any) and
/// the one that was opened.
#[derive(Debug, Clone, Copy)]
pub struct TransitionOutcome {
    pub closed: Option<IntervalId>,
    pub opened: IntervalId,
}

/// Append-only interval history for many subjects.
///
/// All mutation for a subject happens under the ledger's write lock, so the
/// close-then-open of `transition` is atomic: a concurrent `current_value`
/// read either sees the old interval still open or the new one already
/// opened, never a gap.
pub struct IntervalLedger<V, T> {
    entries: RwLock<HashMap<MemberId, Vec<Interval<V, T>>>>,
}

impl<V, T> IntervalLedger<V, T>
where
    V: Clone + PartialEq + Debug,
    T: TimePoint,
{
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Open a new interval `[start, end)` for the subject.
    ///
    /// # Errors
    ///
    /// - `EndBeforeStart` if `end < start`
    /// - `Overlapping` if the new interval would overlap any existing one
    pub fn open_interval(
        &self,
        subject: MemberId,
        value: V,
        start: T,
        end: Option<T>,
        note: Option<String>,
    ) -> Result<IntervalId, IntervalError> {
        let mut entries = self.entries.write().expect("interval ledger lock poisoned");
        let history = entries.entry(subject).or_default();
        Self::push_interval(history, subject, value, start, end, note)
    }

    /// Close the currently open interval at `at`, if one exists.
    ///
    /// Returns the closed interval's id, or `None` when the subject has no
    /// open interval.
    pub fn close_open_interval(
        &self,
        subject: MemberId,
        at: T,
        note: Option<String>,
    ) -> Result<Option<IntervalId>, IntervalError> {
        let mut entries = self.entries.write().expect("interval ledger lock poisoned");
        let history = entries.entry(subject).or_default();
        Self::close_open(history, at, note)
    }

    /// The sole compound mutation: close the open interval (if any) at
    /// `start`, then open `[start, end)` with the new value.
    ///
    /// `start` defaults to `now`; the caller supplies `now` so derivations
    /// stay deterministic under test.
    pub fn transition(
        &self,
        subject: MemberId,
        new_value: V,
        start: Option<T>,
        end: Option<T>,
        note: Option<String>,
        now: T,
    ) -> Result<TransitionOutcome, IntervalError> {
        let start = start.unwrap_or(now);
        let mut entries = self.entries.write().expect("interval ledger lock poisoned");
        let history = entries.entry(subject).or_default();

        let closed = Self::close_open(history, start, None)?;
        let opened = Self::push_interval(history, subject, new_value, start, end, note)?;

        Ok(TransitionOutcome { closed, opened })
    }

    /// The value the subject holds as of `at`, if any interval covers it.
    pub fn current_value(&self, subject: MemberId, at: T) -> Option<V> {
        self.current_interval(subject, at).map(|i| i.value)
    }

    /// The interval covering `at`, if any.
    pub fn current_interval(&self, subject: MemberId, at: T) -> Option<Interval<V, T>> {
        let entries = self.entries.read().expect("interval ledger lock poisoned");
        entries.get(&subject).and_then(|history| {
            history
                .iter()
                .filter(|i| i.covers(at))
                .max_by_key(|i| i.start)
                .cloned()
        })
    }

    /// Full history for a subject, ordered by start descending.
    pub fn history(&self, subject: MemberId) -> Vec<Interval<V, T>> {
        let entries = self.entries.read().expect("interval ledger lock poisoned");
        let mut history = entries.get(&subject).cloned().unwrap_or_default();
        history.sort_by(|a, b| b.start.cmp(&a.start));
        history
    }

    /// Whether any history entry (of any subject) references the value.
    /// Used to refuse hard-deleting catalog entries with history.
    pub fn references_value(&self, value: &V) -> bool {
        let entries = self.entries.read().expect("interval ledger lock poisoned");
        entries
            .values()
            .any(|history| history.iter().any(|i| &i.value == value))
    }

    /// Drop all history for a subject. Only used when a unit of work rolls
    /// back a freshly created member.
    pub fn remove_subject(&self, subject: MemberId) {
        let mut entries = self.entries.write().expect("interval ledger lock poisoned");
        entries.remove(&subject);
    }

    fn close_open(
        history: &mut Vec<Interval<V, T>>,
        at: T,
        note: Option<String>,
    ) -> Result<Option<IntervalId>, IntervalError> {
        match history.iter_mut().find(|i| i.end.is_none()) {
            Some(open) => {
                if at < open.start {
                    return Err(IntervalError::EndBeforeStart);
                }
                open.end = Some(at);
                if let Some(note) = note {
                    open.note = Some(note);
                }
                Ok(Some(open.id))
            }
            None => Ok(None),
        }
    }

    fn push_interval(
        history: &mut Vec<Interval<V, T>>,
        subject: MemberId,
        value: V,
        start: T,
        end: Option<T>,
        note: Option<String>,
    ) -> Result<IntervalId, IntervalError> {
        if let Some(end) = end {
            if end < start {
                return Err(IntervalError::EndBeforeStart);
            }
        }
        // Zero-length predecessors (start == end) cannot cover any time point
        // and never conflict.
        if history
            .iter()
            .filter(|i| i.end != Some(i.start))
            .any(|i| i.overlaps(start, end))
        {
            return Err(IntervalError::Overlapping { subject });
        }

        let id = IntervalId::new();
        history.push(Interval {
            id,
            subject,
            value,
            start,
            end,
            note,
        });
        Ok(id)
    }
}

impl<V, T> Default for IntervalLedger<V, T>
where
    V: Clone + PartialEq + Debug,
    T: TimePoint,
{
    fn default() -> Self {
        Self::new()
    }
}
