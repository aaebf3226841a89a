//! Generic append-only interval history.
//!
//! State history and membership history are both "what value did this member
//! hold at instant t" problems; this module owns the shared ledger mechanics
//! so the two engines only differ in value type, time axis, and transition
//! policy.

pub mod ledger;

pub use ledger::{Interval, IntervalError, IntervalLedger, TimePoint, TransitionOutcome};
