//! Rule domain - admin-configured transition rules, the safe predicate
//! expression language, the evaluation engine, and the cron wiring for
//! periodic rules.

pub mod engine;
pub mod expr;
pub mod models;
pub mod scheduler;

pub use engine::{RuleEngine, RuleError, TickReport};
pub use expr::{EvalError, Expr, ParseError, Scope, Value};
pub use models::{ApplyOn, RuleOutcome, TransitionRule};
pub use scheduler::RuleScheduler;
