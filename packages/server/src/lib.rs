// Club Member Lifecycle Core
//
// This crate provides time-ordered lifecycle state for members of an
// organization: interval-derived member state and membership plans, a rule
// engine for automatic state transitions, and a field-scoped public
// registration API.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
