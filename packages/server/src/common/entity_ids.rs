//! Typed ID definitions for all domain entities.
//!
//! This module defines type aliases for each domain entity, providing
//! compile-time type safety for ID usage throughout the application.

// Re-export the core Id type and version markers
pub use super::id::{Id, V4, V7};

// ============================================================================
// Entity marker types
// ============================================================================

/// Marker type for Member entities.
pub struct Member;

/// Marker type for interval ledger entries (state and membership history).
pub struct Interval;

/// Marker type for transition rules.
pub struct TransitionRule;

/// Marker type for external API configurations.
pub struct ApiConfig;

/// Marker type for activity log entries.
pub struct LogEntry;

// ============================================================================
// Type aliases
// ============================================================================

pub type MemberId = Id<Member>;
pub type IntervalId = Id<Interval>;
pub type RuleId = Id<TransitionRule>;
pub type ApiConfigId = Id<ApiConfig>;
pub type LogEntryId = Id<LogEntry>;
