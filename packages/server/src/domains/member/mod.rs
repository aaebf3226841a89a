//! Member domain - member records, the state history engine, and the
//! attention-color derivation built on top of it.

pub mod models;
pub mod state_engine;
pub mod store;

pub use models::Member;
pub use state_engine::{
    AttentionLevel, AttentionThresholds, MemberStateEngine, StateCatalog, StateCategory,
    StateDefinition, StateError,
};
pub use store::MemberStore;
