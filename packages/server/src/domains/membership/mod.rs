//! Membership domain - plan catalog and the membership history engine.

pub mod engine;
pub mod models;

pub use engine::{MembershipEngine, MembershipError, PlanCatalog, PlanRemoval};
pub use models::{MembershipInterval, MembershipPlan, PriceComponent};
