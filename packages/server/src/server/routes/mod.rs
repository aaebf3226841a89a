pub mod health;
pub mod lookup;
pub mod register;

pub use health::health_handler;
pub use lookup::{lookup_fields_handler, lookup_organizations_handler};
pub use register::{register_member_handler, register_preflight_handler};
