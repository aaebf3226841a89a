// Domain modules - one directory per bounded context

pub mod api_config;
pub mod audit;
pub mod fields;
pub mod ingestion;
pub mod intervals;
pub mod member;
pub mod membership;
pub mod organization;
pub mod rules;
