//! Registration ingestion domain - converts, validates and materializes
//! members from untrusted external payloads.

pub mod convert;
pub mod pipeline;

pub use convert::{convert_payload, convert_value};
pub use pipeline::{RegistrationError, RegistrationPipeline, RegistrationReceipt};
