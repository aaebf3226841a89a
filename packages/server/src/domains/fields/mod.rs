//! Field catalog domain - unifies builtin and admin-defined custom fields
//! into one descriptor type consumed by API configurations and the
//! registration ingestion pipeline.

pub mod builtin;
pub mod models;
pub mod registry;

pub use models::{
    CustomField, FieldDescriptor, FieldError, FieldValue, OwnerModel, SourceKind, ValueType,
};
pub use registry::FieldRegistry;
