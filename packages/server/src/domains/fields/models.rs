use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Target model a field belongs to.
///
/// Fields are scoped per entity type; the uniqueness invariant for technical
/// names holds within one owner model, not globally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerModel {
    Member,
    Team,
    Department,
}

impl OwnerModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerModel::Member => "member",
            OwnerModel::Team => "team",
            OwnerModel::Department => "department",
        }
    }
}

/// Value type of a field, driving type conversion and validation of
/// external payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Text,
    LongText,
    Integer,
    Decimal,
    Boolean,
    Date,
    DateTime,
    SingleSelect,
    Reference,
    ReferenceMulti,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Text => "text",
            ValueType::LongText => "long_text",
            ValueType::Integer => "integer",
            ValueType::Decimal => "decimal",
            ValueType::Boolean => "boolean",
            ValueType::Date => "date",
            ValueType::DateTime => "datetime",
            ValueType::SingleSelect => "single_select",
            ValueType::Reference => "reference",
            ValueType::ReferenceMulti => "reference_multi",
        }
    }
}

/// Whether a descriptor originates from the static schema or from an
/// admin-defined custom field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Builtin,
    Custom,
}

/// A statically declared field of the member schema.
#[derive(Debug, Clone)]
pub struct BuiltinField {
    pub technical_name: &'static str,
    pub label: &'static str,
    pub value_type: ValueType,
    pub required: bool,
}

/// An admin-defined custom field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomField {
    pub owner_model: OwnerModel,
    pub technical_name: String,
    pub label: String,
    pub value_type: ValueType,
    pub required: bool,
    pub sequence: i32,
    /// Comma-separated options, only meaningful for single-select fields
    pub selection_values: Option<String>,
}

/// Normalized field metadata, regardless of whether the field is builtin
/// or admin-defined. This is the one shape the API configuration and the
/// ingestion pipeline work with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub owner_model: OwnerModel,
    pub technical_name: String,
    pub label: String,
    pub value_type: ValueType,
    pub required: bool,
    pub sequence: i32,
    pub source_kind: SourceKind,
}

#[derive(Error, Debug)]
pub enum FieldError {
    #[error("technical name '{technical_name}' already exists on model '{owner_model}'")]
    DuplicateFieldName {
        owner_model: &'static str,
        technical_name: String,
    },
}

/// A converted field value as materialized on a member record.
///
/// `Empty` is the sentinel produced when an external payload sends an empty
/// value for a non-text field. `Raw` carries values that failed lenient
/// conversion and were passed through untouched; validation decides whether
/// they are acceptable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Decimal(Decimal),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Reference(i64),
    ReferenceList(Vec<i64>),
    Raw(serde_json::Value),
    Empty,
}

impl FieldValue {
    /// True for values an external form effectively left blank.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Empty => true,
            FieldValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Whether this value satisfies the given declared type.
    ///
    /// `Empty` always satisfies (required-ness is checked separately);
    /// `Raw` never does.
    pub fn satisfies(&self, value_type: ValueType) -> bool {
        if matches!(self, FieldValue::Empty) {
            return true;
        }
        match value_type {
            ValueType::Text | ValueType::LongText | ValueType::SingleSelect => {
                matches!(self, FieldValue::Text(_))
            }
            ValueType::Integer => matches!(self, FieldValue::Integer(_)),
            ValueType::Decimal => {
                matches!(self, FieldValue::Decimal(_) | FieldValue::Integer(_))
            }
            ValueType::Boolean => matches!(self, FieldValue::Boolean(_)),
            ValueType::Date => matches!(self, FieldValue::Date(_)),
            ValueType::DateTime => matches!(self, FieldValue::DateTime(_)),
            ValueType::Reference => {
                matches!(self, FieldValue::Reference(_) | FieldValue::Integer(_))
            }
            ValueType::ReferenceMulti => matches!(self, FieldValue::ReferenceList(_)),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<i64> {
        match self {
            FieldValue::Reference(id) | FieldValue::Integer(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(d) => Some(*d),
            FieldValue::DateTime(dt) => Some(dt.date()),
            _ => None,
        }
    }
}
