//! Static field schema for the member model.
//!
//! The identity set (`firstname`, `lastname`, `gender`, `company_id`) is
//! required and therefore always part of every API configuration's allowed
//! field set.

use super::models::{BuiltinField, OwnerModel, ValueType};

/// Builtin member fields, in form display order.
pub const MEMBER_FIELDS: &[BuiltinField] = &[
    BuiltinField {
        technical_name: "firstname",
        label: "First Name",
        value_type: ValueType::Text,
        required: true,
    },
    BuiltinField {
        technical_name: "lastname",
        label: "Last Name",
        value_type: ValueType::Text,
        required: true,
    },
    BuiltinField {
        technical_name: "gender",
        label: "Gender",
        value_type: ValueType::SingleSelect,
        required: true,
    },
    BuiltinField {
        technical_name: "company_id",
        label: "Organization",
        value_type: ValueType::Reference,
        required: true,
    },
    BuiltinField {
        technical_name: "birthdate_date",
        label: "Birthdate",
        value_type: ValueType::Date,
        required: false,
    },
    BuiltinField {
        technical_name: "email",
        label: "Email",
        value_type: ValueType::Text,
        required: false,
    },
    BuiltinField {
        technical_name: "phone",
        label: "Phone",
        value_type: ValueType::Text,
        required: false,
    },
    BuiltinField {
        technical_name: "street",
        label: "Street",
        value_type: ValueType::Text,
        required: false,
    },
    BuiltinField {
        technical_name: "city",
        label: "City",
        value_type: ValueType::Text,
        required: false,
    },
    BuiltinField {
        technical_name: "zip",
        label: "ZIP",
        value_type: ValueType::Text,
        required: false,
    },
    BuiltinField {
        technical_name: "nationality_id",
        label: "Nationality",
        value_type: ValueType::Reference,
        required: false,
    },
    BuiltinField {
        technical_name: "newsletter",
        label: "Newsletter Opt-In",
        value_type: ValueType::Boolean,
        required: false,
    },
];

/// Builtin fields for a given owner model. Only the member model carries a
/// static schema today.
pub fn fields_for(owner_model: OwnerModel) -> &'static [BuiltinField] {
    match owner_model {
        OwnerModel::Member => MEMBER_FIELDS,
        _ => &[],
    }
}

/// Default display sequence for builtin fields.
pub const BUILTIN_SEQUENCE: i32 = 10;
