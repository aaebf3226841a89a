//! Lenient type conversion of untrusted JSON payloads against the field
//! catalog.
//!
//! Conversion never hard-fails: a value that cannot be converted is passed
//! through raw (and logged); the validation step downstream decides whether
//! the raw value is acceptable. Keys without a matching descriptor pass
//! through untouched as well.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde_json::Value as Json;
use tracing::warn;

use crate::domains::fields::{FieldDescriptor, FieldValue, ValueType};

/// Strings the boolean converter treats as true (case-insensitive).
const TRUTHY: &[&str] = &["1", "true", "yes", "x", "on"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%d.%m.%Y %H:%M"];

/// Convert every payload key with a matching descriptor; pass everything
/// else through verbatim.
pub fn convert_payload(
    payload: &serde_json::Map<String, Json>,
    fields: &[FieldDescriptor],
) -> BTreeMap<String, FieldValue> {
    let mut converted = BTreeMap::new();

    for field in fields {
        let Some(raw) = payload.get(&field.technical_name) else {
            continue;
        };
        converted.insert(
            field.technical_name.clone(),
            convert_value(field.value_type, raw),
        );
    }

    // keys not present in the field catalog pass through unconverted
    for (key, raw) in payload {
        if !converted.contains_key(key) {
            converted.insert(key.clone(), FieldValue::Raw(raw.clone()));
        }
    }

    converted
}

/// Convert one raw JSON value according to a declared value type.
pub fn convert_value(value_type: ValueType, raw: &Json) -> FieldValue {
    if is_empty_input(raw) {
        return empty_for(value_type);
    }

    match try_convert(value_type, raw) {
        Some(value) => value,
        None => {
            warn!(
                value_type = value_type.as_str(),
                raw = %raw,
                "type conversion failed, passing raw value through"
            );
            FieldValue::Raw(raw.clone())
        }
    }
}

/// `""`, `null` and the literal string "null" count as empty input.
fn is_empty_input(raw: &Json) -> bool {
    match raw {
        Json::Null => true,
        Json::String(s) => s.is_empty() || s == "null",
        _ => false,
    }
}

fn empty_for(value_type: ValueType) -> FieldValue {
    match value_type {
        ValueType::Text | ValueType::LongText | ValueType::SingleSelect => {
            FieldValue::Text(String::new())
        }
        ValueType::Boolean => FieldValue::Boolean(false),
        ValueType::ReferenceMulti => FieldValue::ReferenceList(Vec::new()),
        _ => FieldValue::Empty,
    }
}

fn try_convert(value_type: ValueType, raw: &Json) -> Option<FieldValue> {
    match value_type {
        ValueType::Text | ValueType::LongText | ValueType::SingleSelect => {
            scalar_to_string(raw).map(|s| FieldValue::Text(s.trim().to_string()))
        }
        ValueType::Integer => parse_integer(raw).map(FieldValue::Integer),
        ValueType::Reference => parse_integer(raw).map(FieldValue::Reference),
        ValueType::Decimal => parse_decimal(raw).map(FieldValue::Decimal),
        ValueType::Boolean => Some(FieldValue::Boolean(parse_boolean(raw))),
        ValueType::Date => parse_date(raw).map(FieldValue::Date),
        ValueType::DateTime => parse_datetime(raw).map(FieldValue::DateTime),
        ValueType::ReferenceMulti => Some(FieldValue::ReferenceList(parse_reference_list(raw))),
    }
}

fn scalar_to_string(raw: &Json) -> Option<String> {
    match raw {
        Json::String(s) => Some(s.clone()),
        Json::Number(n) => Some(n.to_string()),
        Json::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn parse_integer(raw: &Json) -> Option<i64> {
    match raw {
        Json::Number(n) => n.as_i64(),
        Json::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Locale-tolerant decimal parse: accepts `,` as the decimal separator.
fn parse_decimal(raw: &Json) -> Option<Decimal> {
    match raw {
        Json::Number(n) => n.to_string().parse::<Decimal>().ok(),
        Json::String(s) => s.trim().replace(',', ".").parse::<Decimal>().ok(),
        _ => None,
    }
}

/// Booleans always coerce: real booleans pass through, everything else is
/// matched against the truthy set.
fn parse_boolean(raw: &Json) -> bool {
    match raw {
        Json::Bool(b) => *b,
        Json::Number(n) => TRUTHY.contains(&n.to_string().as_str()),
        Json::String(s) => TRUTHY.contains(&s.trim().to_lowercase().as_str()),
        _ => false,
    }
}

/// Tries `YYYY-MM-DD`, then ISO-8601 date-times, then `DD.MM.YYYY`;
/// first match wins.
fn parse_date(raw: &Json) -> Option<NaiveDate> {
    let s = scalar_to_string(raw)?;
    let s = s.trim();

    if let Ok(date) = NaiveDate::parse_from_str(s, DATE_FORMATS[0]) {
        return Some(date);
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.date());
    }
    NaiveDate::parse_from_str(s, DATE_FORMATS[1]).ok()
}

fn parse_datetime(raw: &Json) -> Option<NaiveDateTime> {
    let s = scalar_to_string(raw)?;
    let s = s.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// Accepts an array of ids or a comma-separated numeric string; elements
/// that are not numeric are ignored, not errored.
fn parse_reference_list(raw: &Json) -> Vec<i64> {
    match raw {
        Json::Array(items) => items.iter().filter_map(parse_integer).collect(),
        Json::String(s) => s
            .split(',')
            .filter_map(|part| part.trim().parse::<i64>().ok())
            .collect(),
        _ => Vec::new(),
    }
}
