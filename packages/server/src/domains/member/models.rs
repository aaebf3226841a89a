use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::common::MemberId;
use crate::domains::fields::FieldValue;

/// A member of the organization.
///
/// State and membership are deliberately NOT stored here: both are derived
/// from the interval ledgers, so the record can never disagree with its
/// history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,

    // Identity fields (always present, enforced at ingestion)
    pub firstname: String,
    pub lastname: String,
    pub gender: String,
    /// Opaque reference to the owning organization
    pub company_id: i64,

    // Optional contact schema
    pub birthdate_date: Option<NaiveDate>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub zip: Option<String>,
    pub nationality_id: Option<i64>,
    pub newsletter: bool,

    /// Admin-defined custom field values plus passthrough payload keys,
    /// keyed by technical name
    pub custom_values: BTreeMap<String, FieldValue>,

    /// Soft-deactivation flag; members with history are never hard-deleted
    pub active: bool,

    pub created_at: DateTime<Utc>,
}

impl Member {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.firstname, self.lastname).trim().to_string()
    }

    /// Completed years since birthdate, as of `today`.
    pub fn age(&self, today: NaiveDate) -> Option<i64> {
        self.birthdate_date
            .and_then(|birth| today.years_since(birth))
            .map(i64::from)
    }

    /// Resolve an attribute by technical name, builtin fields first, then
    /// custom values. This is the surface rule predicates see.
    pub fn field(&self, technical_name: &str) -> Option<FieldValue> {
        match technical_name {
            "firstname" => Some(FieldValue::Text(self.firstname.clone())),
            "lastname" => Some(FieldValue::Text(self.lastname.clone())),
            "gender" => Some(FieldValue::Text(self.gender.clone())),
            "company_id" => Some(FieldValue::Reference(self.company_id)),
            "birthdate_date" => self.birthdate_date.map(FieldValue::Date),
            "email" => self.email.clone().map(FieldValue::Text),
            "phone" => self.phone.clone().map(FieldValue::Text),
            "street" => self.street.clone().map(FieldValue::Text),
            "city" => self.city.clone().map(FieldValue::Text),
            "zip" => self.zip.clone().map(FieldValue::Text),
            "nationality_id" => self.nationality_id.map(FieldValue::Reference),
            "newsletter" => Some(FieldValue::Boolean(self.newsletter)),
            other => self.custom_values.get(other).cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member() -> Member {
        Member {
            id: MemberId::new(),
            firstname: "Ada".to_string(),
            lastname: "Lovelace".to_string(),
            gender: "female".to_string(),
            company_id: 1,
            birthdate_date: NaiveDate::from_ymd_opt(2010, 6, 15),
            email: None,
            phone: None,
            street: None,
            city: None,
            zip: None,
            nationality_id: None,
            newsletter: false,
            custom_values: BTreeMap::new(),
            active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn age_counts_completed_years() {
        let m = member();
        let day_before = NaiveDate::from_ymd_opt(2026, 6, 14).unwrap();
        let birthday = NaiveDate::from_ymd_opt(2026, 6, 15).unwrap();

        assert_eq!(m.age(day_before), Some(15));
        assert_eq!(m.age(birthday), Some(16));
    }

    #[test]
    fn field_resolves_builtin_and_custom() {
        let mut m = member();
        m.custom_values.insert(
            "tshirt_size".to_string(),
            FieldValue::Text("M".to_string()),
        );

        assert_eq!(
            m.field("lastname"),
            Some(FieldValue::Text("Lovelace".to_string()))
        );
        assert_eq!(m.field("company_id"), Some(FieldValue::Reference(1)));
        assert_eq!(
            m.field("tshirt_size"),
            Some(FieldValue::Text("M".to_string()))
        );
        assert_eq!(m.field("unknown"), None);
    }
}
