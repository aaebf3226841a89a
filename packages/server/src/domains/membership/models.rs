use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::{IntervalId, MemberId};

/// One price line of a membership plan (base fee, locker, insurance, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceComponent {
    pub label: String,
    pub amount: Decimal,
}

/// A bookable membership plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembershipPlan {
    pub name: String,
    pub code: String,
    pub price_components: Vec<PriceComponent>,
    pub active: bool,
}

/// A membership history entry as exposed to callers.
///
/// `active` is derived: an entry is active while it has no end date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipInterval {
    pub id: IntervalId,
    pub member: MemberId,
    pub plan_code: String,
    pub date_start: NaiveDate,
    pub date_end: Option<NaiveDate>,
    pub active: bool,
    pub note: Option<String>,
}
