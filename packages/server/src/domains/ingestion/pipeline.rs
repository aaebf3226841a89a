//! Registration ingestion pipeline.
//!
//! Stateless per request: parse the `{api_key, data}` envelope, resolve the
//! API configuration, rate-limit, convert and validate the payload against
//! the configuration's allowed field set, then materialize the member and
//! its first state interval as one unit of work. Any failure after
//! materialization starts rolls the member back entirely.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value as Json;
use thiserror::Error;
use tracing::{error, info};

use super::convert::convert_payload;
use crate::common::MemberId;
use crate::domains::api_config::ApiConfiguration;
use crate::domains::audit::ActivityKind;
use crate::domains::fields::{FieldDescriptor, FieldValue};
use crate::domains::member::{Member, StateDefinition};
use crate::domains::organization::Organization;
use crate::kernel::{RateKey, ServerDeps};

/// Identity fields every registration must carry, independent of any
/// configuration.
const IDENTITY_FIELDS: &[&str] = &["firstname", "lastname", "gender", "company_id"];

/// Builtin keys materialized onto the member record itself; everything else
/// lands in `custom_values`.
const MEMBER_COLUMNS: &[&str] = &[
    "firstname",
    "lastname",
    "gender",
    "company_id",
    "birthdate_date",
    "email",
    "phone",
    "street",
    "city",
    "zip",
    "nationality_id",
    "newsletter",
];

#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("missing 'api_key'")]
    MissingCredential,

    #[error("missing 'data' section")]
    MissingPayload,

    #[error("invalid or inactive API key")]
    InvalidCredential,

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("missing required fields: {}", .0.join(", "))]
    MissingRequiredFields(Vec<String>),

    #[error("invalid organization reference '{0}'")]
    InvalidReference(String),

    #[error("field validation failed")]
    ValidationFailed(BTreeMap<String, String>),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl RegistrationError {
    /// HTTP status equivalent for the error envelope.
    pub fn status_code(&self) -> u16 {
        match self {
            RegistrationError::MissingCredential
            | RegistrationError::MissingPayload
            | RegistrationError::MissingRequiredFields(_)
            | RegistrationError::InvalidReference(_) => 400,
            RegistrationError::InvalidCredential => 401,
            RegistrationError::RateLimited => 429,
            RegistrationError::ValidationFailed(_) => 422,
            RegistrationError::Internal(_) => 500,
        }
    }
}

#[derive(Deserialize, Default)]
struct Envelope {
    api_key: Option<String>,
    data: Option<serde_json::Map<String, Json>>,
}

/// Success envelope data for a completed registration.
#[derive(Debug, Clone)]
pub struct RegistrationReceipt {
    pub member_id: MemberId,
    pub member_name: String,
    pub organization: Organization,
    pub current_state: Option<StateDefinition>,
}

pub struct RegistrationPipeline {
    deps: Arc<ServerDeps>,
}

impl RegistrationPipeline {
    pub const API_NAME: &'static str = "register_member";

    pub fn new(deps: Arc<ServerDeps>) -> Self {
        Self { deps }
    }

    /// Resolve the configuration a raw request body authenticates against,
    /// without running the pipeline. Used by the response layer to apply
    /// per-configuration CORS/HSTS headers even on failures.
    pub fn peek_config(&self, body: &[u8]) -> Option<ApiConfiguration> {
        let envelope: Envelope = serde_json::from_slice(body).ok()?;
        let api_key = envelope.api_key?;
        self.deps.api_configs.find_by_key(&api_key)
    }

    /// Run the full pipeline for one request body.
    pub fn register(
        &self,
        body: &[u8],
        source_ip: IpAddr,
        now: DateTime<Utc>,
    ) -> Result<RegistrationReceipt, RegistrationError> {
        // 1. envelope
        let envelope: Envelope = serde_json::from_slice(body).unwrap_or_default();
        let api_key = envelope
            .api_key
            .filter(|k| !k.is_empty())
            .ok_or(RegistrationError::MissingCredential)?;
        let payload = envelope
            .data
            .filter(|d| !d.is_empty())
            .ok_or(RegistrationError::MissingPayload)?;

        // 2. credential
        let config = self
            .deps
            .api_configs
            .resolve(Self::API_NAME, &api_key)
            .ok_or(RegistrationError::InvalidCredential)?;

        // 3. rate limit: per-configuration when enabled, per-IP fallback
        let allowed = if config.rate_limit.enabled {
            self.deps
                .rate_limiter
                .check(RateKey::Config(config.id), &config.rate_limit, now)
        } else {
            self.deps.rate_limiter.check(
                RateKey::Ip(source_ip),
                &self.deps.fallback_rate_policy(),
                now,
            )
        };
        if !allowed {
            return Err(RegistrationError::RateLimited);
        }

        // 4. allowed field subset for the member model
        let fields = self.deps.api_configs.effective_allowed_fields(&config);

        // 5. type conversion (lenient; unknown keys pass through)
        let converted = convert_payload(&payload, &fields);

        // 6. required fields: identity set plus required descriptors
        let missing = missing_required_fields(&converted, &fields);
        if !missing.is_empty() {
            return Err(RegistrationError::MissingRequiredFields(missing));
        }

        // 7. owning organization must exist
        let organization = self.resolve_organization(&converted)?;

        // 8. per-field validation, collecting every violation
        let violations = validate_fields(&converted, &fields);
        if !violations.is_empty() {
            return Err(RegistrationError::ValidationFailed(violations));
        }

        // 9. materialize member + first state interval as one unit of work
        let receipt = self.materialize(converted, &config, organization, now)?;

        info!(
            member = %receipt.member_id,
            organization = receipt.organization.id,
            "member registered via API"
        );
        Ok(receipt)
    }

    fn resolve_organization(
        &self,
        converted: &BTreeMap<String, FieldValue>,
    ) -> Result<Organization, RegistrationError> {
        let value = converted
            .get("company_id")
            .ok_or_else(|| RegistrationError::InvalidReference("<missing>".to_string()))?;
        let id = value.as_reference().ok_or_else(|| {
            RegistrationError::InvalidReference(format!("{value:?}"))
        })?;
        self.deps
            .organizations
            .find(id)
            .ok_or_else(|| RegistrationError::InvalidReference(id.to_string()))
    }

    fn materialize(
        &self,
        converted: BTreeMap<String, FieldValue>,
        config: &ApiConfiguration,
        organization: Organization,
        now: DateTime<Utc>,
    ) -> Result<RegistrationReceipt, RegistrationError> {
        let member = build_member(&converted, organization.id, now);
        let member_id = member.id;
        let member_name = member.full_name();

        self.deps.members.insert(member);
        self.deps.audit.record(
            ActivityKind::Create,
            member_id,
            format!(
                "Member '{}' created via API as '{}'",
                member_name, config.acting_identity
            ),
            None,
            None,
            now,
        );

        // registration rules open the first state interval; if that fails
        // the whole unit of work rolls back
        if let Err(e) = self.deps.rules.apply_registration_rules(&[member_id], now) {
            error!(member = %member_id, error = %e, "registration rolled back");
            self.rollback(member_id);
            return Err(RegistrationError::Internal(e.into()));
        }

        Ok(RegistrationReceipt {
            member_id,
            member_name,
            organization,
            current_state: self.deps.states.current_state(member_id, now),
        })
    }

    fn rollback(&self, member_id: MemberId) {
        self.deps.states.discard_member(member_id);
        self.deps.memberships.discard_member(member_id);
        self.deps.audit.remove_member(member_id);
        self.deps.members.remove(member_id);
    }
}

fn missing_required_fields(
    converted: &BTreeMap<String, FieldValue>,
    fields: &[FieldDescriptor],
) -> Vec<String> {
    let mut required: Vec<&str> = IDENTITY_FIELDS.to_vec();
    for field in fields.iter().filter(|f| f.required) {
        if !required.contains(&field.technical_name.as_str()) {
            required.push(&field.technical_name);
        }
    }

    required
        .into_iter()
        .filter(|name| converted.get(*name).map_or(true, FieldValue::is_blank))
        .map(str::to_string)
        .collect()
}

fn validate_fields(
    converted: &BTreeMap<String, FieldValue>,
    fields: &[FieldDescriptor],
) -> BTreeMap<String, String> {
    let mut violations = BTreeMap::new();
    for field in fields {
        let Some(value) = converted.get(&field.technical_name) else {
            continue;
        };
        if !value.satisfies(field.value_type) {
            violations.insert(
                field.technical_name.clone(),
                format!("expected {}", field.value_type.as_str()),
            );
        }
    }
    violations
}

fn build_member(
    converted: &BTreeMap<String, FieldValue>,
    organization: i64,
    now: DateTime<Utc>,
) -> Member {
    let text = |key: &str| -> String {
        converted
            .get(key)
            .and_then(|v| v.as_text())
            .unwrap_or_default()
            .to_string()
    };
    let optional_text = |key: &str| -> Option<String> {
        converted
            .get(key)
            .and_then(|v| v.as_text())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let custom_values: BTreeMap<String, FieldValue> = converted
        .iter()
        .filter(|(key, _)| !MEMBER_COLUMNS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    Member {
        id: MemberId::new(),
        firstname: text("firstname"),
        lastname: text("lastname"),
        gender: text("gender"),
        company_id: organization,
        birthdate_date: converted.get("birthdate_date").and_then(FieldValue::as_date),
        email: optional_text("email"),
        phone: optional_text("phone"),
        street: optional_text("street"),
        city: optional_text("city"),
        zip: optional_text("zip"),
        nationality_id: converted
            .get("nationality_id")
            .and_then(FieldValue::as_reference),
        newsletter: matches!(
            converted.get("newsletter"),
            Some(FieldValue::Boolean(true))
        ),
        custom_values,
        active: true,
        created_at: now,
    }
}
