use serde::{Deserialize, Serialize};

use crate::common::ApiConfigId;
use crate::domains::fields::FieldDescriptor;

/// Per-configuration rate limit policy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimitSettings {
    pub enabled: bool,
    pub max_per_window: usize,
    pub window_seconds: i64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        // disabled unless explicitly turned on
        Self {
            enabled: false,
            max_per_window: 60,
            window_seconds: 60,
        }
    }
}

/// Configuration of one external API surface (e.g. member registration for
/// one club), identified by a generated secret key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfiguration {
    pub id: ApiConfigId,
    /// Which API this key unlocks (e.g. "register_member")
    pub api_name: String,
    /// Generated secret; never logged
    pub api_key: String,
    /// Organization that owns this configuration
    pub owner_organization: i64,
    /// Organizations members may register under through this key
    pub issuing_organizations: Vec<i64>,
    /// Fields external clients may submit. Required fields are auto-added
    /// and cannot be removed while required.
    pub allowed_fields: Vec<FieldDescriptor>,
    /// Optional explicit CORS origin; wildcard when unset
    pub cors_origin: Option<String>,
    /// Adds an HSTS header to every response when set
    pub enforce_https: bool,
    pub rate_limit: RateLimitSettings,
    /// Identity attributed to records created through this key
    pub acting_identity: String,
    pub active: bool,
}

/// Creation parameters; key generation and required-field completion happen
/// in the store.
#[derive(Debug, Clone)]
pub struct NewApiConfiguration {
    pub api_name: String,
    pub owner_organization: i64,
    pub issuing_organizations: Vec<i64>,
    pub allowed_fields: Vec<FieldDescriptor>,
    pub cors_origin: Option<String>,
    pub enforce_https: bool,
    pub rate_limit: RateLimitSettings,
    pub acting_identity: String,
}
