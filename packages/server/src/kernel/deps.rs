//! Central dependency container wired once at startup and shared by the
//! HTTP layer, the ingestion pipeline and the rule scheduler.

use std::sync::Arc;

use super::rate_limit::{InMemoryRateLimiter, RateLimiter};
use crate::config::Config;
use crate::domains::api_config::{ApiConfigStore, RateLimitSettings};
use crate::domains::audit::ActivityLog;
use crate::domains::fields::FieldRegistry;
use crate::domains::member::{
    AttentionThresholds, MemberStateEngine, MemberStore, StateCatalog,
};
use crate::domains::membership::{MembershipEngine, PlanCatalog};
use crate::domains::organization::OrganizationDirectory;
use crate::domains::rules::RuleEngine;

#[derive(Clone)]
pub struct ServerDeps {
    pub config: Config,
    pub fields: Arc<FieldRegistry>,
    pub api_configs: Arc<ApiConfigStore>,
    pub members: Arc<MemberStore>,
    pub organizations: Arc<OrganizationDirectory>,
    pub states: Arc<MemberStateEngine>,
    pub memberships: Arc<MembershipEngine>,
    pub rules: Arc<RuleEngine>,
    pub rate_limiter: Arc<dyn RateLimiter>,
    pub audit: Arc<ActivityLog>,
}

impl ServerDeps {
    /// Wire the full dependency graph from configuration, with the default
    /// state catalog seeded and the in-memory rate limiter installed.
    pub fn new(config: Config) -> Self {
        let audit = Arc::new(ActivityLog::new());
        let fields = Arc::new(FieldRegistry::new());
        let api_configs = Arc::new(ApiConfigStore::new(fields.clone()));
        let members = Arc::new(MemberStore::new());
        let organizations = Arc::new(OrganizationDirectory::new());

        let thresholds = AttentionThresholds {
            warning_days: config.attention_warning_days,
            critical_days: config.attention_critical_days,
        };
        let states = Arc::new(MemberStateEngine::new(
            Arc::new(StateCatalog::with_defaults()),
            audit.clone(),
            thresholds,
        ));
        let memberships = Arc::new(MembershipEngine::new(
            Arc::new(PlanCatalog::new()),
            audit.clone(),
        ));
        let rules = Arc::new(RuleEngine::new(
            members.clone(),
            states.clone(),
            memberships.clone(),
        ));

        Self {
            config,
            fields,
            api_configs,
            members,
            organizations,
            states,
            memberships,
            rules,
            rate_limiter: Arc::new(InMemoryRateLimiter::new()),
            audit,
        }
    }

    /// Global per-IP fallback policy for requests outside any API
    /// configuration.
    pub fn fallback_rate_policy(&self) -> RateLimitSettings {
        RateLimitSettings {
            enabled: self.config.rate_limit_enabled,
            max_per_window: self.config.rate_limit_max_per_window,
            window_seconds: self.config.rate_limit_window_seconds,
        }
    }
}
