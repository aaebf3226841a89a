//! API configuration store.

use std::sync::{Arc, RwLock};

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use super::models::{ApiConfiguration, NewApiConfiguration};
use crate::common::ApiConfigId;
use crate::domains::fields::{FieldDescriptor, FieldRegistry, OwnerModel};

#[derive(Error, Debug)]
pub enum ApiConfigError {
    #[error("unknown API configuration {0}")]
    UnknownConfig(ApiConfigId),

    #[error("field '{technical_name}' is required and cannot be removed")]
    RequiredFieldNotRemovable { technical_name: String },
}

pub struct ApiConfigStore {
    registry: Arc<FieldRegistry>,
    configs: RwLock<Vec<ApiConfiguration>>,
}

impl ApiConfigStore {
    pub fn new(registry: Arc<FieldRegistry>) -> Self {
        Self {
            registry,
            configs: RwLock::new(Vec::new()),
        }
    }

    /// Create a configuration: generates the secret key and completes the
    /// allowed field set with every required member field.
    pub fn create(&self, new: NewApiConfiguration) -> ApiConfiguration {
        let mut allowed_fields = new.allowed_fields;
        for required in self.registry.required_for(OwnerModel::Member) {
            if !allowed_fields
                .iter()
                .any(|f| f.technical_name == required.technical_name)
            {
                allowed_fields.push(required);
            }
        }
        allowed_fields.sort_by(|a, b| {
            a.sequence
                .cmp(&b.sequence)
                .then_with(|| a.technical_name.cmp(&b.technical_name))
        });

        let config = ApiConfiguration {
            id: ApiConfigId::new(),
            api_name: new.api_name,
            api_key: generate_api_key(),
            owner_organization: new.owner_organization,
            issuing_organizations: new.issuing_organizations,
            allowed_fields,
            cors_origin: new.cors_origin,
            enforce_https: new.enforce_https,
            rate_limit: new.rate_limit,
            acting_identity: new.acting_identity,
            active: true,
        };

        info!(api = %config.api_name, id = %config.id, "API configuration created");
        self.configs
            .write()
            .expect("api config store lock poisoned")
            .push(config.clone());
        config
    }

    /// Resolve the active configuration a request authenticates against.
    pub fn resolve(&self, api_name: &str, api_key: &str) -> Option<ApiConfiguration> {
        self.configs
            .read()
            .expect("api config store lock poisoned")
            .iter()
            .find(|c| c.active && c.api_name == api_name && c.api_key == api_key)
            .cloned()
    }

    /// Any active configuration carrying this key (CORS preflight does not
    /// know the API name).
    pub fn find_by_key(&self, api_key: &str) -> Option<ApiConfiguration> {
        self.configs
            .read()
            .expect("api config store lock poisoned")
            .iter()
            .find(|c| c.active && c.api_key == api_key)
            .cloned()
    }

    /// Active configuration serving a given organization and API, for the
    /// field lookup endpoint.
    pub fn find_for_organization(
        &self,
        organization: i64,
        api_name: &str,
    ) -> Option<ApiConfiguration> {
        self.configs
            .read()
            .expect("api config store lock poisoned")
            .iter()
            .find(|c| {
                c.active
                    && c.api_name == api_name
                    && c.issuing_organizations.contains(&organization)
            })
            .cloned()
    }

    pub fn get(&self, id: ApiConfigId) -> Option<ApiConfiguration> {
        self.configs
            .read()
            .expect("api config store lock poisoned")
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    pub fn set_active(&self, id: ApiConfigId, active: bool) -> Result<(), ApiConfigError> {
        let mut configs = self.configs.write().expect("api config store lock poisoned");
        let config = configs
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(ApiConfigError::UnknownConfig(id))?;
        config.active = active;
        Ok(())
    }

    pub fn add_allowed_field(
        &self,
        id: ApiConfigId,
        field: FieldDescriptor,
    ) -> Result<(), ApiConfigError> {
        let mut configs = self.configs.write().expect("api config store lock poisoned");
        let config = configs
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(ApiConfigError::UnknownConfig(id))?;
        if !config
            .allowed_fields
            .iter()
            .any(|f| f.technical_name == field.technical_name)
        {
            config.allowed_fields.push(field);
        }
        Ok(())
    }

    /// Remove a field from the allowed set. Required fields stay put.
    pub fn remove_allowed_field(
        &self,
        id: ApiConfigId,
        technical_name: &str,
    ) -> Result<(), ApiConfigError> {
        let mut configs = self.configs.write().expect("api config store lock poisoned");
        let config = configs
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(ApiConfigError::UnknownConfig(id))?;

        if let Some(field) = config
            .allowed_fields
            .iter()
            .find(|f| f.technical_name == technical_name)
        {
            if field.required {
                return Err(ApiConfigError::RequiredFieldNotRemovable {
                    technical_name: technical_name.to_string(),
                });
            }
        }
        config
            .allowed_fields
            .retain(|f| f.technical_name != technical_name);
        Ok(())
    }

    /// The allowed member fields of a configuration, with required fields
    /// registered after the configuration was created merged in. The
    /// invariant is that required fields are always part of the set.
    pub fn effective_allowed_fields(&self, config: &ApiConfiguration) -> Vec<FieldDescriptor> {
        let mut fields: Vec<FieldDescriptor> = config
            .allowed_fields
            .iter()
            .filter(|f| f.owner_model == OwnerModel::Member)
            .cloned()
            .collect();
        for required in self.registry.required_for(OwnerModel::Member) {
            if !fields
                .iter()
                .any(|f| f.technical_name == required.technical_name)
            {
                fields.push(required);
            }
        }
        fields.sort_by(|a, b| {
            a.sequence
                .cmp(&b.sequence)
                .then_with(|| a.technical_name.cmp(&b.technical_name))
        });
        fields
    }
}

/// Generate a new API key: 64 hex chars derived from fresh UUID entropy.
fn generate_api_key() -> String {
    let mut hasher = Sha256::new();
    hasher.update(Uuid::new_v4().as_bytes());
    hasher.update(Uuid::new_v4().as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::api_config::models::RateLimitSettings;

    fn store() -> ApiConfigStore {
        ApiConfigStore::new(Arc::new(FieldRegistry::new()))
    }

    fn new_config() -> NewApiConfiguration {
        NewApiConfiguration {
            api_name: "register_member".to_string(),
            owner_organization: 1,
            issuing_organizations: vec![1],
            allowed_fields: Vec::new(),
            cors_origin: None,
            enforce_https: true,
            rate_limit: RateLimitSettings::default(),
            acting_identity: "api-user".to_string(),
        }
    }

    #[test]
    fn create_generates_distinct_keys() {
        let store = store();
        let a = store.create(new_config());
        let b = store.create(new_config());

        assert_eq!(a.api_key.len(), 64);
        assert_ne!(a.api_key, b.api_key);
    }

    #[test]
    fn required_fields_are_auto_added() {
        let store = store();
        let config = store.create(new_config());

        for name in ["firstname", "lastname", "gender", "company_id"] {
            assert!(
                config
                    .allowed_fields
                    .iter()
                    .any(|f| f.technical_name == name),
                "missing required field {name}"
            );
        }
    }

    #[test]
    fn required_fields_cannot_be_removed() {
        let store = store();
        let config = store.create(new_config());

        let err = store
            .remove_allowed_field(config.id, "lastname")
            .unwrap_err();
        assert!(matches!(
            err,
            ApiConfigError::RequiredFieldNotRemovable { .. }
        ));
    }

    #[test]
    fn resolve_requires_matching_active_config() {
        let store = store();
        let config = store.create(new_config());

        assert!(store.resolve("register_member", &config.api_key).is_some());
        assert!(store.resolve("register_member", "wrong-key").is_none());

        store.set_active(config.id, false).unwrap();
        assert!(store.resolve("register_member", &config.api_key).is_none());
    }
}
