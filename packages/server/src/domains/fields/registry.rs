//! Field registry: merges the static member schema with admin-defined
//! custom fields into one catalog of `FieldDescriptor`s.

use std::sync::RwLock;

use tracing::{debug, warn};

use super::builtin::{self, BUILTIN_SEQUENCE};
use super::models::{CustomField, FieldDescriptor, FieldError, OwnerModel, SourceKind};

/// Catalog of all fields known for each owner model.
///
/// Builtin fields come from the static schema; custom fields are registered
/// at runtime by administrators. Technical names are unique per owner model
/// across both kinds; collisions are rejected at registration time, before
/// any record is touched.
pub struct FieldRegistry {
    custom: RwLock<Vec<CustomField>>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self {
            custom: RwLock::new(Vec::new()),
        }
    }

    /// Register an admin-defined custom field.
    ///
    /// # Errors
    ///
    /// `FieldError::DuplicateFieldName` if the technical name collides with a
    /// builtin or an already-registered custom field on the same model.
    pub fn register_custom(&self, field: CustomField) -> Result<FieldDescriptor, FieldError> {
        let builtin_clash = builtin::fields_for(field.owner_model)
            .iter()
            .any(|b| b.technical_name == field.technical_name);

        let mut custom = self.custom.write().expect("field registry lock poisoned");
        let custom_clash = custom
            .iter()
            .any(|c| c.owner_model == field.owner_model && c.technical_name == field.technical_name);

        if builtin_clash || custom_clash {
            warn!(
                owner_model = field.owner_model.as_str(),
                technical_name = %field.technical_name,
                "duplicate technical name rejected"
            );
            return Err(FieldError::DuplicateFieldName {
                owner_model: field.owner_model.as_str(),
                technical_name: field.technical_name,
            });
        }

        let descriptor = describe_custom(&field);
        custom.push(field);
        debug!(
            technical_name = %descriptor.technical_name,
            "custom field registered"
        );
        Ok(descriptor)
    }

    /// All field descriptors for an owner model, builtin and custom merged,
    /// ordered by sequence then technical name.
    pub fn describe(&self, owner_model: OwnerModel) -> Vec<FieldDescriptor> {
        let custom = self.custom.read().expect("field registry lock poisoned");
        let mut fields: Vec<FieldDescriptor> = builtin::fields_for(owner_model)
            .iter()
            .map(|b| describe_builtin(owner_model, b))
            .chain(
                custom
                    .iter()
                    .filter(|c| c.owner_model == owner_model)
                    .map(describe_custom),
            )
            .collect();
        fields.sort_by(|a, b| {
            a.sequence
                .cmp(&b.sequence)
                .then_with(|| a.technical_name.cmp(&b.technical_name))
        });
        fields
    }

    /// The subset of descriptors that can never be omitted from an API
    /// configuration's allowed field set.
    pub fn required_for(&self, owner_model: OwnerModel) -> Vec<FieldDescriptor> {
        self.describe(owner_model)
            .into_iter()
            .filter(|f| f.required)
            .collect()
    }

    /// Look up one descriptor by technical name.
    pub fn find(&self, owner_model: OwnerModel, technical_name: &str) -> Option<FieldDescriptor> {
        self.describe(owner_model)
            .into_iter()
            .find(|f| f.technical_name == technical_name)
    }
}

impl Default for FieldRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn describe_builtin(
    owner_model: OwnerModel,
    field: &super::models::BuiltinField,
) -> FieldDescriptor {
    FieldDescriptor {
        owner_model,
        technical_name: field.technical_name.to_string(),
        label: field.label.to_string(),
        value_type: field.value_type,
        required: field.required,
        sequence: BUILTIN_SEQUENCE,
        source_kind: SourceKind::Builtin,
    }
}

fn describe_custom(field: &CustomField) -> FieldDescriptor {
    FieldDescriptor {
        owner_model: field.owner_model,
        technical_name: field.technical_name.clone(),
        label: field.label.clone(),
        value_type: field.value_type,
        required: field.required,
        sequence: field.sequence,
        source_kind: SourceKind::Custom,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::fields::models::ValueType;

    fn tshirt_field() -> CustomField {
        CustomField {
            owner_model: OwnerModel::Member,
            technical_name: "tshirt_size".to_string(),
            label: "T-Shirt Size".to_string(),
            value_type: ValueType::SingleSelect,
            required: false,
            sequence: 20,
            selection_values: Some("S,M,L,XL".to_string()),
        }
    }

    #[test]
    fn describe_merges_builtin_and_custom() {
        let registry = FieldRegistry::new();
        registry.register_custom(tshirt_field()).unwrap();

        let fields = registry.describe(OwnerModel::Member);
        assert!(fields.iter().any(|f| f.technical_name == "firstname"
            && f.source_kind == SourceKind::Builtin));
        assert!(fields.iter().any(|f| f.technical_name == "tshirt_size"
            && f.source_kind == SourceKind::Custom));
    }

    #[test]
    fn custom_name_colliding_with_builtin_is_rejected() {
        let registry = FieldRegistry::new();
        let mut field = tshirt_field();
        field.technical_name = "lastname".to_string();

        let err = registry.register_custom(field).unwrap_err();
        assert!(matches!(err, FieldError::DuplicateFieldName { .. }));
    }

    #[test]
    fn custom_name_colliding_with_custom_is_rejected() {
        let registry = FieldRegistry::new();
        registry.register_custom(tshirt_field()).unwrap();

        let err = registry.register_custom(tshirt_field()).unwrap_err();
        assert!(matches!(err, FieldError::DuplicateFieldName { .. }));
    }

    #[test]
    fn same_name_on_different_models_is_allowed() {
        let registry = FieldRegistry::new();
        registry.register_custom(tshirt_field()).unwrap();

        let mut team_field = tshirt_field();
        team_field.owner_model = OwnerModel::Team;
        assert!(registry.register_custom(team_field).is_ok());
    }

    #[test]
    fn required_for_returns_identity_set() {
        let registry = FieldRegistry::new();
        let required: Vec<String> = registry
            .required_for(OwnerModel::Member)
            .into_iter()
            .map(|f| f.technical_name)
            .collect();

        for name in ["firstname", "lastname", "gender", "company_id"] {
            assert!(required.contains(&name.to_string()), "missing {name}");
        }
    }

    #[test]
    fn describe_orders_by_sequence() {
        let registry = FieldRegistry::new();
        let mut early = tshirt_field();
        early.technical_name = "aaa_first".to_string();
        early.sequence = 1;
        registry.register_custom(early).unwrap();

        let fields = registry.describe(OwnerModel::Member);
        assert_eq!(fields[0].technical_name, "aaa_first");
    }
}
