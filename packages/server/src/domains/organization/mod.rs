//! Organization directory.
//!
//! Organizations are external collaborators referenced by opaque integer
//! ids (the `company_id` of registration payloads). The directory only
//! resolves and lists them; hierarchy management lives elsewhere.

use std::sync::RwLock;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: i64,
    pub name: String,
}

pub struct OrganizationDirectory {
    organizations: RwLock<Vec<Organization>>,
}

impl OrganizationDirectory {
    pub fn new() -> Self {
        Self {
            organizations: RwLock::new(Vec::new()),
        }
    }

    pub fn upsert(&self, organization: Organization) {
        let mut orgs = self
            .organizations
            .write()
            .expect("organization directory lock poisoned");
        match orgs.iter_mut().find(|o| o.id == organization.id) {
            Some(existing) => *existing = organization,
            None => orgs.push(organization),
        }
    }

    pub fn find(&self, id: i64) -> Option<Organization> {
        self.organizations
            .read()
            .expect("organization directory lock poisoned")
            .iter()
            .find(|o| o.id == id)
            .cloned()
    }

    /// All organizations, sorted by name.
    pub fn all(&self) -> Vec<Organization> {
        let mut orgs = self
            .organizations
            .read()
            .expect("organization directory lock poisoned")
            .clone();
        orgs.sort_by(|a, b| a.name.cmp(&b.name));
        orgs
    }
}

impl Default for OrganizationDirectory {
    fn default() -> Self {
        Self::new()
    }
}
