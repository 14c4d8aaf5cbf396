use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pointer from a dependent object to the object that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerReference {
    pub kind: String,
    pub name: String,
    pub uid: String,
    /// True for the single owner that manages the dependent.
    #[serde(default)]
    pub controller: bool,
}

/// Metadata shared by every stored object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub name: String,
    pub namespace: String,
    /// Assigned by the store on create.
    #[serde(default)]
    pub uid: String,
    /// Bumped by the store on every successful write; 0 means "never stored".
    #[serde(default)]
    pub resource_version: u64,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub owner_references: Vec<OwnerReference>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Set once the object is being torn down.
    #[serde(default)]
    pub deletion_timestamp: Option<DateTime<Utc>>,
}

impl ObjectMeta {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    /// The owner reference flagged as controller, if any.
    pub fn controller_owner(&self) -> Option<&OwnerReference> {
        self.owner_references.iter().find(|o| o.controller)
    }
}

/// A namespaced object kind that can live in the state store.
pub trait Resource:
    Clone + Send + Sync + Serialize + serde::de::DeserializeOwned + 'static
{
    /// Kind name, e.g. `RoleBinding`.
    const KIND: &'static str;
    /// Lowercase plural used in registry keys, e.g. `rolebindings`.
    const PLURAL: &'static str;

    fn metadata(&self) -> &ObjectMeta;

    fn metadata_mut(&mut self) -> &mut ObjectMeta;

    fn name(&self) -> &str {
        &self.metadata().name
    }

    fn namespace(&self) -> &str {
        &self.metadata().namespace
    }

    /// Reference to this object suitable for a dependent's `owner_references`.
    fn controller_ref(&self) -> OwnerReference {
        OwnerReference {
            kind: Self::KIND.to_string(),
            name: self.metadata().name.clone(),
            uid: self.metadata().uid.clone(),
            controller: true,
        }
    }
}
