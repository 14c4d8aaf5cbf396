use pkg_constants::rbac::ARGOCD_KIND;
use pkg_constants::state::ARGOCDS_PLURAL;
use serde::{Deserialize, Serialize};

use crate::meta::{ObjectMeta, Resource};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSetSpec {
    /// Run the ApplicationSet controller for this instance.
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgoCDSpec {
    #[serde(default)]
    pub applicationset: ApplicationSetSpec,
}

/// The parent managed resource. Owns the ApplicationSet RoleBinding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgoCD {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ArgoCDSpec,
}

impl ArgoCD {
    /// Whether the ApplicationSet RoleBinding should exist right now.
    pub fn wants_applicationset(&self) -> bool {
        self.spec.applicationset.enabled && self.metadata.deletion_timestamp.is_none()
    }
}

impl Resource for ArgoCD {
    const KIND: &'static str = ARGOCD_KIND;
    const PLURAL: &'static str = ARGOCDS_PLURAL;

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}
