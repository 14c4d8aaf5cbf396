use pkg_constants::rbac::{RBAC_API_GROUP, ROLE_BINDING_KIND, ROLE_KIND};
use pkg_constants::state::ROLE_BINDINGS_PLURAL;
use serde::{Deserialize, Serialize};

use crate::meta::{ObjectMeta, Resource};

// --- RoleRef ---

/// Points a binding at the role whose rules it grants.
/// `RoleRef::default()` is the empty reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRef {
    #[serde(default)]
    pub api_group: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
}

impl RoleRef {
    /// Reference to a namespaced `Role` in the RBAC API group.
    pub fn role(name: impl Into<String>) -> Self {
        Self {
            api_group: RBAC_API_GROUP.to_string(),
            kind: ROLE_KIND.to_string(),
            name: name.into(),
        }
    }
}

// --- Subject ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubjectKind {
    User,
    Group,
    ServiceAccount,
}

/// A principal that a binding grants the role to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub kind: SubjectKind,
    pub name: String,
    /// Only meaningful for service accounts.
    #[serde(default)]
    pub namespace: Option<String>,
    /// Empty for service accounts, `rbac.authorization.k8s.io` for users and groups.
    #[serde(default)]
    pub api_group: String,
}

impl Subject {
    pub fn service_account(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            kind: SubjectKind::ServiceAccount,
            name: name.into(),
            namespace: Some(namespace.into()),
            api_group: String::new(),
        }
    }
}

// --- RoleBinding ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleBinding {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub role_ref: RoleRef,
    #[serde(default)]
    pub subjects: Vec<Subject>,
}

impl RoleBinding {
    /// True when `role_ref` and `subjects` (in order) equal `other`'s.
    /// Metadata is not compared.
    pub fn grants_match(&self, other: &RoleBinding) -> bool {
        self.role_ref == other.role_ref && self.subjects == other.subjects
    }
}

impl Resource for RoleBinding {
    const KIND: &'static str = ROLE_BINDING_KIND;
    const PLURAL: &'static str = ROLE_BINDINGS_PLURAL;

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(role_ref: RoleRef, subjects: Vec<Subject>) -> RoleBinding {
        RoleBinding {
            metadata: ObjectMeta::new("argocd", "argocd"),
            role_ref,
            subjects,
        }
    }

    #[test]
    fn grants_match_ignores_metadata() {
        let a = binding(
            RoleRef::role("argocd"),
            vec![Subject::service_account("argocd", "argocd")],
        );
        let mut b = a.clone();
        b.metadata.resource_version = 7;
        b.metadata.labels.insert("x".to_string(), "y".to_string());
        assert!(a.grants_match(&b));
    }

    #[test]
    fn grants_match_respects_subject_order() {
        let first = Subject::service_account("a", "argocd");
        let second = Subject::service_account("b", "argocd");
        let a = binding(RoleRef::role("argocd"), vec![first.clone(), second.clone()]);
        let b = binding(RoleRef::role("argocd"), vec![second, first]);
        assert!(!a.grants_match(&b));
    }

    #[test]
    fn role_ref_points_at_namespaced_role() {
        let role_ref = RoleRef::role("argocd");
        assert_eq!(role_ref.api_group, "rbac.authorization.k8s.io");
        assert_eq!(role_ref.kind, "Role");
        assert_eq!(role_ref.name, "argocd");
        assert_ne!(role_ref, RoleRef::default());
    }

    #[test]
    fn role_binding_decodes_without_grants() {
        let rb: RoleBinding =
            serde_json::from_str(r#"{"metadata":{"name":"argocd","namespace":"argocd"}}"#)
                .unwrap();
        assert_eq!(rb.role_ref, RoleRef::default());
        assert!(rb.subjects.is_empty());
    }
}
