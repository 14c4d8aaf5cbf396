//! Objects owned by the ApplicationSet controller of an ArgoCD instance.

pub mod controller;
pub mod rolebinding;

use pkg_constants::rbac::APPLICATIONSET_CONTROLLER_COMPONENT;
use pkg_state::ObjectClient;
use pkg_types::rbac::RoleBinding;

pub use rolebinding::{RoleBindingAction, desired_role_binding};

/// Name shared by the ApplicationSet ServiceAccount, Role and RoleBinding of
/// the ArgoCD instance `argocd_name`.
pub fn resource_name(argocd_name: &str) -> String {
    format!("{}-{}", argocd_name, APPLICATIONSET_CONTROLLER_COMPONENT)
}

/// Converges and removes the ApplicationSet RoleBinding.
///
/// Holds no state besides the client; calls for different bindings may run
/// concurrently.
pub struct ApplicationSetReconciler<C> {
    client: C,
}

impl<C: ObjectClient<RoleBinding>> ApplicationSetReconciler<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }
}
