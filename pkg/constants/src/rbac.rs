//! RBAC object constants.

/// API group of Role, ClusterRole, RoleBinding and ClusterRoleBinding.
pub const RBAC_API_GROUP: &str = "rbac.authorization.k8s.io";

/// Kind name for namespaced roles.
pub const ROLE_KIND: &str = "Role";

/// Kind name for namespaced role bindings.
pub const ROLE_BINDING_KIND: &str = "RoleBinding";

/// Kind name of the parent managed resource.
pub const ARGOCD_KIND: &str = "ArgoCD";

/// Component suffix for everything owned by the ApplicationSet controller.
/// Resource name = `<argocd-name>-APPLICATIONSET_CONTROLLER_COMPONENT`.
pub const APPLICATIONSET_CONTROLLER_COMPONENT: &str = "applicationset-controller";
