//! State store key layout.

/// Root of every object key: `/registry/<plural>/<namespace>/<name>`.
pub const REGISTRY_PREFIX: &str = "/registry";

/// Plural used in keys for RoleBindings.
pub const ROLE_BINDINGS_PLURAL: &str = "rolebindings";

/// Plural used in keys for ArgoCD instances.
pub const ARGOCDS_PLURAL: &str = "argocds";
