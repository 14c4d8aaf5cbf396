//! Well-known label keys and values stamped on managed objects.

pub const LABEL_NAME: &str = "app.kubernetes.io/name";

pub const LABEL_PART_OF: &str = "app.kubernetes.io/part-of";

pub const LABEL_COMPONENT: &str = "app.kubernetes.io/component";

/// Holds the name of the ArgoCD instance that manages the object.
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Value of `LABEL_PART_OF` on every managed object.
pub const PART_OF_ARGOCD: &str = "argocd";
