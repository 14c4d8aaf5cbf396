pub mod argocd;
pub mod config;
pub mod meta;
pub mod rbac;
pub mod validate;

pub use meta::{ObjectMeta, OwnerReference, Resource};
