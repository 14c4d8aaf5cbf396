use async_trait::async_trait;
use chrono::Utc;
use pkg_types::Resource;
use uuid::Uuid;

use crate::error::ClientError;

/// Typed CRUD over namespaced objects of kind `T`.
///
/// Implementations: [`crate::memory::MemoryClient`] (tests) and
/// [`crate::registry::RegistryClient`] (SlateDB).
#[async_trait]
pub trait ObjectClient<T: Resource>: Send + Sync {
    /// Fetch `namespace/name`. Absence is `ClientError::NotFound`.
    async fn get(&self, name: &str, namespace: &str) -> Result<T, ClientError>;

    /// Persist a new object and return it as stored (uid, version, timestamp filled in).
    /// Fails with `AlreadyExists` if the key is taken.
    async fn create(&self, obj: &T) -> Result<T, ClientError>;

    /// Replace an existing object. `obj.metadata().resource_version` must equal the
    /// stored version or the call fails with `Conflict`.
    async fn update(&self, obj: &T) -> Result<T, ClientError>;

    /// Delete `namespace/name`. Absence is `ClientError::NotFound`.
    async fn delete(&self, name: &str, namespace: &str) -> Result<(), ClientError>;

    /// All objects in `namespace`, or in every namespace when `None`.
    async fn list(&self, namespace: Option<&str>) -> Result<Vec<T>, ClientError>;
}

/// Stamp server-owned metadata on an object about to be created.
pub(crate) fn prepare_create<T: Resource>(obj: &T) -> T {
    let mut stored = obj.clone();
    let meta = stored.metadata_mut();
    meta.uid = Uuid::new_v4().to_string();
    meta.resource_version = 1;
    meta.created_at = Some(Utc::now());
    stored
}

/// Check `obj` against the currently stored copy and produce the next version.
/// `uid` and `created_at` are carried over from `current`.
pub(crate) fn prepare_update<T: Resource>(obj: &T, current: &T) -> Result<T, ClientError> {
    let expected = obj.metadata().resource_version;
    let actual = current.metadata().resource_version;
    if expected != actual {
        return Err(ClientError::Conflict {
            kind: T::KIND,
            namespace: obj.namespace().to_string(),
            name: obj.name().to_string(),
            expected,
            actual,
        });
    }
    let mut stored = obj.clone();
    let meta = stored.metadata_mut();
    meta.uid = current.metadata().uid.clone();
    meta.created_at = current.metadata().created_at;
    meta.resource_version = actual + 1;
    Ok(stored)
}
