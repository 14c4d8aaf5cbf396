use async_trait::async_trait;
use pkg_constants::state::REGISTRY_PREFIX;
use pkg_types::Resource;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::client::StateStore;
use crate::error::ClientError;
use crate::object::{ObjectClient, prepare_create, prepare_update};

/// Typed client over [`StateStore`]. Objects are JSON under
/// `/registry/<plural>/<namespace>/<name>`.
///
/// SlateDB has no compare-and-swap, so the read-check-write of create, update
/// and delete runs under a lock shared by every clone of this client. Clients
/// for the same kind must therefore be cloned from one instance.
pub struct RegistryClient<T> {
    store: StateStore,
    write_lock: Arc<Mutex<()>>,
    _kind: PhantomData<fn() -> T>,
}

impl<T> Clone for RegistryClient<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            write_lock: self.write_lock.clone(),
            _kind: PhantomData,
        }
    }
}

impl<T: Resource> RegistryClient<T> {
    pub fn new(store: StateStore) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
            _kind: PhantomData,
        }
    }

    fn key(name: &str, namespace: &str) -> String {
        format!("{}/{}/{}/{}", REGISTRY_PREFIX, T::PLURAL, namespace, name)
    }

    fn prefix(namespace: Option<&str>) -> String {
        match namespace {
            Some(ns) => format!("{}/{}/{}/", REGISTRY_PREFIX, T::PLURAL, ns),
            None => format!("{}/{}/", REGISTRY_PREFIX, T::PLURAL),
        }
    }

    fn decode(data: &[u8]) -> Result<T, ClientError> {
        serde_json::from_slice(data).map_err(|source| ClientError::Codec {
            kind: T::KIND,
            source,
        })
    }

    async fn put(&self, obj: &T) -> Result<(), ClientError> {
        let data = serde_json::to_vec(obj).map_err(|source| ClientError::Codec {
            kind: T::KIND,
            source,
        })?;
        self.store
            .put(&Self::key(obj.name(), obj.namespace()), &data)
            .await?;
        Ok(())
    }

    async fn fetch(&self, name: &str, namespace: &str) -> Result<Option<T>, ClientError> {
        match self.store.get(&Self::key(name, namespace)).await? {
            Some(data) => Self::decode(&data).map(Some),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl<T: Resource> ObjectClient<T> for RegistryClient<T> {
    async fn get(&self, name: &str, namespace: &str) -> Result<T, ClientError> {
        self.fetch(name, namespace)
            .await?
            .ok_or_else(|| ClientError::not_found(T::KIND, namespace, name))
    }

    async fn create(&self, obj: &T) -> Result<T, ClientError> {
        let _guard = self.write_lock.lock().await;
        if self.fetch(obj.name(), obj.namespace()).await?.is_some() {
            return Err(ClientError::already_exists(
                T::KIND,
                obj.namespace(),
                obj.name(),
            ));
        }
        let stored = prepare_create(obj);
        self.put(&stored).await?;
        debug!("Created {} {}/{}", T::KIND, obj.namespace(), obj.name());
        Ok(stored)
    }

    async fn update(&self, obj: &T) -> Result<T, ClientError> {
        let _guard = self.write_lock.lock().await;
        let current = self
            .fetch(obj.name(), obj.namespace())
            .await?
            .ok_or_else(|| ClientError::not_found(T::KIND, obj.namespace(), obj.name()))?;
        let stored = prepare_update(obj, &current)?;
        self.put(&stored).await?;
        debug!(
            "Updated {} {}/{} (resource version {})",
            T::KIND,
            obj.namespace(),
            obj.name(),
            stored.metadata().resource_version
        );
        Ok(stored)
    }

    async fn delete(&self, name: &str, namespace: &str) -> Result<(), ClientError> {
        let _guard = self.write_lock.lock().await;
        let key = Self::key(name, namespace);
        if self.store.get(&key).await?.is_none() {
            return Err(ClientError::not_found(T::KIND, namespace, name));
        }
        self.store.delete(&key).await?;
        debug!("Deleted {} {}/{}", T::KIND, namespace, name);
        Ok(())
    }

    async fn list(&self, namespace: Option<&str>) -> Result<Vec<T>, ClientError> {
        let entries = self.store.list_prefix(&Self::prefix(namespace)).await?;
        entries
            .into_iter()
            .map(|(_, value)| Self::decode(&value))
            .collect()
    }
}
