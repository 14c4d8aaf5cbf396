use async_trait::async_trait;
use pkg_types::Resource;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

use crate::error::ClientError;
use crate::object::{ObjectClient, prepare_create, prepare_update};

type ObjectKey = (String, String);

/// In-process object store with the same version semantics as the registry.
/// Counts successful writes so tests can assert "no write happened".
#[derive(Clone)]
pub struct MemoryClient<T> {
    objects: Arc<RwLock<BTreeMap<ObjectKey, T>>>,
    writes: Arc<AtomicU64>,
}

impl<T: Resource> MemoryClient<T> {
    pub fn new() -> Self {
        Self {
            objects: Arc::new(RwLock::new(BTreeMap::new())),
            writes: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Seed the store with pre-existing objects, as if created earlier.
    /// Seeding does not count as a write.
    pub async fn seed(&self, objs: impl IntoIterator<Item = T>) {
        let mut map = self.objects.write().await;
        for obj in objs {
            let stored = prepare_create(&obj);
            map.insert(key_of(&stored), stored);
        }
    }

    /// Number of successful create/update/delete calls so far.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }
}

impl<T: Resource> Default for MemoryClient<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn key_of<T: Resource>(obj: &T) -> ObjectKey {
    (obj.namespace().to_string(), obj.name().to_string())
}

#[async_trait]
impl<T: Resource> ObjectClient<T> for MemoryClient<T> {
    async fn get(&self, name: &str, namespace: &str) -> Result<T, ClientError> {
        let map = self.objects.read().await;
        map.get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| ClientError::not_found(T::KIND, namespace, name))
    }

    async fn create(&self, obj: &T) -> Result<T, ClientError> {
        let mut map = self.objects.write().await;
        let key = key_of(obj);
        if map.contains_key(&key) {
            return Err(ClientError::already_exists(T::KIND, &key.0, &key.1));
        }
        let stored = prepare_create(obj);
        map.insert(key, stored.clone());
        self.record_write();
        Ok(stored)
    }

    async fn update(&self, obj: &T) -> Result<T, ClientError> {
        let mut map = self.objects.write().await;
        let key = key_of(obj);
        let current = map
            .get(&key)
            .ok_or_else(|| ClientError::not_found(T::KIND, &key.0, &key.1))?;
        let stored = prepare_update(obj, current)?;
        map.insert(key, stored.clone());
        self.record_write();
        Ok(stored)
    }

    async fn delete(&self, name: &str, namespace: &str) -> Result<(), ClientError> {
        let mut map = self.objects.write().await;
        match map.remove(&(namespace.to_string(), name.to_string())) {
            Some(_) => {
                self.record_write();
                Ok(())
            }
            None => Err(ClientError::not_found(T::KIND, namespace, name)),
        }
    }

    async fn list(&self, namespace: Option<&str>) -> Result<Vec<T>, ClientError> {
        let map = self.objects.read().await;
        Ok(map
            .iter()
            .filter(|((ns, _), _)| namespace.is_none_or(|want| ns.as_str() == want))
            .map(|(_, obj)| obj.clone())
            .collect())
    }
}
