use anyhow::Context;
use pkg_constants::controller::DEFAULT_GC_INTERVAL_SECS;
use pkg_constants::rbac::ARGOCD_KIND;
use pkg_state::ObjectClient;
use pkg_types::argocd::ArgoCD;
use pkg_types::rbac::RoleBinding;
use pkg_types::{OwnerReference, Resource};
use std::time::Duration;
use tracing::{info, warn};

use crate::applicationset::ApplicationSetReconciler;

/// Background collector for RoleBindings whose controlling ArgoCD is gone.
///
/// Covers the case where an instance disappears without the ApplicationSet
/// controller ever seeing it terminate. An owner that was deleted and
/// recreated under the same name has a new uid and does not count.
pub struct OwnerGarbageCollector<A, B> {
    instances: A,
    reconciler: ApplicationSetReconciler<B>,
    namespace: Option<String>,
    check_interval: Duration,
}

impl<A, B> OwnerGarbageCollector<A, B>
where
    A: ObjectClient<ArgoCD> + 'static,
    B: ObjectClient<RoleBinding> + 'static,
{
    pub fn new(instances: A, bindings: B) -> Self {
        Self {
            instances,
            reconciler: ApplicationSetReconciler::new(bindings),
            namespace: None,
            check_interval: Duration::from_secs(DEFAULT_GC_INTERVAL_SECS),
        }
    }

    pub fn with_namespace(mut self, namespace: Option<String>) -> Self {
        self.namespace = namespace;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "OwnerGarbageCollector started (interval={}s)",
                self.check_interval.as_secs()
            );
            let mut interval = tokio::time::interval(self.check_interval);
            loop {
                interval.tick().await;
                match self.collect().await {
                    Ok(0) => {}
                    Ok(n) => info!("OwnerGarbageCollector removed {} orphaned RoleBindings", n),
                    Err(e) => warn!("OwnerGarbageCollector error: {:#}", e),
                }
            }
        })
    }

    /// One pass. Returns how many RoleBindings were deleted. A failed delete is
    /// logged and skipped; the pass reports an error if any delete failed.
    async fn collect(&self) -> anyhow::Result<usize> {
        let bindings = self
            .reconciler
            .client()
            .list(self.namespace.as_deref())
            .await
            .context("failed to list RoleBindings")?;

        let mut removed = 0;
        let mut failed = 0usize;
        for rb in &bindings {
            let Some(owner) = rb.metadata.controller_owner() else {
                continue;
            };
            if owner.kind != ARGOCD_KIND {
                continue;
            }
            match self.owner_exists(owner, rb.namespace()).await {
                Ok(true) => {}
                Ok(false) => {
                    info!(
                        "RoleBinding {}/{}: owner ArgoCD {} is gone, deleting",
                        rb.namespace(),
                        rb.name(),
                        owner.name
                    );
                    match self
                        .reconciler
                        .delete_role_binding(rb.name(), rb.namespace())
                        .await
                    {
                        Ok(()) => removed += 1,
                        Err(e) => {
                            warn!("{:#}", e);
                            failed += 1;
                        }
                    }
                }
                // Unknown is not gone; try again next pass.
                Err(e) => warn!(
                    "RoleBinding {}/{}: cannot check owner: {:#}",
                    rb.namespace(),
                    rb.name(),
                    e
                ),
            }
        }

        if failed > 0 {
            anyhow::bail!(
                "{} of {} orphaned RoleBindings failed to delete",
                failed,
                failed + removed
            );
        }
        Ok(removed)
    }

    async fn owner_exists(&self, owner: &OwnerReference, namespace: &str) -> anyhow::Result<bool> {
        match self.instances.get(&owner.name, namespace).await {
            Ok(argocd) => Ok(argocd.metadata.uid == owner.uid),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pkg_state::{ClientError, MemoryClient};
    use pkg_types::ObjectMeta;
    use pkg_types::argocd::ArgoCDSpec;

    use crate::applicationset::desired_role_binding;

    fn argocd(name: &str) -> ArgoCD {
        ArgoCD {
            metadata: ObjectMeta::new(name, "argocd"),
            spec: ArgoCDSpec::default(),
        }
    }

    /// Refuses to delete one named binding; everything else goes to `inner`.
    struct StuckDeleteClient {
        inner: MemoryClient<RoleBinding>,
        stuck: &'static str,
    }

    #[async_trait]
    impl ObjectClient<RoleBinding> for StuckDeleteClient {
        async fn get(&self, name: &str, namespace: &str) -> Result<RoleBinding, ClientError> {
            self.inner.get(name, namespace).await
        }
        async fn create(&self, obj: &RoleBinding) -> Result<RoleBinding, ClientError> {
            self.inner.create(obj).await
        }
        async fn update(&self, obj: &RoleBinding) -> Result<RoleBinding, ClientError> {
            self.inner.update(obj).await
        }
        async fn delete(&self, name: &str, namespace: &str) -> Result<(), ClientError> {
            if name == self.stuck {
                return Err(anyhow::anyhow!("SlateDB delete failed: io error").into());
            }
            self.inner.delete(name, namespace).await
        }
        async fn list(&self, namespace: Option<&str>) -> Result<Vec<RoleBinding>, ClientError> {
            self.inner.list(namespace).await
        }
    }

    #[tokio::test]
    async fn test_removes_only_orphans() {
        let instances = MemoryClient::new();
        let bindings = MemoryClient::new();
        instances.seed([argocd("live")]).await;
        let live = instances.get("live", "argocd").await.unwrap();

        let mut gone = argocd("gone");
        gone.metadata.uid = "deleted-uid".to_string();

        bindings
            .seed([
                desired_role_binding("live-applicationset-controller", "argocd", Some(&live)),
                desired_role_binding("gone-applicationset-controller", "argocd", Some(&gone)),
                // No owner: left alone
                desired_role_binding("manual", "argocd", None),
            ])
            .await;

        let gc = OwnerGarbageCollector::new(instances, bindings.clone());
        assert_eq!(gc.collect().await.unwrap(), 1);

        let mut left: Vec<String> = bindings
            .list(None)
            .await
            .unwrap()
            .into_iter()
            .map(|rb| rb.metadata.name)
            .collect();
        left.sort();
        assert_eq!(left, vec!["live-applicationset-controller", "manual"]);

        // Nothing left to collect
        assert_eq!(gc.collect().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_recreated_owner_does_not_adopt_old_binding() {
        let instances = MemoryClient::new();
        let bindings = MemoryClient::new();
        let mut previous = argocd("argocd");
        previous.metadata.uid = "previous-uid".to_string();
        bindings
            .seed([desired_role_binding(
                "argocd-applicationset-controller",
                "argocd",
                Some(&previous),
            )])
            .await;
        // Same name, fresh uid
        instances.seed([argocd("argocd")]).await;

        let gc = OwnerGarbageCollector::new(instances, bindings.clone());
        assert_eq!(gc.collect().await.unwrap(), 1);
        assert!(bindings.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_delete_does_not_stop_the_pass() {
        let instances = MemoryClient::<ArgoCD>::new();
        let bindings = MemoryClient::new();
        let mut a = argocd("a");
        a.metadata.uid = "a-uid".to_string();
        let mut b = argocd("b");
        b.metadata.uid = "b-uid".to_string();
        bindings
            .seed([
                desired_role_binding("a-applicationset-controller", "argocd", Some(&a)),
                desired_role_binding("b-applicationset-controller", "argocd", Some(&b)),
            ])
            .await;

        let gc = OwnerGarbageCollector::new(
            instances,
            StuckDeleteClient {
                inner: bindings.clone(),
                stuck: "a-applicationset-controller",
            },
        );
        let err = gc.collect().await.unwrap_err();
        assert_eq!(err.to_string(), "1 of 2 orphaned RoleBindings failed to delete");

        let left: Vec<String> = bindings
            .list(None)
            .await
            .unwrap()
            .into_iter()
            .map(|rb| rb.metadata.name)
            .collect();
        assert_eq!(left, vec!["a-applicationset-controller"]);
    }
}
