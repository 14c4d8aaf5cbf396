use anyhow::Context;
use pkg_constants::controller::DEFAULT_RECONCILE_INTERVAL_SECS;
use pkg_state::ObjectClient;
use pkg_types::Resource;
use pkg_types::argocd::ArgoCD;
use pkg_types::rbac::RoleBinding;
use pkg_types::validate::validate_object_key;
use std::time::Duration;
use tracing::{info, warn};

use super::{ApplicationSetReconciler, resource_name};

/// Background controller that keeps the ApplicationSet RoleBinding of every
/// ArgoCD instance in step with the instance.
///
/// Instances with the ApplicationSet controller enabled get their binding
/// converged; disabled or terminating instances get it removed.
pub struct ApplicationSetController<A, B> {
    instances: A,
    reconciler: ApplicationSetReconciler<B>,
    namespace: Option<String>,
    check_interval: Duration,
}

impl<A, B> ApplicationSetController<A, B>
where
    A: ObjectClient<ArgoCD> + 'static,
    B: ObjectClient<RoleBinding> + 'static,
{
    pub fn new(instances: A, bindings: B) -> Self {
        Self {
            instances,
            reconciler: ApplicationSetReconciler::new(bindings),
            namespace: None,
            check_interval: Duration::from_secs(DEFAULT_RECONCILE_INTERVAL_SECS),
        }
    }

    /// Only look at ArgoCD instances in `namespace`.
    pub fn with_namespace(mut self, namespace: Option<String>) -> Self {
        self.namespace = namespace;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    /// Start the controller loop as a background task.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "ApplicationSetController started (interval={}s, namespace={})",
                self.check_interval.as_secs(),
                self.namespace.as_deref().unwrap_or("*")
            );
            let mut interval = tokio::time::interval(self.check_interval);
            loop {
                interval.tick().await;
                if let Err(e) = self.reconcile().await {
                    warn!("ApplicationSetController reconcile error: {:#}", e);
                }
            }
        })
    }

    /// One pass over all ArgoCD instances. A failing instance is logged and
    /// skipped; the pass reports an error if any instance failed.
    async fn reconcile(&self) -> anyhow::Result<()> {
        let instances = self
            .instances
            .list(self.namespace.as_deref())
            .await
            .context("failed to list ArgoCD instances")?;

        let mut failed = 0usize;
        for argocd in &instances {
            if let Err(e) = self.reconcile_instance(argocd).await {
                warn!(
                    "ArgoCD {}/{}: {:#}",
                    argocd.namespace(),
                    argocd.name(),
                    e
                );
                failed += 1;
            }
        }

        if failed > 0 {
            anyhow::bail!(
                "{} of {} ArgoCD instances failed to reconcile",
                failed,
                instances.len()
            );
        }
        Ok(())
    }

    async fn reconcile_instance(&self, argocd: &ArgoCD) -> anyhow::Result<()> {
        let name = resource_name(argocd.name());
        let ns = argocd.namespace();
        validate_object_key(&name, ns)?;

        if argocd.wants_applicationset() {
            self.reconciler
                .reconcile_role_binding(&name, ns, Some(argocd))
                .await?;
        } else {
            self.reconciler.delete_role_binding(&name, ns).await?;
        }
        Ok(())
    }
}
