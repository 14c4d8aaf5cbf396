use anyhow::Context;
use pkg_constants::labels::{
    LABEL_COMPONENT, LABEL_MANAGED_BY, LABEL_NAME, LABEL_PART_OF, PART_OF_ARGOCD,
};
use pkg_constants::rbac::APPLICATIONSET_CONTROLLER_COMPONENT;
use pkg_state::ObjectClient;
use pkg_types::argocd::ArgoCD;
use pkg_types::rbac::{RoleBinding, RoleRef, Subject};
use pkg_types::{ObjectMeta, Resource};
use tracing::{debug, info};

use super::ApplicationSetReconciler;

/// What a converge pass did to the RoleBinding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleBindingAction {
    Created,
    Updated,
    Unchanged,
}

/// The RoleBinding that should exist for `resource_name` in `namespace`.
///
/// Binds the Role named `resource_name` to the ServiceAccount of the same name.
/// When `owner` is given it becomes the controlling owner, so the binding is
/// collected with its ArgoCD even if the explicit delete never runs.
pub fn desired_role_binding(
    resource_name: &str,
    namespace: &str,
    owner: Option<&ArgoCD>,
) -> RoleBinding {
    let mut metadata = ObjectMeta::new(resource_name, namespace);
    metadata
        .labels
        .insert(LABEL_NAME.to_string(), resource_name.to_string());
    metadata
        .labels
        .insert(LABEL_PART_OF.to_string(), PART_OF_ARGOCD.to_string());
    metadata.labels.insert(
        LABEL_COMPONENT.to_string(),
        APPLICATIONSET_CONTROLLER_COMPONENT.to_string(),
    );
    if let Some(owner) = owner {
        metadata
            .labels
            .insert(LABEL_MANAGED_BY.to_string(), owner.name().to_string());
        metadata.owner_references.push(owner.controller_ref());
    }

    RoleBinding {
        metadata,
        role_ref: RoleRef::role(resource_name),
        subjects: vec![Subject::service_account(resource_name, namespace)],
    }
}

impl<C: ObjectClient<RoleBinding>> ApplicationSetReconciler<C> {
    /// Make the stored RoleBinding match [`desired_role_binding`].
    ///
    /// Creates it when absent. When `role_ref` or `subjects` drifted, both are
    /// overwritten on the fetched object and written back with its resource
    /// version, so a concurrent writer turns this call into a conflict error.
    /// Performs at most one write and never retries.
    pub async fn reconcile_role_binding(
        &self,
        resource_name: &str,
        namespace: &str,
        owner: Option<&ArgoCD>,
    ) -> anyhow::Result<RoleBindingAction> {
        let desired = desired_role_binding(resource_name, namespace, owner);

        let mut existing = match self.client.get(resource_name, namespace).await {
            Ok(rb) => rb,
            Err(e) if e.is_not_found() => {
                self.client.create(&desired).await.with_context(|| {
                    format!("failed to create RoleBinding {}/{}", namespace, resource_name)
                })?;
                info!("Created RoleBinding {}/{}", namespace, resource_name);
                return Ok(RoleBindingAction::Created);
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("failed to get RoleBinding {}/{}", namespace, resource_name)
                });
            }
        };

        if existing.grants_match(&desired) {
            debug!("RoleBinding {}/{} is up to date", namespace, resource_name);
            return Ok(RoleBindingAction::Unchanged);
        }

        // Both fields together, never one at a time.
        existing.role_ref = desired.role_ref;
        existing.subjects = desired.subjects;
        self.client.update(&existing).await.with_context(|| {
            format!("failed to update RoleBinding {}/{}", namespace, resource_name)
        })?;
        info!("Updated drifted RoleBinding {}/{}", namespace, resource_name);
        Ok(RoleBindingAction::Updated)
    }

    /// Delete the RoleBinding. Already being gone counts as success.
    pub async fn delete_role_binding(
        &self,
        resource_name: &str,
        namespace: &str,
    ) -> anyhow::Result<()> {
        match self.client.delete(resource_name, namespace).await {
            Ok(()) => {
                info!("Deleted RoleBinding {}/{}", namespace, resource_name);
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                debug!(
                    "RoleBinding {}/{} already absent, nothing to delete",
                    namespace, resource_name
                );
                Ok(())
            }
            Err(e) => Err(e).with_context(|| {
                format!("failed to delete RoleBinding {}/{}", namespace, resource_name)
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pkg_state::{ClientError, MemoryClient};
    use pkg_types::argocd::{ApplicationSetSpec, ArgoCDSpec};
    use pkg_types::rbac::SubjectKind;

    const NAME: &str = "argocd";
    const NS: &str = "argocd";

    fn reconciler() -> (
        ApplicationSetReconciler<MemoryClient<RoleBinding>>,
        MemoryClient<RoleBinding>,
    ) {
        let client = MemoryClient::new();
        (ApplicationSetReconciler::new(client.clone()), client)
    }

    fn outdated(role_ref: RoleRef, subjects: Vec<Subject>) -> RoleBinding {
        RoleBinding {
            metadata: ObjectMeta::new(NAME, NS),
            role_ref,
            subjects,
        }
    }

    fn assert_converged(rb: &RoleBinding) {
        assert_eq!(
            rb.role_ref,
            RoleRef {
                api_group: "rbac.authorization.k8s.io".to_string(),
                kind: "Role".to_string(),
                name: NAME.to_string(),
            }
        );
        assert_eq!(
            rb.subjects,
            vec![Subject {
                kind: SubjectKind::ServiceAccount,
                name: NAME.to_string(),
                namespace: Some(NS.to_string()),
                api_group: String::new(),
            }]
        );
    }

    /// Every call fails as if the backend were unreachable.
    struct UnavailableClient;

    #[async_trait]
    impl ObjectClient<RoleBinding> for UnavailableClient {
        async fn get(&self, _name: &str, _namespace: &str) -> Result<RoleBinding, ClientError> {
            Err(anyhow::anyhow!("connection refused").into())
        }
        async fn create(&self, _obj: &RoleBinding) -> Result<RoleBinding, ClientError> {
            Err(anyhow::anyhow!("connection refused").into())
        }
        async fn update(&self, _obj: &RoleBinding) -> Result<RoleBinding, ClientError> {
            Err(anyhow::anyhow!("connection refused").into())
        }
        async fn delete(&self, _name: &str, _namespace: &str) -> Result<(), ClientError> {
            Err(anyhow::anyhow!("connection refused").into())
        }
        async fn list(&self, _namespace: Option<&str>) -> Result<Vec<RoleBinding>, ClientError> {
            Err(anyhow::anyhow!("connection refused").into())
        }
    }

    /// Reads succeed, but another writer bumps the object right after each read.
    struct RacingClient {
        inner: MemoryClient<RoleBinding>,
    }

    #[async_trait]
    impl ObjectClient<RoleBinding> for RacingClient {
        async fn get(&self, name: &str, namespace: &str) -> Result<RoleBinding, ClientError> {
            let rb = self.inner.get(name, namespace).await?;
            self.inner.update(&rb).await?;
            Ok(rb)
        }
        async fn create(&self, obj: &RoleBinding) -> Result<RoleBinding, ClientError> {
            self.inner.create(obj).await
        }
        async fn update(&self, obj: &RoleBinding) -> Result<RoleBinding, ClientError> {
            self.inner.update(obj).await
        }
        async fn delete(&self, name: &str, namespace: &str) -> Result<(), ClientError> {
            self.inner.delete(name, namespace).await
        }
        async fn list(&self, namespace: Option<&str>) -> Result<Vec<RoleBinding>, ClientError> {
            self.inner.list(namespace).await
        }
    }

    #[test]
    fn desired_binding_points_role_and_subject_at_resource_name() {
        let rb = desired_role_binding(NAME, NS, None);
        assert_eq!(rb.metadata.name, NAME);
        assert_eq!(rb.metadata.namespace, NS);
        assert_converged(&rb);
        assert!(rb.metadata.owner_references.is_empty());
        assert_eq!(
            rb.metadata.labels.get("app.kubernetes.io/component").map(String::as_str),
            Some("applicationset-controller")
        );
    }

    #[test]
    fn desired_binding_is_owned_by_argocd() {
        let mut owner = ArgoCD {
            metadata: ObjectMeta::new("example", NS),
            spec: ArgoCDSpec {
                applicationset: ApplicationSetSpec { enabled: true },
            },
        };
        owner.metadata.uid = "uid-1".to_string();

        let rb = desired_role_binding("example-applicationset-controller", NS, Some(&owner));
        let controller = rb.metadata.controller_owner().unwrap();
        assert_eq!(controller.kind, "ArgoCD");
        assert_eq!(controller.name, "example");
        assert_eq!(controller.uid, "uid-1");
        assert_eq!(
            rb.metadata.labels.get("app.kubernetes.io/managed-by").map(String::as_str),
            Some("example")
        );
    }

    #[tokio::test]
    async fn test_creates_missing_binding() {
        let (r, client) = reconciler();

        let action = r.reconcile_role_binding(NAME, NS, None).await.unwrap();
        assert_eq!(action, RoleBindingAction::Created);

        let rb = client.get(NAME, NS).await.unwrap();
        assert_converged(&rb);
        assert_eq!(client.write_count(), 1);
    }

    #[tokio::test]
    async fn test_overwrites_empty_binding() {
        let (r, client) = reconciler();
        client.seed([outdated(RoleRef::default(), vec![])]).await;
        let before = client.get(NAME, NS).await.unwrap();

        let action = r.reconcile_role_binding(NAME, NS, None).await.unwrap();
        assert_eq!(action, RoleBindingAction::Updated);

        let rb = client.get(NAME, NS).await.unwrap();
        assert_converged(&rb);
        assert_eq!(rb.metadata.uid, before.metadata.uid);
        assert_eq!(rb.metadata.resource_version, before.metadata.resource_version + 1);
        assert_eq!(client.write_count(), 1);
    }

    #[tokio::test]
    async fn test_second_reconcile_does_not_write() {
        let (r, client) = reconciler();

        r.reconcile_role_binding(NAME, NS, None).await.unwrap();
        let action = r.reconcile_role_binding(NAME, NS, None).await.unwrap();
        assert_eq!(action, RoleBindingAction::Unchanged);
        assert_eq!(client.write_count(), 1);
    }

    #[tokio::test]
    async fn test_role_ref_only_drift_rewrites_both_fields() {
        let (r, client) = reconciler();
        client
            .seed([outdated(
                RoleRef::role("someone-else"),
                vec![Subject::service_account(NAME, NS)],
            )])
            .await;

        let action = r.reconcile_role_binding(NAME, NS, None).await.unwrap();
        assert_eq!(action, RoleBindingAction::Updated);
        assert_converged(&client.get(NAME, NS).await.unwrap());
    }

    #[tokio::test]
    async fn test_extra_subjects_are_replaced_not_merged() {
        let (r, client) = reconciler();
        client
            .seed([outdated(
                RoleRef::role(NAME),
                vec![
                    Subject::service_account(NAME, NS),
                    Subject::service_account("intruder", NS),
                ],
            )])
            .await;

        r.reconcile_role_binding(NAME, NS, None).await.unwrap();
        let rb = client.get(NAME, NS).await.unwrap();
        assert_converged(&rb);
        assert_eq!(rb.subjects.len(), 1);
    }

    #[tokio::test]
    async fn test_update_keeps_existing_metadata() {
        let (r, client) = reconciler();
        let mut seeded = outdated(RoleRef::default(), vec![]);
        seeded
            .metadata
            .labels
            .insert("team".to_string(), "platform".to_string());
        client.seed([seeded]).await;

        r.reconcile_role_binding(NAME, NS, None).await.unwrap();
        let rb = client.get(NAME, NS).await.unwrap();
        assert_eq!(rb.metadata.labels.get("team").map(String::as_str), Some("platform"));
    }

    #[tokio::test]
    async fn test_get_failure_is_propagated() {
        let r = ApplicationSetReconciler::new(UnavailableClient);

        let err = r.reconcile_role_binding(NAME, NS, None).await.unwrap_err();
        assert_eq!(err.to_string(), "failed to get RoleBinding argocd/argocd");
        let cause = err.downcast_ref::<ClientError>().unwrap();
        assert!(matches!(cause, ClientError::Backend(_)));
    }

    #[tokio::test]
    async fn test_stale_update_surfaces_conflict() {
        let inner = MemoryClient::new();
        inner.seed([outdated(RoleRef::default(), vec![])]).await;
        let r = ApplicationSetReconciler::new(RacingClient {
            inner: inner.clone(),
        });

        let err = r.reconcile_role_binding(NAME, NS, None).await.unwrap_err();
        assert!(err.downcast_ref::<ClientError>().unwrap().is_conflict());

        // The racing write landed, ours did not
        let rb = inner.get(NAME, NS).await.unwrap();
        assert_eq!(rb.role_ref, RoleRef::default());
        assert!(rb.subjects.is_empty());
    }

    #[tokio::test]
    async fn test_delete_existing_binding() {
        let (r, client) = reconciler();
        r.reconcile_role_binding(NAME, NS, None).await.unwrap();

        r.delete_role_binding(NAME, NS).await.unwrap();
        assert!(client.get(NAME, NS).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_delete_missing_binding_succeeds() {
        let (r, client) = reconciler();

        r.delete_role_binding(NAME, NS).await.unwrap();
        r.delete_role_binding(NAME, NS).await.unwrap();
        assert_eq!(client.write_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_failure_is_propagated() {
        let r = ApplicationSetReconciler::new(UnavailableClient);

        let err = r.delete_role_binding(NAME, NS).await.unwrap_err();
        assert_eq!(err.to_string(), "failed to delete RoleBinding argocd/argocd");
    }
}
