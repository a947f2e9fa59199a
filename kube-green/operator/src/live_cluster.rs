//! The production [`ClusterClient`]: every method is a thin wrapper around
//! a real `kube::Client`. Kept separate from `kube_green_core::patch::engine`
//! so the engine itself never has a live-cluster dependency to mock around.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{ListParams, Patch, PatchParams, PostParams};
use kube::core::{ApiResource, DynamicObject};
use kube::{Api, Client, Resource};

use kube_green_core::cluster::ClusterClient;
use kube_green_core::error::{CoreError, Result};
use kube_green_crd::{SleepInfo, SleepInfoStatus};

#[derive(Clone)]
pub struct LiveCluster {
    client: Client,
}

impl LiveCluster {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClusterClient for LiveCluster {
    async fn list(&self, namespace: &str, resource: &ApiResource) -> Result<Vec<DynamicObject>> {
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), namespace, resource);
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(|source| CoreError::ListFailed {
                kind: resource.kind.clone(),
                namespace: namespace.to_string(),
                source,
            })?;
        Ok(list.items)
    }

    async fn apply(
        &self,
        namespace: &str,
        resource: &ApiResource,
        name: &str,
        field_manager: &str,
        object: serde_json::Value,
    ) -> Result<DynamicObject> {
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), namespace, resource);
        api.patch(name, &PatchParams::apply(field_manager), &Patch::Apply(&object))
            .await
            .map_err(|source| CoreError::WriteFailed {
                kind: resource.kind.clone(),
                namespace: namespace.to_string(),
                name: name.to_string(),
                source,
            })
    }

    async fn merge_patch(
        &self,
        namespace: &str,
        resource: &ApiResource,
        name: &str,
        field_manager: &str,
        patch: serde_json::Value,
    ) -> Result<DynamicObject> {
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), namespace, resource);
        let params = PatchParams {
            field_manager: Some(field_manager.to_string()),
            ..PatchParams::default()
        };
        api.patch(name, &params, &Patch::Merge(&patch))
            .await
            .map_err(|source| CoreError::WriteFailed {
                kind: resource.kind.clone(),
                namespace: namespace.to_string(),
                name: name.to_string(),
                source,
            })
    }

    async fn list_sleep_infos(&self, namespace: &str) -> Result<Vec<SleepInfo>> {
        let api: Api<SleepInfo> = Api::namespaced(self.client.clone(), namespace);
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(|source| CoreError::ListFailed {
                kind: "SleepInfo".to_string(),
                namespace: namespace.to_string(),
                source,
            })?;
        Ok(list.items)
    }

    async fn update_status(&self, namespace: &str, name: &str, status: SleepInfoStatus) -> Result<()> {
        let api: Api<SleepInfo> = Api::namespaced(self.client.clone(), namespace);
        let patch = serde_json::json!({ "status": status });
        api.patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map(|_| ())
            .map_err(|source| CoreError::WriteFailed {
                kind: "SleepInfo".to_string(),
                namespace: namespace.to_string(),
                name: name.to_string(),
                source,
            })
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        match api.get(name).await {
            Ok(secret) => Ok(Some(secret)),
            Err(kube::Error::Api(e)) if e.code == 404 => Ok(None),
            Err(e) => Err(CoreError::Kube(e)),
        }
    }

    async fn put_secret(&self, namespace: &str, secret: Secret) -> Result<()> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let name = secret
            .metadata
            .name
            .clone()
            .expect("restore secret always carries a name");

        let outcome = if secret.metadata.resource_version.is_none() {
            api.create(&PostParams::default(), &secret).await.map(|_| ())
        } else {
            api.replace(&name, &PostParams::default(), &secret)
                .await
                .map(|_| ())
        };

        outcome.map_err(|e| match e {
            kube::Error::Api(api_err) if api_err.code == 409 => CoreError::Conflict { name },
            other => CoreError::WriteFailed {
                kind: "Secret".to_string(),
                namespace: namespace.to_string(),
                name,
                source: other,
            },
        })
    }

    async fn emit_warning(&self, sleep_info: &SleepInfo, reason: &str, message: &str) {
        use kube::runtime::events::{Event, EventType, Recorder, Reporter};

        let reporter = Reporter {
            controller: "kube-green".to_string(),
            instance: None,
        };
        let object_ref = sleep_info.object_ref(&());
        let recorder = Recorder::new(self.client.clone(), reporter, object_ref);
        if let Err(e) = recorder
            .publish(Event {
                type_: EventType::Warning,
                reason: reason.to_string(),
                note: Some(message.to_string()),
                action: "Reconcile".to_string(),
                secondary: None,
            })
            .await
        {
            tracing::warn!(error = %e, "failed to emit event, continuing");
        }
    }
}
