//! An in-memory [`ClusterClient`] double for tests. Good enough to drive
//! the real patch engine end to end without a live API server.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::core::{ApiResource, DynamicObject};

use kube_green_crd::{SleepInfo, SleepInfoStatus};

use crate::cluster::ClusterClient;
use crate::error::{CoreError, Result};
use crate::patch::merge::apply_merge_patch;

#[derive(Default)]
pub struct FakeCluster {
    objects: Mutex<HashMap<(String, String), HashMap<String, DynamicObject>>>,
    sleep_infos: Mutex<HashMap<String, Vec<SleepInfo>>>,
    secrets: Mutex<HashMap<(String, String), Secret>>,
    pub events: Mutex<Vec<(String, String, String)>>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_object(&self, namespace: &str, resource: &ApiResource, object: DynamicObject) {
        let name = object.metadata.name.clone().expect("seeded object needs a name");
        self.objects
            .lock()
            .unwrap()
            .entry((namespace.to_string(), resource.plural.clone()))
            .or_default()
            .insert(name, object);
    }

    pub fn seed_sleep_info(&self, namespace: &str, sleep_info: SleepInfo) {
        self.sleep_infos
            .lock()
            .unwrap()
            .entry(namespace.to_string())
            .or_default()
            .push(sleep_info);
    }

    pub fn get_object(&self, namespace: &str, resource: &ApiResource, name: &str) -> Option<DynamicObject> {
        self.objects
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), resource.plural.clone()))?
            .get(name)
            .cloned()
    }
}

#[async_trait]
impl ClusterClient for FakeCluster {
    async fn list(&self, namespace: &str, resource: &ApiResource) -> Result<Vec<DynamicObject>> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), resource.plural.clone()))
            .map(|by_name| by_name.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn apply(
        &self,
        namespace: &str,
        resource: &ApiResource,
        name: &str,
        _field_manager: &str,
        object: serde_json::Value,
    ) -> Result<DynamicObject> {
        let dynamic: DynamicObject = serde_json::from_value(object)?;
        self.objects
            .lock()
            .unwrap()
            .entry((namespace.to_string(), resource.plural.clone()))
            .or_default()
            .insert(name.to_string(), dynamic.clone());
        Ok(dynamic)
    }

    async fn merge_patch(
        &self,
        namespace: &str,
        resource: &ApiResource,
        name: &str,
        _field_manager: &str,
        patch: serde_json::Value,
    ) -> Result<DynamicObject> {
        let mut objects = self.objects.lock().unwrap();
        let bucket = objects
            .entry((namespace.to_string(), resource.plural.clone()))
            .or_default();
        let existing = bucket
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::MalformedPatch {
                kind: resource.kind.clone(),
                name: name.to_string(),
                reason: "object not found".to_string(),
            })?;
        let mut value = serde_json::to_value(&existing)?;
        apply_merge_patch(&mut value, &patch);
        let updated: DynamicObject = serde_json::from_value(value)?;
        bucket.insert(name.to_string(), updated.clone());
        Ok(updated)
    }

    async fn list_sleep_infos(&self, namespace: &str) -> Result<Vec<SleepInfo>> {
        Ok(self
            .sleep_infos
            .lock()
            .unwrap()
            .get(namespace)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>> {
        Ok(self
            .secrets
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn put_secret(&self, namespace: &str, secret: Secret) -> Result<()> {
        let name = secret
            .metadata
            .name
            .clone()
            .expect("secret being persisted needs a name");
        let mut secrets = self.secrets.lock().unwrap();
        let key = (namespace.to_string(), name);
        if let Some(existing) = secrets.get(&key) {
            if existing.metadata.resource_version != secret.metadata.resource_version {
                return Err(CoreError::Conflict { name: key.1 });
            }
        }
        let mut stored = secret;
        let next_version = stored
            .metadata
            .resource_version
            .as_ref()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0)
            + 1;
        stored.metadata.resource_version = Some(next_version.to_string());
        secrets.insert(key, stored);
        Ok(())
    }

    async fn update_status(&self, namespace: &str, name: &str, status: SleepInfoStatus) -> Result<()> {
        if let Some(list) = self.sleep_infos.lock().unwrap().get_mut(namespace) {
            if let Some(found) = list.iter_mut().find(|si| si.metadata.name.as_deref() == Some(name)) {
                found.status = Some(status);
            }
        }
        Ok(())
    }

    async fn emit_warning(&self, sleep_info: &SleepInfo, reason: &str, message: &str) {
        let name = sleep_info.metadata.name.clone().unwrap_or_default();
        self.events
            .lock()
            .unwrap()
            .push((name, reason.to_string(), message.to_string()));
    }
}
