//! The restore record: a namespace's memory of what SLEEP changed, so WAKE
//! knows what to put back (spec.md §3, §4.4).

pub mod store;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Per patch-target-kind, per object name, the RFC 7396 merge patch that
/// reverses what SLEEP did to that object.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct RestoreRecord {
    #[serde(flatten)]
    by_target: BTreeMap<String, BTreeMap<String, Value>>,
}

impl RestoreRecord {
    pub fn get(&self, target_key: &str, object_name: &str) -> Option<&Value> {
        self.by_target.get(target_key)?.get(object_name)
    }

    pub fn set(&mut self, target_key: &str, object_name: &str, patch: Value) {
        self.by_target
            .entry(target_key.to_string())
            .or_default()
            .insert(object_name.to_string(), patch);
    }

    pub fn remove(&mut self, target_key: &str, object_name: &str) {
        if let Some(by_name) = self.by_target.get_mut(target_key) {
            by_name.remove(object_name);
            if by_name.is_empty() {
                self.by_target.remove(target_key);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.by_target.values().all(|m| m.is_empty())
    }

    /// Whether any object under `target_key` has a stored restore patch —
    /// used to skip listing a kind entirely when there's nothing to
    /// restore for it.
    pub fn has_any(&self, target_key: &str) -> bool {
        self.by_target
            .get(target_key)
            .is_some_and(|m| !m.is_empty())
    }
}

/// Keys a pre-pair-coupling release of this operator used: a flat
/// `name -> replica count` map for Deployments, and a flat
/// `name -> {"suspend": bool}` map for CronJobs, each as its own secret data
/// key rather than nested under a single `restore` document. Read
/// transparently so upgrading the sidecar format doesn't strand existing
/// restore state.
pub fn migrate_legacy(data: &BTreeMap<String, Vec<u8>>) -> RestoreRecord {
    let mut record = RestoreRecord::default();

    if let Some(raw) = data.get("deployment-replicas") {
        if let Ok(Value::Object(by_name)) = serde_json::from_slice::<Value>(raw) {
            for (name, replicas) in by_name {
                record.set(
                    "apps/Deployment",
                    &name,
                    serde_json::json!({"spec": {"replicas": replicas}}),
                );
            }
        }
    }

    if let Some(raw) = data.get("cronjobs-info") {
        if let Ok(Value::Object(by_name)) = serde_json::from_slice::<Value>(raw) {
            for (name, info) in by_name {
                let suspend = info.get("suspend").cloned().unwrap_or(Value::Bool(false));
                record.set(
                    "batch/CronJob",
                    &name,
                    serde_json::json!({"spec": {"suspend": suspend}}),
                );
            }
        }
    }

    record
}
