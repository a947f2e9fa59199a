//! The sidecar `Secret` that persists a namespace's [`RestoreRecord`]
//! (spec.md §4.4: "one `Secret` per `SleepInfo`, named
//! `{name}-sleepinfo-restore`").

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;

use crate::cluster::ClusterClient;
use crate::error::Result;

use super::{migrate_legacy, RestoreRecord};

const RESTORE_KEY: &str = "restore";

pub fn secret_name(sleep_info_name: &str) -> String {
    format!("{sleep_info_name}-sleepinfo-restore")
}

/// Loads the restore record for `sleep_info_name`, along with the secret's
/// current `resourceVersion` (`None` if the secret doesn't exist yet, in
/// which case a save must create it).
pub async fn load<C: ClusterClient + ?Sized>(
    client: &C,
    namespace: &str,
    sleep_info_name: &str,
) -> Result<(RestoreRecord, Option<String>)> {
    let name = secret_name(sleep_info_name);
    let Some(secret) = client.get_secret(namespace, &name).await? else {
        return Ok((RestoreRecord::default(), None));
    };
    let resource_version = secret.metadata.resource_version.clone();
    let data: BTreeMap<String, Vec<u8>> = secret
        .data
        .unwrap_or_default()
        .into_iter()
        .map(|(k, ByteString(bytes))| (k, bytes))
        .collect();

    let record = match data.get(RESTORE_KEY) {
        Some(raw) => serde_json::from_slice(raw)?,
        None => migrate_legacy(&data),
    };
    Ok((record, resource_version))
}

/// Persists `record`, failing with [`CoreError::Conflict`] if
/// `expected_resource_version` no longer matches what's on the server —
/// the caller should re-load and retry rather than clobber a concurrent
/// writer (spec.md's "optimistic concurrency on the sidecar secret").
pub async fn save<C: ClusterClient + ?Sized>(
    client: &C,
    namespace: &str,
    sleep_info_name: &str,
    record: &RestoreRecord,
    expected_resource_version: Option<String>,
) -> Result<()> {
    let payload = serde_json::to_vec(record)?;
    let secret = Secret {
        metadata: ObjectMeta {
            name: Some(secret_name(sleep_info_name)),
            namespace: Some(namespace.to_string()),
            resource_version: expected_resource_version,
            ..Default::default()
        },
        data: Some(BTreeMap::from([(
            RESTORE_KEY.to_string(),
            ByteString(payload),
        )])),
        ..Default::default()
    };
    client.put_secret(namespace, secret).await
}
