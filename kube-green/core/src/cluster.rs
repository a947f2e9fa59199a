//! The generic cluster-I/O capability the engine needs (spec.md's
//! "decouple core logic from a live cluster" requirement).
//!
//! Every patch target — native Kubernetes kinds, the three managed CRs, and
//! author-supplied ones — is handled uniformly as a [`DynamicObject`]. This
//! keeps the engine free of per-kind branching and lets tests run against an
//! in-memory double instead of a real API server.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};

use kube_green_crd::{SleepInfo, SleepInfoStatus};

use crate::error::Result;

/// Builds the [`ApiResource`] for a (group, version, kind, plural) tuple.
/// Centralized here so `PatchTarget` doesn't need to depend on `kube::core`
/// directly.
pub fn api_resource(group: &str, version: &str, kind: &str, plural: &str) -> ApiResource {
    let gvk = GroupVersionKind::gvk(group, version, kind);
    ApiResource::from_gvk_with_plural(&gvk, plural)
}

/// Everything the engine needs from a Kubernetes cluster, abstracted behind
/// a trait so production code (backed by `kube::Client`) and tests (backed
/// by an in-memory fake) share one reconciliation path.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Lists every object of `resource`'s kind in `namespace`.
    async fn list(&self, namespace: &str, resource: &ApiResource) -> Result<Vec<DynamicObject>>;

    /// Writes the full object back via server-side apply, field-managed by
    /// `field_manager`. Used for the SLEEP path, where the engine computes
    /// the complete post-patch object locally.
    async fn apply(
        &self,
        namespace: &str,
        resource: &ApiResource,
        name: &str,
        field_manager: &str,
        object: serde_json::Value,
    ) -> Result<DynamicObject>;

    /// Applies an RFC 7396 JSON merge patch. Used for the WAKE restore path,
    /// where only the reverse patch is known, not the full target shape.
    async fn merge_patch(
        &self,
        namespace: &str,
        resource: &ApiResource,
        name: &str,
        field_manager: &str,
        patch: serde_json::Value,
    ) -> Result<DynamicObject>;

    /// Lists every `SleepInfo` in `namespace`.
    async fn list_sleep_infos(&self, namespace: &str) -> Result<Vec<SleepInfo>>;

    /// Writes `status` to the `SleepInfo` named `name`'s status subresource.
    async fn update_status(&self, namespace: &str, name: &str, status: SleepInfoStatus) -> Result<()>;

    /// Reads the restore-record sidecar `Secret`, if it exists.
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>>;

    /// Creates or replaces the sidecar `Secret`. Implementations must
    /// surface a resource-version mismatch as `CoreError::Conflict` so the
    /// reconciler can requeue instead of silently losing a concurrent
    /// writer's update.
    async fn put_secret(&self, namespace: &str, secret: Secret) -> Result<()>;

    /// Emits a namespace-scoped warning `Event` tied to `sleep_info`.
    /// Best-effort: a failure here must never abort a firing.
    async fn emit_warning(&self, sleep_info: &SleepInfo, reason: &str, message: &str);
}
