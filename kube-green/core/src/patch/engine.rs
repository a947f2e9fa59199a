//! Drives one firing: lists the live objects for each patch target, applies
//! or restores them, and keeps the sidecar restore record in sync
//! (spec.md §4.3).
//!
//! Two regimes, chosen per target:
//! - **Annotation-driven** (`PgCluster`, `HDFSCluster`): the wake patch is
//!   applied unconditionally, ignoring the restore store entirely, with an
//!   add/replace fallback for the first firing against an object with no
//!   prior annotation.
//! - **Value-driven** (everything else, including author patches): SLEEP
//!   computes the full post-patch object, writes it via server-side apply,
//!   and stores the reverse merge patch. WAKE looks the reverse patch up
//!   per object and restores it, unless the object has drifted since SLEEP
//!   touched it, in which case the restore is skipped and a warning event
//!   is raised instead.

use kube::core::DynamicObject;

use kube_green_crd::{Operation, SleepInfo, SleepInfoSpec};

use crate::cluster::ClusterClient;
use crate::error::Result;
use crate::pair::find_sleep_half;
use crate::restore::{store, RestoreRecord};

use super::merge;
use super::{catalog, PatchBody, PatchEntry, PatchTarget};

const FIELD_MANAGER: &str = "kube-green";

/// Tally of what one firing did, surfaced in `SleepInfo.status`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FiringOutcome {
    pub applied: usize,
    pub skipped: usize,
    pub warnings: Vec<String>,
}

/// Runs one SLEEP or WAKE_UP firing for `sleep_info` against every matching
/// object in `namespace`. `peers` is every other `SleepInfo` in the same
/// namespace, consulted only for the §4.5 pair-assisted restore lookup
/// below — it has no bearing on which operation fires.
pub async fn fire<C: ClusterClient + ?Sized>(
    client: &C,
    namespace: &str,
    sleep_info: &SleepInfo,
    operation: Operation,
    peers: &[SleepInfo],
) -> Result<FiringOutcome> {
    let name = sleep_info.metadata.name.clone().unwrap_or_default();
    let spec = &sleep_info.spec;
    let entries = catalog::build(spec, operation)?;
    let (mut record, resource_version) = store::load(client, namespace, &name).await?;
    let mut outcome = FiringOutcome::default();

    for entry in &entries {
        if entry.target.is_annotation_driven() {
            apply_annotation_entry(client, namespace, entry, spec, sleep_info, &mut outcome).await?;
        } else {
            apply_sleep_entry(client, namespace, entry, spec, sleep_info, &mut record, &mut outcome).await?;
        }
    }

    if operation == Operation::WakeUp {
        if record.is_empty() {
            if let Some(borrowed_from) = find_sleep_half(sleep_info, peers).and_then(|s| s.metadata.name.clone()) {
                restore_from_paired_sidecar(client, namespace, spec, sleep_info, &borrowed_from, &mut outcome).await?;
            } else {
                restore_pending(client, namespace, spec, sleep_info, &mut record, &mut outcome).await?;
            }
        } else {
            restore_pending(client, namespace, spec, sleep_info, &mut record, &mut outcome).await?;
        }
    }

    store::save(client, namespace, &name, &record, resource_version).await?;
    Ok(outcome)
}

/// Restores objects using the *sleep-half's* sidecar record rather than
/// this `SleepInfo`'s own (spec.md §4.5: "locate the paired sleep-half by
/// shared annotations and borrow its restore state"). The mutated record —
/// with every entry this firing consumed removed — is written back under
/// the sleep-half's own name, since that secret is where the entries live;
/// this `SleepInfo`'s own (empty) sidecar is untouched.
async fn restore_from_paired_sidecar<C: ClusterClient + ?Sized>(
    client: &C,
    namespace: &str,
    spec: &SleepInfoSpec,
    sleep_info: &SleepInfo,
    sleep_half_name: &str,
    outcome: &mut FiringOutcome,
) -> Result<()> {
    let (mut borrowed, resource_version) = store::load(client, namespace, sleep_half_name).await?;
    if borrowed.is_empty() {
        return Ok(());
    }
    restore_pending(client, namespace, spec, sleep_info, &mut borrowed, outcome).await?;
    store::save(client, namespace, sleep_half_name, &borrowed, resource_version).await
}

async fn apply_annotation_entry<C: ClusterClient + ?Sized>(
    client: &C,
    namespace: &str,
    entry: &PatchEntry,
    spec: &SleepInfoSpec,
    sleep_info: &SleepInfo,
    outcome: &mut FiringOutcome,
) -> Result<()> {
    let PatchBody::Pointer(pointer) = &entry.body else {
        return Ok(());
    };
    let resource = entry.target.api_resource();
    let objects = client.list(namespace, &resource).await?;
    let merge_doc = merge::pointer_patch_to_merge_doc(pointer)?;

    for object in objects {
        let Some(obj_name) = object.metadata.name.clone() else {
            continue;
        };
        if is_excluded(&object, spec, &entry.target) {
            outcome.skipped += 1;
            continue;
        }
        if let Err(e) = client
            .merge_patch(namespace, &resource, &obj_name, FIELD_MANAGER, merge_doc.clone())
            .await
        {
            let message = e.to_string();
            client.emit_warning(sleep_info, "PatchFailed", &message).await;
            outcome.warnings.push(message);
            continue;
        }
        outcome.applied += 1;
    }
    Ok(())
}

async fn apply_sleep_entry<C: ClusterClient + ?Sized>(
    client: &C,
    namespace: &str,
    entry: &PatchEntry,
    spec: &SleepInfoSpec,
    sleep_info: &SleepInfo,
    record: &mut RestoreRecord,
    outcome: &mut FiringOutcome,
) -> Result<()> {
    let resource = entry.target.api_resource();
    let objects = client.list(namespace, &resource).await?;

    for object in objects {
        let Some(obj_name) = object.metadata.name.clone() else {
            continue;
        };
        if is_excluded(&object, spec, &entry.target) {
            outcome.skipped += 1;
            continue;
        }
        let before = match serde_json::to_value(&object) {
            Ok(v) => v,
            Err(e) => {
                outcome.warnings.push(e.to_string());
                continue;
            }
        };
        let after = match merge::apply_entry(&before, entry) {
            Ok(v) => v,
            Err(e) => {
                let message = e.to_string();
                client.emit_warning(sleep_info, "PatchFailed", &message).await;
                outcome.warnings.push(message);
                continue;
            }
        };
        let reverse = merge::diff_merge_patch(&after, &before);
        if merge::is_empty_object(&reverse) {
            outcome.skipped += 1;
            continue;
        }
        client.apply(namespace, &resource, &obj_name, FIELD_MANAGER, after).await?;
        record.set(&entry.target.restore_key(), &obj_name, reverse);
        outcome.applied += 1;
    }
    Ok(())
}

/// Restores every value-driven target the restore record still has an
/// entry for, and — for a target `spec` still has enabled — forward-
/// patches any object that has no restore entry at all (spec.md §4.3:
/// "If absent and the patch target carries a non-empty forward patch
/// anyway, apply that forward patch... this lets a wake-only `SleepInfo`
/// still act on objects it never slept"). The candidate kinds are the
/// fixed builtin list (so leftover restore entries for a toggle the
/// author has since disabled still get cleaned up) plus whatever author
/// targets are still configured.
async fn restore_pending<C: ClusterClient + ?Sized>(
    client: &C,
    namespace: &str,
    spec: &SleepInfoSpec,
    sleep_info: &SleepInfo,
    record: &mut RestoreRecord,
    outcome: &mut FiringOutcome,
) -> Result<()> {
    let forward_eligible = catalog::wake_value_targets(spec);
    let mut candidates = vec![
        PatchTarget::Deployment,
        PatchTarget::StatefulSet,
        PatchTarget::CronJob,
        PatchTarget::PgBouncer,
    ];
    candidates.extend(
        spec.patches
            .iter()
            .map(|p| PatchTarget::Author(p.target.clone())),
    );

    for target in candidates {
        let key = target.restore_key();
        let can_forward = forward_eligible.contains(&target) || matches!(target, PatchTarget::Author(_));
        if !record.has_any(&key) && !can_forward {
            continue;
        }
        let resource = target.api_resource();
        let objects = client.list(namespace, &resource).await?;
        let probe = probe_entry(&target, spec);

        for object in objects {
            let Some(obj_name) = object.metadata.name.clone() else {
                continue;
            };
            if is_excluded(&object, spec, &target) {
                outcome.skipped += 1;
                continue;
            }

            if let Some(reverse) = record.get(&key, &obj_name).cloned() {
                if let Some(probe_entry) = &probe {
                    if has_drifted(&object, probe_entry) {
                        let message = format!(
                            "{}/{} was modified since it was put to sleep, skipping wake up",
                            target.kind(),
                            obj_name
                        );
                        client
                            .emit_warning(sleep_info, "ResourceModified", &message)
                            .await;
                        outcome.warnings.push(message);
                        continue;
                    }
                }

                client
                    .merge_patch(namespace, &resource, &obj_name, FIELD_MANAGER, reverse)
                    .await?;
                record.remove(&key, &obj_name);
                outcome.applied += 1;
                continue;
            }

            if !can_forward {
                continue;
            }
            let Some(probe_entry) = &probe else {
                continue;
            };
            if apply_forward_fallback(client, namespace, &resource, &obj_name, &object, probe_entry).await? {
                outcome.applied += 1;
            }
        }
    }
    Ok(())
}

/// Applies `probe`'s forward patch directly to `object`, with no restore
/// bookkeeping — there is nothing to reverse since this object was never
/// put to sleep by this `SleepInfo`. Pointer patches go through the same
/// add/replace fallback as the annotation-driven CRs; an author's RFC 6902
/// document is simulated locally and the resulting object applied whole,
/// mirroring the SLEEP path's write but skipping the restore-patch step.
async fn apply_forward_fallback<C: ClusterClient + ?Sized>(
    client: &C,
    namespace: &str,
    resource: &kube::core::ApiResource,
    obj_name: &str,
    object: &DynamicObject,
    probe: &PatchEntry,
) -> Result<bool> {
    match &probe.body {
        PatchBody::Pointer(pointer) => {
            let merge_doc = merge::pointer_patch_to_merge_doc(pointer)?;
            client
                .merge_patch(namespace, resource, obj_name, FIELD_MANAGER, merge_doc)
                .await?;
            Ok(true)
        }
        PatchBody::Json(_) => {
            let Ok(live) = serde_json::to_value(object) else {
                return Ok(false);
            };
            match merge::apply_entry(&live, probe) {
                Ok(after) => {
                    client.apply(namespace, resource, obj_name, FIELD_MANAGER, after).await?;
                    Ok(true)
                }
                Err(_) => Ok(false),
            }
        }
    }
}

/// Whether re-applying the SLEEP-time patch to the current live object
/// would still change anything. If it wouldn't, the object is still in the
/// shape SLEEP left it in and the restore is safe; if it would, something
/// else has touched the object in the meantime.
fn has_drifted(object: &DynamicObject, probe: &PatchEntry) -> bool {
    let Ok(live) = serde_json::to_value(object) else {
        return false;
    };
    match merge::apply_entry(&live, probe) {
        Ok(reapplied) => !merge::is_empty_object(&merge::diff_merge_patch(&reapplied, &live)),
        // Can't re-simulate (the path catalog assumed no longer exists);
        // don't strand the restore over it.
        Err(_) => false,
    }
}

fn probe_entry(target: &PatchTarget, spec: &SleepInfoSpec) -> Option<PatchEntry> {
    if let PatchTarget::Author(target_ref) = target {
        let author = spec.patches.iter().find(|p| &p.target == target_ref)?;
        let ops: json_patch::Patch = serde_json::from_value(author.patch.clone()).ok()?;
        return Some(PatchEntry {
            target: target.clone(),
            body: PatchBody::Json(ops),
        });
    }
    catalog::builtin_forward_patch(target).map(|pointer| PatchEntry {
        target: target.clone(),
        body: PatchBody::Pointer(pointer),
    })
}

/// Whether `object` should be skipped: either its labels match an
/// `excludeRef` selector, or it's controller-owned by something other than
/// this operator and its kind isn't one of the three managed CRs, which are
/// exempt from that rule because their own "controller" is the database
/// operator they belong to, not a Kubernetes native controller loop
/// (spec.md §4.3's "3-CR exemption").
fn is_excluded(object: &DynamicObject, spec: &SleepInfoSpec, target: &PatchTarget) -> bool {
    let labels = object.metadata.labels.clone().unwrap_or_default();
    if spec.exclude_ref.iter().any(|m| m.matches(&labels)) {
        return true;
    }
    if !target.is_managed_cr() {
        if let Some(owners) = &object.metadata.owner_references {
            if owners.iter().any(|o| o.controller == Some(true)) {
                return true;
            }
        }
    }
    false
}
