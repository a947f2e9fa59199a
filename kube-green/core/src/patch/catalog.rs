//! The default-patch catalog: turns a `SleepInfoSpec` plus the operation
//! being fired into the concrete list of patches to apply (spec.md §4.7).
//!
//! Every `suspend*` toggle is `Option<bool>` with absent meaning `false`
//! (spec.md §3: "all optional booleans; absent = false") — a `SleepInfo`
//! that sets none of them suspends nothing. Author-supplied patches only
//! fire on SLEEP; WAKE restores them from the sidecar's stored reverse
//! patch, same as every other value-driven target.

use serde_json::json;

use kube_green_crd::{AuthorPatch, Operation, SleepInfoSpec};

use super::{ForwardOp, PatchBody, PatchEntry, PatchTarget, PointerPatch};
use crate::error::{CoreError, Result};

const PGCLUSTER_SHUTDOWN_ANNOTATION: &str = "pgcluster.stratio.com/shutdown";
const HDFSCLUSTER_SHUTDOWN_ANNOTATION: &str = "hdfscluster.stratio.com/shutdown";

/// The fixed SLEEP-time pointer patch for a value-driven builtin target.
/// `None` for annotation-driven CRs and author targets, which have no
/// single well-known forward shape. Shared between `build` (so the SLEEP
/// path and this table can't drift apart) and the engine's WAKE-time drift
/// check (which needs to know "what would SLEEP have set this to" without
/// having the original firing's entries on hand).
pub fn builtin_forward_patch(target: &PatchTarget) -> Option<PointerPatch> {
    let (path, value) = match target {
        PatchTarget::Deployment | PatchTarget::StatefulSet | PatchTarget::PgBouncer => {
            ("/spec/replicas", json!(0))
        }
        PatchTarget::CronJob => ("/spec/suspend", json!(true)),
        PatchTarget::PgCluster | PatchTarget::HdfsCluster | PatchTarget::Author(_) => return None,
    };
    Some(PointerPatch {
        path: path.to_string(),
        value,
        op: ForwardOp::Replace,
    })
}

/// Builds the patch entries for one firing. SLEEP fires every enabled
/// builtin target plus every author patch; WAKE fires only the two
/// annotation-driven CRs unconditionally — everything else is restored by
/// the engine from the sidecar record, not recomputed here.
pub fn build(spec: &SleepInfoSpec, operation: Operation) -> Result<Vec<PatchEntry>> {
    let mut entries = Vec::new();

    push_value_driven(
        &mut entries,
        operation,
        PatchTarget::Deployment,
        spec.suspend_deployments.unwrap_or(false),
    );
    push_value_driven(
        &mut entries,
        operation,
        PatchTarget::StatefulSet,
        spec.suspend_stateful_sets.unwrap_or(false),
    );
    push_value_driven(
        &mut entries,
        operation,
        PatchTarget::CronJob,
        spec.suspend_cron_jobs.unwrap_or(false),
    );
    push_value_driven(
        &mut entries,
        operation,
        PatchTarget::PgBouncer,
        spec.suspend_deployments_pgbouncer.unwrap_or(false),
    );

    push_annotation_driven(
        &mut entries,
        operation,
        PatchTarget::PgCluster,
        spec.suspend_stateful_sets_postgres.unwrap_or(false),
        PGCLUSTER_SHUTDOWN_ANNOTATION,
    );
    push_annotation_driven(
        &mut entries,
        operation,
        PatchTarget::HdfsCluster,
        spec.suspend_stateful_sets_hdfs.unwrap_or(false),
        HDFSCLUSTER_SHUTDOWN_ANNOTATION,
    );

    if operation == Operation::Sleep {
        for author in &spec.patches {
            entries.push(author_entry(author)?);
        }
    }

    Ok(entries)
}

/// The value-driven builtin targets enabled on `spec`, independent of
/// operation. The WAKE path uses this to know which kinds it may still
/// forward-patch when no restore entry exists for an object (spec.md
/// §4.3: "this lets a wake-only `SleepInfo` still act on objects it never
/// slept") — `build` itself only emits value-driven entries for SLEEP,
/// since WAKE normally restores rather than recomputes them.
pub fn wake_value_targets(spec: &SleepInfoSpec) -> Vec<PatchTarget> {
    let mut targets = Vec::new();
    if spec.suspend_deployments.unwrap_or(false) {
        targets.push(PatchTarget::Deployment);
    }
    if spec.suspend_stateful_sets.unwrap_or(false) {
        targets.push(PatchTarget::StatefulSet);
    }
    if spec.suspend_cron_jobs.unwrap_or(false) {
        targets.push(PatchTarget::CronJob);
    }
    if spec.suspend_deployments_pgbouncer.unwrap_or(false) {
        targets.push(PatchTarget::PgBouncer);
    }
    targets
}

fn push_value_driven(entries: &mut Vec<PatchEntry>, operation: Operation, target: PatchTarget, enabled: bool) {
    if !enabled || operation != Operation::Sleep {
        return;
    }
    let Some(pointer) = builtin_forward_patch(&target) else {
        return;
    };
    entries.push(PatchEntry {
        target,
        body: PatchBody::Pointer(pointer),
    });
}

fn push_annotation_driven(
    entries: &mut Vec<PatchEntry>,
    operation: Operation,
    target: PatchTarget,
    enabled: bool,
    annotation: &str,
) {
    if !enabled {
        return;
    }
    let path = format!("/metadata/annotations/{}", escape_pointer_token(annotation));
    let (value, op) = match operation {
        Operation::Sleep => (json!("true"), ForwardOp::Add),
        Operation::WakeUp => (json!("false"), ForwardOp::Replace),
    };
    entries.push(PatchEntry {
        target,
        body: PatchBody::Pointer(PointerPatch { path, value, op }),
    });
}

fn author_entry(author: &AuthorPatch) -> Result<PatchEntry> {
    let ops: json_patch::Patch =
        serde_json::from_value(author.patch.clone()).map_err(|e| CoreError::MalformedPatch {
            kind: author.target.kind.clone(),
            name: "<author-patch>".to_string(),
            reason: e.to_string(),
        })?;
    Ok(PatchEntry {
        target: PatchTarget::Author(author.target.clone()),
        body: PatchBody::Json(ops),
    })
}

fn escape_pointer_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube_green_crd::PatchTargetRef;

    fn base_spec() -> SleepInfoSpec {
        SleepInfoSpec {
            weekdays: "1-5".to_string(),
            sleep_at: "20:00".to_string(),
            wake_up_at: Some("08:00".to_string()),
            time_zone: String::new(),
            suspend_deployments: None,
            suspend_stateful_sets: None,
            suspend_cron_jobs: None,
            suspend_deployments_pgbouncer: None,
            suspend_stateful_sets_postgres: None,
            suspend_stateful_sets_hdfs: None,
            exclude_ref: vec![],
            patches: vec![],
        }
    }

    /// All six toggles explicitly enabled, for tests about the shape of a
    /// fully-suspending `SleepInfo` rather than about the default.
    fn all_enabled_spec() -> SleepInfoSpec {
        SleepInfoSpec {
            suspend_deployments: Some(true),
            suspend_stateful_sets: Some(true),
            suspend_cron_jobs: Some(true),
            suspend_deployments_pgbouncer: Some(true),
            suspend_stateful_sets_postgres: Some(true),
            suspend_stateful_sets_hdfs: Some(true),
            ..base_spec()
        }
    }

    #[test]
    fn absent_toggles_suspend_nothing() {
        let entries = build(&base_spec(), Operation::Sleep).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn all_enabled_suspends_every_builtin_kind() {
        let entries = build(&all_enabled_spec(), Operation::Sleep).unwrap();
        let targets: Vec<_> = entries.iter().map(|e| e.target.clone()).collect();
        assert!(targets.contains(&PatchTarget::Deployment));
        assert!(targets.contains(&PatchTarget::StatefulSet));
        assert!(targets.contains(&PatchTarget::CronJob));
        assert!(targets.contains(&PatchTarget::PgBouncer));
        assert!(targets.contains(&PatchTarget::PgCluster));
        assert!(targets.contains(&PatchTarget::HdfsCluster));
        assert_eq!(entries.len(), 6);
    }

    #[test]
    fn explicit_false_disables_a_target() {
        let mut spec = all_enabled_spec();
        spec.suspend_cron_jobs = Some(false);
        let entries = build(&spec, Operation::Sleep).unwrap();
        assert!(!entries.iter().any(|e| e.target == PatchTarget::CronJob));
        assert_eq!(entries.len(), 5);
    }

    #[test]
    fn wake_only_annotation_driven_targets_are_forward_patched() {
        let entries = build(&all_enabled_spec(), Operation::WakeUp).unwrap();
        assert_eq!(entries.len(), 2);
        for entry in &entries {
            match &entry.body {
                PatchBody::Pointer(p) => assert_eq!(p.op, ForwardOp::Replace),
                _ => panic!("expected pointer patch"),
            }
        }
    }

    #[test]
    fn wake_value_targets_matches_enabled_toggles() {
        assert!(wake_value_targets(&base_spec()).is_empty());
        let targets = wake_value_targets(&all_enabled_spec());
        assert!(targets.contains(&PatchTarget::Deployment));
        assert!(targets.contains(&PatchTarget::StatefulSet));
        assert!(targets.contains(&PatchTarget::CronJob));
        assert!(targets.contains(&PatchTarget::PgBouncer));
        assert_eq!(targets.len(), 4);
    }

    #[test]
    fn author_patches_only_fire_on_sleep() {
        let mut spec = base_spec();
        spec.patches.push(AuthorPatch {
            target: PatchTargetRef {
                group: "example.com".to_string(),
                kind: "Widget".to_string(),
            },
            patch: serde_json::json!([{"op": "replace", "path": "/spec/paused", "value": true}]),
        });
        let sleep_entries = build(&spec, Operation::Sleep).unwrap();
        assert!(sleep_entries
            .iter()
            .any(|e| matches!(&e.target, PatchTarget::Author(r) if r.kind == "Widget")));

        let wake_entries = build(&spec, Operation::WakeUp).unwrap();
        assert!(!wake_entries
            .iter()
            .any(|e| matches!(&e.target, PatchTarget::Author(_))));
    }

    #[test]
    fn malformed_author_patch_is_an_error() {
        let mut spec = base_spec();
        spec.patches.push(AuthorPatch {
            target: PatchTargetRef {
                group: "example.com".to_string(),
                kind: "Widget".to_string(),
            },
            patch: serde_json::json!({"not": "an array of ops"}),
        });
        assert!(build(&spec, Operation::Sleep).is_err());
    }
}
