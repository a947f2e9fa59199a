use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::operation::Operation;

/// A label-match exclusion: any target object whose labels satisfy this
/// selector is skipped by the patch engine.
///
/// Only `matchLabels`-style equality selection is implemented; see
/// `DESIGN.md` for the open question on `matchExpressions`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LabelMatch {
    #[serde(default)]
    pub match_labels: BTreeMap<String, String>,
}

impl LabelMatch {
    /// Whether `labels` satisfies this selector (every key in
    /// `match_labels` is present in `labels` with an equal value). An empty
    /// selector matches nothing, consistent with "no selector configured".
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        !self.match_labels.is_empty()
            && self
                .match_labels
                .iter()
                .all(|(k, v)| labels.get(k) == Some(v))
    }
}

/// A Kubernetes API group + kind pair identifying what an author-supplied
/// patch applies to.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub struct PatchTargetRef {
    #[serde(default)]
    pub group: String,
    pub kind: String,
}

impl PatchTargetRef {
    /// Renders as `"group/Kind"`, the restore-record key format (spec §6).
    pub fn as_restore_key(&self) -> String {
        if self.group.is_empty() {
            self.kind.clone()
        } else {
            format!("{}/{}", self.group, self.kind)
        }
    }
}

/// An author-supplied JSON-patch document bound to a patch target, carried
/// through untouched by the default-patch catalog (spec.md §4.7: "Author-
/// supplied `patches` are concatenated after built-in patches").
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthorPatch {
    pub target: PatchTargetRef,
    pub patch: serde_json::Value,
}

/// The user-authored sleep/wake schedule for one namespace.
///
/// Field names are wire contract (spec.md §6) and MUST NOT be renamed:
/// `weekdays`, `sleepAt`, `wakeUpAt`, `timeZone`, `suspend*`, `excludeRef`,
/// `patches`. An external HTTP façade (out of this crate's scope) is the
/// expected producer of these objects, with `timeZone`-relative fields
/// already normalized by the time they reach the cluster.
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "kube-green.stratio.com",
    version = "v1alpha1",
    kind = "SleepInfo",
    namespaced,
    status = "SleepInfoStatus",
    shortname = "si"
)]
#[serde(rename_all = "camelCase")]
pub struct SleepInfoSpec {
    /// Weekday set expression, e.g. `"1-5"` or `"lunes-viernes"`. Non-empty.
    pub weekdays: String,

    /// Wall time `HH:MM` in `time_zone` at which SLEEP fires.
    pub sleep_at: String,

    /// Wall time `HH:MM` in `time_zone` at which WAKE fires. Absent means
    /// this `SleepInfo` is sleep-only (wake behavior comes from a paired
    /// object, or there is none).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wake_up_at: Option<String>,

    /// IANA timezone name. Empty defaults to UTC.
    #[serde(default)]
    pub time_zone: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspend_deployments: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspend_stateful_sets: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspend_cron_jobs: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspend_deployments_pgbouncer: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspend_stateful_sets_postgres: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspend_stateful_sets_hdfs: Option<bool>,

    /// Objects whose labels match any entry here are skipped by the patch
    /// engine, regardless of kind.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_ref: Vec<LabelMatch>,

    /// Author-supplied extra patches, applied after the built-in catalog.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patches: Vec<AuthorPatch>,
}

impl SleepInfoSpec {
    pub fn is_wake_configured(&self) -> bool {
        self.wake_up_at.is_some()
    }
}

/// Status subresource: the outcome of the last firing, surfaced to
/// operators and to `kubectl describe` (spec.md §7's "condition on
/// `SleepInfo.status`").
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SleepInfoStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_schedule: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub succeeded: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
