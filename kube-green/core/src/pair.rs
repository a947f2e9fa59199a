//! Pair resolution: locating the sleep-half's sidecar record for a
//! wake-half `SleepInfo` whose own restore record is empty (spec.md §4.5,
//! §9). Coupling is a pure annotation lookup against an already-fetched
//! list of `SleepInfo`s — there is no background sync process and no
//! cross-object watch of any kind. This resolver is consulted only for
//! restore-patch lookup; it has no bearing on when either half fires (that
//! is entirely `sleep_at`/`wake_up_at`/`pair-role`, see
//! `crate::state::derive_operation`).

use kube_green_crd::{pair_id, pair_role, PairRole, SleepInfo};

/// Finds the sleep-half `SleepInfo` paired with `this` by `pair-id`, if
/// `this` is itself a wake-half (`pair-role=wake`). Returns `None` when
/// `this` isn't a wake-half, carries no `pair-id`, or no matching
/// `pair-role=sleep` counterpart exists in `all` — none of these are
/// errors; the caller falls back to "no restore available" (spec.md §4.5:
/// "Missing sleep-half or missing sidecar is not an error").
pub fn find_sleep_half<'a>(this: &SleepInfo, all: &'a [SleepInfo]) -> Option<&'a SleepInfo> {
    if pair_role(&this.metadata) != Some(PairRole::Wake) {
        return None;
    }
    let this_name = this.metadata.name.as_deref();
    let id = pair_id(&this.metadata)?;
    all.iter().find(|other| {
        other.metadata.name.as_deref() != this_name
            && pair_id(&other.metadata) == Some(id)
            && pair_role(&other.metadata) == Some(PairRole::Sleep)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use kube_green_crd::{SleepInfoSpec, SleepInfoStatus, PAIR_ID, PAIR_ROLE};
    use std::collections::BTreeMap;

    fn sleep_info(name: &str, annotations: &[(&str, &str)]) -> SleepInfo {
        SleepInfo {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("default".to_string()),
                annotations: (!annotations.is_empty()).then(|| {
                    annotations
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect::<BTreeMap<_, _>>()
                }),
                ..Default::default()
            },
            spec: SleepInfoSpec {
                weekdays: "1-5".to_string(),
                sleep_at: "20:00".to_string(),
                wake_up_at: None,
                time_zone: String::new(),
                suspend_deployments: None,
                suspend_stateful_sets: None,
                suspend_cron_jobs: None,
                suspend_deployments_pgbouncer: None,
                suspend_stateful_sets_postgres: None,
                suspend_stateful_sets_hdfs: None,
                exclude_ref: vec![],
                patches: vec![],
            },
            status: Some(SleepInfoStatus::default()),
        }
    }

    #[test]
    fn non_wake_role_never_looks_up_a_pair() {
        let this = sleep_info("sleep-half", &[(PAIR_ID, "team-a"), (PAIR_ROLE, "sleep")]);
        let wake_half = sleep_info("wake-half", &[(PAIR_ID, "team-a"), (PAIR_ROLE, "wake")]);
        assert!(find_sleep_half(&this, &[this.clone(), wake_half]).is_none());
    }

    #[test]
    fn finds_matching_sleep_half() {
        let wake_half = sleep_info("wake-half", &[(PAIR_ID, "team-a"), (PAIR_ROLE, "wake")]);
        let sleep_half = sleep_info("sleep-half", &[(PAIR_ID, "team-a"), (PAIR_ROLE, "sleep")]);
        let all = vec![wake_half.clone(), sleep_half.clone()];
        let found = find_sleep_half(&wake_half, &all).expect("expected a match");
        assert_eq!(found.metadata.name.as_deref(), Some("sleep-half"));
    }

    #[test]
    fn mismatched_pair_id_is_unpaired() {
        let wake_half = sleep_info("wake-half", &[(PAIR_ID, "team-a"), (PAIR_ROLE, "wake")]);
        let sleep_half = sleep_info("sleep-half", &[(PAIR_ID, "team-b"), (PAIR_ROLE, "sleep")]);
        assert!(find_sleep_half(&wake_half, &[wake_half.clone(), sleep_half]).is_none());
    }

    #[test]
    fn no_pair_id_is_unpaired() {
        let wake_half = sleep_info("wake-half", &[(PAIR_ROLE, "wake")]);
        assert!(find_sleep_half(&wake_half, &[wake_half.clone()]).is_none());
    }

    #[test]
    fn wake_half_cannot_pair_with_itself() {
        let wake_half = sleep_info("wake-half", &[(PAIR_ID, "team-a"), (PAIR_ROLE, "wake")]);
        assert!(find_sleep_half(&wake_half, &[wake_half.clone()]).is_none());
    }
}
