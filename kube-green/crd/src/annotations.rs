//! The pair-coupling annotations recognized on `SleepInfo` objects.
//!
//! These two annotations are the *only* coupling channel between a
//! sleep-half and a wake-half `SleepInfo`; there is no other cross-object
//! state.

use std::fmt;
use std::str::FromStr;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

/// Shared identifier relating a sleep-half and a wake-half `SleepInfo`.
pub const PAIR_ID: &str = "kube-green.stratio.com/pair-id";

/// Role within a pair: `sleep` | `wake`.
pub const PAIR_ROLE: &str = "kube-green.stratio.com/pair-role";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PairRole {
    Sleep,
    Wake,
}

impl fmt::Display for PairRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PairRole::Sleep => write!(f, "sleep"),
            PairRole::Wake => write!(f, "wake"),
        }
    }
}

impl FromStr for PairRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sleep" => Ok(PairRole::Sleep),
            "wake" => Ok(PairRole::Wake),
            other => Err(format!("unknown pair-role `{other}`")),
        }
    }
}

/// Reads the `pair-id` annotation, if any.
pub fn pair_id(meta: &ObjectMeta) -> Option<&str> {
    meta.annotations.as_ref()?.get(PAIR_ID).map(String::as_str)
}

/// Reads and parses the `pair-role` annotation, if any. An unparseable
/// value is treated the same as absent — the pair mechanism is best-effort
/// and never blocks a firing.
pub fn pair_role(meta: &ObjectMeta) -> Option<PairRole> {
    meta.annotations
        .as_ref()?
        .get(PAIR_ROLE)
        .and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn meta_with(annotations: &[(&str, &str)]) -> ObjectMeta {
        ObjectMeta {
            annotations: Some(
                annotations
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect::<BTreeMap<_, _>>(),
            ),
            ..Default::default()
        }
    }

    #[test]
    fn reads_pair_id_and_role() {
        let meta = meta_with(&[(PAIR_ID, "ns-1"), (PAIR_ROLE, "wake")]);
        assert_eq!(pair_id(&meta), Some("ns-1"));
        assert_eq!(pair_role(&meta), Some(PairRole::Wake));
    }

    #[test]
    fn absent_annotations_are_none() {
        let meta = ObjectMeta::default();
        assert_eq!(pair_id(&meta), None);
        assert_eq!(pair_role(&meta), None);
    }

    #[test]
    fn unparseable_role_degrades_to_none() {
        let meta = meta_with(&[(PAIR_ROLE, "sideways")]);
        assert_eq!(pair_role(&meta), None);
    }
}
