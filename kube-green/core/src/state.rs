//! Pure state derivation (spec.md §4.6) and firing-due evaluation (spec.md
//! §4.8 step 4). Neither makes a cluster call: `derive_operation` only
//! looks at the `SleepInfo`'s own spec, its `pair-role` annotation, and
//! the last recorded operation; `evaluate` only compares instants.

use std::time::Duration;

use chrono::DateTime;
use chrono::Utc;

use kube_green_crd::{Operation, PairRole};

/// Which wall-clock field on the `SleepInfoSpec` the current firing's
/// schedule is read from. `Sleep` covers both "today we sleep" and the
/// reused-field case (spec.md §4.6 row 3: a wake-only pair-half fires WAKE
/// at its own `sleepAt`, since it has no `wakeUpAt` of its own).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WallField {
    Sleep,
    Wake,
}

/// Implements spec.md §4.6's derivation table. Returns the operation that
/// is "current" right now (the next one this `SleepInfo` should fire) and
/// which spec field carries its wall-clock time.
///
/// | `wake_up_at` | `last_operation` | `pair_role` | Result |
/// |---|---|---|---|
/// | present | `Some(Sleep)` | — | `(WakeUp, Wake)` |
/// | present | otherwise | — | `(Sleep, Sleep)` |
/// | absent | — | `Some(Wake)` | `(WakeUp, Sleep)` |
/// | absent | — | otherwise | `(Sleep, Sleep)` |
///
/// The `pair_role=wake` row is checked before `last_operation` so a stale
/// `lastOperation=Sleep` left over from before an object was re-paired
/// can't wedge it — spec.md §4.6: "The `pair-role` annotation is
/// authoritative and overrides any stale `lastOperation=Sleep`".
pub fn derive_operation(
    wake_up_at: Option<&str>,
    last_operation: Option<Operation>,
    pair_role: Option<PairRole>,
) -> (Operation, WallField) {
    if wake_up_at.is_some() {
        if last_operation == Some(Operation::Sleep) {
            (Operation::WakeUp, WallField::Wake)
        } else {
            (Operation::Sleep, WallField::Sleep)
        }
    } else if pair_role == Some(PairRole::Wake) {
        (Operation::WakeUp, WallField::Sleep)
    } else {
        (Operation::Sleep, WallField::Sleep)
    }
}

/// Whether the currently-derived operation is due to fire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Due {
    /// `now` hasn't reached `schedule - delta` yet.
    NotYet,
    /// `now` is within `sleepDelta` of `schedule`: fire it.
    Fire,
    /// `now` is more than `sleepDelta` past `schedule`: spec.md §4.8 step 4
    /// — "mark this firing missed", do not apply it, wait for the next
    /// occurrence instead.
    Missed,
}

/// Evaluates one candidate firing instant against `now`, with `delta`
/// tolerance either side (spec.md §4.8 step 4) and de-duplication against
/// `last_schedule` (spec.md §5: "firing the same operation twice for the
/// same `lastSchedule` must be a no-op").
pub fn evaluate(
    now: DateTime<Utc>,
    schedule: DateTime<Utc>,
    last_schedule: Option<DateTime<Utc>>,
    delta: Duration,
) -> Due {
    if let Some(last) = last_schedule {
        if schedule <= last {
            return Due::NotYet;
        }
    }
    let delta = chrono::Duration::from_std(delta).unwrap_or_else(|_| chrono::Duration::zero());
    if now < schedule - delta {
        Due::NotYet
    } else if now > schedule + delta {
        Due::Missed
    } else {
        Due::Fire
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 28, hour, minute, 0).unwrap()
    }

    #[test]
    fn both_times_configured_sleep_then_wake() {
        assert_eq!(
            derive_operation(Some("08:00"), None, None),
            (Operation::Sleep, WallField::Sleep)
        );
        assert_eq!(
            derive_operation(Some("08:00"), Some(Operation::WakeUp), None),
            (Operation::Sleep, WallField::Sleep)
        );
        assert_eq!(
            derive_operation(Some("08:00"), Some(Operation::Sleep), None),
            (Operation::WakeUp, WallField::Wake)
        );
    }

    #[test]
    fn wake_only_configured_pair_half_reuses_sleep_field() {
        // spec.md §8 scenario 3: a wake-half with no wakeUpAt of its own
        // fires WAKE at its own sleepAt.
        assert_eq!(
            derive_operation(None, None, Some(PairRole::Wake)),
            (Operation::WakeUp, WallField::Sleep)
        );
    }

    #[test]
    fn pair_role_wake_overrides_stale_last_operation() {
        assert_eq!(
            derive_operation(None, Some(Operation::Sleep), Some(PairRole::Wake)),
            (Operation::WakeUp, WallField::Sleep)
        );
    }

    #[test]
    fn sleep_half_or_unpaired_only_ever_sleeps() {
        assert_eq!(
            derive_operation(None, None, Some(PairRole::Sleep)),
            (Operation::Sleep, WallField::Sleep)
        );
        assert_eq!(
            derive_operation(None, Some(Operation::WakeUp), None),
            (Operation::Sleep, WallField::Sleep)
        );
    }

    #[test]
    fn not_yet_due_before_the_window() {
        let due = evaluate(at(19, 0), at(20, 0), None, Duration::from_secs(60));
        assert_eq!(due, Due::NotYet);
    }

    #[test]
    fn fires_inside_the_tolerance_window() {
        let due = evaluate(at(20, 0), at(20, 0), None, Duration::from_secs(60));
        assert_eq!(due, Due::Fire);
        let due = evaluate(at(20, 0) + chrono::Duration::seconds(30), at(20, 0), None, Duration::from_secs(60));
        assert_eq!(due, Due::Fire);
    }

    #[test]
    fn missed_past_the_tolerance_window() {
        let due = evaluate(
            at(20, 0) + chrono::Duration::minutes(10),
            at(20, 0),
            None,
            Duration::from_secs(60),
        );
        assert_eq!(due, Due::Missed);
    }

    #[test]
    fn already_recorded_schedule_does_not_refire() {
        let due = evaluate(at(20, 30), at(20, 0), Some(at(20, 0)), Duration::from_secs(60));
        assert_eq!(due, Due::NotYet);
    }

    #[test]
    fn newer_schedule_fires_even_with_a_stale_last_schedule() {
        let yesterday = at(20, 0) - chrono::Duration::days(1);
        let due = evaluate(at(20, 0), at(20, 0), Some(yesterday), Duration::from_secs(60));
        assert_eq!(due, Due::Fire);
    }
}
