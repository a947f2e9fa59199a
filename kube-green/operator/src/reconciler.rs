//! The control loop: for each `SleepInfo`, work out whether SLEEP or
//! WAKE_UP is due right now and, if so, fire it (spec.md §4.6, §4.8).
//!
//! Pairing never changes which operation fires or at what wall time — that
//! is entirely `derive_operation`, driven by this object's own spec and its
//! own `pair-role` annotation. The paired sleep-half only ever gets
//! consulted inside `fire` itself, as a restore-patch source of last
//! resort.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use kube::runtime::controller::Action;

use kube_green_core::cluster::ClusterClient;
use kube_green_core::error::CoreError;
use kube_green_core::patch::engine::fire;
use kube_green_core::state::{derive_operation, evaluate, Due, WallField};
use kube_green_crd::{pair_role, SleepInfo, SleepInfoStatus};
use kube_green_schedule::{convert, parse_timezone, WallTime, WeekdaySet};

use crate::config::Config;

pub struct Context {
    pub client: Arc<dyn ClusterClient>,
    pub config: Config,
}

fn fire_instant(today: NaiveDate, day_shift: i8, wall: WallTime) -> DateTime<Utc> {
    let date = today + chrono::Duration::days(i64::from(day_shift));
    let naive = date
        .and_hms_opt(u32::from(wall.hour), u32::from(wall.minute), 0)
        .expect("WallTime always carries a valid hour/minute");
    Utc.from_utc_datetime(&naive)
}

pub async fn reconcile(
    sleep_info: Arc<SleepInfo>,
    ctx: Arc<Context>,
) -> std::result::Result<Action, CoreError> {
    let namespace = sleep_info.metadata.namespace.clone().unwrap_or_default();
    let name = sleep_info.metadata.name.clone().unwrap_or_default();
    let requeue = Action::requeue(Duration::from_secs(ctx.config.sleep_delta_seconds));

    let tz = parse_timezone(&sleep_info.spec.time_zone)?;
    let now = Utc::now();
    let today = now.with_timezone(&tz).date_naive();

    let weekdays = WeekdaySet::parse(&sleep_info.spec.weekdays)?;
    if !weekdays.contains(today.weekday().num_days_from_sunday() as u8) {
        return Ok(requeue);
    }

    let last_operation = sleep_info.status.as_ref().and_then(|s| s.operation);
    let last_schedule = sleep_info.status.as_ref().and_then(|s| s.last_schedule);
    let role = pair_role(&sleep_info.metadata);
    let (operation, wall_field) =
        derive_operation(sleep_info.spec.wake_up_at.as_deref(), last_operation, role);

    let wall_str = match wall_field {
        WallField::Sleep => sleep_info.spec.sleep_at.as_str(),
        // Only reachable when derive_operation matched the "wake_up_at
        // present" branch, so this is always Some.
        WallField::Wake => sleep_info
            .spec
            .wake_up_at
            .as_deref()
            .unwrap_or(sleep_info.spec.sleep_at.as_str()),
    };
    let wall = WallTime::parse(wall_str)?;
    let (utc_wall, day_shift) = convert(wall, tz, chrono_tz::UTC, today);
    let schedule = fire_instant(today, day_shift, utc_wall);

    let delta = Duration::from_secs(ctx.config.sleep_delta_seconds);
    match evaluate(now, schedule, last_schedule, delta) {
        Due::NotYet => return Ok(requeue),
        Due::Missed => {
            tracing::warn!(
                namespace = %namespace,
                name = %name,
                operation = %operation,
                scheduled_for = %schedule,
                "firing missed its tolerance window, skipping to the next occurrence"
            );
            let status = SleepInfoStatus {
                operation: Some(operation),
                last_schedule: Some(schedule),
                succeeded: Some(false),
                message: Some("firing missed its tolerance window".to_string()),
            };
            ctx.client.update_status(&namespace, &name, status).await?;
            return Ok(requeue);
        }
        Due::Fire => {}
    }

    if ctx.config.dry_run {
        tracing::info!(namespace = %namespace, name = %name, operation = %operation, "dry run: would fire");
        return Ok(requeue);
    }

    let all_sleep_infos = ctx.client.list_sleep_infos(&namespace).await?;
    tracing::info!(namespace = %namespace, name = %name, operation = %operation, "firing");
    let outcome = fire(
        ctx.client.as_ref(),
        &namespace,
        &sleep_info,
        operation,
        &all_sleep_infos,
    )
    .await;

    let status = match &outcome {
        Ok(result) => SleepInfoStatus {
            operation: Some(operation),
            last_schedule: Some(schedule),
            succeeded: Some(result.warnings.is_empty()),
            message: (!result.warnings.is_empty()).then(|| result.warnings.join("; ")),
        },
        Err(e) => SleepInfoStatus {
            operation: Some(operation),
            last_schedule: Some(schedule),
            succeeded: Some(false),
            message: Some(e.to_string()),
        },
    };
    ctx.client.update_status(&namespace, &name, status).await?;

    outcome?;
    Ok(requeue)
}

pub fn error_policy(
    sleep_info: Arc<SleepInfo>,
    error: &CoreError,
    _ctx: Arc<Context>,
) -> Action {
    tracing::error!(
        name = %sleep_info.metadata.name.clone().unwrap_or_default(),
        error = %error,
        "reconciliation failed"
    );
    Action::requeue(Duration::from_secs(30))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fire_instant_applies_day_shift() {
        let today = NaiveDate::from_ymd_opt(2026, 7, 28).unwrap();
        let wall = WallTime::new(23, 30).unwrap();
        let instant = fire_instant(today, 1, wall);
        assert_eq!(instant.date_naive(), NaiveDate::from_ymd_opt(2026, 7, 29).unwrap());
        assert_eq!(instant.format("%H:%M").to_string(), "23:30");
    }
}
