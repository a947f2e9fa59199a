//! Timezone conversion for schedule wall times.
//!
//! Given a wall time authored in one IANA zone, computes the equivalent
//! wall time in another zone plus the day shift needed to keep a weekday
//! set aligned across the zone crossing.

use chrono::{Datelike, LocalResult, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;

use crate::error::{Result, ScheduleError};
use crate::walltime::WallTime;

/// Parses an IANA timezone name. Empty string defaults to UTC, per
/// `SleepInfo.spec.timeZone`'s documented default.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    if name.is_empty() {
        return Ok(chrono_tz::UTC);
    }
    name.parse::<Tz>()
        .map_err(|_| ScheduleError::UnknownTimezone(name.to_string()))
}

/// Resolves a naive local datetime in `tz`, applying kube-green's DST
/// tie-break policy: a gap (spring-forward) resolves to the later offset by
/// advancing minute-by-minute until the local time exists again; an overlap
/// (fall-back) resolves to the earlier of the two valid offsets.
fn resolve_local(tz: Tz, naive: NaiveDateTime) -> chrono::DateTime<Tz> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _latest) => earliest,
        LocalResult::None => {
            let mut candidate = naive;
            loop {
                candidate += chrono::Duration::minutes(1);
                match tz.from_local_datetime(&candidate) {
                    LocalResult::Single(dt) => break dt,
                    LocalResult::Ambiguous(earliest, _) => break earliest,
                    LocalResult::None => continue,
                }
            }
        }
    }
}

/// Converts `wall_time`, anchored on `today` in `from_tz`, into the
/// equivalent wall time in `to_tz`.
///
/// Returns the converted `WallTime` and the day shift (`-1`, `0`, or `+1` in
/// the common case) by which a weekday set authored against `from_tz` must
/// be shifted to fire on the correct day in `to_tz`. Computed as a plain
/// date difference rather than an ordinal-day (`yearDay`) difference, which
/// sidesteps the year-boundary wraparound (Dec 31 → Jan 1) that a naive
/// `yearDay` subtraction would get wrong; this is equivalent to spec's
/// "correct by comparing Unix timestamps when the year differs" but avoids
/// the special case entirely.
pub fn convert(wall_time: WallTime, from_tz: Tz, to_tz: Tz, today: NaiveDate) -> (WallTime, i8) {
    let naive = today.and_hms_opt(wall_time.hour as u32, wall_time.minute as u32, 0).expect(
        "WallTime is range-checked to valid hour/minute, so and_hms_opt cannot fail",
    );
    let from_dt = resolve_local(from_tz, naive);
    let to_dt = from_dt.with_timezone(&to_tz);

    let to_wall = WallTime::new(to_dt.hour() as u8, to_dt.minute() as u8)
        .expect("hour/minute extracted from a valid DateTime are always in range");

    let day_shift = (to_dt.date_naive() - today).num_days();
    (to_wall, day_shift as i8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn utc_to_utc_is_identity() {
        let wt = WallTime::parse("22:00").unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 7, 28).unwrap();
        let (converted, shift) = convert(wt, chrono_tz::UTC, chrono_tz::UTC, today);
        assert_eq!(converted, wt);
        assert_eq!(shift, 0);
    }

    #[test]
    fn bogota_saturday_evening_crosses_to_sunday_utc() {
        // America/Bogotá is UTC-5 year round (no DST).
        let wt = WallTime::parse("20:58").unwrap();
        let saturday = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(); // a Saturday
        let (converted, shift) =
            convert(wt, chrono_tz::America::Bogota, chrono_tz::UTC, saturday);
        assert_eq!(converted, WallTime::parse("01:58").unwrap());
        assert_eq!(shift, 1);
    }

    #[test]
    fn tokyo_morning_crosses_back_a_day_from_utc() {
        let wt = WallTime::parse("08:30").unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let (converted, shift) = convert(wt, chrono_tz::Asia::Tokyo, chrono_tz::UTC, day);
        assert_eq!(converted, WallTime::parse("23:30").unwrap());
        assert_eq!(shift, -1);
    }

    #[test]
    fn year_boundary_crossing_is_handled() {
        let wt = WallTime::parse("23:30").unwrap();
        let new_years_eve = NaiveDate::from_ymd_opt(2026, 12, 31).unwrap();
        let (converted, shift) =
            convert(wt, chrono_tz::America::Bogota, chrono_tz::UTC, new_years_eve);
        assert_eq!(converted, WallTime::parse("04:30").unwrap());
        assert_eq!(shift, 1);
    }

    #[rstest]
    #[case("US/Eastern")]
    #[case("Europe/Madrid")]
    #[case("UTC")]
    fn parses_known_zones(#[case] name: &str) {
        assert!(parse_timezone(name).is_ok());
    }

    #[test]
    fn empty_timezone_defaults_to_utc() {
        assert_eq!(parse_timezone("").unwrap(), chrono_tz::UTC);
    }

    #[test]
    fn unknown_timezone_is_an_error() {
        assert!(parse_timezone("Not/AZone").is_err());
    }

    #[test]
    fn dst_gap_resolves_to_later_offset() {
        // US/Eastern spring-forward 2026-03-08: 02:00-02:59 does not exist.
        let wt = WallTime::parse("02:30").unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 3, 8).unwrap();
        let (converted, _) = convert(wt, chrono_tz::US::Eastern, chrono_tz::UTC, day);
        // 02:30 local doesn't exist; resolving forward lands on 03:30 EDT (UTC-4) = 07:30 UTC.
        assert_eq!(converted, WallTime::parse("07:30").unwrap());
    }

    #[test]
    fn dst_overlap_resolves_to_earlier_offset() {
        // US/Eastern fall-back 2026-11-01: 01:00-01:59 occurs twice.
        let wt = WallTime::parse("01:30").unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 11, 1).unwrap();
        let (converted, _) = convert(wt, chrono_tz::US::Eastern, chrono_tz::UTC, day);
        // Earlier mapping is still EDT (UTC-4): 01:30 EDT = 05:30 UTC.
        assert_eq!(converted, WallTime::parse("05:30").unwrap());
    }
}
