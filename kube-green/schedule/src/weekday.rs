//! Weekday-set parsing and shifting.
//!
//! Days are numbered 0..=6 with 0 = Sunday, matching the `cron`/Kubernetes
//! convention `kube-green` schedules are authored against.

use std::fmt;

use unicode_normalization::UnicodeNormalization;

use crate::error::{Result, ScheduleError};

/// An ordered set of weekdays, stored as a 7-bit mask (bit `d` ⇔ day `d`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct WeekdaySet(u8);

const ALL_DAYS_MASK: u8 = 0b0111_1111;

/// Spanish day names (with and without diacritics handled by normalization),
/// indexed 0 = Sunday, matching the wire convention.
const SPANISH_NAMES: [&str; 7] = [
    "domingo", "lunes", "martes", "miercoles", "jueves", "viernes", "sabado",
];

fn normalize_token(token: &str) -> String {
    token
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .trim()
        .to_ascii_lowercase()
}

/// Unicode combining-mark filter, good enough for the Latin diacritics used
/// in the Spanish weekday names (`á é í ó ú`).
fn is_combining_mark(c: char) -> bool {
    matches!(c, '\u{0300}'..='\u{036F}')
}

fn parse_day_token(token: &str) -> Result<u8> {
    let normalized = normalize_token(token);
    if normalized.is_empty() {
        return Err(ScheduleError::MalformedWeekdays(token.to_string()));
    }
    if let Ok(n) = normalized.parse::<i64>() {
        if !(0..=6).contains(&n) {
            return Err(ScheduleError::WeekdayOutOfRange(n));
        }
        return Ok(n as u8);
    }
    SPANISH_NAMES
        .iter()
        .position(|name| *name == normalized)
        .map(|idx| idx as u8)
        .ok_or_else(|| ScheduleError::MalformedWeekdays(token.to_string()))
}

impl WeekdaySet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn from_mask(mask: u8) -> Self {
        Self(mask & ALL_DAYS_MASK)
    }

    pub fn insert(&mut self, day: u8) {
        debug_assert!(day <= 6);
        self.0 |= 1 << day;
    }

    pub fn contains(&self, day: u8) -> bool {
        day <= 6 && (self.0 & (1 << day)) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn mask(&self) -> u8 {
        self.0
    }

    /// Ordered iterator over the days in the set, starting from Sunday (0).
    pub fn days(&self) -> impl Iterator<Item = u8> + '_ {
        (0..=6u8).filter(move |d| self.contains(*d))
    }

    /// Parses a weekday expression: a comma list of numeric/named tokens,
    /// where each token may itself be a range `a-b` (wrap-around allowed,
    /// e.g. `5-1` = {5,6,0,1}).
    ///
    /// Accepts numeric days (`"0-6"`, `"1,3,5"`) and localized Spanish names
    /// with or without diacritics (`"lunes-viernes"`, `"sábado"`,
    /// `"miercoles"`).
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ScheduleError::MalformedWeekdays(input.to_string()));
        }

        let mut set = WeekdaySet::empty();
        for part in trimmed.split(',') {
            let part = part.trim();
            if part.is_empty() {
                return Err(ScheduleError::MalformedWeekdays(input.to_string()));
            }
            if let Some((start_raw, end_raw)) = part.split_once('-') {
                // A bare numeric token like "5" never reaches here because
                // it has no '-'; this branch is only for genuine ranges.
                let start = parse_day_token(start_raw)?;
                let end = parse_day_token(end_raw)?;
                for day in wrapping_range(start, end) {
                    set.insert(day);
                }
            } else {
                set.insert(parse_day_token(part)?);
            }
        }

        if set.is_empty() {
            return Err(ScheduleError::MalformedWeekdays(input.to_string()));
        }
        Ok(set)
    }

    /// Shifts every day in the set by `k` (may be negative), wrapping mod 7.
    /// An empty input always yields an empty output.
    pub fn shift(&self, k: i64) -> Self {
        let mut shifted = WeekdaySet::empty();
        for day in self.days() {
            let next = (day as i64 + k).rem_euclid(7) as u8;
            shifted.insert(next);
        }
        shifted
    }

    /// Canonical comma-separated numeric rendering, e.g. `"0,1,5"`.
    pub fn to_canonical_string(&self) -> String {
        self.days()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Expands `start..=end` going forward around the 0..=6 ring, inclusive of
/// both ends, supporting wrap-around (`start > end`).
fn wrapping_range(start: u8, end: u8) -> impl Iterator<Item = u8> {
    let len = if end >= start {
        end - start + 1
    } else {
        7 - (start - end - 1)
    };
    (0..len).map(move |i| (start + i) % 7)
}

impl fmt::Display for WeekdaySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("0-6", "0,1,2,3,4,5,6")]
    #[case("1,3,5", "1,3,5")]
    #[case("5-1", "0,1,5,6")]
    #[case("lunes-viernes", "1,2,3,4,5")]
    #[case("sábado", "6")]
    #[case("miercoles", "3")]
    fn parses_expected_sets(#[case] input: &str, #[case] expected: &str) {
        let set = WeekdaySet::parse(input).unwrap();
        assert_eq!(set.to_canonical_string(), expected);
    }

    #[test]
    fn rejects_empty() {
        assert!(WeekdaySet::parse("").is_err());
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(matches!(
            WeekdaySet::parse("7"),
            Err(ScheduleError::WeekdayOutOfRange(7))
        ));
    }

    #[test]
    fn rejects_garbage() {
        assert!(WeekdaySet::parse("notaday").is_err());
    }

    #[test]
    fn shift_is_identity_at_zero() {
        let set = WeekdaySet::parse("1-5").unwrap();
        assert_eq!(set.shift(0), set);
    }

    #[test]
    fn shift_empty_stays_empty() {
        assert_eq!(WeekdaySet::empty().shift(3), WeekdaySet::empty());
    }

    #[rstest]
    #[case("0-6", 1)]
    #[case("1,3,5", -2)]
    #[case("5-1", 3)]
    fn shift_round_trips(#[case] input: &str, #[case] k: i64) {
        let set = WeekdaySet::parse(input).unwrap();
        assert_eq!(set.shift(k).shift(-k), set);
    }

    #[test]
    fn parse_canonical_round_trip() {
        let set = WeekdaySet::parse("0,2,4").unwrap();
        let rendered = set.to_canonical_string();
        assert_eq!(WeekdaySet::parse(&rendered).unwrap(), set);
    }
}
