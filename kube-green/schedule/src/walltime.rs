//! Wall-clock `HH:MM` parsing and minute arithmetic.

use std::fmt;

use crate::error::{Result, ScheduleError};

const MINUTES_PER_DAY: i64 = 24 * 60;

/// A wall-clock time of day, with no associated date or timezone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WallTime {
    pub hour: u8,
    pub minute: u8,
}

impl WallTime {
    pub fn new(hour: u8, minute: u8) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(ScheduleError::MalformedTime(format!(
                "{hour:02}:{minute:02}"
            )));
        }
        Ok(Self { hour, minute })
    }

    /// Parses `"HH:MM"`.
    pub fn parse(input: &str) -> Result<Self> {
        let (hour_raw, minute_raw) = input
            .split_once(':')
            .ok_or_else(|| ScheduleError::MalformedTime(input.to_string()))?;
        let hour: u8 = hour_raw
            .parse()
            .map_err(|_| ScheduleError::MalformedTime(input.to_string()))?;
        let minute: u8 = minute_raw
            .parse()
            .map_err(|_| ScheduleError::MalformedTime(input.to_string()))?;
        Self::new(hour, minute)
    }

    fn as_minutes(&self) -> i64 {
        self.hour as i64 * 60 + self.minute as i64
    }

    fn from_minutes(total: i64) -> Self {
        let wrapped = total.rem_euclid(MINUTES_PER_DAY);
        Self {
            hour: (wrapped / 60) as u8,
            minute: (wrapped % 60) as u8,
        }
    }

    /// Returns the wall-clock time `n` minutes later, wrapping modulo 24h.
    /// `n` may be negative.
    pub fn add_minutes(&self, n: i64) -> Self {
        Self::from_minutes(self.as_minutes() + n)
    }
}

impl fmt::Display for WallTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}
