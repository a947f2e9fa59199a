use thiserror::Error;

/// Errors raised while parsing or manipulating a `SleepInfo` schedule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("malformed weekdays expression `{0}`")]
    MalformedWeekdays(String),

    #[error("weekday `{0}` is out of range 0..=6")]
    WeekdayOutOfRange(i64),

    #[error("malformed time `{0}`, expected HH:MM")]
    MalformedTime(String),

    #[error("unknown IANA timezone `{0}`")]
    UnknownTimezone(String),
}

pub type Result<T> = std::result::Result<T, ScheduleError>;
