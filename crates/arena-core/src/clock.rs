//! # Clock Module
//!
//! Wall-clock primitives shared by bookings, sessions and the slot grid.
//!
//! - [`ClockTime`]: a time of day, `HH:MM`, minute precision
//! - [`TimeRange`]: half-open `[start, end)` interval within one day
//! - [`Clock`]: injectable source of "now", so rules that look at the
//!   current time stay deterministic in tests

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// CLOCK TIME
// =============================================================================

/// A time of day with minute precision.
///
/// Ordered by minutes since midnight. Serialized as `"HH:MM"` both in
/// JSON and in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClockTime {
    minutes: u16,
}

impl ClockTime {
    /// Build from hour (0-23) and minute (0-59).
    #[must_use]
    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        if hour > 23 || minute > 59 {
            return None;
        }
        Some(Self {
            minutes: (hour * 60 + minute) as u16,
        })
    }

    /// Build a time sitting exactly on `hour`.
    #[must_use]
    pub fn on_hour(hour: u32) -> Option<Self> {
        Self::from_hm(hour, 0)
    }

    #[must_use]
    pub fn hour(&self) -> u32 {
        u32::from(self.minutes / 60)
    }

    #[must_use]
    pub fn minute(&self) -> u32 {
        u32::from(self.minutes % 60)
    }

    /// Minutes since midnight.
    #[must_use]
    pub fn minutes(&self) -> u32 {
        u32::from(self.minutes)
    }

    /// True when the minute component is zero.
    #[must_use]
    pub fn is_on_hour(&self) -> bool {
        self.minutes % 60 == 0
    }

    /// Convert to a chrono time.
    #[must_use]
    pub fn to_naive(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour(), self.minute(), 0).unwrap_or(NaiveTime::MIN)
    }

    /// Truncate a chrono time to minute precision.
    #[must_use]
    pub fn from_naive(time: NaiveTime) -> Self {
        Self {
            minutes: (time.hour() * 60 + time.minute()) as u16,
        }
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for ClockTime {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::validation(format!("invalid time '{s}', expected HH:MM"));
        let (h, m) = s.split_once(':').ok_or_else(invalid)?;
        if h.len() != 2 || m.len() != 2 {
            return Err(invalid());
        }
        let hour: u32 = h.parse().map_err(|_| invalid())?;
        let minute: u32 = m.parse().map_err(|_| invalid())?;
        Self::from_hm(hour, minute).ok_or_else(invalid)
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// DATES
// =============================================================================

/// Parse a calendar date in `YYYY-MM-DD` form.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| Error::validation(format!("invalid date '{s}', expected YYYY-MM-DD")))
}

// =============================================================================
// CLOCK
// =============================================================================

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Local wall-clock time, used for "in the past" checks.
    fn now(&self) -> NaiveDateTime;

    /// Instant used for `created_at` / `updated_at` stamps.
    fn now_utc(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// The host clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }

    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl FixedClock {
    /// Freeze at `date` `hh:mm`.
    #[must_use]
    pub fn at(date: NaiveDate, hour: u32, minute: u32) -> Self {
        let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
        Self(date.and_time(time))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }

    fn now_utc(&self) -> DateTime<Utc> {
        self.0.and_utc()
    }
}

// =============================================================================
// TIME RANGE
// =============================================================================

/// Half-open interval `[start, end)` within a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: ClockTime,
    pub end: ClockTime,
}

impl TimeRange {
    /// Build a range; `end` must come after `start`.
    pub fn new(start: ClockTime, end: ClockTime) -> Result<Self> {
        if end <= start {
            return Err(Error::validation("end time must be after start time"));
        }
        Ok(Self { start, end })
    }

    /// Parse both ends from `HH:MM` strings.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(start.parse()?, end.parse()?)
    }

    /// True when the two ranges share at least one minute.
    #[must_use]
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// True when `other` lies entirely within `self`.
    #[must_use]
    pub fn contains(&self, other: &TimeRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Length in minutes.
    #[must_use]
    pub fn duration_minutes(&self) -> u32 {
        self.end.minutes() - self.start.minutes()
    }

    /// The hour-long range starting at `hour`, if it fits in a day.
    #[must_use]
    pub fn hour(hour: u32) -> Option<Self> {
        let start = ClockTime::on_hour(hour)?;
        // The last hour of the day ends at 23:59, the latest representable time.
        let end = ClockTime::on_hour(hour + 1).or_else(|| ClockTime::from_hm(23, 59))?;
        Some(Self { start, end })
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}
