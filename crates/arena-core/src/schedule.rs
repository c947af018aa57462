//! # Schedule Module
//!
//! Weekly session templates. A schedule says "every Tuesday 18:00-19:00
//! at the pool"; dated [`Session`]s are generated from it.
//!
//! Weekdays count from Sunday: 0 = Sunday ... 6 = Saturday.

use crate::clock::{ClockTime, TimeRange};
use crate::error::{Error, Result};
use crate::primitives::{FacilityId, ScheduleId, SessionId, UserId};
use crate::session::Session;
use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A recurring weekly slot led by one trainer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: ScheduleId,
    pub trainer_id: UserId,
    pub facility_id: FacilityId,
    pub weekday: u8,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    pub capacity: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Schedule {
    #[must_use]
    pub fn range(&self) -> TimeRange {
        TimeRange {
            start: self.start_time,
            end: self.end_time,
        }
    }

    /// Two active schedules clash when they share a weekday and overlap.
    #[must_use]
    pub fn clashes_with(&self, other: &Schedule) -> bool {
        self.is_active
            && other.is_active
            && self.weekday == other.weekday
            && self.range().overlaps(&other.range())
    }

    /// The dated session for one occurrence.
    #[must_use]
    pub fn session_on(&self, date: NaiveDate, now: DateTime<Utc>) -> Session {
        Session {
            id: SessionId::new(),
            schedule_id: Some(self.id),
            trainer_id: self.trainer_id,
            facility_id: self.facility_id,
            date,
            start_time: self.start_time,
            end_time: self.end_time,
            capacity: self.capacity,
            is_canceled: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Listing order: weekday, then start time.
    pub fn by_weekday(a: &Schedule, b: &Schedule) -> std::cmp::Ordering {
        a.weekday
            .cmp(&b.weekday)
            .then_with(|| a.start_time.cmp(&b.start_time))
    }
}

/// Schedule input.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleDraft {
    pub facility_id: FacilityId,
    pub weekday: u8,
    pub start_time: String,
    pub end_time: String,
    pub capacity: u32,
}

impl ScheduleDraft {
    pub fn into_schedule(self, trainer_id: UserId, now: DateTime<Utc>) -> Result<Schedule> {
        if self.weekday > 6 {
            return Err(Error::validation("weekday must be between 0 (Sunday) and 6"));
        }
        let range = TimeRange::parse(&self.start_time, &self.end_time)?;
        if self.capacity < 1 {
            return Err(Error::validation("capacity must be at least 1"));
        }
        Ok(Schedule {
            id: ScheduleId::new(),
            trainer_id,
            facility_id: self.facility_id,
            weekday: self.weekday,
            start_time: range.start,
            end_time: range.end,
            capacity: self.capacity,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Weekday of `date`, Sunday = 0.
#[must_use]
pub fn weekday_of(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// The next `count` dates falling on `weekday`, starting at `from`
/// (inclusive).
#[must_use]
pub fn next_weekdays(weekday: u8, from: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let ahead = (u64::from(weekday) + 7 - u64::from(weekday_of(from))) % 7;
    let Some(first) = from.checked_add_days(Days::new(ahead)) else {
        return Vec::new();
    };
    (0..count as u64)
        .map_while(|week| {
            week.checked_mul(7)
                .and_then(|days| first.checked_add_days(Days::new(days)))
        })
        .collect()
}
