//! # Session Module
//!
//! Concrete trainer-led sessions on a given date. Sessions come either
//! from a weekly [`Schedule`](crate::schedule::Schedule) or are created
//! one-off by a trainer or an admin.

use crate::clock::{ClockTime, TimeRange, parse_date};
use crate::error::{Error, Result};
use crate::primitives::{FacilityId, ScheduleId, SessionId, UserId};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// A dated training session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub schedule_id: Option<ScheduleId>,
    pub trainer_id: UserId,
    pub facility_id: FacilityId,
    pub date: NaiveDate,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    pub capacity: u32,
    pub is_canceled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    #[must_use]
    pub fn range(&self) -> TimeRange {
        TimeRange {
            start: self.start_time,
            end: self.end_time,
        }
    }

    /// Local date-time the session begins.
    #[must_use]
    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.start_time.to_naive())
    }

    #[must_use]
    pub fn has_started(&self, now: NaiveDateTime) -> bool {
        self.starts_at() <= now
    }
}

/// Input for a one-off session.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionDraft {
    pub facility_id: FacilityId,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub capacity: u32,
    /// Only honoured for admins; trainers always create for themselves.
    #[serde(default)]
    pub trainer_id: Option<UserId>,
}

impl SessionDraft {
    /// Validate and build a session led by `trainer_id`.
    pub fn into_session(self, trainer_id: UserId, now: DateTime<Utc>) -> Result<Session> {
        let date = parse_date(&self.date)?;
        let range = TimeRange::parse(&self.start_time, &self.end_time)?;
        if self.capacity < 1 {
            return Err(Error::validation("capacity must be at least 1"));
        }
        Ok(Session {
            id: SessionId::new(),
            schedule_id: None,
            trainer_id,
            facility_id: self.facility_id,
            date,
            start_time: range.start,
            end_time: range.end,
            capacity: self.capacity,
            is_canceled: false,
            created_at: now,
            updated_at: now,
        })
    }
}
