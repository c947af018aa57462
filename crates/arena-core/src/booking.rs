//! # Booking Module
//!
//! Facility reservations and the rules a new reservation must pass.
//!
//! The rules are pure functions over the records involved; the store
//! gathers those records and calls them inside one write transaction so
//! nothing can slip in between check and insert.
//!
//! Rule order:
//! 1. facility exists and is active
//! 2. window: whole hours, 1-2 hours, inside opening hours, not in the past
//! 3. one booking per user per facility per day
//! 4. no overlap with the user's own bookings that day
//! 5. no overlap with other bookings at the facility
//! 6. no overlap with sessions at the facility
//! 7. at most [`MAX_UPCOMING_BOOKINGS`] upcoming bookings per user

use crate::clock::{ClockTime, TimeRange, parse_date};
use crate::error::{Error, Result};
use crate::facility::Facility;
use crate::primitives::{BookingId, FacilityId, MAX_UPCOMING_BOOKINGS, UserId};
use crate::session::Session;
use crate::slots::SlotSelection;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// A reservation of one facility for a contiguous time range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub user_id: UserId,
    pub facility_id: FacilityId,
    pub date: NaiveDate,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    pub note: String,
    pub is_canceled: bool,
    pub admin_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    #[must_use]
    pub fn range(&self) -> TimeRange {
        TimeRange {
            start: self.start_time,
            end: self.end_time,
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.is_canceled
    }

    #[must_use]
    pub fn ends_at(&self) -> NaiveDateTime {
        self.date.and_time(self.end_time.to_naive())
    }

    /// Active and not yet over.
    #[must_use]
    pub fn is_upcoming(&self, now: NaiveDateTime) -> bool {
        self.is_active() && self.ends_at() > now
    }

    /// Mark canceled, optionally recording why.
    pub fn cancel(&mut self, admin_note: Option<String>, now: DateTime<Utc>) -> Result<()> {
        if self.is_canceled {
            return Err(Error::conflict("booking is already canceled"));
        }
        self.is_canceled = true;
        if let Some(note) = admin_note.filter(|n| !n.trim().is_empty()) {
            self.admin_note = Some(note);
        }
        self.updated_at = now;
        Ok(())
    }

    /// Ordering for listings: newest date first, then latest start.
    pub fn newest_first(a: &Booking, b: &Booking) -> std::cmp::Ordering {
        b.date
            .cmp(&a.date)
            .then_with(|| b.start_time.cmp(&a.start_time))
    }
}

/// Raw booking input as received from a client.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingDraft {
    pub facility_id: FacilityId,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub note: Option<String>,
}

/// A parsed booking request, ready for rule checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRequest {
    pub user_id: UserId,
    pub facility_id: FacilityId,
    pub date: NaiveDate,
    pub range: TimeRange,
    pub note: String,
}

impl BookingDraft {
    /// Parse the date and times on behalf of `user_id`.
    pub fn parse(self, user_id: UserId) -> Result<BookingRequest> {
        Ok(BookingRequest {
            user_id,
            facility_id: self.facility_id,
            date: parse_date(&self.date)?,
            range: TimeRange::parse(&self.start_time, &self.end_time)?,
            note: self.note.unwrap_or_default().trim().to_string(),
        })
    }
}

impl BookingRequest {
    /// Rules 1 and 2: the facility accepts this window.
    pub fn check_window(&self, facility: &Facility, now: NaiveDateTime) -> Result<()> {
        if !facility.is_active {
            return Err(Error::conflict("facility is not available for booking"));
        }
        SlotSelection::from_range(self.range)?;
        if !facility.hours().contains(&self.range) {
            return Err(Error::conflict("booking must be within the facility's opening hours"));
        }
        if self.date.and_time(self.range.start.to_naive()) <= now {
            return Err(Error::conflict("cannot book a time in the past"));
        }
        Ok(())
    }

    /// Rules 3 to 7 against the records already in the store.
    ///
    /// `user_bookings` are all of the caller's bookings, `facility_bookings`
    /// and `facility_sessions` those at the facility on the requested date.
    pub fn check_conflicts(
        &self,
        user_bookings: &[Booking],
        facility_bookings: &[Booking],
        facility_sessions: &[Session],
        now: NaiveDateTime,
    ) -> Result<()> {
        let same_day: Vec<&Booking> = user_bookings
            .iter()
            .filter(|b| b.is_active() && b.date == self.date)
            .collect();

        if same_day.iter().any(|b| b.facility_id == self.facility_id) {
            return Err(Error::conflict(
                "you already have a booking at this facility on this date",
            ));
        }
        if same_day.iter().any(|b| b.range().overlaps(&self.range)) {
            return Err(Error::conflict("you already have an overlapping booking"));
        }
        if facility_bookings
            .iter()
            .any(|b| b.is_active() && b.date == self.date && b.range().overlaps(&self.range))
        {
            return Err(Error::conflict("time slot is already booked"));
        }
        if facility_sessions
            .iter()
            .any(|s| !s.is_canceled && s.date == self.date && s.range().overlaps(&self.range))
        {
            return Err(Error::conflict("time slot is reserved for a training session"));
        }
        let upcoming = user_bookings.iter().filter(|b| b.is_upcoming(now)).count();
        if upcoming >= MAX_UPCOMING_BOOKINGS {
            return Err(Error::conflict(format!(
                "you can have at most {MAX_UPCOMING_BOOKINGS} upcoming bookings"
            )));
        }
        Ok(())
    }

    /// Materialize the booking once every rule has passed.
    #[must_use]
    pub fn into_booking(self, now: DateTime<Utc>) -> Booking {
        Booking {
            id: BookingId::new(),
            user_id: self.user_id,
            facility_id: self.facility_id,
            date: self.date,
            start_time: self.range.start,
            end_time: self.range.end,
            note: self.note,
            is_canceled: false,
            admin_note: None,
            created_at: now,
            updated_at: now,
        }
    }
}
