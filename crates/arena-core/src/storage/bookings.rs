//! Bookings: creation under the full rule set, cancellation, listings.

use super::{BOOKINGS, FACILITIES, SESSIONS, Store, require, save, scan};
use crate::booking::{Booking, BookingDraft};
use crate::error::{Error, Result};
use crate::facility::Facility;
use crate::primitives::{BookingId, FacilityId, Page, UserId, page_size};
use crate::session::Session;
use chrono::NaiveDate;

impl Store {
    /// Book on behalf of `user_id`.
    ///
    /// Every rule is checked against the state inside the same write
    /// transaction that inserts the booking.
    pub fn create_booking(&self, user_id: UserId, draft: BookingDraft) -> Result<Booking> {
        let request = draft.parse(user_id)?;
        let now = self.clock.now();
        let stamp = self.clock.now_utc();
        self.write(|txn| {
            let facility: Facility = require(
                &txn.open_table(FACILITIES)?,
                request.facility_id.as_bytes(),
                "facility",
            )?;
            request.check_window(&facility, now)?;

            let mut bookings = txn.open_table(BOOKINGS)?;
            let existing: Vec<Booking> = scan(&bookings)?;
            let (mine, at_facility): (Vec<Booking>, Vec<Booking>) = existing
                .into_iter()
                .filter(|b| b.user_id == user_id || b.facility_id == request.facility_id)
                .partition(|b| b.user_id == user_id);
            let sessions: Vec<Session> = scan::<Session>(&txn.open_table(SESSIONS)?)?
                .into_iter()
                .filter(|s| s.facility_id == request.facility_id && s.date == request.date)
                .collect();

            // Own bookings at this facility land in `mine`; the
            // one-per-facility-per-day rule covers them.
            request.check_conflicts(&mine, &at_facility, &sessions, now)?;

            let booking = request.into_booking(stamp);
            save(&mut bookings, booking.id.as_bytes(), &booking)?;
            Ok(booking)
        })
    }

    pub fn booking(&self, id: BookingId) -> Result<Booking> {
        self.read(|txn| require(&txn.open_table(BOOKINGS)?, id.as_bytes(), "booking"))
    }

    /// Cancel; canceling twice is a conflict.
    pub fn cancel_booking(&self, id: BookingId, admin_note: Option<String>) -> Result<Booking> {
        let now = self.clock.now_utc();
        self.write(|txn| {
            let mut bookings = txn.open_table(BOOKINGS)?;
            let mut booking: Booking = require(&bookings, id.as_bytes(), "booking")?;
            booking.cancel(admin_note, now)?;
            save(&mut bookings, id.as_bytes(), &booking)?;
            Ok(booking)
        })
    }

    /// Active bookings at a facility on one date, by start time.
    pub fn bookings_for_facility(&self, id: FacilityId, date: NaiveDate) -> Result<Vec<Booking>> {
        let mut bookings = self.filter_bookings(|b| b.facility_id == id && b.date == date && b.is_active())?;
        bookings.sort_by_key(|b| b.start_time);
        Ok(bookings)
    }

    /// A user's bookings, newest first.
    pub fn bookings_for_user(&self, id: UserId, offset: usize) -> Result<Page<Booking>> {
        let mut bookings = self.filter_bookings(|b| b.user_id == id)?;
        bookings.sort_by(Booking::newest_first);
        Ok(Page::slice(bookings, offset, page_size::BOOKINGS))
    }

    /// All bookings dated within `[start, end]`, newest first.
    pub fn bookings_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        offset: usize,
    ) -> Result<Page<Booking>> {
        if end < start {
            return Err(Error::validation("end_date must not be before start_date"));
        }
        let mut bookings = self.filter_bookings(|b| b.date >= start && b.date <= end)?;
        bookings.sort_by(Booking::newest_first);
        Ok(Page::slice(bookings, offset, page_size::BOOKINGS))
    }

    fn filter_bookings(&self, keep: impl Fn(&Booking) -> bool) -> Result<Vec<Booking>> {
        let all: Vec<Booking> = self.read(|txn| scan(&txn.open_table(BOOKINGS)?))?;
        Ok(all.into_iter().filter(|b| keep(b)).collect())
    }
}
