//! # Slots Module
//!
//! The hourly availability grid of a facility, and the 1-2 hour slot
//! selection a client builds from it.
//!
//! One slot exists per whole hour from the opening hour up to (not
//! including) the closing hour. A slot's status is decided in priority
//! order: `session`, `my-booking`, `booked`, `past`, `available`.

use crate::booking::Booking;
use crate::clock::{ClockTime, TimeRange};
use crate::error::{Error, Result};
use crate::facility::Facility;
use crate::primitives::{MAX_BOOKING_HOURS, UserId};
use crate::session::Session;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

/// Status of one hourly slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SlotStatus {
    /// Covered by a training session.
    Session,
    /// Covered by the viewer's own booking.
    MyBooking,
    /// Covered by someone else's booking.
    Booked,
    /// Already started.
    Past,
    Available,
}

/// One hour of the grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Slot {
    pub hour: u32,
    pub start: ClockTime,
    pub end: ClockTime,
    pub status: SlotStatus,
}

/// A facility's slots for one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayGrid {
    pub date: NaiveDate,
    pub slots: Vec<Slot>,
}

impl DayGrid {
    /// Hours currently bookable.
    pub fn available_hours(&self) -> impl Iterator<Item = u32> + '_ {
        self.slots
            .iter()
            .filter(|s| s.status == SlotStatus::Available)
            .map(|s| s.hour)
    }
}

/// Build the grid for `facility` on `date`.
///
/// Canceled bookings and sessions, and records for other dates, are
/// ignored. `viewer` decides which bookings show as `my-booking`.
pub fn build_day(
    facility: &Facility,
    date: NaiveDate,
    bookings: &[Booking],
    sessions: &[Session],
    viewer: Option<UserId>,
    now: NaiveDateTime,
) -> DayGrid {
    let bookings: Vec<&Booking> = bookings
        .iter()
        .filter(|b| b.is_active() && b.date == date)
        .collect();
    let sessions: Vec<&Session> = sessions
        .iter()
        .filter(|s| !s.is_canceled && s.date == date)
        .collect();

    let slots = (facility.open_time.hour()..facility.close_time.hour())
        .filter_map(TimeRange::hour)
        .map(|range| {
            let status = slot_status(&range, date, &bookings, &sessions, viewer, now);
            Slot {
                hour: range.start.hour(),
                start: range.start,
                end: range.end,
                status,
            }
        })
        .collect();

    DayGrid { date, slots }
}

fn slot_status(
    range: &TimeRange,
    date: NaiveDate,
    bookings: &[&Booking],
    sessions: &[&Session],
    viewer: Option<UserId>,
    now: NaiveDateTime,
) -> SlotStatus {
    if sessions.iter().any(|s| s.range().overlaps(range)) {
        return SlotStatus::Session;
    }
    let taken: Vec<&&Booking> = bookings
        .iter()
        .filter(|b| b.range().overlaps(range))
        .collect();
    if !taken.is_empty() {
        if taken.iter().any(|b| Some(b.user_id) == viewer) {
            return SlotStatus::MyBooking;
        }
        return SlotStatus::Booked;
    }
    if date.and_time(range.start.to_naive()) <= now {
        return SlotStatus::Past;
    }
    SlotStatus::Available
}

// =============================================================================
// SELECTION
// =============================================================================

/// Up to [`MAX_BOOKING_HOURS`] consecutive hours.
///
/// Hours are kept sorted; a selection is never gapped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotSelection {
    hours: Vec<u32>,
}

impl SlotSelection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn hours(&self) -> &[u32] {
        &self.hours
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hours.is_empty()
    }

    /// Click on `hour`.
    ///
    /// A selected hour is removed. Otherwise, with exactly one hour
    /// selected and `hour` next to it, the selection grows to both;
    /// in every other case it restarts at `hour`.
    pub fn toggle(&mut self, hour: u32) {
        if let Some(pos) = self.hours.iter().position(|&h| h == hour) {
            self.hours.remove(pos);
            return;
        }
        match self.hours.as_slice() {
            [only] if only.abs_diff(hour) == 1 => {
                let only = *only;
                self.hours = vec![only.min(hour), only.max(hour)];
            }
            _ => self.hours = vec![hour],
        }
    }

    /// `[first, last + 1)` as a time range.
    #[must_use]
    pub fn range(&self) -> Option<TimeRange> {
        let first = *self.hours.first()?;
        let last = *self.hours.last()?;
        TimeRange::hour(first)
            .zip(TimeRange::hour(last))
            .map(|(a, b)| TimeRange {
                start: a.start,
                end: b.end,
            })
    }

    /// Accept a range only if it sits on whole hours and spans 1 or 2 of them.
    pub fn from_range(range: TimeRange) -> Result<Self> {
        if !range.start.is_on_hour() || !range.end.is_on_hour() {
            return Err(Error::validation("bookings must start and end on the hour"));
        }
        let hours = range.end.hour() - range.start.hour();
        if hours < 1 || hours > MAX_BOOKING_HOURS {
            return Err(Error::validation(format!(
                "bookings must last between 1 and {MAX_BOOKING_HOURS} hours"
            )));
        }
        Ok(Self {
            hours: (range.start.hour()..range.end.hour()).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::BookingDraft;
    use crate::clock::{Clock, FixedClock};
    use crate::facility::FacilityDraft;
    use crate::session::SessionDraft;
    use chrono::Utc;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, 1).unwrap()
    }

    fn facility() -> Facility {
        FacilityDraft {
            name: "Pool".into(),
            kind: "swimming".into(),
            description: "25m indoor pool".into(),
            capacity: 20,
            open_time: "08:00".into(),
            close_time: "12:00".into(),
            image_url: None,
        }
        .into_facility(Utc::now())
        .unwrap()
    }

    fn booking(f: &Facility, user: UserId, start: &str, end: &str) -> Booking {
        BookingDraft {
            facility_id: f.id,
            date: "2025-09-01".into(),
            start_time: start.into(),
            end_time: end.into(),
            note: None,
        }
        .parse(user)
        .unwrap()
        .into_booking(Utc::now())
    }

    fn session(f: &Facility, start: &str, end: &str) -> Session {
        SessionDraft {
            facility_id: f.id,
            date: "2025-09-01".into(),
            start_time: start.into(),
            end_time: end.into(),
            capacity: 5,
            trainer_id: None,
        }
        .into_session(UserId::new(), Utc::now())
        .unwrap()
    }

    fn statuses(grid: &DayGrid) -> Vec<SlotStatus> {
        grid.slots.iter().map(|s| s.status).collect()
    }

    #[test]
    fn grid_has_one_slot_per_opening_hour() {
        let f = facility();
        let grid = build_day(&f, day(), &[], &[], None, FixedClock::at(day(), 0, 0).now());
        let hours: Vec<u32> = grid.slots.iter().map(|s| s.hour).collect();
        assert_eq!(hours, vec![8, 9, 10, 11]);
        assert!(statuses(&grid).iter().all(|s| *s == SlotStatus::Available));
    }

    #[test]
    fn statuses_follow_priority() {
        let f = facility();
        let me = UserId::new();
        let bookings = vec![
            booking(&f, me, "08:00", "09:00"),
            booking(&f, UserId::new(), "09:00", "10:00"),
            booking(&f, me, "10:00", "11:00"),
        ];
        // Session overlapping my 10:00 booking wins.
        let sessions = vec![session(&f, "10:30", "11:00")];
        let now = FixedClock::at(day(), 9, 30).now();
        let grid = build_day(&f, day(), &bookings, &sessions, Some(me), now);
        assert_eq!(
            statuses(&grid),
            vec![
                SlotStatus::MyBooking,
                SlotStatus::Booked,
                SlotStatus::Session,
                SlotStatus::Available,
            ]
        );
    }

    #[test]
    fn started_hours_are_past() {
        let f = facility();
        let now = FixedClock::at(day(), 10, 0).now();
        let grid = build_day(&f, day(), &[], &[], None, now);
        assert_eq!(
            statuses(&grid),
            vec![
                SlotStatus::Past,
                SlotStatus::Past,
                SlotStatus::Past,
                SlotStatus::Available,
            ]
        );
        assert_eq!(grid.available_hours().collect::<Vec<_>>(), vec![11]);
    }

    #[test]
    fn anonymous_viewer_sees_booked() {
        let f = facility();
        let b = booking(&f, UserId::new(), "11:00", "12:00");
        let grid = build_day(&f, day(), &[b], &[], None, FixedClock::at(day(), 0, 0).now());
        assert_eq!(grid.slots[3].status, SlotStatus::Booked);
    }

    #[test]
    fn toggle_follows_selection_rules() {
        let mut sel = SlotSelection::new();
        sel.toggle(10);
        assert_eq!(sel.hours(), &[10]);
        sel.toggle(9);
        assert_eq!(sel.hours(), &[9, 10]);
        // A third hour restarts the selection.
        sel.toggle(11);
        assert_eq!(sel.hours(), &[11]);
        // Non-adjacent restarts too.
        sel.toggle(14);
        assert_eq!(sel.hours(), &[14]);
        sel.toggle(14);
        assert!(sel.is_empty());
    }

    #[test]
    fn toggle_removes_from_pair() {
        let mut sel = SlotSelection::new();
        sel.toggle(10);
        sel.toggle(11);
        sel.toggle(10);
        assert_eq!(sel.hours(), &[11]);
    }

    #[test]
    fn selection_range_spans_last_hour() {
        let mut sel = SlotSelection::new();
        sel.toggle(16);
        sel.toggle(17);
        let range = sel.range().unwrap();
        assert_eq!(range.to_string(), "16:00-18:00");
        assert!(SlotSelection::new().range().is_none());
    }

    #[test]
    fn from_range_enforces_whole_hours() {
        assert!(SlotSelection::from_range(TimeRange::parse("10:00", "11:00").unwrap()).is_ok());
        assert_eq!(
            SlotSelection::from_range(TimeRange::parse("10:00", "12:00").unwrap())
                .unwrap()
                .hours(),
            &[10, 11]
        );
        assert!(SlotSelection::from_range(TimeRange::parse("10:00", "13:00").unwrap()).is_err());
        assert!(SlotSelection::from_range(TimeRange::parse("10:15", "11:15").unwrap()).is_err());
    }
}
