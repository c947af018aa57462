//! Facilities, their reviews, and availability grids.

use super::{BOOKINGS, FACILITIES, REVIEWS, SCHEDULES, SESSIONS, Store, require, save, scan};
use crate::booking::Booking;
use crate::error::{Error, Result};
use crate::facility::{Facility, FacilityDraft, FacilityPatch};
use crate::primitives::{FacilityId, MAX_GRID_DAYS, Page, ReviewId, UserId, page_size};
use crate::review::{RatingSummary, Review, ReviewDraft};
use crate::schedule::Schedule;
use crate::session::Session;
use crate::slots::{DayGrid, build_day};
use chrono::{Days, NaiveDate};

impl Store {
    // -------------------------------------------------------------------------
    // Facilities
    // -------------------------------------------------------------------------

    pub fn create_facility(&self, draft: FacilityDraft) -> Result<Facility> {
        let facility = draft.into_facility(self.clock.now_utc())?;
        self.write(|txn| {
            let mut facilities = txn.open_table(FACILITIES)?;
            save(&mut facilities, facility.id.as_bytes(), &facility)
        })?;
        Ok(facility)
    }

    pub fn facility(&self, id: FacilityId) -> Result<Facility> {
        self.read(|txn| require(&txn.open_table(FACILITIES)?, id.as_bytes(), "facility"))
    }

    /// All facilities, sorted by name.
    pub fn list_facilities(&self) -> Result<Vec<Facility>> {
        let mut facilities: Vec<Facility> = self.read(|txn| scan(&txn.open_table(FACILITIES)?))?;
        facilities.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(facilities)
    }

    pub fn update_facility(&self, id: FacilityId, patch: FacilityPatch) -> Result<Facility> {
        let now = self.clock.now_utc();
        self.write(|txn| {
            let mut facilities = txn.open_table(FACILITIES)?;
            let mut facility: Facility = require(&facilities, id.as_bytes(), "facility")?;
            patch.apply(&mut facility, now)?;
            save(&mut facilities, id.as_bytes(), &facility)?;
            Ok(facility)
        })
    }

    /// Delete a facility that has nothing upcoming.
    ///
    /// Its reviews go with it and its schedules are deactivated. Past
    /// bookings and sessions stay for history.
    pub fn delete_facility(&self, id: FacilityId) -> Result<()> {
        let now = self.clock.now();
        let stamp = self.clock.now_utc();
        self.write(|txn| {
            let mut facilities = txn.open_table(FACILITIES)?;
            let _: Facility = require(&facilities, id.as_bytes(), "facility")?;

            let bookings: Vec<Booking> = scan(&txn.open_table(BOOKINGS)?)?;
            if bookings
                .iter()
                .any(|b| b.facility_id == id && b.is_upcoming(now))
            {
                return Err(Error::conflict("facility has upcoming bookings"));
            }
            let sessions: Vec<Session> = scan(&txn.open_table(SESSIONS)?)?;
            if sessions
                .iter()
                .any(|s| s.facility_id == id && !s.is_canceled && !s.has_started(now))
            {
                return Err(Error::conflict("facility has upcoming sessions"));
            }

            let mut reviews = txn.open_table(REVIEWS)?;
            let doomed: Vec<ReviewId> = scan::<Review>(&reviews)?
                .into_iter()
                .filter(|r| r.facility_id == id)
                .map(|r| r.id)
                .collect();
            for review in doomed {
                reviews.remove(review.as_bytes().as_slice())?;
            }

            let mut schedules = txn.open_table(SCHEDULES)?;
            let owned: Vec<Schedule> = scan::<Schedule>(&schedules)?
                .into_iter()
                .filter(|s| s.facility_id == id && s.is_active)
                .collect();
            for mut schedule in owned {
                schedule.is_active = false;
                schedule.updated_at = stamp;
                save(&mut schedules, schedule.id.as_bytes(), &schedule)?;
            }

            facilities.remove(id.as_bytes().as_slice())?;
            Ok(())
        })
    }

    /// Slot grids for `days` consecutive dates starting at `from`.
    pub fn day_grids(
        &self,
        id: FacilityId,
        from: NaiveDate,
        days: u32,
        viewer: Option<UserId>,
    ) -> Result<Vec<DayGrid>> {
        if !(1..=MAX_GRID_DAYS).contains(&days) {
            return Err(Error::validation(format!(
                "days must be between 1 and {MAX_GRID_DAYS}"
            )));
        }
        let now = self.clock.now();
        let last = from
            .checked_add_days(Days::new(u64::from(days - 1)))
            .ok_or_else(|| Error::validation("date out of range"))?;
        let (facility, bookings, sessions) = self.read(|txn| {
            let facility: Facility = require(&txn.open_table(FACILITIES)?, id.as_bytes(), "facility")?;
            let in_window = |fid: FacilityId, date: NaiveDate| fid == id && date >= from && date <= last;
            let bookings: Vec<Booking> = scan::<Booking>(&txn.open_table(BOOKINGS)?)?
                .into_iter()
                .filter(|b| in_window(b.facility_id, b.date))
                .collect();
            let sessions: Vec<Session> = scan::<Session>(&txn.open_table(SESSIONS)?)?
                .into_iter()
                .filter(|s| in_window(s.facility_id, s.date))
                .collect();
            Ok((facility, bookings, sessions))
        })?;
        Ok(from
            .iter_days()
            .take(days as usize)
            .map(|date| build_day(&facility, date, &bookings, &sessions, viewer, now))
            .collect())
    }

    // -------------------------------------------------------------------------
    // Reviews
    // -------------------------------------------------------------------------

    pub fn create_review(
        &self,
        facility_id: FacilityId,
        user_id: UserId,
        draft: ReviewDraft,
    ) -> Result<Review> {
        let review = draft.into_review(facility_id, user_id, self.clock.now_utc())?;
        self.write(|txn| {
            let _: Facility = require(
                &txn.open_table(FACILITIES)?,
                facility_id.as_bytes(),
                "facility",
            )?;
            let mut reviews = txn.open_table(REVIEWS)?;
            save(&mut reviews, review.id.as_bytes(), &review)
        })?;
        Ok(review)
    }

    pub fn review(&self, id: ReviewId) -> Result<Review> {
        self.read(|txn| require(&txn.open_table(REVIEWS)?, id.as_bytes(), "review"))
    }

    pub fn delete_review(&self, id: ReviewId) -> Result<()> {
        self.write(|txn| {
            let mut reviews = txn.open_table(REVIEWS)?;
            if reviews.remove(id.as_bytes().as_slice())?.is_none() {
                return Err(Error::NotFound("review"));
            }
            Ok(())
        })
    }

    /// Newest reviews first.
    pub fn reviews_for_facility(&self, id: FacilityId, offset: usize) -> Result<Page<Review>> {
        let mut reviews: Vec<Review> = self.read(|txn| {
            let _: Facility = require(&txn.open_table(FACILITIES)?, id.as_bytes(), "facility")?;
            scan(&txn.open_table(REVIEWS)?)
        })?;
        reviews.retain(|r| r.facility_id == id);
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(Page::slice(reviews, offset, page_size::REVIEWS))
    }

    pub fn rating(&self, id: FacilityId) -> Result<RatingSummary> {
        let reviews: Vec<Review> = self.read(|txn| {
            let _: Facility = require(&txn.open_table(FACILITIES)?, id.as_bytes(), "facility")?;
            scan(&txn.open_table(REVIEWS)?)
        })?;
        Ok(RatingSummary::from_ratings(
            id,
            reviews
                .iter()
                .filter(|r| r.facility_id == id)
                .map(|r| r.rating),
        ))
    }
}

#[cfg(test)]
mod tests {
    use crate::booking::BookingDraft;
    use crate::error::Error;
    use crate::facility::FacilityPatch;
    use crate::primitives::FacilityId;
    use crate::review::ReviewDraft;
    use crate::slots::SlotStatus;
    use crate::storage::test_support::{facility, monday, store, user};
    use crate::user::Role;

    #[test]
    fn facilities_list_sorted_by_name() {
        let store = store();
        facility(&store, "Tennis");
        facility(&store, "archery range");
        facility(&store, "Gym");
        let names: Vec<String> = store
            .list_facilities()
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["archery range", "Gym", "Tennis"]);
    }

    #[test]
    fn update_facility_revalidates() {
        let store = store();
        let f = facility(&store, "Gym");
        let bad = FacilityPatch {
            capacity: Some(0),
            ..FacilityPatch::default()
        };
        assert!(matches!(store.update_facility(f.id, bad), Err(Error::Validation(_))));
        let good = FacilityPatch {
            is_active: Some(false),
            ..FacilityPatch::default()
        };
        assert!(!store.update_facility(f.id, good).unwrap().is_active);
    }

    #[test]
    fn delete_facility_blocked_by_upcoming_booking() {
        let store = store();
        let f = facility(&store, "Gym");
        let u = user(&store, "a@campus.edu", Role::Student);
        store
            .create_booking(
                u.id,
                BookingDraft {
                    facility_id: f.id,
                    date: "2025-03-11".into(),
                    start_time: "10:00".into(),
                    end_time: "11:00".into(),
                    note: None,
                },
            )
            .unwrap();
        assert!(matches!(store.delete_facility(f.id), Err(Error::Conflict(_))));
    }

    #[test]
    fn delete_facility_takes_reviews_along() {
        let store = store();
        let f = facility(&store, "Gym");
        let u = user(&store, "a@campus.edu", Role::Student);
        let review = store
            .create_review(
                f.id,
                u.id,
                ReviewDraft {
                    rating: 4,
                    comment: "Nice".into(),
                },
            )
            .unwrap();
        store.delete_facility(f.id).unwrap();
        assert!(matches!(store.facility(f.id), Err(Error::NotFound(_))));
        assert!(matches!(store.review(review.id), Err(Error::NotFound(_))));
    }

    #[test]
    fn review_on_missing_facility_is_not_found() {
        let store = store();
        let u = user(&store, "a@campus.edu", Role::Student);
        let draft = ReviewDraft {
            rating: 3,
            comment: "Okay".into(),
        };
        assert!(matches!(
            store.create_review(FacilityId::new(), u.id, draft),
            Err(Error::NotFound("facility"))
        ));
    }

    #[test]
    fn rating_averages_only_this_facility() {
        let store = store();
        let f = facility(&store, "Gym");
        let other = facility(&store, "Pool");
        let u = user(&store, "a@campus.edu", Role::Student);
        for (fid, rating) in [(f.id, 5), (f.id, 4), (other.id, 1)] {
            store
                .create_review(
                    fid,
                    u.id,
                    ReviewDraft {
                        rating,
                        comment: "fine".into(),
                    },
                )
                .unwrap();
        }
        let summary = store.rating(f.id).unwrap();
        assert_eq!(summary.review_count, 2);
        assert_eq!(summary.average_rating, Some(4.5));
        assert_eq!(store.rating(facility(&store, "Empty").id).unwrap().average_rating, None);
    }

    #[test]
    fn reviews_page_by_ten() {
        let store = store();
        let f = facility(&store, "Gym");
        let u = user(&store, "a@campus.edu", Role::Student);
        for _ in 0..13 {
            store
                .create_review(
                    f.id,
                    u.id,
                    ReviewDraft {
                        rating: 5,
                        comment: "great".into(),
                    },
                )
                .unwrap();
        }
        let first = store.reviews_for_facility(f.id, 0).unwrap();
        assert_eq!(first.items.len(), 10);
        assert_eq!(first.total, 13);
        assert_eq!(store.reviews_for_facility(f.id, 10).unwrap().items.len(), 3);
    }

    #[test]
    fn delete_missing_review_is_not_found() {
        let store = store();
        assert!(matches!(
            store.delete_review(crate::primitives::ReviewId::new()),
            Err(Error::NotFound("review"))
        ));
    }

    #[test]
    fn day_grids_mark_bookings_for_viewer() {
        let store = store();
        let f = facility(&store, "Gym");
        let me = user(&store, "me@campus.edu", Role::Student);
        store
            .create_booking(
                me.id,
                BookingDraft {
                    facility_id: f.id,
                    date: "2025-03-10".into(),
                    start_time: "12:00".into(),
                    end_time: "13:00".into(),
                    note: None,
                },
            )
            .unwrap();
        let grids = store.day_grids(f.id, monday(), 2, Some(me.id)).unwrap();
        assert_eq!(grids.len(), 2);
        let today = &grids[0];
        // Clock is frozen at 09:00: 08:00 is past, 12:00 is mine.
        assert_eq!(today.slots[0].status, SlotStatus::Past);
        assert_eq!(today.slots[4].status, SlotStatus::MyBooking);
        assert!(grids[1].slots.iter().all(|s| s.status == SlotStatus::Available));

        let anonymous = store.day_grids(f.id, monday(), 1, None).unwrap();
        assert_eq!(anonymous[0].slots[4].status, SlotStatus::Booked);
    }

    #[test]
    fn day_grids_bound_the_window() {
        let store = store();
        let f = facility(&store, "Gym");
        assert!(store.day_grids(f.id, monday(), 0, None).is_err());
        assert!(store.day_grids(f.id, monday(), 15, None).is_err());
        assert_eq!(store.day_grids(f.id, monday(), 14, None).unwrap().len(), 14);
    }
}
