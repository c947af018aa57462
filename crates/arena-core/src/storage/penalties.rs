//! Penalties and the credit-score bookkeeping that goes with them.

use super::{BOOKINGS, FACILITIES, PENALTIES, SESSIONS, Store, USERS, load, require, save, scan};
use crate::booking::Booking;
use crate::error::{Error, Result};
use crate::facility::Facility;
use crate::penalty::{Penalty, PenaltyDraft};
use crate::primitives::{PenaltyId, UserId};
use crate::session::Session;
use crate::user::User;
use chrono::NaiveDate;
use redb::ReadTransaction;
use serde::Serialize;

/// A penalty with the names and dates a listing shows next to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PenaltyView {
    #[serde(flatten)]
    pub penalty: Penalty,
    pub user_name: String,
    pub facility_name: Option<String>,
    pub booking_date: Option<NaiveDate>,
    pub session_date: Option<NaiveDate>,
    pub context_info: String,
}

impl Store {
    /// Record a penalty given by `given_by` and deduct its points.
    pub fn give_penalty(&self, draft: PenaltyDraft, given_by: UserId) -> Result<Penalty> {
        let penalty = draft.into_penalty(given_by, self.clock.now_utc())?;
        let stamp = penalty.created_at;
        self.write(|txn| {
            let mut users = txn.open_table(USERS)?;
            let mut user: User = require(&users, penalty.user_id.as_bytes(), "user")?;
            if let Some(id) = penalty.booking_id {
                let _: Booking = require(&txn.open_table(BOOKINGS)?, id.as_bytes(), "booking")?;
            }
            if let Some(id) = penalty.session_id {
                let _: Session = require(&txn.open_table(SESSIONS)?, id.as_bytes(), "session")?;
            }
            user.credit_score = user
                .credit_score
                .checked_sub(penalty.deduction())
                .ok_or_else(|| Error::conflict("credit score out of range"))?;
            user.updated_at = stamp;
            save(&mut users, user.id.as_bytes(), &user)?;
            let mut penalties = txn.open_table(PENALTIES)?;
            save(&mut penalties, penalty.id.as_bytes(), &penalty)?;
            Ok(())
        })?;
        Ok(penalty)
    }

    pub fn penalty(&self, id: PenaltyId) -> Result<Penalty> {
        self.read(|txn| require(&txn.open_table(PENALTIES)?, id.as_bytes(), "penalty"))
    }

    /// Delete a penalty and give its points back.
    pub fn revoke_penalty(&self, id: PenaltyId) -> Result<Penalty> {
        let stamp = self.clock.now_utc();
        self.write(|txn| {
            let mut penalties = txn.open_table(PENALTIES)?;
            let penalty: Penalty = require(&penalties, id.as_bytes(), "penalty")?;
            penalties.remove(id.as_bytes().as_slice())?;
            let mut users = txn.open_table(USERS)?;
            // The user may be gone; the penalty is still removed.
            if let Some(mut user) = load::<User>(&users, penalty.user_id.as_bytes())? {
                user.credit_score = user
                    .credit_score
                    .checked_add(penalty.deduction())
                    .ok_or_else(|| Error::conflict("credit score out of range"))?;
                user.updated_at = stamp;
                save(&mut users, user.id.as_bytes(), &user)?;
            }
            Ok(penalty)
        })
    }

    pub fn penalties_for_user(&self, id: UserId) -> Result<Vec<PenaltyView>> {
        self.penalty_views(|p| p.user_id == id)
    }

    pub fn penalties_given_by(&self, id: UserId) -> Result<Vec<PenaltyView>> {
        self.penalty_views(|p| p.given_by_id == id)
    }

    /// Penalties created within `[start, end]` (UTC dates).
    pub fn penalties_between(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<PenaltyView>> {
        if end < start {
            return Err(Error::validation("end must not be before start"));
        }
        self.penalty_views(|p| {
            let day = p.created_at.date_naive();
            day >= start && day <= end
        })
    }

    /// Newest first, each enriched with context.
    fn penalty_views(&self, keep: impl Fn(&Penalty) -> bool) -> Result<Vec<PenaltyView>> {
        self.read(|txn| {
            let mut penalties: Vec<Penalty> = scan::<Penalty>(&txn.open_table(PENALTIES)?)?
                .into_iter()
                .filter(|p| keep(p))
                .collect();
            penalties.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            penalties
                .into_iter()
                .map(|p| enrich(txn, p))
                .collect()
        })
    }
}

fn enrich(txn: &ReadTransaction, penalty: Penalty) -> Result<PenaltyView> {
    let users = txn.open_table(USERS)?;
    let facilities = txn.open_table(FACILITIES)?;
    let user_name = load::<User>(&users, penalty.user_id.as_bytes())?
        .map(|u| u.full_name())
        .unwrap_or_default();

    let booking: Option<Booking> = match penalty.booking_id {
        Some(id) => load(&txn.open_table(BOOKINGS)?, id.as_bytes())?,
        None => None,
    };
    let session: Option<Session> = match penalty.session_id {
        Some(id) => load(&txn.open_table(SESSIONS)?, id.as_bytes())?,
        None => None,
    };
    let facility_id = booking
        .as_ref()
        .map(|b| b.facility_id)
        .or(session.as_ref().map(|s| s.facility_id));
    let facility_name = match facility_id {
        Some(id) => load::<Facility>(&facilities, id.as_bytes())?.map(|f| f.name),
        None => None,
    };

    let context_info = match (&booking, &session, &facility_name) {
        (Some(b), _, Some(name)) => format!("booking at {name} on {} {}", b.date, b.range()),
        (_, Some(s), Some(name)) => format!("session at {name} on {} {}", s.date, s.range()),
        (Some(b), _, None) => format!("booking on {}", b.date),
        (_, Some(s), None) => format!("session on {}", s.date),
        _ => String::from("general"),
    };

    Ok(PenaltyView {
        user_name,
        facility_name,
        booking_date: booking.map(|b| b.date),
        session_date: session.map(|s| s.date),
        context_info,
        penalty,
    })
}
