//! # Registration Module
//!
//! A user's seat in a training session.

use crate::error::{Error, Result};
use crate::primitives::{RegistrationId, SessionId, UserId};
use crate::session::Session;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub id: RegistrationId,
    pub session_id: SessionId,
    pub user_id: UserId,
    pub is_canceled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Registration {
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.is_canceled
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.is_canceled {
            return Err(Error::conflict("registration is already canceled"));
        }
        self.is_canceled = true;
        self.updated_at = now;
        Ok(())
    }

    /// Register `user_id` for `session`, given the session's existing
    /// registrations.
    pub fn admit(
        session: &Session,
        existing: &[Registration],
        user_id: UserId,
        now: NaiveDateTime,
        stamp: DateTime<Utc>,
    ) -> Result<Registration> {
        if session.is_canceled {
            return Err(Error::conflict("session is canceled"));
        }
        if session.has_started(now) {
            return Err(Error::conflict("session has already started"));
        }
        let active: Vec<&Registration> = existing
            .iter()
            .filter(|r| r.is_active() && r.session_id == session.id)
            .collect();
        if active.iter().any(|r| r.user_id == user_id) {
            return Err(Error::conflict("already registered for this session"));
        }
        if active.len() >= session.capacity as usize {
            return Err(Error::conflict("no free spots in this session"));
        }
        Ok(Registration {
            id: RegistrationId::new(),
            session_id: session.id,
            user_id,
            is_canceled: false,
            created_at: stamp,
            updated_at: stamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, FixedClock};
    use crate::primitives::FacilityId;
    use crate::session::SessionDraft;
    use chrono::NaiveDate;

    fn session(capacity: u32) -> Session {
        SessionDraft {
            facility_id: FacilityId::new(),
            date: "2025-07-01".into(),
            start_time: "18:00".into(),
            end_time: "19:00".into(),
            capacity,
            trainer_id: None,
        }
        .into_session(UserId::new(), Utc::now())
        .unwrap()
    }

    fn morning() -> NaiveDateTime {
        FixedClock::at(NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(), 9, 0).now()
    }

    #[test]
    fn admits_until_full() {
        let s = session(2);
        let mut regs = Vec::new();
        for _ in 0..2 {
            regs.push(Registration::admit(&s, &regs, UserId::new(), morning(), Utc::now()).unwrap());
        }
        let err = Registration::admit(&s, &regs, UserId::new(), morning(), Utc::now()).unwrap_err();
        assert!(err.to_string().contains("no free spots"));
    }

    #[test]
    fn canceled_seat_frees_capacity() {
        let s = session(1);
        let mut first = Registration::admit(&s, &[], UserId::new(), morning(), Utc::now()).unwrap();
        first.cancel(Utc::now()).unwrap();
        assert!(Registration::admit(&s, &[first], UserId::new(), morning(), Utc::now()).is_ok());
    }

    #[test]
    fn duplicate_registration_conflicts() {
        let s = session(5);
        let user = UserId::new();
        let first = Registration::admit(&s, &[], user, morning(), Utc::now()).unwrap();
        let err = Registration::admit(&s, &[first], user, morning(), Utc::now()).unwrap_err();
        assert!(err.to_string().contains("already registered"));
    }

    #[test]
    fn started_or_canceled_sessions_refuse() {
        let s = session(5);
        let evening = s.starts_at();
        assert!(Registration::admit(&s, &[], UserId::new(), evening, Utc::now()).is_err());

        let mut s = session(5);
        s.is_canceled = true;
        assert!(Registration::admit(&s, &[], UserId::new(), morning(), Utc::now()).is_err());
    }
}
