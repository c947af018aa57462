//! Schedules, sessions, and session registrations.

use super::{
    FACILITIES, REGISTRATIONS, SCHEDULES, SESSIONS, Store, USERS, require, save, scan,
};
use crate::error::{Error, Result};
use crate::facility::Facility;
use crate::primitives::{
    FacilityId, MAX_GENERATE_WEEKS, Page, RegistrationId, SCHEDULE_LOOKAHEAD, ScheduleId,
    SessionId, UserId, page_size,
};
use crate::registration::Registration;
use crate::schedule::{Schedule, ScheduleDraft, next_weekdays};
use crate::session::{Session, SessionDraft};
use crate::user::User;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

/// A session with its number of active registrations.
pub type SessionWithCount = (Session, usize);

impl Store {
    // -------------------------------------------------------------------------
    // Schedules
    // -------------------------------------------------------------------------

    /// Create a weekly schedule for `trainer_id` and generate its next
    /// occurrences as sessions, all in one transaction.
    pub fn create_schedule(
        &self,
        trainer_id: UserId,
        draft: ScheduleDraft,
    ) -> Result<(Schedule, Vec<Session>)> {
        let stamp = self.clock.now_utc();
        let today = self.clock.today();
        let schedule = draft.into_schedule(trainer_id, stamp)?;
        self.write(|txn| {
            let _: Facility = require(
                &txn.open_table(FACILITIES)?,
                schedule.facility_id.as_bytes(),
                "facility",
            )?;
            let mut schedules = txn.open_table(SCHEDULES)?;
            let clash = scan::<Schedule>(&schedules)?
                .iter()
                .any(|s| s.trainer_id == trainer_id && s.clashes_with(&schedule));
            if clash {
                return Err(Error::conflict(
                    "schedule overlaps another of your schedules on that weekday",
                ));
            }
            save(&mut schedules, schedule.id.as_bytes(), &schedule)?;

            let mut sessions = txn.open_table(SESSIONS)?;
            let mut created = Vec::with_capacity(SCHEDULE_LOOKAHEAD);
            for date in next_weekdays(schedule.weekday, today, SCHEDULE_LOOKAHEAD) {
                let session = schedule.session_on(date, stamp);
                save(&mut sessions, session.id.as_bytes(), &session)?;
                created.push(session);
            }
            Ok((schedule, created))
        })
    }

    pub fn schedule(&self, id: ScheduleId) -> Result<Schedule> {
        self.read(|txn| require(&txn.open_table(SCHEDULES)?, id.as_bytes(), "schedule"))
    }

    /// Delete a schedule and cancel its sessions from today on.
    /// Returns how many sessions were canceled.
    pub fn delete_schedule(&self, id: ScheduleId) -> Result<usize> {
        let today = self.clock.today();
        let stamp = self.clock.now_utc();
        self.write(|txn| {
            let mut schedules = txn.open_table(SCHEDULES)?;
            if schedules.remove(id.as_bytes().as_slice())?.is_none() {
                return Err(Error::NotFound("schedule"));
            }
            let mut sessions = txn.open_table(SESSIONS)?;
            let upcoming: Vec<Session> = scan::<Session>(&sessions)?
                .into_iter()
                .filter(|s| s.schedule_id == Some(id) && s.date >= today && !s.is_canceled)
                .collect();
            for mut session in upcoming.iter().cloned() {
                session.is_canceled = true;
                session.updated_at = stamp;
                save(&mut sessions, session.id.as_bytes(), &session)?;
            }
            Ok(upcoming.len())
        })
    }

    pub fn schedules_for_trainer(&self, id: UserId) -> Result<Vec<Schedule>> {
        self.filter_schedules(|s| s.trainer_id == id)
    }

    pub fn schedules_for_facility(&self, id: FacilityId) -> Result<Vec<Schedule>> {
        self.filter_schedules(|s| s.facility_id == id)
    }

    fn filter_schedules(&self, keep: impl Fn(&Schedule) -> bool) -> Result<Vec<Schedule>> {
        let mut schedules: Vec<Schedule> = self
            .read(|txn| scan(&txn.open_table(SCHEDULES)?))?
            .into_iter()
            .filter(|s| keep(s))
            .collect();
        schedules.sort_by(Schedule::by_weekday);
        Ok(schedules)
    }

    /// Roll every active schedule forward `weeks` occurrences from today,
    /// skipping dates that already have a session from that schedule.
    /// Returns the number of sessions created.
    pub fn generate_sessions(&self, weeks: usize) -> Result<usize> {
        if !(1..=MAX_GENERATE_WEEKS).contains(&weeks) {
            return Err(Error::validation(format!(
                "weeks must be between 1 and {MAX_GENERATE_WEEKS}"
            )));
        }
        let today = self.clock.today();
        let stamp = self.clock.now_utc();
        self.write(|txn| {
            let schedules: Vec<Schedule> = scan(&txn.open_table(SCHEDULES)?)?;
            let mut sessions = txn.open_table(SESSIONS)?;
            let existing: BTreeSet<(ScheduleId, NaiveDate)> = scan::<Session>(&sessions)?
                .into_iter()
                .filter_map(|s| s.schedule_id.map(|id| (id, s.date)))
                .collect();
            let mut created = 0;
            for schedule in schedules.iter().filter(|s| s.is_active) {
                for date in next_weekdays(schedule.weekday, today, weeks) {
                    if existing.contains(&(schedule.id, date)) {
                        continue;
                    }
                    let session = schedule.session_on(date, stamp);
                    save(&mut sessions, session.id.as_bytes(), &session)?;
                    created += 1;
                }
            }
            Ok(created)
        })
    }

    // -------------------------------------------------------------------------
    // Sessions
    // -------------------------------------------------------------------------

    /// One-off session led by `trainer_id`.
    pub fn create_session(&self, draft: SessionDraft, trainer_id: UserId) -> Result<Session> {
        let session = draft.into_session(trainer_id, self.clock.now_utc())?;
        self.write(|txn| {
            let _: Facility = require(
                &txn.open_table(FACILITIES)?,
                session.facility_id.as_bytes(),
                "facility",
            )?;
            let _: User = require(&txn.open_table(USERS)?, trainer_id.as_bytes(), "user")?;
            let mut sessions = txn.open_table(SESSIONS)?;
            save(&mut sessions, session.id.as_bytes(), &session)
        })?;
        Ok(session)
    }

    pub fn session(&self, id: SessionId) -> Result<Session> {
        self.read(|txn| require(&txn.open_table(SESSIONS)?, id.as_bytes(), "session"))
    }

    /// Remove a session and its registrations.
    pub fn delete_session(&self, id: SessionId) -> Result<()> {
        self.write(|txn| {
            let mut sessions = txn.open_table(SESSIONS)?;
            if sessions.remove(id.as_bytes().as_slice())?.is_none() {
                return Err(Error::NotFound("session"));
            }
            let mut registrations = txn.open_table(REGISTRATIONS)?;
            let doomed: Vec<RegistrationId> = scan::<Registration>(&registrations)?
                .into_iter()
                .filter(|r| r.session_id == id)
                .map(|r| r.id)
                .collect();
            for reg in doomed {
                registrations.remove(reg.as_bytes().as_slice())?;
            }
            Ok(())
        })
    }

    pub fn cancel_session(&self, id: SessionId) -> Result<Session> {
        let stamp = self.clock.now_utc();
        self.write(|txn| {
            let mut sessions = txn.open_table(SESSIONS)?;
            let mut session: Session = require(&sessions, id.as_bytes(), "session")?;
            if session.is_canceled {
                return Err(Error::conflict("session is already canceled"));
            }
            session.is_canceled = true;
            session.updated_at = stamp;
            save(&mut sessions, id.as_bytes(), &session)?;
            Ok(session)
        })
    }

    pub fn sessions_for_facility(
        &self,
        id: FacilityId,
        date: Option<NaiveDate>,
    ) -> Result<Vec<SessionWithCount>> {
        self.filter_sessions(|s| s.facility_id == id && date.is_none_or(|d| s.date == d))
    }

    pub fn sessions_for_trainer(
        &self,
        id: UserId,
        date: Option<NaiveDate>,
    ) -> Result<Vec<SessionWithCount>> {
        self.filter_sessions(|s| s.trainer_id == id && date.is_none_or(|d| s.date == d))
    }

    /// Sessions by date and start time, with their active registration count.
    fn filter_sessions(&self, keep: impl Fn(&Session) -> bool) -> Result<Vec<SessionWithCount>> {
        let (sessions, registrations) = self.read(|txn| {
            let sessions: Vec<Session> = scan(&txn.open_table(SESSIONS)?)?;
            let registrations: Vec<Registration> = scan(&txn.open_table(REGISTRATIONS)?)?;
            Ok((sessions, registrations))
        })?;
        let mut counts: BTreeMap<SessionId, usize> = BTreeMap::new();
        for reg in registrations.iter().filter(|r| r.is_active()) {
            *counts.entry(reg.session_id).or_default() += 1;
        }
        let mut out: Vec<SessionWithCount> = sessions
            .into_iter()
            .filter(|s| keep(s))
            .map(|s| {
                let count = counts.get(&s.id).copied().unwrap_or(0);
                (s, count)
            })
            .collect();
        out.sort_by(|(a, _), (b, _)| a.date.cmp(&b.date).then_with(|| a.start_time.cmp(&b.start_time)));
        Ok(out)
    }

    // -------------------------------------------------------------------------
    // Registrations
    // -------------------------------------------------------------------------

    /// Take a seat in `session_id` for `user_id`.
    pub fn register(&self, session_id: SessionId, user_id: UserId) -> Result<Registration> {
        let now = self.clock.now();
        let stamp = self.clock.now_utc();
        self.write(|txn| {
            let session: Session =
                require(&txn.open_table(SESSIONS)?, session_id.as_bytes(), "session")?;
            let mut registrations = txn.open_table(REGISTRATIONS)?;
            let existing: Vec<Registration> = scan::<Registration>(&registrations)?
                .into_iter()
                .filter(|r| r.session_id == session_id)
                .collect();
            let registration = Registration::admit(&session, &existing, user_id, now, stamp)?;
            save(&mut registrations, registration.id.as_bytes(), &registration)?;
            Ok(registration)
        })
    }

    pub fn registration(&self, id: RegistrationId) -> Result<Registration> {
        self.read(|txn| {
            require(&txn.open_table(REGISTRATIONS)?, id.as_bytes(), "registration")
        })
    }

    pub fn cancel_registration(&self, id: RegistrationId) -> Result<Registration> {
        let stamp = self.clock.now_utc();
        self.write(|txn| {
            let mut registrations = txn.open_table(REGISTRATIONS)?;
            let mut registration: Registration =
                require(&registrations, id.as_bytes(), "registration")?;
            registration.cancel(stamp)?;
            save(&mut registrations, id.as_bytes(), &registration)?;
            Ok(registration)
        })
    }

    /// Active registrations of a session, oldest first, with the registrant.
    pub fn registrations_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<(Registration, User)>> {
        self.read(|txn| {
            let _: Session = require(&txn.open_table(SESSIONS)?, session_id.as_bytes(), "session")?;
            let users = txn.open_table(USERS)?;
            let mut regs: Vec<Registration> = scan::<Registration>(&txn.open_table(REGISTRATIONS)?)?
                .into_iter()
                .filter(|r| r.session_id == session_id && r.is_active())
                .collect();
            regs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            let mut out = Vec::with_capacity(regs.len());
            for reg in regs {
                let user: User = require(&users, reg.user_id.as_bytes(), "user")?;
                out.push((reg, user));
            }
            Ok(out)
        })
    }

    /// A user's registrations, newest first, with their sessions.
    pub fn registrations_for_user(
        &self,
        user_id: UserId,
        offset: usize,
    ) -> Result<Page<(Registration, Session)>> {
        self.read(|txn| {
            let sessions = txn.open_table(SESSIONS)?;
            let mut regs: Vec<Registration> = scan::<Registration>(&txn.open_table(REGISTRATIONS)?)?
                .into_iter()
                .filter(|r| r.user_id == user_id)
                .collect();
            regs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            let page = Page::slice(regs, offset, page_size::REGISTRATIONS);
            let mut items = Vec::with_capacity(page.items.len());
            for reg in page.items {
                let session: Session = require(&sessions, reg.session_id.as_bytes(), "session")?;
                items.push((reg, session));
            }
            Ok(Page {
                items,
                offset: page.offset,
                total: page.total,
            })
        })
    }
}
