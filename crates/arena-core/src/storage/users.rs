//! User accounts and trainer profiles.

use super::{
    EMAILS, SCHEDULES, Store, TRAINERS, USERS, load, require, save, scan,
};
use crate::error::{Error, Result};
use crate::primitives::{Page, UserId, page_size};
use crate::schedule::Schedule;
use crate::trainer::{TrainerPatch, TrainerProfile};
use crate::user::{NewUser, Role, User, UserPatch, normalize_email};
use redb::ReadableTable;

impl Store {
    // -------------------------------------------------------------------------
    // Users
    // -------------------------------------------------------------------------

    /// Insert a new account. The email must not be taken.
    pub fn create_user(&self, new: NewUser, password_hash: String) -> Result<User> {
        let user = new.into_user(password_hash, self.clock.now_utc())?;
        self.write(|txn| {
            let mut emails = txn.open_table(EMAILS)?;
            if emails.get(user.email.as_str())?.is_some() {
                return Err(Error::conflict("email is already registered"));
            }
            emails.insert(user.email.as_str(), user.id.as_bytes().as_slice())?;
            let mut users = txn.open_table(USERS)?;
            save(&mut users, user.id.as_bytes(), &user)?;
            Ok(())
        })?;
        Ok(user)
    }

    pub fn user(&self, id: UserId) -> Result<User> {
        self.read(|txn| require(&txn.open_table(USERS)?, id.as_bytes(), "user"))
    }

    /// Look up by email, case-insensitively.
    pub fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        let Ok(email) = normalize_email(email) else {
            return Ok(None);
        };
        self.read(|txn| {
            let emails = txn.open_table(EMAILS)?;
            let Some(id) = emails.get(email.as_str())? else {
                return Ok(None);
            };
            let key = id.value().to_vec();
            load(&txn.open_table(USERS)?, &key)
        })
    }

    /// Admin listing: newest first, optionally filtered by a
    /// case-insensitive match on email or first name.
    pub fn list_users(&self, query: Option<&str>, offset: usize) -> Result<Page<User>> {
        let needle = query
            .map(|q| q.trim().to_lowercase())
            .filter(|q| !q.is_empty());
        let mut users: Vec<User> = self.read(|txn| scan(&txn.open_table(USERS)?))?;
        if let Some(needle) = needle {
            users.retain(|u| {
                u.email.contains(&needle) || u.first_name.to_lowercase().contains(&needle)
            });
        }
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(Page::slice(users, offset, page_size::USERS))
    }

    /// Apply `patch` on behalf of `actor`, who may not deactivate
    /// themselves or change their own role.
    pub fn update_user(&self, id: UserId, actor: UserId, patch: UserPatch) -> Result<User> {
        let now = self.clock.now_utc();
        self.write(|txn| {
            let mut users = txn.open_table(USERS)?;
            let mut user: User = require(&users, id.as_bytes(), "user")?;
            if id == actor && patch.locks_out(&user) {
                return Err(Error::conflict(
                    "you cannot deactivate your own account or change your own role",
                ));
            }
            patch.apply(&mut user, now)?;
            save(&mut users, id.as_bytes(), &user)?;
            Ok(user)
        })
    }

    /// Deactivate an account. `actor` may not deactivate themselves.
    pub fn deactivate_user(&self, id: UserId, actor: UserId) -> Result<User> {
        if id == actor {
            return Err(Error::conflict("you cannot delete your own account"));
        }
        let now = self.clock.now_utc();
        self.write(|txn| {
            let mut users = txn.open_table(USERS)?;
            let mut user: User = require(&users, id.as_bytes(), "user")?;
            user.is_active = false;
            user.updated_at = now;
            save(&mut users, id.as_bytes(), &user)?;
            Ok(user)
        })
    }

    // -------------------------------------------------------------------------
    // Trainers
    // -------------------------------------------------------------------------

    /// Make `user_id` a trainer with an empty profile.
    pub fn promote_trainer(&self, user_id: UserId) -> Result<TrainerProfile> {
        let now = self.clock.now_utc();
        self.write(|txn| {
            let mut users = txn.open_table(USERS)?;
            let mut user: User = require(&users, user_id.as_bytes(), "user")?;
            if user.role == Role::Trainer {
                return Err(Error::conflict("user is already a trainer"));
            }
            let mut trainers = txn.open_table(TRAINERS)?;
            let profile = TrainerProfile::new(user_id, user.role, now);
            user.role = Role::Trainer;
            user.updated_at = now;
            save(&mut users, user_id.as_bytes(), &user)?;
            save(&mut trainers, user_id.as_bytes(), &profile)?;
            Ok(profile)
        })
    }

    /// A profile together with its account.
    pub fn trainer(&self, id: UserId) -> Result<(TrainerProfile, User)> {
        self.read(|txn| {
            let profile = require(&txn.open_table(TRAINERS)?, id.as_bytes(), "trainer")?;
            let user = require(&txn.open_table(USERS)?, id.as_bytes(), "user")?;
            Ok((profile, user))
        })
    }

    /// Newest trainers first.
    pub fn list_trainers(&self, offset: usize) -> Result<Page<(TrainerProfile, User)>> {
        self.read(|txn| {
            let users = txn.open_table(USERS)?;
            let mut profiles: Vec<TrainerProfile> = scan(&txn.open_table(TRAINERS)?)?;
            profiles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            let page = Page::slice(profiles, offset, page_size::TRAINERS);
            let mut items = Vec::with_capacity(page.items.len());
            for profile in page.items {
                let user: User = require(&users, profile.id.as_bytes(), "user")?;
                items.push((profile, user));
            }
            Ok(Page {
                items,
                offset: page.offset,
                total: page.total,
            })
        })
    }

    pub fn update_trainer(&self, id: UserId, patch: TrainerPatch) -> Result<TrainerProfile> {
        let now = self.clock.now_utc();
        self.write(|txn| {
            let mut trainers = txn.open_table(TRAINERS)?;
            let mut profile: TrainerProfile = require(&trainers, id.as_bytes(), "trainer")?;
            patch.apply(&mut profile, now)?;
            save(&mut trainers, id.as_bytes(), &profile)?;
            Ok(profile)
        })
    }

    /// Remove the profile, restore the previous role, and deactivate the
    /// trainer's schedules.
    pub fn demote_trainer(&self, id: UserId) -> Result<User> {
        let now = self.clock.now_utc();
        self.write(|txn| {
            let mut trainers = txn.open_table(TRAINERS)?;
            let profile: TrainerProfile = require(&trainers, id.as_bytes(), "trainer")?;
            trainers.remove(id.as_bytes().as_slice())?;

            let mut users = txn.open_table(USERS)?;
            let mut user: User = require(&users, id.as_bytes(), "user")?;
            user.role = profile.previous_role;
            user.updated_at = now;
            save(&mut users, id.as_bytes(), &user)?;

            let mut schedules = txn.open_table(SCHEDULES)?;
            let owned: Vec<Schedule> = scan::<Schedule>(&schedules)?
                .into_iter()
                .filter(|s| s.trainer_id == id && s.is_active)
                .collect();
            for mut schedule in owned {
                schedule.is_active = false;
                schedule.updated_at = now;
                save(&mut schedules, schedule.id.as_bytes(), &schedule)?;
            }
            Ok(user)
        })
    }
}
