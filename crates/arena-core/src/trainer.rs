//! # Trainer Module
//!
//! Trainer profiles. A profile exists exactly while its user holds the
//! trainer role; the store creates and removes both together.

use crate::error::{Error, Result};
use crate::primitives::UserId;
use crate::user::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Public profile of a trainer. Keyed by the trainer's user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainerProfile {
    pub id: UserId,
    pub bio: String,
    pub specialty: String,
    /// Role to restore on demotion.
    pub previous_role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrainerProfile {
    /// Empty profile for a freshly promoted user.
    #[must_use]
    pub fn new(id: UserId, previous_role: Role, now: DateTime<Utc>) -> Self {
        Self {
            id,
            bio: String::new(),
            specialty: String::new(),
            previous_role,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Profile update; both fields are required.
#[derive(Debug, Clone, Deserialize)]
pub struct TrainerPatch {
    pub bio: String,
    pub specialty: String,
}

impl TrainerPatch {
    pub fn apply(self, profile: &mut TrainerProfile, now: DateTime<Utc>) -> Result<()> {
        let bio = self.bio.trim();
        let specialty = self.specialty.trim();
        if bio.is_empty() {
            return Err(Error::validation("bio is required"));
        }
        if specialty.is_empty() {
            return Err(Error::validation("specialty is required"));
        }
        profile.bio = bio.to_string();
        profile.specialty = specialty.to_string();
        profile.updated_at = now;
        Ok(())
    }
}
