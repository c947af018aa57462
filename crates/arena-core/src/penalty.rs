//! # Penalty Module
//!
//! Credit-score deductions issued by admins and trainers. The store
//! applies and reverts the deduction in the same transaction as the
//! penalty record itself.

use crate::error::{Error, Result};
use crate::primitives::{BookingId, MAX_PENALTY_POINTS, PenaltyId, SessionId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PenaltyType {
    Late,
    Absence,
    Damage,
    Behavior,
    Other,
}

impl PenaltyType {
    pub const ALL: [PenaltyType; 5] = [
        Self::Late,
        Self::Absence,
        Self::Damage,
        Self::Behavior,
        Self::Other,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Late => "late",
            Self::Absence => "absence",
            Self::Damage => "damage",
            Self::Behavior => "behavior",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for PenaltyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PenaltyType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| {
                Error::validation("penalty type must be one of late, absence, damage, behavior, other")
            })
    }
}

/// A recorded deduction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Penalty {
    pub id: PenaltyId,
    pub user_id: UserId,
    pub given_by_id: UserId,
    pub session_id: Option<SessionId>,
    pub booking_id: Option<BookingId>,
    pub reason: String,
    pub points: u32,
    pub penalty_type: PenaltyType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Penalty {
    /// Points as a signed score delta.
    #[must_use]
    pub fn deduction(&self) -> i32 {
        i32::try_from(self.points).unwrap_or(i32::MAX)
    }
}

/// Penalty input. Loose types so bad values surface as validation errors.
#[derive(Debug, Clone, Deserialize)]
pub struct PenaltyDraft {
    pub user_id: UserId,
    #[serde(default)]
    pub session_id: Option<SessionId>,
    #[serde(default)]
    pub booking_id: Option<BookingId>,
    pub reason: String,
    pub points: i64,
    pub penalty_type: String,
}

impl PenaltyDraft {
    pub fn into_penalty(self, given_by_id: UserId, now: DateTime<Utc>) -> Result<Penalty> {
        let reason = self.reason.trim().to_string();
        if reason.is_empty() {
            return Err(Error::validation("reason is required"));
        }
        if self.points <= 0 {
            return Err(Error::validation("points must be greater than 0"));
        }
        let points = u32::try_from(self.points)
            .ok()
            .filter(|p| *p <= MAX_PENALTY_POINTS)
            .ok_or_else(|| {
                Error::validation(format!("points must be at most {MAX_PENALTY_POINTS}"))
            })?;
        Ok(Penalty {
            id: PenaltyId::new(),
            user_id: self.user_id,
            given_by_id,
            session_id: self.session_id,
            booking_id: self.booking_id,
            reason,
            points,
            penalty_type: self.penalty_type.parse()?,
            created_at: now,
            updated_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(points: i64, kind: &str) -> PenaltyDraft {
        PenaltyDraft {
            user_id: UserId::new(),
            session_id: None,
            booking_id: None,
            reason: "No-show".into(),
            points,
            penalty_type: kind.into(),
        }
    }

    #[test]
    fn draft_requires_positive_points() {
        assert!(draft(0, "late").into_penalty(UserId::new(), Utc::now()).is_err());
        assert!(draft(-3, "late").into_penalty(UserId::new(), Utc::now()).is_err());
        let p = draft(5, "Absence").into_penalty(UserId::new(), Utc::now()).unwrap();
        assert_eq!(p.deduction(), 5);
        assert_eq!(p.penalty_type, PenaltyType::Absence);
    }

    #[test]
    fn draft_caps_points() {
        let p = draft(i64::from(MAX_PENALTY_POINTS), "late")
            .into_penalty(UserId::new(), Utc::now())
            .unwrap();
        assert_eq!(p.points, MAX_PENALTY_POINTS);
        let over = i64::from(MAX_PENALTY_POINTS) + 1;
        assert!(draft(over, "late").into_penalty(UserId::new(), Utc::now()).is_err());
        assert!(draft(i64::from(i32::MAX), "late").into_penalty(UserId::new(), Utc::now()).is_err());
    }

    #[test]
    fn draft_rejects_unknown_type_and_blank_reason() {
        assert!(draft(5, "rude").into_penalty(UserId::new(), Utc::now()).is_err());
        let mut d = draft(5, "other");
        d.reason = "   ".into();
        assert!(d.into_penalty(UserId::new(), Utc::now()).is_err());
    }

    #[test]
    fn giver_is_recorded() {
        let giver = UserId::new();
        let p = draft(1, "damage").into_penalty(giver, Utc::now()).unwrap();
        assert_eq!(p.given_by_id, giver);
    }
}
