//! # Primitives Module
//!
//! Identifier newtypes, service-wide limits, and offset paging.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// =============================================================================
// LIMITS
// =============================================================================

/// Credit score assigned to every new account.
pub const DEFAULT_CREDIT_SCORE: i32 = 100;

/// Largest deduction a single penalty may carry.
pub const MAX_PENALTY_POINTS: u32 = 100;

/// How many upcoming active bookings one user may hold.
pub const MAX_UPCOMING_BOOKINGS: usize = 3;

/// Longest booking, in whole hours.
pub const MAX_BOOKING_HOURS: u32 = 2;

/// How many future occurrences a new schedule generates right away.
pub const SCHEDULE_LOOKAHEAD: usize = 2;

/// Furthest ahead, in weeks, a session roll-forward may reach.
pub const MAX_GENERATE_WEEKS: usize = 52;

/// Longest window the slot grid endpoint will build.
pub const MAX_GRID_DAYS: u32 = 14;

/// Page sizes per listing.
pub mod page_size {
    pub const USERS: usize = 20;
    pub const BOOKINGS: usize = 20;
    pub const REVIEWS: usize = 10;
    pub const TRAINERS: usize = 10;
    pub const REGISTRATIONS: usize = 10;
}

// =============================================================================
// IDENTIFIERS
// =============================================================================

macro_rules! uuid_id {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(pub Uuid);

            impl $name {
                /// Generate a fresh random id.
                #[must_use]
                pub fn new() -> Self {
                    Self(Uuid::new_v4())
                }

                /// Raw bytes, used as the storage key.
                #[must_use]
                pub fn as_bytes(&self) -> &[u8; 16] {
                    self.0.as_bytes()
                }
            }

            impl Default for $name {
                fn default() -> Self {
                    Self::new()
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    self.0.fmt(f)
                }
            }

            impl FromStr for $name {
                type Err = uuid::Error;

                fn from_str(s: &str) -> Result<Self, Self::Err> {
                    Uuid::parse_str(s).map(Self)
                }
            }
        )*
    };
}

uuid_id!(
    /// Identifies a user account.
    UserId,
    /// Identifies a facility.
    FacilityId,
    /// Identifies a booking.
    BookingId,
    /// Identifies a facility review.
    ReviewId,
    /// Identifies a weekly trainer schedule.
    ScheduleId,
    /// Identifies a training session.
    SessionId,
    /// Identifies a session registration.
    RegistrationId,
    /// Identifies a penalty.
    PenaltyId,
);

// =============================================================================
// PAGING
// =============================================================================

/// One page of an offset-paginated listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub offset: usize,
    pub total: usize,
}

impl<T> Page<T> {
    /// Cut a page out of an already ordered list.
    pub fn slice(all: Vec<T>, offset: usize, size: usize) -> Self {
        let total = all.len();
        let items = all.into_iter().skip(offset).take(size).collect();
        Self {
            items,
            offset,
            total,
        }
    }

    /// Transform every item, keeping the paging metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            offset: self.offset,
            total: self.total,
        }
    }
}
