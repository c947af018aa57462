//! # Arena Core
//!
//! The domain engine behind the Arena campus booking service.
//!
//! This crate knows nothing about HTTP or async runtimes. It provides:
//! - Strongly typed identifiers and domain records
//! - Input validation for every record the API accepts
//! - The booking, registration and penalty rules
//! - The hourly time-slot availability grid
//! - A `redb`-backed [`Store`] that runs each multi-step rule inside a
//!   single write transaction
//!
//! ## Layout
//!
//! ```text
//! primitives  ids, limits, paging
//! clock       HH:MM times, date parsing, injectable clock, half-open ranges
//! slots       availability grid + 1-2 hour slot selection
//! user … penalty   records and validation, one module per resource
//! storage     redb tables and transactional operations
//! ```

pub mod booking;
pub mod clock;
pub mod error;
pub mod facility;
pub mod penalty;
pub mod primitives;
pub mod registration;
pub mod review;
pub mod schedule;
pub mod session;
pub mod slots;
pub mod storage;
pub mod trainer;
pub mod user;

pub use booking::{Booking, BookingDraft};
pub use clock::{Clock, ClockTime, FixedClock, SystemClock, TimeRange};
pub use error::{Error, Result};
pub use facility::{Facility, FacilityDraft, FacilityPatch};
pub use penalty::{Penalty, PenaltyDraft, PenaltyType};
pub use primitives::{
    BookingId, FacilityId, Page, PenaltyId, RegistrationId, ReviewId, ScheduleId, SessionId,
    UserId,
};
pub use registration::Registration;
pub use review::{RatingSummary, Review, ReviewDraft};
pub use schedule::{Schedule, ScheduleDraft};
pub use session::{Session, SessionDraft};
pub use slots::{DayGrid, Slot, SlotSelection, SlotStatus};
pub use storage::{PenaltyView, SessionWithCount, Store, StoreCounts};
pub use trainer::{TrainerPatch, TrainerProfile};
pub use user::{NewUser, Role, User, UserPatch};
