//! # Review Module
//!
//! Facility reviews and the rating summary.
//!
//! The average is computed in integer hundredths and only turned into a
//! JSON number at the edge, so no float arithmetic is involved.

use crate::error::{Error, Result};
use crate::primitives::{FacilityId, ReviewId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A rating (1-5) with a short comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub facility_id: FacilityId,
    pub user_id: UserId,
    pub rating: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Review input.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewDraft {
    pub rating: u8,
    pub comment: String,
}

impl ReviewDraft {
    pub fn into_review(
        self,
        facility_id: FacilityId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Review> {
        if !(1..=5).contains(&self.rating) {
            return Err(Error::validation("rating must be between 1 and 5"));
        }
        let comment = self.comment.trim().to_string();
        if comment.chars().count() < 3 {
            return Err(Error::validation("comment must be at least 3 characters"));
        }
        Ok(Review {
            id: ReviewId::new(),
            facility_id,
            user_id,
            rating: self.rating,
            comment,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Average rating of one facility.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingSummary {
    pub facility_id: FacilityId,
    /// Rounded to two decimals; `None` without reviews.
    pub average_rating: Option<f64>,
    pub review_count: usize,
}

impl RatingSummary {
    pub fn from_ratings(facility_id: FacilityId, ratings: impl IntoIterator<Item = u8>) -> Self {
        let (sum, count) = ratings
            .into_iter()
            .fold((0u64, 0u64), |(s, c), r| (s + u64::from(r), c + 1));
        let average_rating = average_hundredths(sum, count)
            .map(format_hundredths)
            .and_then(|text| text.parse().ok());
        Self {
            facility_id,
            average_rating,
            review_count: count as usize,
        }
    }
}

/// `sum / count` in hundredths, rounded half up.
#[must_use]
pub fn average_hundredths(sum: u64, count: u64) -> Option<u64> {
    if count == 0 {
        return None;
    }
    Some((sum * 200 + count) / (count * 2))
}

/// `433` -> `"4.33"`.
#[must_use]
pub fn format_hundredths(value: u64) -> String {
    format!("{}.{:02}", value / 100, value % 100)
}
