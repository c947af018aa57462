//! # Facility Module
//!
//! Bookable sport facilities and their validation rules.

use crate::clock::{ClockTime, TimeRange};
use crate::error::{Error, Result};
use crate::primitives::FacilityId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A bookable facility (court, gym, pool, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facility {
    pub id: FacilityId,
    pub name: String,
    /// Free-form category, exposed as `type` over the API.
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub capacity: u32,
    pub open_time: ClockTime,
    pub close_time: ClockTime,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Facility {
    /// Opening hours as a range.
    #[must_use]
    pub fn hours(&self) -> TimeRange {
        TimeRange {
            start: self.open_time,
            end: self.close_time,
        }
    }

    /// Check every field invariant.
    pub fn validate(&self) -> Result<()> {
        let name_len = self.name.trim().chars().count();
        if !(2..=100).contains(&name_len) {
            return Err(Error::validation("name must be 2-100 characters"));
        }
        if self.kind.trim().is_empty() {
            return Err(Error::validation("type is required"));
        }
        if self.description.trim().chars().count() < 5 {
            return Err(Error::validation(
                "description must be at least 5 characters",
            ));
        }
        if self.capacity < 1 {
            return Err(Error::validation("capacity must be at least 1"));
        }
        if self.open_time >= self.close_time {
            return Err(Error::validation("open time must be before close time"));
        }
        if let Some(url) = &self.image_url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            return Err(Error::validation("image url must start with http:// or https://"));
        }
        Ok(())
    }
}

/// Input for creating a facility.
#[derive(Debug, Clone, Deserialize)]
pub struct FacilityDraft {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub capacity: u32,
    pub open_time: String,
    pub close_time: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl FacilityDraft {
    /// Validate and turn into a new active facility.
    pub fn into_facility(self, now: DateTime<Utc>) -> Result<Facility> {
        let facility = Facility {
            id: FacilityId::new(),
            name: self.name.trim().to_string(),
            kind: self.kind.trim().to_string(),
            description: self.description.trim().to_string(),
            capacity: self.capacity,
            open_time: self.open_time.parse()?,
            close_time: self.close_time.parse()?,
            image_url: normalize_url(self.image_url),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        facility.validate()?;
        Ok(facility)
    }
}

/// Partial update; absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FacilityPatch {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub description: Option<String>,
    pub capacity: Option<u32>,
    pub open_time: Option<String>,
    pub close_time: Option<String>,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
}

impl FacilityPatch {
    /// Apply onto `facility`; the result is revalidated as a whole.
    pub fn apply(self, facility: &mut Facility, now: DateTime<Utc>) -> Result<()> {
        let mut next = facility.clone();
        if let Some(name) = self.name {
            next.name = name.trim().to_string();
        }
        if let Some(kind) = self.kind {
            next.kind = kind.trim().to_string();
        }
        if let Some(description) = self.description {
            next.description = description.trim().to_string();
        }
        if let Some(capacity) = self.capacity {
            next.capacity = capacity;
        }
        if let Some(open) = self.open_time {
            next.open_time = open.parse()?;
        }
        if let Some(close) = self.close_time {
            next.close_time = close.parse()?;
        }
        if self.image_url.is_some() {
            next.image_url = normalize_url(self.image_url);
        }
        if let Some(active) = self.is_active {
            next.is_active = active;
        }
        next.validate()?;
        next.updated_at = now;
        *facility = next;
        Ok(())
    }
}

// An empty string clears the image.
fn normalize_url(url: Option<String>) -> Option<String> {
    url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty())
}
