//! # User Module
//!
//! Accounts, roles, and the validation applied on sign-up and update.
//!
//! Password hashing lives in the server; the core only ever sees the
//! finished PHC string.

use crate::error::{Error, Result};
use crate::primitives::{DEFAULT_CREDIT_SCORE, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Staff,
    Admin,
    Trainer,
}

impl Role {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Staff => "staff",
            Self::Admin => "admin",
            Self::Trainer => "trainer",
        }
    }

    /// Roles anyone may pick for themselves when signing up.
    #[must_use]
    pub fn is_self_assignable(&self) -> bool {
        matches!(self, Self::Student | Self::Staff)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Self::Student),
            "staff" => Ok(Self::Staff),
            "admin" => Ok(Self::Admin),
            "trainer" => Ok(Self::Trainer),
            other => Err(Error::validation(format!("unknown role '{other}'"))),
        }
    }
}

/// A user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Lower-cased; unique across the store.
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub role: Role,
    pub phone: Option<String>,
    pub credit_score: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    #[must_use]
    pub fn is_trainer(&self) -> bool {
        self.role == Role::Trainer
    }
}

// =============================================================================
// VALIDATION
// =============================================================================

/// Lower-case and check an email address.
pub fn normalize_email(raw: &str) -> Result<String> {
    let email = raw.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(Error::validation("invalid email address"));
    }
    Ok(email)
}

fn check_name(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    let len = value.chars().count();
    if !(2..=50).contains(&len) {
        return Err(Error::validation(format!("{field} must be 2-50 characters")));
    }
    Ok(value.to_string())
}

/// Password length rule; hashing happens elsewhere.
pub fn check_password(password: &str) -> Result<()> {
    let len = password.chars().count();
    if !(6..=100).contains(&len) {
        return Err(Error::validation("password must be 6-100 characters"));
    }
    Ok(())
}

fn normalize_phone(phone: Option<String>) -> Option<String> {
    phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty())
}

// =============================================================================
// INPUTS
// =============================================================================

/// Sign-up input.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

impl NewUser {
    /// Validate every field. `allow_any_role` is set only for the CLI
    /// bootstrap path; the public sign-up accepts student and staff.
    pub fn validate(&self, allow_any_role: bool) -> Result<()> {
        normalize_email(&self.email)?;
        check_name("first name", &self.first_name)?;
        check_name("last name", &self.last_name)?;
        check_password(&self.password)?;
        let role = self.role.unwrap_or(Role::Student);
        if !allow_any_role && !role.is_self_assignable() {
            return Err(Error::validation("role must be student or staff"));
        }
        Ok(())
    }

    /// Build the account record around an already computed hash.
    pub fn into_user(self, password_hash: String, now: DateTime<Utc>) -> Result<User> {
        Ok(User {
            id: UserId::new(),
            email: normalize_email(&self.email)?,
            first_name: check_name("first name", &self.first_name)?,
            last_name: check_name("last name", &self.last_name)?,
            password_hash,
            role: self.role.unwrap_or(Role::Student),
            phone: normalize_phone(self.phone),
            credit_score: DEFAULT_CREDIT_SCORE,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Profile update. Names and phone are self-service; the rest is admin only.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub credit_score: Option<i32>,
}

impl UserPatch {
    /// True when the patch changes a field only admins may touch.
    #[must_use]
    pub fn touches_admin_fields(&self) -> bool {
        self.role.is_some() || self.is_active.is_some() || self.credit_score.is_some()
    }

    /// True when applying the patch would deactivate `user` or change
    /// their role.
    #[must_use]
    pub fn locks_out(&self, user: &User) -> bool {
        self.is_active == Some(false) || self.role.is_some_and(|role| role != user.role)
    }

    /// Apply onto `user`. Role changes to or from trainer go through the
    /// trainer endpoints, which keep the profile in step.
    pub fn apply(self, user: &mut User, now: DateTime<Utc>) -> Result<()> {
        let mut next = user.clone();
        if let Some(first) = self.first_name {
            next.first_name = check_name("first name", &first)?;
        }
        if let Some(last) = self.last_name {
            next.last_name = check_name("last name", &last)?;
        }
        if self.phone.is_some() {
            next.phone = normalize_phone(self.phone);
        }
        if let Some(role) = self.role
            && role != user.role
        {
            if role == Role::Trainer || user.role == Role::Trainer {
                return Err(Error::conflict(
                    "trainer role is managed through the trainer endpoints",
                ));
            }
            next.role = role;
        }
        if let Some(active) = self.is_active {
            next.is_active = active;
        }
        if let Some(score) = self.credit_score {
            next.credit_score = score;
        }
        next.updated_at = now;
        *user = next;
        Ok(())
    }
}
