//! # Error Module
//!
//! The single error type returned by every fallible operation in the core.
//!
//! Variants are coarse on purpose: the HTTP layer maps each one to a
//! status code, and the message is what the client sees.

use thiserror::Error;

/// Errors from domain validation, rule checks, and storage.
#[derive(Debug, Error)]
pub enum Error {
    /// Input failed validation (bad format, out of range, missing field).
    #[error("{0}")]
    Validation(String),

    /// A referenced record does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The request is well-formed but breaks a business rule.
    #[error("{0}")]
    Conflict(String),

    /// The embedded database failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// A stored record could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),
}

/// Result alias used throughout the core.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Shorthand for a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Shorthand for a rule violation.
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}

// redb splits its errors by phase; they all collapse into Storage here.
macro_rules! storage_error_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Error {
                fn from(err: $ty) -> Self {
                    Self::Storage(err.to_string())
                }
            }
        )*
    };
}

storage_error_from!(
    redb::Error,
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

impl From<postcard::Error> for Error {
    fn from(err: postcard::Error) -> Self {
        Self::Codec(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_the_record() {
        assert_eq!(Error::NotFound("facility").to_string(), "facility not found");
    }

    #[test]
    fn validation_message_is_passed_through() {
        let err = Error::validation("capacity must be at least 1");
        assert_eq!(err.to_string(), "capacity must be at least 1");
    }
}
