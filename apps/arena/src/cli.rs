//! # CLI Commands
//!
//! Operator commands run by the `arena` binary. Each opens the database
//! itself, so they are usable from tests without the argument parser.

use crate::api;
use crate::api::auth::hash_password;
use crate::config::{ConfigError, ServerConfig};
use arena_core::{Error as CoreError, NewUser, Role, Store, StoreCounts, UserId};
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("database already exists at {0} (use --force to overwrite)")]
    AlreadyExists(String),

    #[error("cannot remove old database: {0}")]
    Remove(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] CoreError),

    #[error("server error: {0}")]
    Server(String),
}

// =============================================================================
// INIT
// =============================================================================

/// Create an empty database at `db`.
pub fn cmd_init(db: &Path, force: bool) -> Result<(), CliError> {
    if db.exists() {
        if !force {
            return Err(CliError::AlreadyExists(db.display().to_string()));
        }
        std::fs::remove_file(db)?;
    }
    Store::open(db)?;
    info!(db = %db.display(), "database initialized");
    Ok(())
}

// =============================================================================
// ACCOUNTS
// =============================================================================

/// Bootstrap an administrator account.
pub fn cmd_create_admin(
    db: &Path,
    email: &str,
    first_name: &str,
    last_name: &str,
    password: &str,
) -> Result<UserId, CliError> {
    let store = Store::open_existing(db)?;
    let new = NewUser {
        email: email.to_string(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        password: password.to_string(),
        phone: None,
        role: Some(Role::Admin),
    };
    new.validate(true)?;
    let hash = hash_password(&new.password)?;
    let user = store.create_user(new, hash)?;
    info!(user = %user.id, email = %user.email, "admin created");
    Ok(user.id)
}

// =============================================================================
// STATUS & MAINTENANCE
// =============================================================================

pub fn cmd_status(db: &Path) -> Result<StoreCounts, CliError> {
    Ok(Store::open_existing(db)?.counts()?)
}

/// Roll every active schedule forward by `weeks` occurrences.
pub fn cmd_generate_sessions(db: &Path, weeks: usize) -> Result<usize, CliError> {
    let store = Store::open_existing(db)?;
    let created = store.generate_sessions(weeks)?;
    info!(created, weeks, "sessions generated");
    Ok(created)
}

// =============================================================================
// SERVER
// =============================================================================

/// Open (or create) the database and serve until shutdown.
pub async fn cmd_serve(config: ServerConfig) -> Result<(), CliError> {
    let store = Store::open(&config.db)?;
    api::serve(store, config)
        .await
        .map_err(|e| CliError::Server(e.to_string()))
}
