//! # Storage Module
//!
//! Persistent storage for every Arena record using redb.
//!
//! Uses redb embedded database for:
//! - ACID transactions
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! Records are postcard-encoded and keyed by their 16 uuid bytes. Every
//! operation that checks a rule and then writes does both inside one
//! write transaction; redb admits a single writer at a time, so those
//! operations are serialisable.

mod bookings;
mod facilities;
mod penalties;
mod training;
mod users;

pub use penalties::PenaltyView;
pub use training::SessionWithCount;

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use redb::backends::InMemoryBackend;
use redb::{
    Database, ReadTransaction, ReadableDatabase, ReadableTable, ReadableTableMetadata, Table,
    TableDefinition, WriteTransaction,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;

// =============================================================================
// TABLES
// =============================================================================

type RecordTable = TableDefinition<'static, &'static [u8], &'static [u8]>;

pub(crate) const USERS: RecordTable = TableDefinition::new("users");
/// Lower-cased email -> user id bytes.
pub(crate) const EMAILS: TableDefinition<&str, &[u8]> = TableDefinition::new("user_emails");
pub(crate) const FACILITIES: RecordTable = TableDefinition::new("facilities");
pub(crate) const BOOKINGS: RecordTable = TableDefinition::new("bookings");
pub(crate) const REVIEWS: RecordTable = TableDefinition::new("reviews");
pub(crate) const TRAINERS: RecordTable = TableDefinition::new("trainers");
pub(crate) const SCHEDULES: RecordTable = TableDefinition::new("schedules");
pub(crate) const SESSIONS: RecordTable = TableDefinition::new("sessions");
pub(crate) const REGISTRATIONS: RecordTable = TableDefinition::new("registrations");
pub(crate) const PENALTIES: RecordTable = TableDefinition::new("penalties");

const RECORD_TABLES: [RecordTable; 9] = [
    USERS,
    FACILITIES,
    BOOKINGS,
    REVIEWS,
    TRAINERS,
    SCHEDULES,
    SESSIONS,
    REGISTRATIONS,
    PENALTIES,
];

// =============================================================================
// STORE
// =============================================================================

/// Handle to the Arena database.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct Store {
    db: Database,
    clock: Arc<dyn Clock>,
}

/// Record counts, reported by `arena status`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreCounts {
    pub users: u64,
    pub facilities: u64,
    pub bookings: u64,
    pub reviews: u64,
    pub trainers: u64,
    pub schedules: u64,
    pub sessions: u64,
    pub registrations: u64,
    pub penalties: u64,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

impl Store {
    /// Open the database at `path`, creating it and its tables if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::create(path.as_ref())?;
        Self::from_database(db)
    }

    /// Open an existing database; fails if `path` does not exist.
    pub fn open_existing(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::Storage(format!(
                "database not found: {}",
                path.display()
            )));
        }
        let db = Database::open(path)?;
        Self::from_database(db)
    }

    /// A throwaway database held in memory.
    pub fn in_memory() -> Result<Self> {
        let db = Database::builder().create_with_backend(InMemoryBackend::new())?;
        Self::from_database(db)
    }

    /// Replace the clock, used by tests to freeze "now".
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    fn from_database(db: Database) -> Result<Self> {
        // Reading a table that was never created is an error in redb.
        let txn = db.begin_write()?;
        for def in RECORD_TABLES {
            txn.open_table(def)?;
        }
        txn.open_table(EMAILS)?;
        txn.commit()?;
        Ok(Self {
            db,
            clock: Arc::new(SystemClock),
        })
    }

    /// Record counts per table.
    pub fn counts(&self) -> Result<StoreCounts> {
        self.read(|txn| {
            let len = |def: RecordTable| -> Result<u64> { Ok(txn.open_table(def)?.len()?) };
            Ok(StoreCounts {
                users: len(USERS)?,
                facilities: len(FACILITIES)?,
                bookings: len(BOOKINGS)?,
                reviews: len(REVIEWS)?,
                trainers: len(TRAINERS)?,
                schedules: len(SCHEDULES)?,
                sessions: len(SESSIONS)?,
                registrations: len(REGISTRATIONS)?,
                penalties: len(PENALTIES)?,
            })
        })
    }

    // -------------------------------------------------------------------------
    // Transactions
    // -------------------------------------------------------------------------

    pub(crate) fn read<R>(&self, f: impl FnOnce(&ReadTransaction) -> Result<R>) -> Result<R> {
        let txn = self.db.begin_read()?;
        f(&txn)
    }

    /// Run `f` in a write transaction; commit on `Ok`, abort on `Err`.
    pub(crate) fn write<R>(&self, f: impl FnOnce(&WriteTransaction) -> Result<R>) -> Result<R> {
        let txn = self.db.begin_write()?;
        match f(&txn) {
            Ok(out) => {
                txn.commit()?;
                Ok(out)
            }
            Err(err) => {
                txn.abort()?;
                Err(err)
            }
        }
    }
}

// =============================================================================
// RECORD CODEC
// =============================================================================

pub(crate) fn load<T: DeserializeOwned>(
    table: &impl ReadableTable<&'static [u8], &'static [u8]>,
    key: &[u8],
) -> Result<Option<T>> {
    match table.get(key)? {
        Some(guard) => Ok(Some(postcard::from_bytes(guard.value())?)),
        None => Ok(None),
    }
}

/// Like [`load`] but a missing record is `NotFound(what)`.
pub(crate) fn require<T: DeserializeOwned>(
    table: &impl ReadableTable<&'static [u8], &'static [u8]>,
    key: &[u8],
    what: &'static str,
) -> Result<T> {
    load(table, key)?.ok_or(Error::NotFound(what))
}

pub(crate) fn save<T: Serialize>(
    table: &mut Table<'_, &'static [u8], &'static [u8]>,
    key: &[u8],
    value: &T,
) -> Result<()> {
    let bytes = postcard::to_allocvec(value)?;
    table.insert(key, bytes.as_slice())?;
    Ok(())
}

/// Decode every record in the table.
pub(crate) fn scan<T: DeserializeOwned>(
    table: &impl ReadableTable<&'static [u8], &'static [u8]>,
) -> Result<Vec<T>> {
    let mut out = Vec::new();
    for entry in table.iter()? {
        let (_, value) = entry?;
        out.push(postcard::from_bytes(value.value())?);
    }
    Ok(out)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::clock::FixedClock;
    use crate::facility::{Facility, FacilityDraft};
    use crate::user::{NewUser, Role, User};
    use chrono::NaiveDate;

    /// 2025-03-10 is a Monday.
    pub fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    /// In-memory store frozen at Monday 09:00.
    pub fn store() -> Store {
        Store::in_memory()
            .unwrap()
            .with_clock(Arc::new(FixedClock::at(monday(), 9, 0)))
    }

    pub fn user(store: &Store, email: &str, role: Role) -> User {
        let new = NewUser {
            email: email.into(),
            first_name: "Test".into(),
            last_name: "User".into(),
            password: "secret123".into(),
            phone: None,
            role: Some(role),
        };
        store.create_user(new, "hash".into()).unwrap()
    }

    pub fn facility(store: &Store, name: &str) -> Facility {
        store
            .create_facility(FacilityDraft {
                name: name.into(),
                kind: "court".into(),
                description: "A test facility".into(),
                capacity: 10,
                open_time: "08:00".into(),
                close_time: "20:00".into(),
                image_url: None,
            })
            .unwrap()
    }
}
