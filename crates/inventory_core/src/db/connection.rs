//! Lazily opened, explicitly owned SQLite connection.
//!
//! # Responsibility
//! - Replace process-wide connector state with an object callers construct
//!   and inject into each repository.
//! - Open on first use, close on `release`.
//!
//! # Invariants
//! - At most one live connection per manager.
//! - A manager is never shared between repositories of different kinds.

use super::{open, DbResult};
use log::debug;
use rusqlite::Connection;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Where a manager opens its connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbLocation {
    File(PathBuf),
    /// Private database that lives as long as the connection does.
    Memory,
}

impl DbLocation {
    /// Parses a configured path; `:memory:` selects an in-memory database.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            ":memory:" => Self::Memory,
            path => Self::File(PathBuf::from(path)),
        }
    }
}

impl Display for DbLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Memory => write!(f, ":memory:"),
        }
    }
}

/// Owns at most one live connection to `location`.
#[derive(Debug)]
pub struct ConnectionManager {
    location: DbLocation,
    conn: Option<Connection>,
}

impl ConnectionManager {
    pub fn new(location: DbLocation) -> Self {
        Self {
            location,
            conn: None,
        }
    }

    pub fn location(&self) -> &DbLocation {
        &self.location
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Returns the live connection, opening and migrating one if needed.
    ///
    /// Repeated calls return the same connection until `release`.
    pub fn acquire(&mut self) -> DbResult<&mut Connection> {
        let conn = match self.conn.take() {
            Some(conn) => conn,
            None => open(&self.location)?,
        };
        Ok(self.conn.insert(conn))
    }

    /// Closes and clears the held connection. No-op when nothing is open.
    ///
    /// For `DbLocation::Memory` this discards the database.
    pub fn release(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err((_, err)) = conn.close() {
                debug!("event=db_close module=db status=error error={err}");
                return;
            }
            debug!(
                "event=db_close module=db status=ok location={}",
                self.location
            );
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.release();
    }
}
