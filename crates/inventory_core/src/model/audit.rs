//! Audit fields carried by every stored document.
//!
//! # Invariants
//! - `created_at` is written once by `AuditFields::new`.
//! - `modified_at` and `version` only move through `touch`.
//! - Timestamps are fixed-width RFC 3339 UTC strings, so text order is time
//!   order (the repository sorts on the raw string).

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditFields {
    /// Opaque id of the creating actor, `null` when unknown.
    #[serde(default)]
    pub created_by: Option<String>,
    pub created_at: String,
    pub modified_at: String,
    #[serde(default)]
    pub deleted: bool,
    /// Optimistic concurrency counter. Pre-versioned documents read as 0.
    #[serde(default)]
    pub version: u64,
}

impl AuditFields {
    /// Fresh audit block for a record created at `now`.
    pub fn new(created_by: Option<String>, now: &str) -> Self {
        Self {
            created_by,
            created_at: now.to_string(),
            modified_at: now.to_string(),
            deleted: false,
            version: 1,
        }
    }

    /// Records a mutation at `now` and returns the new version.
    ///
    /// `None` once `version` is exhausted; the fields are left untouched.
    pub fn touch(&mut self, now: &str) -> Option<u64> {
        let next = self.version.checked_add(1)?;
        self.modified_at = now.to_string();
        self.version = next;
        Some(next)
    }

    pub fn is_active(&self) -> bool {
        !self.deleted
    }
}

/// Current time as a sortable timestamp.
pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

/// Formats `at` as `YYYY-MM-DDTHH:MM:SS.ffffff+00:00`.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, false)
}
