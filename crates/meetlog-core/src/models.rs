//! Domain models for meeting notes.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A stored meeting note.
///
/// `duration` is derived from the time window at read time and is never
/// persisted, so it can't go stale against `start_time`/`end_time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: i64,
    pub company_name: String,
    pub subject: String,
    pub date: NaiveDate,
    /// Meeting start, `HH:MM`.
    pub start_time: String,
    /// Meeting end, `HH:MM`.
    pub end_time: String,
    /// Free-form, comma-separated by convention (not enforced).
    pub participants: String,
    pub ai_summary: String,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Minutes from `start_time` to `end_time`. Negative when the end
    /// precedes the start; day wrap is deliberately not corrected.
    pub duration: i64,
}

/// Raw, untrusted field set for create and update payloads.
///
/// Every field is optional at the wire level; [`crate::validation::validate`]
/// decides what is actually required. Updates are full-replace, so the same
/// draft shape (and the same rules) applies to both writes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteDraft {
    pub company_name: Option<String>,
    pub subject: Option<String>,
    /// Calendar date as `YYYY-MM-DD`; parsed during validation.
    pub date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub participants: Option<String>,
    pub ai_summary: Option<String>,
    pub notes: Option<String>,
}
