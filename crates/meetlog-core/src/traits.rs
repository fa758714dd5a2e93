//! Core traits for the meetlog record store.
//!
//! These traits define the interfaces that concrete implementations must
//! satisfy, enabling pluggable backends and testability.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::models::{Note, NoteDraft};

/// Filter for listing notes. All supplied fields combine with logical AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteFilter {
    /// Case-insensitive substring match on the company name.
    pub company_name: Option<String>,
    /// Case-insensitive substring match on the subject.
    pub subject: Option<String>,
    /// Exact-match meeting date.
    pub date: Option<NaiveDate>,
    /// Case-insensitive substring match on the participants field.
    pub participants: Option<String>,
}

impl NoteFilter {
    /// True when no filter field is set.
    pub fn is_empty(&self) -> bool {
        self.company_name.is_none()
            && self.subject.is_none()
            && self.date.is_none()
            && self.participants.is_none()
    }
}

/// Repository for note CRUD, filtered listing, and substring search.
///
/// This is the only component allowed to mutate persisted notes. `list` and
/// `search` order results by creation time, newest first; the ordering is
/// fixed, not configurable.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Insert a new note. Validates the draft; assigns id and sets
    /// `created_at == updated_at`. No row is written on validation failure.
    async fn insert(&self, draft: NoteDraft) -> Result<Note>;

    /// Fetch a note by id.
    async fn fetch(&self, id: i64) -> Result<Note>;

    /// Full-replace update of every field except id and `created_at`;
    /// refreshes `updated_at`. Partial updates are not supported: the
    /// draft is validated under the same rules as insertion.
    async fn update(&self, id: i64, draft: NoteDraft) -> Result<Note>;

    /// Delete a note, returning the deleted snapshot.
    async fn delete(&self, id: i64) -> Result<Note>;

    /// Count notes matching the filter.
    async fn count(&self, filter: &NoteFilter) -> Result<i64>;

    /// List notes matching the filter, newest first.
    async fn list(&self, filter: &NoteFilter, limit: i64, offset: i64) -> Result<Vec<Note>>;

    /// Case-insensitive substring search across company name, subject,
    /// participants, AI summary, and notes text (logical OR). Unpaginated.
    async fn search(&self, query: &str) -> Result<Vec<Note>>;
}
