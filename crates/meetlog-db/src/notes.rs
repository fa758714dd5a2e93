//! Note repository implementation.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::{postgres::PgRow, Pool, Postgres, Row};
use tracing::debug;

use meetlog_core::{
    duration_minutes, validate, Error, Note, NoteDraft, NoteFilter, NoteRepository, Result,
};

use crate::escape_like;

/// Column list shared by every SELECT/RETURNING on the note table.
const NOTE_COLUMNS: &str = "id, company_name, subject, date, start_time, end_time, \
     participants, ai_summary, notes, created_at, updated_at";

/// PostgreSQL implementation of NoteRepository.
#[derive(Clone)]
pub struct PgNoteRepository {
    pool: Pool<Postgres>,
}

impl PgNoteRepository {
    /// Create a new PgNoteRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

// =============================================================================
// HELPER FUNCTIONS FOR FILTER QUERY BUILDING
// =============================================================================

/// A positional parameter produced while building a filter clause.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterParam {
    /// An ILIKE pattern, wildcards already escaped and wrapped in `%`.
    Like(String),
    /// An exact-match calendar date.
    Date(NaiveDate),
}

/// Build the WHERE fragment for a filter, starting at parameter `$1`.
///
/// Returns the fragment (each condition prefixed with `AND `) and the bind
/// values in positional order. Substring fields escape LIKE wildcards so
/// user input can't smuggle `%` or `_` into the pattern.
pub fn build_filter_clause(filter: &NoteFilter) -> (String, Vec<FilterParam>) {
    let mut clause = String::new();
    let mut params = Vec::new();
    let mut param_idx = 1;

    if let Some(company_name) = &filter.company_name {
        add_like_filter(&mut clause, &mut params, &mut param_idx, "company_name", company_name);
    }
    if let Some(subject) = &filter.subject {
        add_like_filter(&mut clause, &mut params, &mut param_idx, "subject", subject);
    }
    if let Some(participants) = &filter.participants {
        add_like_filter(
            &mut clause,
            &mut params,
            &mut param_idx,
            "participants",
            participants,
        );
    }
    if let Some(date) = filter.date {
        clause.push_str(&format!("AND date = ${} ", param_idx));
        params.push(FilterParam::Date(date));
    }

    (clause, params)
}

/// Add a case-insensitive substring condition to the clause.
fn add_like_filter(
    clause: &mut String,
    params: &mut Vec<FilterParam>,
    param_idx: &mut usize,
    column: &str,
    value: &str,
) {
    clause.push_str(&format!("AND {} ILIKE ${} ", column, param_idx));
    params.push(FilterParam::Like(format!("%{}%", escape_like(value))));
    *param_idx += 1;
}

/// Macro to bind filter parameters to a query in positional order.
macro_rules! bind_filter_params {
    ($query:expr, $params:expr) => {{
        let mut q = $query;
        for param in $params {
            q = match param {
                FilterParam::Like(pattern) => q.bind(pattern),
                FilterParam::Date(date) => q.bind(date),
            };
        }
        q
    }};
}

/// Map a database row to a Note, deriving `duration` from the time window.
fn map_row_to_note(row: PgRow) -> Note {
    let start_time: String = row.get("start_time");
    let end_time: String = row.get("end_time");
    let duration = duration_minutes(&start_time, &end_time);

    Note {
        id: row.get("id"),
        company_name: row.get("company_name"),
        subject: row.get("subject"),
        date: row.get("date"),
        start_time,
        end_time,
        participants: row.get("participants"),
        ai_summary: row.get("ai_summary"),
        notes: row.get("notes"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        duration,
    }
}

#[async_trait]
impl NoteRepository for PgNoteRepository {
    async fn insert(&self, draft: NoteDraft) -> Result<Note> {
        // Same rules as the boundary; no row is written on failure.
        let fields = validate(&draft).map_err(Error::Validation)?;
        let now = Utc::now();

        let sql = format!(
            "INSERT INTO note (company_name, subject, date, start_time, end_time, \
             participants, ai_summary, notes, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
             RETURNING {}",
            NOTE_COLUMNS
        );

        let row = sqlx::query(&sql)
            .bind(&fields.company_name)
            .bind(&fields.subject)
            .bind(fields.date)
            .bind(&fields.start_time)
            .bind(&fields.end_time)
            .bind(&fields.participants)
            .bind(&fields.ai_summary)
            .bind(&fields.notes)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;

        let note = map_row_to_note(row);
        debug!(
            subsystem = "database",
            component = "notes",
            op = "insert",
            note_id = note.id,
            "Note inserted"
        );
        Ok(note)
    }

    async fn fetch(&self, id: i64) -> Result<Note> {
        let sql = format!("SELECT {} FROM note WHERE id = $1", NOTE_COLUMNS);

        sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .map(map_row_to_note)
            .ok_or(Error::NoteNotFound(id))
    }

    async fn update(&self, id: i64, draft: NoteDraft) -> Result<Note> {
        let fields = validate(&draft).map_err(Error::Validation)?;
        let now = Utc::now();

        // Full replace: id and created_at are the only surviving columns.
        let sql = format!(
            "UPDATE note SET company_name = $1, subject = $2, date = $3, start_time = $4, \
             end_time = $5, participants = $6, ai_summary = $7, notes = $8, updated_at = $9
             WHERE id = $10
             RETURNING {}",
            NOTE_COLUMNS
        );

        sqlx::query(&sql)
            .bind(&fields.company_name)
            .bind(&fields.subject)
            .bind(fields.date)
            .bind(&fields.start_time)
            .bind(&fields.end_time)
            .bind(&fields.participants)
            .bind(&fields.ai_summary)
            .bind(&fields.notes)
            .bind(now)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .map(map_row_to_note)
            .ok_or(Error::NoteNotFound(id))
    }

    async fn delete(&self, id: i64) -> Result<Note> {
        let sql = format!("DELETE FROM note WHERE id = $1 RETURNING {}", NOTE_COLUMNS);

        let deleted = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .map(map_row_to_note)
            .ok_or(Error::NoteNotFound(id))?;

        debug!(
            subsystem = "database",
            component = "notes",
            op = "delete",
            note_id = id,
            "Note deleted"
        );
        Ok(deleted)
    }

    async fn count(&self, filter: &NoteFilter) -> Result<i64> {
        let (clause, params) = build_filter_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM note WHERE TRUE {}", clause);

        let query = sqlx::query_scalar(&sql);
        let query = bind_filter_params!(query, &params);
        let total: i64 = query.fetch_one(&self.pool).await.map_err(Error::Database)?;
        Ok(total)
    }

    async fn list(&self, filter: &NoteFilter, limit: i64, offset: i64) -> Result<Vec<Note>> {
        let (clause, params) = build_filter_clause(filter);
        let next_idx = params.len() + 1;

        // Fixed ordering: newest first, id as tiebreak so pages never
        // overlap when two rows share a created_at.
        let sql = format!(
            "SELECT {} FROM note WHERE TRUE {} ORDER BY created_at DESC, id DESC \
             LIMIT ${} OFFSET ${}",
            NOTE_COLUMNS,
            clause,
            next_idx,
            next_idx + 1
        );

        let query = sqlx::query(&sql);
        let query = bind_filter_params!(query, &params);
        let rows = query
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        debug!(
            subsystem = "database",
            component = "notes",
            op = "list",
            result_count = rows.len(),
            "Notes listed"
        );
        Ok(rows.into_iter().map(map_row_to_note).collect())
    }

    async fn search(&self, query: &str) -> Result<Vec<Note>> {
        let pattern = format!("%{}%", escape_like(query));
        let sql = format!(
            "SELECT {} FROM note
             WHERE company_name ILIKE $1
                OR subject ILIKE $1
                OR participants ILIKE $1
                OR ai_summary ILIKE $1
                OR notes ILIKE $1
             ORDER BY created_at DESC, id DESC",
            NOTE_COLUMNS
        );

        let rows = sqlx::query(&sql)
            .bind(&pattern)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        debug!(
            subsystem = "database",
            component = "notes",
            op = "search",
            query = query,
            result_count = rows.len(),
            "Notes searched"
        );
        Ok(rows.into_iter().map(map_row_to_note).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_builds_empty_clause() {
        let (clause, params) = build_filter_clause(&NoteFilter::default());
        assert!(clause.is_empty());
        assert!(params.is_empty());
    }

    #[test]
    fn test_single_text_filter() {
        let filter = NoteFilter {
            company_name: Some("Acme".to_string()),
            ..Default::default()
        };
        let (clause, params) = build_filter_clause(&filter);
        assert_eq!(clause, "AND company_name ILIKE $1 ");
        assert_eq!(params, vec![FilterParam::Like("%Acme%".to_string())]);
    }

    #[test]
    fn test_filters_combine_with_and_in_field_order() {
        let filter = NoteFilter {
            company_name: Some("Acme".to_string()),
            subject: Some("sync".to_string()),
            date: Some("2024-01-01".parse().unwrap()),
            participants: Some("alice".to_string()),
        };
        let (clause, params) = build_filter_clause(&filter);
        assert_eq!(
            clause,
            "AND company_name ILIKE $1 AND subject ILIKE $2 \
             AND participants ILIKE $3 AND date = $4 "
        );
        assert_eq!(params.len(), 4);
        assert_eq!(
            params[3],
            FilterParam::Date("2024-01-01".parse().unwrap())
        );
    }

    #[test]
    fn test_filter_escapes_like_wildcards() {
        let filter = NoteFilter {
            subject: Some("100%_done".to_string()),
            ..Default::default()
        };
        let (_, params) = build_filter_clause(&filter);
        assert_eq!(
            params,
            vec![FilterParam::Like("%100\\%\\_done%".to_string())]
        );
    }

    #[test]
    fn test_date_only_filter_uses_first_param() {
        let filter = NoteFilter {
            date: Some("2024-06-15".parse().unwrap()),
            ..Default::default()
        };
        let (clause, params) = build_filter_clause(&filter);
        assert_eq!(clause, "AND date = $1 ");
        assert_eq!(params.len(), 1);
    }
}
