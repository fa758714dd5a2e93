//! Note field validation.
//!
//! Single source of truth for schema-level checks. Both the HTTP boundary
//! and the Postgres repository call [`validate`]; the logic lives only here
//! even though both layers invoke it.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ValidationErrors;
use crate::models::NoteDraft;

/// Maximum length of `companyName` in characters.
pub const COMPANY_NAME_MAX: usize = 100;
/// Maximum length of `subject` in characters (empty allowed).
pub const SUBJECT_MAX: usize = 200;
/// Maximum length of `participants` in characters.
pub const PARTICIPANTS_MAX: usize = 500;
/// Maximum length of `aiSummary` in characters (empty allowed).
pub const AI_SUMMARY_MAX: usize = 2000;
/// Maximum length of `notes` in characters.
pub const NOTES_MAX: usize = 5000;

/// `HH:MM`, 00:00–23:59. A single-digit hour is accepted ("9:30").
static TIME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([01]?[0-9]|2[0-3]):[0-5][0-9]$").expect("time pattern compiles"));

/// Validated field set, ready to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidFields {
    pub company_name: String,
    pub subject: String,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub participants: String,
    pub ai_summary: String,
    pub notes: String,
}

/// True when `s` matches the `HH:MM` pattern.
pub fn is_valid_time(s: &str) -> bool {
    TIME_PATTERN.is_match(s)
}

/// Signed minutes from `start` to `end`.
///
/// Negative when the end precedes the start: a meeting crossing midnight is
/// reported as a negative duration rather than being wrapped. Derived at
/// read time, never stored.
pub fn duration_minutes(start: &str, end: &str) -> i64 {
    minute_of_day(end) - minute_of_day(start)
}

fn minute_of_day(time: &str) -> i64 {
    let (hours, minutes) = time.split_once(':').unwrap_or(("0", "0"));
    let hours: i64 = hours.parse().unwrap_or(0);
    let minutes: i64 = minutes.parse().unwrap_or(0);
    hours * 60 + minutes
}

/// Validate a raw draft into a persistable field set.
///
/// Pure function: collects every field-level failure instead of stopping at
/// the first, so callers can surface all problems in one response. An empty
/// string counts as missing for the required fields; `subject` and
/// `aiSummary` may be empty and default to `""`.
pub fn validate(draft: &NoteDraft) -> Result<ValidFields, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let company_name = required_text(
        &mut errors,
        "companyName",
        draft.company_name.as_deref(),
        COMPANY_NAME_MAX,
    );
    let subject = optional_text(&mut errors, "subject", draft.subject.as_deref(), SUBJECT_MAX);
    let date = required_date(&mut errors, draft.date.as_deref());
    let start_time = required_time(&mut errors, "startTime", draft.start_time.as_deref());
    let end_time = required_time(&mut errors, "endTime", draft.end_time.as_deref());
    let participants = required_text(
        &mut errors,
        "participants",
        draft.participants.as_deref(),
        PARTICIPANTS_MAX,
    );
    let ai_summary = optional_text(
        &mut errors,
        "aiSummary",
        draft.ai_summary.as_deref(),
        AI_SUMMARY_MAX,
    );
    let notes = required_text(&mut errors, "notes", draft.notes.as_deref(), NOTES_MAX);

    if !errors.is_empty() {
        return Err(errors);
    }

    // All accessors returned Some when no error was recorded.
    Ok(ValidFields {
        company_name: company_name.unwrap_or_default(),
        subject: subject.unwrap_or_default(),
        date: date.unwrap_or_default(),
        start_time: start_time.unwrap_or_default(),
        end_time: end_time.unwrap_or_default(),
        participants: participants.unwrap_or_default(),
        ai_summary: ai_summary.unwrap_or_default(),
        notes: notes.unwrap_or_default(),
    })
}

fn required_text(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<&str>,
    max: usize,
) -> Option<String> {
    match value {
        None | Some("") => {
            errors.push(format!("{field} is required"));
            None
        }
        Some(text) if text.chars().count() > max => {
            errors.push(format!("{field} must be between 1 and {max} characters"));
            None
        }
        Some(text) => Some(text.to_string()),
    }
}

fn optional_text(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<&str>,
    max: usize,
) -> Option<String> {
    let text = value.unwrap_or("");
    if text.chars().count() > max {
        errors.push(format!("{field} must be at most {max} characters"));
        return None;
    }
    Some(text.to_string())
}

fn required_date(errors: &mut ValidationErrors, value: Option<&str>) -> Option<NaiveDate> {
    match value {
        None | Some("") => {
            errors.push("date is required");
            None
        }
        Some(raw) => match raw.parse::<NaiveDate>() {
            Ok(date) => Some(date),
            Err(_) => {
                errors.push(format!(
                    "date must be a valid calendar date (YYYY-MM-DD), got \"{raw}\""
                ));
                None
            }
        },
    }
}

fn required_time(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<&str>,
) -> Option<String> {
    match value {
        None | Some("") => {
            errors.push(format!("{field} is required"));
            None
        }
        Some(time) if !is_valid_time(time) => {
            errors.push(format!("{field} must be in HH:MM format"));
            None
        }
        Some(time) => Some(time.to_string()),
    }
}
