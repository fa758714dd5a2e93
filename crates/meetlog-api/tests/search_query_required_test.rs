//! Unit tests for the search endpoint's query-parameter contract.
//!
//! `GET /api/notes/search` requires a non-empty `q`. A missing or blank
//! query is rejected with 400 before the store is consulted; the search
//! itself is a case-insensitive substring OR-match across companyName,
//! subject, participants, aiSummary, and notes, returned unpaginated and
//! newest first.

fn query_is_rejected(q: Option<&str>) -> bool {
    q.unwrap_or_default().trim().is_empty()
}

#[test]
fn test_missing_q_rejected() {
    assert!(query_is_rejected(None));
}

#[test]
fn test_empty_q_rejected() {
    assert!(query_is_rejected(Some("")));
}

#[test]
fn test_blank_q_rejected() {
    assert!(query_is_rejected(Some("   ")));
}

#[test]
fn test_non_empty_q_accepted() {
    assert!(!query_is_rejected(Some("acme")));
    assert!(!query_is_rejected(Some("quarterly sync")));
}

#[test]
fn test_search_response_echoes_query_and_count() {
    // Response shape: { notes, searchQuery, totalResults }; totalResults
    // is the length of the unpaginated match set.
    let notes: Vec<&str> = vec!["a", "b"];
    let response = serde_json::json!({
        "notes": notes,
        "searchQuery": "acme",
        "totalResults": notes.len(),
    });
    assert_eq!(response["totalResults"], 2);
    assert_eq!(response["searchQuery"], "acme");
}
