//! Integration tests for PgNoteRepository against a live Postgres.
//!
//! All tests are `#[ignore]` so the default suite passes without a running
//! database; run them with `cargo test -- --ignored` once the test database
//! from `test_fixtures` is up and migrated.

use meetlog_core::{NoteFilter, NoteRepository};
use meetlog_db::test_fixtures::{sample_draft, TestDatabase};
use meetlog_db::Error;

#[tokio::test]
#[ignore = "requires a test database"]
async fn test_insert_assigns_id_and_timestamps() {
    let test_db = TestDatabase::new().await;

    let first = test_db.db.notes.insert(sample_draft("Acme")).await.unwrap();
    let second = test_db.db.notes.insert(sample_draft("Globex")).await.unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(first.created_at, first.updated_at);
    assert_eq!(first.duration, 30);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a test database"]
async fn test_update_is_full_replace_and_bumps_updated_at() {
    let test_db = TestDatabase::new().await;

    let note = test_db.db.notes.insert(sample_draft("Acme")).await.unwrap();

    let mut draft = sample_draft("Acme");
    draft.subject = Some("Retro".to_string());
    let updated = test_db.db.notes.update(note.id, draft).await.unwrap();

    assert_eq!(updated.id, note.id);
    assert_eq!(updated.created_at, note.created_at);
    assert!(updated.updated_at > note.updated_at);
    assert_eq!(updated.subject, "Retro");

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a test database"]
async fn test_delete_returns_snapshot_and_second_delete_fails() {
    let test_db = TestDatabase::new().await;

    let note = test_db.db.notes.insert(sample_draft("Acme")).await.unwrap();
    let deleted = test_db.db.notes.delete(note.id).await.unwrap();
    assert_eq!(deleted.id, note.id);
    assert_eq!(deleted.company_name, "Acme");

    match test_db.db.notes.delete(note.id).await {
        Err(Error::NoteNotFound(id)) => assert_eq!(id, note.id),
        other => panic!("expected NoteNotFound, got {:?}", other.map(|n| n.id)),
    }

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a test database"]
async fn test_filters_are_conjunctive() {
    let test_db = TestDatabase::new().await;

    test_db.db.notes.insert(sample_draft("Acme")).await.unwrap();
    test_db.db.notes.insert(sample_draft("Globex")).await.unwrap();

    let filter = NoteFilter {
        company_name: Some("acme".to_string()), // case-insensitive
        subject: Some("sync".to_string()),
        ..Default::default()
    };
    let total = test_db.db.notes.count(&filter).await.unwrap();
    assert_eq!(total, 1);

    let notes = test_db.db.notes.list(&filter, 10, 0).await.unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].company_name, "Acme");

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a test database"]
async fn test_pages_concatenate_to_full_set_newest_first() {
    let test_db = TestDatabase::new().await;

    for i in 0..25 {
        let mut draft = sample_draft("Acme");
        draft.notes = Some(format!("note {i}"));
        test_db.db.notes.insert(draft).await.unwrap();
    }

    let filter = NoteFilter::default();
    let total = test_db.db.notes.count(&filter).await.unwrap();
    assert_eq!(total, 25);

    let mut seen = Vec::new();
    for page in 1..=3 {
        let offset = (page - 1) * 10;
        let notes = test_db.db.notes.list(&filter, 10, offset).await.unwrap();
        seen.extend(notes);
    }

    assert_eq!(seen.len(), 25);
    // Newest first, no duplicates across page boundaries.
    for pair in seen.windows(2) {
        assert!(
            (pair[0].created_at, pair[0].id) > (pair[1].created_at, pair[1].id),
            "pages must be strictly ordered"
        );
    }

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a test database"]
async fn test_search_matches_any_text_field() {
    let test_db = TestDatabase::new().await;

    let mut draft = sample_draft("Acme");
    draft.ai_summary = Some("Decided on the Phoenix rollout.".to_string());
    test_db.db.notes.insert(draft).await.unwrap();
    test_db.db.notes.insert(sample_draft("Globex")).await.unwrap();

    // Matches via ai_summary only, case-insensitively.
    let hits = test_db.db.notes.search("phoenix").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].company_name, "Acme");

    // Matches via company_name.
    let hits = test_db.db.notes.search("globex").await.unwrap();
    assert_eq!(hits.len(), 1);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a test database"]
async fn test_duration_negative_when_end_precedes_start() {
    let test_db = TestDatabase::new().await;

    let mut draft = sample_draft("Acme");
    draft.start_time = Some("10:00".to_string());
    draft.end_time = Some("09:00".to_string());
    let note = test_db.db.notes.insert(draft).await.unwrap();

    // Documented quirk: stored as-is, read back as a negative duration.
    assert_eq!(note.duration, -60);
    let fetched = test_db.db.notes.fetch(note.id).await.unwrap();
    assert_eq!(fetched.duration, -60);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a test database"]
async fn test_invalid_draft_never_reaches_the_table() {
    let test_db = TestDatabase::new().await;

    let before = test_db
        .db
        .notes
        .count(&NoteFilter::default())
        .await
        .unwrap();

    let mut draft = sample_draft("Acme");
    draft.start_time = Some("25:00".to_string());
    let err = test_db.db.notes.insert(draft).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let after = test_db
        .db
        .notes
        .count(&NoteFilter::default())
        .await
        .unwrap();
    assert_eq!(before, after);

    test_db.cleanup().await;
}
