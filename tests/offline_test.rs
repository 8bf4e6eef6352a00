//! Offline snapshot loading tests

use session_catalog::catalog::{Catalog, QueryMode};
use session_catalog::storage::{load_offline, save_snapshot, SnapshotError};
use session_catalog::Session;
use std::collections::HashMap;
use std::io::Write;
use tempfile::NamedTempFile;

fn snapshot_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[tokio::test]
async fn test_offline_load_lists_snapshot_records() {
    let file = snapshot_file(r#"[{"id":"A","title":"Talk A"},{"id":"B","title":"Talk B"}]"#);
    let catalog = Catalog::new(QueryMode::Incomplete);

    let total = load_offline(&catalog, file.path()).unwrap();
    assert_eq!(total, 2);
    assert!(catalog.is_ready());

    let titles: HashMap<_, _> = catalog
        .list_all()
        .await
        .unwrap()
        .into_iter()
        .map(|s| (s.id, s.title))
        .collect();
    assert_eq!(titles.len(), 2);
    assert_eq!(titles["A"], "Talk A");
    assert_eq!(titles["B"], "Talk B");
}

#[tokio::test]
async fn test_offline_get_by_id() {
    let file = snapshot_file(
        r#"[{"id":"1545653","title":"Keynote","url":"https://example.com/1545653","speakers":["Ada"]}]"#,
    );
    let catalog = Catalog::new(QueryMode::Block);
    load_offline(&catalog, file.path()).unwrap();

    let session = catalog.get_by_id("1545653").await.unwrap();
    assert_eq!(session.title, "Keynote");
    assert_eq!(session.speakers, vec!["Ada"]);
}

#[test]
fn test_missing_snapshot_is_fatal() {
    let catalog = Catalog::new(QueryMode::Block);
    let result = load_offline(&catalog, std::path::Path::new("/nonexistent/backup.json"));
    assert!(matches!(result, Err(SnapshotError::MissingFile(_))));
    assert!(!catalog.is_ready());
}

#[tokio::test]
async fn test_saved_snapshot_reloads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sessions_backup.json");

    let mut talk = Session::new("42", "https://example.com/42");
    talk.title = "Answer".to_string();
    talk.duration = "42 min".to_string();
    save_snapshot(&path, &[talk.clone()]).unwrap();

    let catalog = Catalog::new(QueryMode::Block);
    load_offline(&catalog, &path).unwrap();
    assert_eq!(catalog.get_by_id("42").await.unwrap(), talk);
}
