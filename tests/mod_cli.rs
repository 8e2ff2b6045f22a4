mod common;

use clap::Parser;
use common::{COLLECTION, DB, write_collection};
use docpager::cli::{self, Args};
use docpager::{PagerConfig, PagerError, RecordId};

fn file_config(root: &std::path::Path, page_size: usize) -> PagerConfig {
    let mut cfg = PagerConfig::new(format!("file://{}", root.display()), DB, COLLECTION);
    cfg.page_size = page_size;
    cfg.log_commands = false;
    cfg
}

fn seeded_dir(n: i64) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let lines: Vec<String> = (1..=n).rev().map(|i| format!(r#"{{"_id": {i}, "year": {}}}"#, 1990 + i)).collect();
    write_collection(dir.path(), DB, COLLECTION, &lines);
    dir
}

#[tokio::test]
async fn prints_the_requested_number_of_pages() {
    let dir = seeded_dir(25);
    let args = Args::try_parse_from(["docpager"]).unwrap();
    let mut out = Vec::new();
    let report = cli::run(&args, &file_config(dir.path(), 10), &mut out).await.unwrap();

    assert_eq!(report.pages, 2);
    assert_eq!(report.records, 20);
    assert_eq!(report.last_id, Some(RecordId::Int(20)));
    assert!(!report.exhausted);
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("Page 1:\n["));
    assert!(text.contains("Page 2:"));
    assert!(!text.contains("Page 3:"));
}

#[tokio::test]
async fn zero_pages_walks_to_the_end() {
    let dir = seeded_dir(25);
    let args = Args::try_parse_from(["docpager", "--pages", "0"]).unwrap();
    let mut out = Vec::new();
    let report = cli::run(&args, &file_config(dir.path(), 10), &mut out).await.unwrap();
    assert_eq!(report.pages, 3);
    assert_eq!(report.records, 25);
    assert!(report.exhausted);
}

#[tokio::test]
async fn resumes_after_a_given_identifier() {
    let dir = seeded_dir(12);
    let args = Args::try_parse_from(["docpager", "--after", "9", "--pages", "0"]).unwrap();
    let mut out = Vec::new();
    let report = cli::run(&args, &file_config(dir.path(), 5), &mut out).await.unwrap();
    assert_eq!(report.records, 3);
    assert_eq!(report.last_id, Some(RecordId::Int(12)));
}

#[tokio::test]
async fn bad_resume_identifier_is_reported() {
    let dir = seeded_dir(3);
    let args = Args::try_parse_from(["docpager", "--after", "zzz"]).unwrap();
    let mut out = Vec::new();
    let err = cli::run(&args, &file_config(dir.path(), 5), &mut out).await.unwrap_err();
    assert!(matches!(err, PagerError::MalformedIdentifier(_)));
    assert!(out.is_empty());
}

#[tokio::test]
async fn unreachable_store_fails_before_printing() {
    let dir = tempfile::tempdir().unwrap();
    let args = Args::try_parse_from(["docpager"]).unwrap();
    let mut out = Vec::new();
    let err = cli::run(&args, &file_config(&dir.path().join("missing"), 5), &mut out).await.unwrap_err();
    assert!(matches!(err, PagerError::ConnectionError(_)));
    assert!(out.is_empty());
}

#[tokio::test]
async fn sort_field_pages_by_keyset() {
    let dir = seeded_dir(6);
    let args = Args::try_parse_from(["docpager", "--pages", "0"]).unwrap();
    let mut cfg = file_config(dir.path(), 4);
    cfg.sort_field = Some("year".into());
    let mut out = Vec::new();
    let report = cli::run(&args, &cfg, &mut out).await.unwrap();
    assert_eq!(report.records, 6);
    assert_eq!(report.last_id, Some(RecordId::Int(6)));
}

#[test]
fn flags_override_lower_layers() {
    let args = Args::try_parse_from([
        "docpager",
        "--uri",
        "memory://",
        "--collection",
        "shows",
        "--page-size",
        "3",
        "--sort-field",
        "year",
        "--timeout-ms",
        "250",
        "--no-command-log",
    ])
    .unwrap();
    let mut cfg = PagerConfig::new("file:///srv/data", DB, COLLECTION);
    args.apply_to(&mut cfg);
    assert_eq!(cfg.uri, "memory://");
    assert_eq!(cfg.database, DB);
    assert_eq!(cfg.collection, "shows");
    assert_eq!(cfg.page_size, 3);
    assert_eq!(cfg.sort_field.as_deref(), Some("year"));
    assert_eq!(cfg.timeout_ms, Some(250));
    assert!(!cfg.log_commands);
}

#[test]
fn pages_defaults_to_two() {
    let args = Args::try_parse_from(["docpager"]).unwrap();
    assert_eq!(args.pages, 2);
    assert!(args.after.is_none());
    assert!(Args::try_parse_from(["docpager", "--pages", "many"]).is_err());
}
