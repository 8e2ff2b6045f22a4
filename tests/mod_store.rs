mod common;

use common::{COLLECTION, DB, config, ids, int_ids, write_collection};
use docpager::{ClientOptions, Connection, Pager, PagerError, RecordId, connect};

fn movie_lines(range: impl IntoIterator<Item = i64>) -> Vec<String> {
    range.into_iter().map(|i| format!(r#"{{"_id": {i}, "title": "movie {i}"}}"#)).collect()
}

fn file_uri(root: &std::path::Path) -> String {
    format!("file://{}", root.display())
}

#[tokio::test]
async fn unknown_scheme_is_a_connection_error() {
    let err = connect("postgres://localhost:5432", ClientOptions::default()).await.unwrap_err();
    assert!(matches!(err, PagerError::ConnectionError(_)));
    let err = connect("file://", ClientOptions::default()).await.unwrap_err();
    assert!(matches!(err, PagerError::ConnectionError(_)));
}

#[cfg(not(feature = "mongo"))]
#[tokio::test]
async fn mongodb_uri_names_the_missing_feature() {
    for uri in ["mongodb://localhost:27017", "mongodb+srv://cluster.example.net"] {
        match connect(uri, ClientOptions::default()).await {
            Err(PagerError::ConnectionError(msg)) => assert!(msg.contains("`mongo` feature"), "{msg}"),
            other => panic!("expected a connection error, got {other:?}"),
        }
    }
}

#[cfg(feature = "mongo")]
#[tokio::test]
async fn malformed_mongodb_uri_is_a_connection_error() {
    let err = connect("mongodb://", ClientOptions::default()).await.unwrap_err();
    assert!(matches!(err, PagerError::ConnectionError(_)));
}

#[tokio::test]
async fn missing_directory_is_a_connection_error() {
    let dir = tempfile::tempdir().unwrap();
    let uri = file_uri(&dir.path().join("nope"));
    assert!(matches!(connect(&uri, ClientOptions::default()).await, Err(PagerError::ConnectionError(_))));
}

#[tokio::test]
async fn pages_an_unsorted_file_in_id_order() {
    let dir = tempfile::tempdir().unwrap();
    write_collection(dir.path(), DB, COLLECTION, &movie_lines([7, 2, 9, 1, 5, 3, 8, 4, 6]));
    let client = connect(&file_uri(dir.path()), ClientOptions::default()).await.unwrap();
    let pager = Pager::new(&client, &config()).unwrap();

    assert_eq!(ids(&pager.paginate(None, 4).await.unwrap()), int_ids(1..=4));
    assert_eq!(ids(&pager.paginate(Some(&RecordId::Int(4)), 4).await.unwrap()), int_ids(5..=8));
    assert_eq!(ids(&pager.paginate(Some(&RecordId::Int(8)), 4).await.unwrap()), int_ids([9]));
    client.close().await.unwrap();
}

#[tokio::test]
async fn object_id_files_page_in_byte_order() {
    let dir = tempfile::tempdir().unwrap();
    let hexes = ["65a000000000000000000003", "65a000000000000000000001", "65a000000000000000000002"];
    let lines: Vec<String> = hexes.iter().map(|h| format!(r#"{{"_id": {{"$oid": "{h}"}}}}"#)).collect();
    write_collection(dir.path(), DB, COLLECTION, &lines);
    let client = connect(&file_uri(dir.path()), ClientOptions::default()).await.unwrap();
    let pager = Pager::new(&client, &config()).unwrap();

    let first = pager.paginate(None, 2).await.unwrap();
    let expected: Vec<RecordId> =
        ["65a000000000000000000001", "65a000000000000000000002"].iter().map(|h| h.parse().unwrap()).collect();
    assert_eq!(ids(&first), expected);
    let rest = pager.paginate_str(Some("65a000000000000000000002"), 2).await.unwrap();
    assert_eq!(ids(&rest), vec!["65a000000000000000000003".parse::<RecordId>().unwrap()]);
}

#[tokio::test]
async fn missing_collection_file_reads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let client = connect(&file_uri(dir.path()), ClientOptions::default()).await.unwrap();
    let pager = Pager::new(&client, &config()).unwrap();
    assert!(pager.paginate(None, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn malformed_line_is_a_query_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut lines = movie_lines([1, 2]);
    lines.push("{ not json".to_string());
    write_collection(dir.path(), DB, COLLECTION, &lines);
    let client = connect(&file_uri(dir.path()), ClientOptions::default()).await.unwrap();
    let pager = Pager::new(&client, &config()).unwrap();
    match pager.paginate(None, 10).await {
        Err(PagerError::QueryError(msg)) => assert!(msg.contains(":3:"), "{msg}"),
        other => panic!("expected a query error, got {other:?}"),
    }
}

#[tokio::test]
async fn record_without_id_is_a_query_error() {
    let dir = tempfile::tempdir().unwrap();
    write_collection(dir.path(), DB, COLLECTION, &[r#"{"title": "orphan"}"#.to_string()]);
    let client = connect(&file_uri(dir.path()), ClientOptions::default()).await.unwrap();
    let pager = Pager::new(&client, &config()).unwrap();
    assert!(matches!(pager.paginate(None, 10).await, Err(PagerError::QueryError(_))));
}

#[tokio::test]
async fn vanished_directory_is_a_connection_error() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("store");
    write_collection(&root, DB, COLLECTION, &movie_lines(1..=3));
    let client = connect(&file_uri(&root), ClientOptions::default()).await.unwrap();
    let pager = Pager::new(&client, &config()).unwrap();
    assert_eq!(pager.paginate(None, 10).await.unwrap().len(), 3);

    std::fs::remove_dir_all(&root).unwrap();
    assert!(matches!(pager.paginate(None, 10).await, Err(PagerError::ConnectionError(_))));
}

#[tokio::test]
async fn edits_show_up_on_the_next_page() {
    let dir = tempfile::tempdir().unwrap();
    write_collection(dir.path(), DB, COLLECTION, &movie_lines(1..=3));
    let client = connect(&file_uri(dir.path()), ClientOptions::default()).await.unwrap();
    let pager = Pager::new(&client, &config()).unwrap();
    assert_eq!(ids(&pager.paginate(None, 3).await.unwrap()), int_ids(1..=3));

    write_collection(dir.path(), DB, COLLECTION, &movie_lines(1..=5));
    assert_eq!(ids(&pager.paginate(Some(&RecordId::Int(3)), 3).await.unwrap()), int_ids([4, 5]));
}

#[tokio::test]
async fn close_is_idempotent_and_final() {
    let client = connect("memory://", ClientOptions::default()).await.unwrap();
    assert!(!client.is_closed());
    client.close().await.unwrap();
    client.close().await.unwrap();
    assert!(client.is_closed());

    let pager = Pager::new(&client, &config()).unwrap();
    assert!(matches!(pager.paginate(None, 1).await, Err(PagerError::ConnectionError(_))));
}

#[tokio::test]
async fn app_name_defaults_and_overrides() {
    let client = connect("memory://", ClientOptions::default()).await.unwrap();
    assert_eq!(client.app_name(), "docpager");
    let client = connect("memory://", ClientOptions::default().with_app_name("movies-report")).await.unwrap();
    assert_eq!(client.app_name(), "movies-report");
}
