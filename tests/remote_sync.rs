use std::collections::HashMap;
use std::io::Read as _;
use std::path::Path;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use bookwright::formats::ChapterStatus;
use bookwright::plan::fallback_plan;
use bookwright::remote::{self, HttpRemoteCollection};
use bookwright::store::MetadataStore;
use predicates::prelude::*;

/// In-memory keyed document collection behind the mirror's REST surface:
/// `PUT/GET /books/{key}`, `GET /books`.
struct MirrorStub {
    base_url: String,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl MirrorStub {
    fn spawn() -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start mirror stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}");

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            let mut documents: HashMap<String, String> = HashMap::new();

            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let mut request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let url = request.url().to_string();
                let is_get = request.method() == &tiny_http::Method::Get;
                let is_put = request.method() == &tiny_http::Method::Put;

                let (status, body) = if is_get && url == "/books" {
                    let mut values: Vec<&str> =
                        documents.values().map(|doc| doc.as_str()).collect();
                    values.sort_unstable();
                    (200, format!("[{}]", values.join(",")))
                } else if is_put && url.starts_with("/books/") {
                    let key = url["/books/".len()..].to_owned();
                    let mut body = String::new();
                    if request.as_reader().read_to_string(&mut body).is_err() {
                        (400, "invalid request body".to_owned())
                    } else {
                        documents.insert(key, body);
                        (200, "{}".to_owned())
                    }
                } else if is_get && url.starts_with("/books/") {
                    let key = &url["/books/".len()..];
                    match documents.get(key) {
                        Some(doc) => (200, doc.clone()),
                        None => (404, "not found".to_owned()),
                    }
                } else {
                    (404, "not found".to_owned())
                };

                let mut response =
                    tiny_http::Response::from_string(body).with_status_code(status);
                if status == 200 {
                    let header = tiny_http::Header::from_bytes(
                        &b"Content-Type"[..],
                        &b"application/json"[..],
                    )
                    .expect("build header");
                    response = response.with_header(header);
                }
                let _ = request.respond(response);
            }
        });

        Self {
            base_url,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }
}

impl Drop for MirrorStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn seed_book(books_dir: &Path, topic: &str, chapters: usize) -> MetadataStore {
    let plan = fallback_plan(topic, chapters);
    let store = MetadataStore::new(books_dir, &plan.book_title);
    store
        .create(&plan, "cover", "toc", topic)
        .expect("create book");
    store
}

#[tokio::test]
async fn push_pull_and_listing_round_trip() -> anyhow::Result<()> {
    let stub = MirrorStub::spawn();
    let temp = tempfile::TempDir::new()?;
    let store = seed_book(temp.path(), "mirrored", 1);

    let collection = HttpRemoteCollection::new(&stub.base_url)?;

    assert!(remote::push(&collection, temp.path(), "Book about mirrored").await);

    let pulled = remote::pull(&collection, "Book about mirrored").await;
    assert_eq!(
        pulled.pointer("/book_info/title").and_then(|v| v.as_str()),
        Some("Book about mirrored")
    );

    let summaries = remote::list_summaries(&collection).await;
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].slug, store.slug());
    assert_eq!(summaries[0].title, "Book about mirrored");
    assert_eq!(summaries[0].book_info.total_chapters, 1);

    // A second book joins the batch sync.
    seed_book(temp.path(), "companion", 2);
    let results = remote::push_all(&collection, temp.path()).await;
    assert_eq!(results.len(), 2);
    assert!(results.values().all(|synced| *synced));
    assert!(results.contains_key("book_book_about_mirrored"));
    assert!(results.contains_key("book_book_about_companion"));

    let summaries = remote::list_summaries(&collection).await;
    assert_eq!(summaries.len(), 2);

    Ok(())
}

#[tokio::test]
async fn unreachable_mirror_degrades_without_breaking_local_state() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let store = seed_book(temp.path(), "offline", 1);

    // Nothing listens here; every remote operation must absorb the failure.
    let collection = HttpRemoteCollection::new("http://127.0.0.1:9")?;

    assert!(!remote::push(&collection, temp.path(), "Book about offline").await);

    let pulled = remote::pull(&collection, "Book about offline").await;
    assert_eq!(pulled, serde_json::json!({}));

    assert!(remote::list_summaries(&collection).await.is_empty());

    let results = remote::push_all(&collection, temp.path()).await;
    assert_eq!(results.get("book_book_about_offline"), Some(&false));

    // Local pipeline operations continue unaffected.
    let chapter_path = store.book_dir().join("ch01_chapter_1.md");
    std::fs::write(&chapter_path, "# Chapter 1: Chapter 1\n\nStill works.")?;
    let metadata = store.record_chapter_completion(0, &chapter_path, "Still works.")?;
    assert_eq!(metadata.book_info.completed_chapters, 1);
    assert_eq!(metadata.chapters[0].status, ChapterStatus::Published);
    assert!(store.load()?.is_some());

    Ok(())
}

#[tokio::test]
async fn push_without_local_metadata_is_false_not_an_error() -> anyhow::Result<()> {
    let stub = MirrorStub::spawn();
    let temp = tempfile::TempDir::new()?;

    let collection = HttpRemoteCollection::new(&stub.base_url)?;
    assert!(!remote::push(&collection, temp.path(), "Never Created").await);
    assert!(remote::list_summaries(&collection).await.is_empty());

    Ok(())
}

#[test]
fn sync_push_cli_reports_result_per_slug() -> anyhow::Result<()> {
    let stub = MirrorStub::spawn();
    let temp = tempfile::TempDir::new()?;
    seed_book(temp.path(), "cli", 1);

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("bookwright");
    cmd.args([
        "sync",
        "push",
        "--mirror-url",
        &stub.base_url,
        "--books-dir",
        temp.path().to_str().unwrap(),
        "--title",
        "Book about cli",
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("book_book_about_cli: synced=true"));

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("bookwright");
    cmd.args(["sync", "list", "--mirror-url", &stub.base_url])
        .assert()
        .success()
        .stdout(predicate::str::contains("Book about cli"));

    Ok(())
}
