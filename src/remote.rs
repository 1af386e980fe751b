use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use chrono::Utc;

use crate::cli::{SyncListArgs, SyncPullArgs, SyncPushAllArgs, SyncPushArgs};
use crate::formats::{MirrorDocument, MirrorSummary};
use crate::slug;
use crate::store::MetadataStore;

/// Keyed remote document collection the mirror speaks to. Behind a trait
/// so tests (and future driver-backed stores) can substitute their own.
#[async_trait]
pub trait RemoteCollection: Send + Sync {
    async fn upsert(&self, key: &str, document: &serde_json::Value) -> anyhow::Result<()>;
    async fn find_one(&self, key: &str) -> anyhow::Result<Option<serde_json::Value>>;
    async fn list(&self) -> anyhow::Result<Vec<serde_json::Value>>;
}

/// REST client for a keyed document collection:
/// `PUT/GET {base}/books/{key}`, `GET {base}/books`.
#[derive(Debug, Clone)]
pub struct HttpRemoteCollection {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRemoteCollection {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("build http client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    fn document_endpoint(&self, key: &str) -> String {
        format!("{}/books/{key}", self.base_url)
    }

    fn collection_endpoint(&self) -> String {
        format!("{}/books", self.base_url)
    }
}

#[async_trait]
impl RemoteCollection for HttpRemoteCollection {
    async fn upsert(&self, key: &str, document: &serde_json::Value) -> anyhow::Result<()> {
        let endpoint = self.document_endpoint(key);
        let response = self
            .client
            .put(&endpoint)
            .json(document)
            .send()
            .await
            .with_context(|| format!("PUT {endpoint}"))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("mirror upsert failed ({status})");
        }
        Ok(())
    }

    async fn find_one(&self, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
        let endpoint = self.document_endpoint(key);
        let response = self
            .client
            .get(&endpoint)
            .send()
            .await
            .with_context(|| format!("GET {endpoint}"))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            anyhow::bail!("mirror lookup failed ({status})");
        }

        let value = response.json().await.context("parse mirror document")?;
        Ok(Some(value))
    }

    async fn list(&self) -> anyhow::Result<Vec<serde_json::Value>> {
        let endpoint = self.collection_endpoint();
        let response = self
            .client
            .get(&endpoint)
            .send()
            .await
            .with_context(|| format!("GET {endpoint}"))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("mirror listing failed ({status})");
        }

        let values = response.json().await.context("parse mirror listing")?;
        Ok(values)
    }
}

/// Upsert one book's local metadata into the mirror, keyed by slug.
///
/// The mirror is non-authoritative: every failure (missing local document,
/// unreachable remote, rejected write) degrades to `false` and a warning,
/// never an error.
pub async fn push(collection: &dyn RemoteCollection, books_dir: &Path, title: &str) -> bool {
    let store = MetadataStore::new(books_dir, title);

    let metadata = match store.load() {
        Ok(Some(metadata)) => metadata,
        Ok(None) => {
            tracing::warn!(slug = store.slug(), "no local metadata to mirror");
            return false;
        }
        Err(err) => {
            tracing::warn!(slug = store.slug(), error = %format!("{err:#}"), "failed to load local metadata");
            return false;
        }
    };

    let document = MirrorDocument {
        key: store.slug().to_owned(),
        title: title.to_owned(),
        slug: store.slug().to_owned(),
        metadata,
        synced_at: Utc::now(),
    };
    let value = match serde_json::to_value(&document) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(slug = store.slug(), error = %err, "failed to serialize mirror document");
            return false;
        }
    };

    match collection.upsert(store.slug(), &value).await {
        Ok(()) => {
            tracing::info!(slug = store.slug(), "metadata mirrored");
            true
        }
        Err(err) => {
            tracing::warn!(slug = store.slug(), error = %format!("{err:#}"), "mirror push failed");
            false
        }
    }
}

/// Point lookup of a book's mirrored metadata. Returns an empty JSON
/// object when the mirror is unreachable or has no entry.
pub async fn pull(collection: &dyn RemoteCollection, title: &str) -> serde_json::Value {
    let key = slug::normalize(title);
    let empty = serde_json::Value::Object(Default::default());

    match collection.find_one(&key).await {
        Ok(Some(document)) => document.get("metadata").cloned().unwrap_or(empty),
        Ok(None) => {
            tracing::warn!(slug = %key, "no metadata found in mirror");
            empty
        }
        Err(err) => {
            tracing::warn!(slug = %key, error = %format!("{err:#}"), "mirror pull failed");
            empty
        }
    }
}

/// Push every book under the books root; individual failures do not
/// abort the batch. Keyed by slug (directory name).
pub async fn push_all(
    collection: &dyn RemoteCollection,
    books_dir: &Path,
) -> BTreeMap<String, bool> {
    let mut results = BTreeMap::new();

    let entries = match std::fs::read_dir(books_dir) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!(books_dir = %books_dir.display(), error = %err, "no books directory to sync");
            return results;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(dir_slug) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };

        let store = MetadataStore::for_slug(books_dir, dir_slug);
        let title = match store.load() {
            Ok(Some(metadata)) => metadata.book_info.title,
            Ok(None) => continue,
            Err(err) => {
                tracing::warn!(slug = dir_slug, error = %format!("{err:#}"), "skipping unreadable book");
                results.insert(dir_slug.to_owned(), false);
                continue;
            }
        };

        let success = push(collection, books_dir, &title).await;
        results.insert(dir_slug.to_owned(), success);
    }

    let synced = results.values().filter(|ok| **ok).count();
    tracing::info!(synced, total = results.len(), "bulk mirror sync finished");
    results
}

/// Projection over the remote collection; malformed entries are skipped,
/// an unreachable mirror yields an empty listing.
pub async fn list_summaries(collection: &dyn RemoteCollection) -> Vec<MirrorSummary> {
    let documents = match collection.list().await {
        Ok(documents) => documents,
        Err(err) => {
            tracing::warn!(error = %format!("{err:#}"), "mirror listing failed");
            return Vec::new();
        }
    };

    let mut summaries = Vec::new();
    for value in documents {
        match serde_json::from_value::<MirrorDocument>(value) {
            Ok(document) => summaries.push(MirrorSummary {
                slug: document.slug,
                title: document.title,
                book_info: document.metadata.book_info,
                synced_at: document.synced_at,
            }),
            Err(err) => {
                tracing::warn!(error = %err, "skipping malformed mirror document");
            }
        }
    }
    summaries
}

pub async fn run_push(args: SyncPushArgs) -> anyhow::Result<()> {
    let collection = HttpRemoteCollection::new(&args.mirror_url)?;
    let synced = push(&collection, Path::new(&args.books_dir), &args.title).await;
    println!("{}: synced={synced}", slug::normalize(&args.title));
    Ok(())
}

pub async fn run_pull(args: SyncPullArgs) -> anyhow::Result<()> {
    let collection = HttpRemoteCollection::new(&args.mirror_url)?;
    let metadata = pull(&collection, &args.title).await;
    println!(
        "{}",
        serde_json::to_string_pretty(&metadata).context("render pulled metadata")?
    );
    Ok(())
}

pub async fn run_push_all(args: SyncPushAllArgs) -> anyhow::Result<()> {
    let collection = HttpRemoteCollection::new(&args.mirror_url)?;
    let results = push_all(&collection, Path::new(&args.books_dir)).await;
    for (slug, synced) in &results {
        println!("{slug}: synced={synced}");
    }
    Ok(())
}

pub async fn run_list(args: SyncListArgs) -> anyhow::Result<()> {
    let collection = HttpRemoteCollection::new(&args.mirror_url)?;
    for summary in list_summaries(&collection).await {
        println!(
            "{}\t{}\t{} ({}/{})\tsynced {}",
            summary.slug,
            summary.title,
            summary.book_info.status,
            summary.book_info.completed_chapters,
            summary.book_info.total_chapters,
            summary.synced_at.to_rfc3339(),
        );
    }
    Ok(())
}
