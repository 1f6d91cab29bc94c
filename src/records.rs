//! Writing and reading individual records.
//!
//! Used by the `hm add` / `hm get` commands and the `POST /records` /
//! `GET /records/{id}` endpoints. New records get a UUID v4 id and the
//! current UTC time; the caller supplies everything else.

use anyhow::{bail, Result};
use chrono::{SubsecRound, Utc};
use serde::Deserialize;

use household_memory_core::store::fetch_record;
use household_memory_core::{models::format_ts_iso, Record, SourceKind};

use crate::config::Config;
use crate::db;
use crate::migrate;
use crate::sqlite_store::SqliteStore;

/// A record as submitted by a user, before it has an id or timestamp.
#[derive(Debug, Clone, Deserialize)]
pub struct NewRecord {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub source_kind: SourceKind,
    #[serde(default)]
    pub source_ref: Option<String>,
}

impl NewRecord {
    /// Validate and stamp the record. Title and content must be non-empty;
    /// tags are trimmed and blank tags dropped. The timestamp is whole
    /// seconds, matching what the store keeps.
    pub fn into_record(self) -> Result<Record> {
        let title = self.title.trim().to_string();
        let content = self.content.trim().to_string();
        if title.is_empty() {
            bail!("title must not be empty");
        }
        if content.is_empty() {
            bail!("content must not be empty");
        }

        let tags = self
            .tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        let source_ref = self
            .source_ref
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(Record {
            id: uuid::Uuid::new_v4().to_string(),
            title,
            content,
            tags,
            source_kind: self.source_kind,
            source_ref,
            created_at: Utc::now().trunc_subsecs(0),
        })
    }
}

/// Split a comma-separated `--tags` value.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Connect and make sure the schema exists.
pub async fn open_store(config: &Config) -> Result<SqliteStore> {
    let pool = db::connect(config).await?;
    migrate::apply(&pool).await?;
    Ok(SqliteStore::new(pool))
}

/// Persist a record built by [`NewRecord::into_record`].
pub async fn add_record(store: &SqliteStore, record: &Record) -> Result<()> {
    store.insert_record(record).await?;
    tracing::info!(id = %record.id, kind = %record.source_kind, "stored record");
    Ok(())
}

/// CLI entry point for `hm add`.
pub async fn run_add(config: &Config, new: NewRecord) -> Result<()> {
    let record = new.into_record()?;
    let store = open_store(config).await?;
    add_record(&store, &record).await?;
    store.pool().close().await;

    println!("Stored record: {}", record.id);
    Ok(())
}

/// CLI entry point for `hm get <id>`.
pub async fn run_get(config: &Config, id: &str) -> Result<()> {
    let store = open_store(config).await?;
    let record = fetch_record(&store, id).await;
    store.pool().close().await;

    let record = match record? {
        Some(r) => r,
        None => {
            eprintln!("Error: record not found: {}", id);
            std::process::exit(1);
        }
    };

    println!("--- Record ---");
    println!("id:          {}", record.id);
    println!("title:       {}", record.title);
    println!("source_kind: {}", record.source_kind);
    if let Some(ref source_ref) = record.source_ref {
        println!("source_ref:  {}", source_ref);
    }
    if !record.tags.is_empty() {
        println!("tags:        {}", record.tags.join(", "));
    }
    println!("created_at:  {}", format_ts_iso(&record.created_at));
    println!();
    println!("--- Content ---");
    println!("{}", record.content);

    Ok(())
}
