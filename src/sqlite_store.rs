//! SQLite-backed [`SearchIndex`] and [`RecordStore`].
//!
//! Records live in `records`; `records_fts` is an external-content FTS5
//! index over title and content kept in sync by triggers (see
//! [`migrate`](crate::migrate)).
//!
//! # Scores
//!
//! FTS5's `bm25()` is negative, more negative meaning more relevant, and
//! its scale depends on corpus statistics. Each hit is reported as its
//! distance from the best hit of the same query: `bm25 − min(bm25)`. The
//! result is non-negative and lower-is-better, and the top hit always
//! scores `0`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use household_memory_core::normalize::query_terms;
use household_memory_core::store::{RecordStore, SearchIndex};
use household_memory_core::{RawHit, Record, SourceKind};

/// Tokens of context on each side of the match in a snippet.
const SNIPPET_TOKENS: i64 = 32;

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert a fully-formed record. The FTS index is updated by trigger.
    pub async fn insert_record(&self, record: &Record) -> Result<()> {
        let tags_json = serde_json::to_string(&record.tags)?;
        sqlx::query(
            r#"
            INSERT INTO records (id, title, content, tags_json, source_kind, source_ref, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.title)
        .bind(&record.content)
        .bind(&tags_json)
        .bind(record.source_kind.as_str())
        .bind(&record.source_ref)
        .bind(record.created_at.timestamp())
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to insert record {}", record.id))?;
        Ok(())
    }

    /// Whether the database answers a trivial query.
    pub async fn ping(&self) -> bool {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}

/// Quote each prefix term so FTS5 never reads user text as syntax.
fn fts_expression(query: &str) -> String {
    query_terms(query)
        .iter()
        .map(|term| format!("\"{}\"*", term.replace('"', "")))
        .collect::<Vec<_>>()
        .join(" ")
}

fn ts_to_datetime(ts: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(ts, 0).unwrap_or_default()
}

fn row_to_record(row: &SqliteRow) -> Result<Record> {
    let tags_json: String = row.get("tags_json");
    let source_kind: String = row.get("source_kind");
    let created_at: i64 = row.get("created_at");

    Ok(Record {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        tags: serde_json::from_str(&tags_json).unwrap_or_default(),
        source_kind: source_kind
            .parse::<SourceKind>()
            .map_err(|e| anyhow::anyhow!(e))?,
        source_ref: row.get("source_ref"),
        created_at: ts_to_datetime(created_at),
    })
}

#[async_trait]
impl SearchIndex for SqliteStore {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<RawHit>> {
        let expression = fts_expression(query);
        if expression.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            r#"
            SELECT r.id AS id,
                   r.title AS title,
                   r.created_at AS created_at,
                   snippet(records_fts, 1, '', '', '…', ?) AS snippet,
                   bm25(records_fts) AS score
            FROM records_fts
            JOIN records r ON r.seq = records_fts.rowid
            WHERE records_fts MATCH ?
            ORDER BY score ASC, r.created_at DESC, r.id ASC
            LIMIT ?
            "#,
        )
        .bind(SNIPPET_TOKENS)
        .bind(&expression)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Full-text search failed for '{}'", expression))?;

        let best = rows
            .first()
            .map(|row| row.get::<f64, _>("score"))
            .unwrap_or(0.0);

        Ok(rows
            .iter()
            .map(|row| {
                let score: f64 = row.get("score");
                RawHit {
                    record_id: row.get("id"),
                    title: row.get("title"),
                    created_at: ts_to_datetime(row.get("created_at")),
                    snippet: row.get("snippet"),
                    raw_score: (score - best).max(0.0),
                }
            })
            .collect())
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn get(&self, id: &str) -> Result<Option<Record>> {
        let row = sqlx::query(
            "SELECT id, title, content, tags_json, source_kind, source_ref, created_at FROM records WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_record).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use household_memory_core::{Confidence, PipelineConfig, RecallPipeline};
    use sqlx::sqlite::SqlitePoolOptions;
    use std::sync::Arc;

    async fn store() -> SqliteStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::migrate::apply(&pool).await.unwrap();
        SqliteStore::new(pool)
    }

    async fn count(store: &SqliteStore) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM records")
            .fetch_one(store.pool())
            .await
            .unwrap()
    }

    fn record(id: &str, title: &str, content: &str, day: u32) -> Record {
        Record {
            id: id.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            tags: vec!["boiler".to_string()],
            source_kind: SourceKind::Document,
            source_ref: Some("invoice.pdf".to_string()),
            created_at: Utc.with_ymd_and_hms(2025, 10, day, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_fts_expression_quotes_terms() {
        assert_eq!(fts_expression("boiler* serviced*"), "\"boiler\"* \"serviced\"*");
        assert_eq!(fts_expression(""), "");
    }

    #[tokio::test]
    async fn test_insert_and_get_round_trip() {
        let store = store().await;
        let rec = record("r1", "Boiler service", "Serviced by ABC Heating", 12);
        store.insert_record(&rec).await.unwrap();
        assert_eq!(store.get("r1").await.unwrap(), Some(rec));
        assert!(store.get("nope").await.unwrap().is_none());
        assert_eq!(count(&store).await, 1);
        assert!(store.ping().await);
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let store = store().await;
        let rec = record("r1", "Boiler", "serviced", 1);
        store.insert_record(&rec).await.unwrap();
        assert!(store.insert_record(&rec).await.is_err());
    }

    #[tokio::test]
    async fn test_search_prefix_and_conjunction() {
        let store = store().await;
        store
            .insert_record(&record(
                "r1",
                "Boiler service",
                "Boiler serviced on 2025-10-12 by ABC Heating",
                12,
            ))
            .await
            .unwrap();
        store
            .insert_record(&record("r2", "Boiler pressure", "Pressure dropped to 0.8 bar", 13))
            .await
            .unwrap();

        let hits = store.search("boiler* servic*", 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record_id, "r1");
        assert_eq!(hits[0].raw_score, 0.0);
        assert!(hits[0].snippet.contains("2025-10-12"));

        let hits = store.search("boiler*", 5).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.raw_score >= 0.0));
        assert!(hits[0].raw_score <= hits[1].raw_score);

        assert_eq!(store.search("boiler*", 1).await.unwrap().len(), 1);
        assert!(store.search("", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_top_hit_always_ranks_one() {
        let store = Arc::new(store().await);
        // A long note that mentions the term once: weak by bm25, still first.
        let filler = "garden hedge fence shed path lawn ".repeat(40);
        store
            .insert_record(&record("r1", "Garden notes", &format!("{} boiler", filler), 3))
            .await
            .unwrap();

        let pipeline = RecallPipeline::new(store, PipelineConfig::default()).unwrap();
        let hits = pipeline.search("boiler", 5).await.unwrap();
        assert_eq!(hits[0].rank, 1.0);
        let answer = pipeline.answer("boiler?").await.unwrap();
        assert_eq!(answer.confidence, Confidence::High);
    }
}
