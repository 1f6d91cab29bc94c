//! In-memory [`SearchIndex`] and [`RecordStore`] for tests and embedding.
//!
//! Records live in a `Vec` behind `std::sync::RwLock`. Search tokenizes
//! title and content with the normalizer's tokenizer and requires every
//! query term to prefix-match at least one token. The raw score is
//! `1 / matched_token_count`, so records mentioning the query terms more
//! often score lower (better).

use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::{RawHit, Record};
use crate::normalize::{query_terms, tokenize};

use super::{RecordStore, SearchIndex};

const SNIPPET_CHARS: usize = 240;

/// In-memory record store with a brute-force prefix index.
pub struct InMemoryStore {
    records: RwLock<Vec<Record>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    pub fn with_records(records: Vec<Record>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    /// Insert a record, replacing any record with the same id.
    pub fn insert(&self, record: Record) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))?;
        records.retain(|r| r.id != record.id);
        records.push(record);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Number of document tokens matched by some term, or `None` if any term
/// matches nothing.
fn conjunctive_matches(terms: &[String], tokens: &[String]) -> Option<usize> {
    if terms
        .iter()
        .any(|term| !tokens.iter().any(|tok| tok.starts_with(term.as_str())))
    {
        return None;
    }
    Some(
        tokens
            .iter()
            .filter(|tok| terms.iter().any(|term| tok.starts_with(term.as_str())))
            .count(),
    )
}

#[async_trait]
impl SearchIndex for InMemoryStore {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<RawHit>> {
        let terms = query_terms(query);
        if terms.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let records = self
            .records
            .read()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))?;

        let mut hits: Vec<RawHit> = records
            .iter()
            .filter_map(|record| {
                let tokens = tokenize(&format!("{} {}", record.title, record.content));
                let matched = conjunctive_matches(&terms, &tokens)?;
                Some(RawHit {
                    record_id: record.id.clone(),
                    title: record.title.clone(),
                    created_at: record.created_at,
                    snippet: record.content.chars().take(SNIPPET_CHARS).collect(),
                    raw_score: 1.0 / matched.max(1) as f64,
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            a.raw_score
                .partial_cmp(&b.raw_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.created_at.cmp(&a.created_at))
                .then(a.record_id.cmp(&b.record_id))
        });
        hits.truncate(limit);
        Ok(hits)
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn get(&self, id: &str) -> Result<Option<Record>> {
        let records = self
            .records
            .read()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))?;
        Ok(records.iter().find(|r| r.id == id).cloned())
    }
}
