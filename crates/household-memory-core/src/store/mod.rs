//! Storage abstractions consumed by the core.
//!
//! The core only reads. [`SearchIndex`] answers full-text queries in the
//! conjunctive-prefix syntax produced by
//! [`normalize_query`](crate::normalize::normalize_query), and
//! [`RecordStore`] fetches a single record by id. Writes belong to the
//! concrete backend and are not part of either trait.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::error::{RecallError, RecallResult};
use crate::models::{RawHit, Record};

/// Full-text search provider.
///
/// # Contract
///
/// - `query` is a space-separated list of `term*` prefix terms; every term
///   must match (implicit AND).
/// - At most `limit` hits are returned, most relevant first.
/// - [`RawHit::raw_score`] is lower-is-better and non-negative.
/// - An unreachable or malformed backend returns `Err`; no matches is
///   `Ok(vec![])`.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<RawHit>>;
}

/// Read access to stored records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch a record by id. `Ok(None)` when it does not exist.
    async fn get(&self, id: &str) -> Result<Option<Record>>;
}

/// Fetch a record, reporting backend failures as [`RecallError::Store`].
pub async fn fetch_record<S: RecordStore + ?Sized>(
    store: &S,
    id: &str,
) -> RecallResult<Option<Record>> {
    store
        .get(id)
        .await
        .map_err(|e| RecallError::Store(format!("{e:#}")))
}
