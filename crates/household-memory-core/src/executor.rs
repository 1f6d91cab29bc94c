//! Concurrent fan-out of query variants to a [`SearchIndex`].
//!
//! Every non-empty variant is searched independently and concurrently with
//! [`futures::future::join_all`]. A variant that fails is logged and
//! reported in its [`VariantResult`]; it does not affect the others. Empty
//! variants are skipped without calling the index.

use futures::future::join_all;

use crate::models::RawHit;
use crate::store::SearchIndex;

/// Raw hits returned for one query variant.
#[derive(Debug, Clone)]
pub struct VariantResult {
    pub query: String,
    /// `Err` holds the backend error message.
    pub hits: Result<Vec<RawHit>, String>,
}

impl VariantResult {
    pub fn is_ok(&self) -> bool {
        self.hits.is_ok()
    }
}

/// Search one variant. Empty queries yield `Ok(vec![])` without a backend call.
pub async fn search_variant<S: SearchIndex + ?Sized>(
    index: &S,
    query: &str,
    limit: usize,
) -> VariantResult {
    if query.trim().is_empty() {
        return VariantResult {
            query: query.to_string(),
            hits: Ok(Vec::new()),
        };
    }

    let hits = match index.search(query, limit).await {
        Ok(mut hits) => {
            hits.truncate(limit);
            tracing::debug!(query, count = hits.len(), "variant returned hits");
            Ok(hits)
        }
        Err(err) => {
            let message = format!("{err:#}");
            tracing::warn!(query, error = %message, "variant search failed");
            Err(message)
        }
    };

    VariantResult {
        query: query.to_string(),
        hits,
    }
}

/// Search all non-empty, distinct variants concurrently.
///
/// Results keep the order of `queries` (after dropping empties and repeats).
pub async fn execute_all<S: SearchIndex + ?Sized>(
    index: &S,
    queries: &[String],
    limit: usize,
) -> Vec<VariantResult> {
    let mut distinct: Vec<&str> = Vec::new();
    for q in queries {
        let q = q.as_str();
        if !q.trim().is_empty() && !distinct.contains(&q) {
            distinct.push(q);
        }
    }

    join_all(distinct.into_iter().map(|q| search_variant(index, q, limit))).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns one hit per query word; fails on queries containing "broken".
    struct EchoIndex {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SearchIndex for EchoIndex {
        async fn search(&self, query: &str, limit: usize) -> Result<Vec<RawHit>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if query.contains("broken") {
                anyhow::bail!("index unavailable");
            }
            Ok(query
                .split_whitespace()
                .chain(std::iter::repeat("extra").take(10))
                .map(|w| RawHit {
                    record_id: w.to_string(),
                    title: w.to_string(),
                    created_at: Utc::now(),
                    snippet: String::new(),
                    raw_score: 0.0,
                })
                .take(limit + 5)
                .collect())
        }
    }

    fn index() -> EchoIndex {
        EchoIndex {
            calls: AtomicUsize::new(0),
        }
    }

    #[tokio::test]
    async fn test_empty_variant_skipped() {
        let idx = index();
        let result = search_variant(&idx, "   ", 5).await;
        assert!(result.hits.unwrap().is_empty());
        assert_eq!(idx.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_limit_enforced() {
        let idx = index();
        let result = search_variant(&idx, "a* b*", 3).await;
        assert_eq!(result.hits.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_failure_isolated_per_variant() {
        let idx = index();
        let queries = vec![
            "boiler*".to_string(),
            "broken*".to_string(),
            String::new(),
            "boiler*".to_string(),
            "roof*".to_string(),
        ];
        let results = execute_all(&idx, &queries, 5).await;
        assert_eq!(results.len(), 3);
        assert_eq!(idx.calls.load(Ordering::SeqCst), 3);
        assert!(results[0].is_ok());
        assert!(!results[1].is_ok());
        assert!(results[1].hits.as_ref().unwrap_err().contains("index unavailable"));
        assert_eq!(results[2].query, "roof*");
        assert!(results[2].is_ok());
    }
}
