//! Direct retrieval without grounding.
//!
//! `hm search` and `GET /search` normalize the query, run it once against
//! the FTS5 index and return ranked hits. No expansion, no evidence check.

use anyhow::Result;
use std::sync::Arc;

use household_memory_core::models::format_ts_iso;
use household_memory_core::pipeline::MAX_SEARCH_LIMIT;
use household_memory_core::{Hit, RecallPipeline};

use crate::config::Config;
use crate::records::open_store;

/// Search with an explicit limit, capped at 20.
pub async fn search_records(config: &Config, query: &str, limit: Option<usize>) -> Result<Vec<Hit>> {
    let store = Arc::new(open_store(config).await?);
    let pipeline = RecallPipeline::new(store.clone(), config.pipeline())?;
    let limit = limit
        .unwrap_or(config.retrieval.limit)
        .min(MAX_SEARCH_LIMIT);

    let hits = pipeline.search(query, limit).await;
    store.pool().close().await;
    Ok(hits?)
}

/// CLI entry point for `hm search`.
pub async fn run_search(config: &Config, query: &str, limit: Option<usize>) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let hits = search_records(config, query, limit).await?;
    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        println!("{}. [{:.2}] {}", i + 1, hit.rank, hit.title);
        println!("    created: {}", format_ts_iso(&hit.created_at));
        println!("    excerpt: \"{}\"", hit.snippet.replace('\n', " ").trim());
        println!("    id: {}", hit.record_id);
        println!();
    }

    Ok(())
}
