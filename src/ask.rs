//! Grounded question answering.
//!
//! Wires the SQLite store and the configured text-generation provider into
//! a [`RecallPipeline`]. Shared by `hm ask` and `POST /ask`.

use anyhow::Result;
use std::sync::Arc;

use household_memory_core::models::format_ts_iso;
use household_memory_core::{Answer, RecallPipeline};

use crate::config::Config;
use crate::generation::create_generator;
use crate::records::open_store;
use crate::sqlite_store::SqliteStore;

/// Build the pipeline for `store` from config.
///
/// An expansion provider that cannot be built (missing API key, bad model)
/// is logged and skipped; questions are then answered from direct search.
pub fn build_pipeline(
    config: &Config,
    store: Arc<SqliteStore>,
) -> Result<RecallPipeline<SqliteStore>> {
    let pipeline = RecallPipeline::new(store, config.pipeline())?;
    match create_generator(config) {
        Ok(Some(generator)) => {
            tracing::info!(provider = generator.name(), "query expansion enabled");
            Ok(pipeline.with_generator(generator))
        }
        Ok(None) => Ok(pipeline),
        Err(e) => {
            tracing::warn!(error = %format!("{e:#}"), "query expansion unavailable");
            Ok(pipeline)
        }
    }
}

pub async fn ask(config: &Config, question: &str) -> Result<Answer> {
    let store = Arc::new(open_store(config).await?);
    let pipeline = build_pipeline(config, store.clone())?;
    let answer = pipeline.answer(question).await;
    store.pool().close().await;
    Ok(answer?)
}

/// CLI entry point for `hm ask`.
pub async fn run_ask(config: &Config, question: &str, json: bool) -> Result<()> {
    let answer = ask(config, question).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
        return Ok(());
    }

    println!("{}", answer.answer);
    println!();
    println!("confidence: {}", answer.confidence);

    if !answer.citations.is_empty() {
        println!();
        println!("--- Citations ({}) ---", answer.citations.len());
        for (i, hit) in answer.citations.iter().enumerate() {
            println!(
                "{}. [{:.2}] {} ({})",
                i + 1,
                hit.rank,
                hit.title,
                format_ts_iso(&hit.created_at)
            );
            println!("    id: {}", hit.record_id);
        }
    }

    if !answer.follow_up_to_store.is_empty() {
        println!();
        println!("--- To answer this next time, store ---");
        for prompt in &answer.follow_up_to_store {
            println!("- {}", prompt);
        }
    }

    Ok(())
}
