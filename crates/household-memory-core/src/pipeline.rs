//! The recall pipeline: the two caller-facing operations.
//!
//! [`RecallPipeline::search`] is direct retrieval: normalize, one index
//! call, rank. [`RecallPipeline::answer`] runs the whole flow. The direct
//! search and the (optional) expansion call run concurrently; expansion
//! variants are then searched together, merged with the direct hits and
//! handed to the evaluator and assembler.

use std::sync::Arc;

use crate::assemble::assemble;
use crate::error::{RecallError, RecallResult};
use crate::evidence::EvidenceThresholds;
use crate::executor::{execute_all, search_variant, VariantResult};
use crate::expand::{ExpansionSettings, QueryExpander, TextGenerator};
use crate::merge::merge_variants;
use crate::models::{Answer, Hit};
use crate::normalize::normalize_query;
use crate::store::SearchIndex;

/// Default number of hits fetched per variant.
pub const DEFAULT_SEARCH_LIMIT: usize = 5;
/// Upper bound on any per-call search limit.
pub const MAX_SEARCH_LIMIT: usize = 20;

/// Everything the pipeline is tuned by, passed in at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub search_limit: usize,
    pub evidence: EvidenceThresholds,
    pub expansion: ExpansionSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            search_limit: DEFAULT_SEARCH_LIMIT,
            evidence: EvidenceThresholds::default(),
            expansion: ExpansionSettings::default(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> RecallResult<()> {
        if self.search_limit == 0 || self.search_limit > MAX_SEARCH_LIMIT {
            return Err(RecallError::Config(format!(
                "retrieval.limit must be between 1 and {}",
                MAX_SEARCH_LIMIT
            )));
        }
        if self.expansion.timeout.is_zero() {
            return Err(RecallError::Config(
                "expansion.timeout_ms must be greater than zero".into(),
            ));
        }
        self.evidence.validate()
    }
}

/// Question answering over a [`SearchIndex`].
///
/// Stateless between calls; share it behind an `Arc` and call it from as
/// many tasks as needed.
pub struct RecallPipeline<S: SearchIndex + ?Sized> {
    index: Arc<S>,
    config: PipelineConfig,
    expander: Option<QueryExpander>,
}

impl<S: SearchIndex + ?Sized> RecallPipeline<S> {
    pub fn new(index: Arc<S>, config: PipelineConfig) -> RecallResult<Self> {
        config.validate()?;
        Ok(Self {
            index,
            config,
            expander: None,
        })
    }

    /// Enable query expansion through `generator`, using the pipeline's
    /// expansion settings.
    pub fn with_generator(self, generator: Arc<dyn TextGenerator>) -> Self {
        let expander = QueryExpander::new(generator, self.config.expansion.clone());
        self.with_expander(expander)
    }

    pub fn with_expander(mut self, expander: QueryExpander) -> Self {
        self.expander = Some(expander);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn index(&self) -> &Arc<S> {
        &self.index
    }

    /// Direct retrieval: no expansion, no grounding.
    ///
    /// At most `limit` hits, with `limit` capped at 20; a zero limit or a
    /// query that normalizes to nothing returns no hits.
    pub async fn search(&self, query: &str, limit: usize) -> RecallResult<Vec<Hit>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let limit = limit.min(MAX_SEARCH_LIMIT);
        let normalized = normalize_query(query);
        let direct = search_variant(self.index.as_ref(), &normalized, limit).await;
        let direct = check_direct(direct)?;

        let mut hits = merge_variants(std::slice::from_ref(&direct));
        hits.truncate(limit);
        Ok(hits)
    }

    /// Answer a question from stored records.
    pub async fn answer(&self, question: &str) -> RecallResult<Answer> {
        let limit = self.config.search_limit;
        let direct_query = normalize_query(question);

        let direct_search = search_variant(self.index.as_ref(), &direct_query, limit);
        let (direct, expansions) = match &self.expander {
            Some(expander) => {
                futures::join!(direct_search, expander.expand(&direct_query, question))
            }
            None => (direct_search.await, Vec::new()),
        };
        let direct = check_direct(direct)?;

        let mut variants = vec![direct];
        if !expansions.is_empty() {
            variants.extend(execute_all(self.index.as_ref(), &expansions, limit).await);
        }

        let hits = merge_variants(&variants);
        let answer = assemble(&hits, &self.config.evidence);
        tracing::debug!(
            query = %direct_query,
            variants = variants.len(),
            hits = hits.len(),
            confidence = %answer.confidence,
            "answered question"
        );
        Ok(answer)
    }
}

fn check_direct(result: VariantResult) -> RecallResult<VariantResult> {
    match &result.hits {
        Ok(_) => Ok(result),
        Err(message) => Err(RecallError::SearchBackend(message.clone())),
    }
}
