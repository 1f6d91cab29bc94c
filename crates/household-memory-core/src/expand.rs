//! Best-effort query expansion through a text-generation provider.
//!
//! A [`QueryExpander`] asks a [`TextGenerator`] for alternate phrasings of
//! the question, normalizes each one, and returns the ones that add a new
//! query. It never fails: provider errors, timeouts and unusable output all
//! produce an empty list, and the pipeline carries on with the direct query
//! alone.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::normalize::normalize_query;

/// Default cap on extra queries per question.
pub const DEFAULT_MAX_EXPANSIONS: usize = 3;
/// Default time budget for one expansion call.
pub const DEFAULT_EXPANSION_TIMEOUT: Duration = Duration::from_millis(2500);

/// External text-generation provider.
///
/// Returns alternate phrasings or keyword lists for a question. May fail or
/// hang; the caller bounds it with a timeout.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Provider identifier used in logs (e.g. `"openai"`).
    fn name(&self) -> &str;

    async fn expand(&self, question: &str) -> Result<Vec<String>>;
}

/// Expansion tuning, decoupled from application config.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpansionSettings {
    /// Maximum number of additional queries (K).
    pub max_expansions: usize,
    /// Time budget for the provider call.
    pub timeout: Duration,
}

impl Default for ExpansionSettings {
    fn default() -> Self {
        Self {
            max_expansions: DEFAULT_MAX_EXPANSIONS,
            timeout: DEFAULT_EXPANSION_TIMEOUT,
        }
    }
}

/// Wraps a [`TextGenerator`] with normalization, dedup, a cap and a timeout.
#[derive(Clone)]
pub struct QueryExpander {
    generator: Arc<dyn TextGenerator>,
    settings: ExpansionSettings,
}

impl QueryExpander {
    pub fn new(generator: Arc<dyn TextGenerator>, settings: ExpansionSettings) -> Self {
        Self {
            generator,
            settings,
        }
    }

    pub fn settings(&self) -> &ExpansionSettings {
        &self.settings
    }

    /// Produce up to `max_expansions` extra normalized queries.
    ///
    /// `direct_query` is the already-normalized question; results never
    /// repeat it or each other and are never empty strings.
    pub async fn expand(&self, direct_query: &str, question: &str) -> Vec<String> {
        if self.settings.max_expansions == 0 {
            return Vec::new();
        }

        let provider = self.generator.name().to_string();
        let call = self.generator.expand(question);
        let phrasings = match tokio::time::timeout(self.settings.timeout, call).await {
            Ok(Ok(phrasings)) => phrasings,
            Ok(Err(err)) => {
                tracing::warn!(%provider, error = %format!("{err:#}"), "query expansion failed");
                return Vec::new();
            }
            Err(_) => {
                tracing::warn!(
                    %provider,
                    timeout_ms = self.settings.timeout.as_millis() as u64,
                    "query expansion timed out"
                );
                return Vec::new();
            }
        };

        let queries = dedup_expansions(direct_query, &phrasings, self.settings.max_expansions);
        tracing::debug!(%provider, returned = phrasings.len(), kept = queries.len(), "query expansion");
        queries
    }
}

/// Normalize phrasings and keep at most `cap` new, distinct, non-empty queries.
pub fn dedup_expansions(direct_query: &str, phrasings: &[String], cap: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for phrasing in phrasings {
        if out.len() >= cap {
            break;
        }
        let query = normalize_query(phrasing);
        if query.is_empty() || query == direct_query || out.contains(&query) {
            continue;
        }
        out.push(query);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedGenerator(Vec<String>);

    #[async_trait]
    impl TextGenerator for FixedGenerator {
        fn name(&self) -> &str {
            "fixed"
        }
        async fn expand(&self, _question: &str) -> Result<Vec<String>> {
            Ok(self.0.clone())
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl TextGenerator for FailingGenerator {
        fn name(&self) -> &str {
            "failing"
        }
        async fn expand(&self, _question: &str) -> Result<Vec<String>> {
            anyhow::bail!("provider returned 500")
        }
    }

    struct SlowGenerator;

    #[async_trait]
    impl TextGenerator for SlowGenerator {
        fn name(&self) -> &str {
            "slow"
        }
        async fn expand(&self, _question: &str) -> Result<Vec<String>> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(vec!["too late".to_string()])
        }
    }

    fn expander(generator: impl TextGenerator + 'static, max: usize) -> QueryExpander {
        QueryExpander::new(
            Arc::new(generator),
            ExpansionSettings {
                max_expansions: max,
                timeout: Duration::from_millis(50),
            },
        )
    }

    #[test]
    fn test_dedup_against_direct_and_each_other() {
        let phrasings = vec![
            "boiler serviced".to_string(),
            "Boiler service date".to_string(),
            "boiler, service date?".to_string(),
            "the".to_string(),
            "heating maintenance".to_string(),
        ];
        let out = dedup_expansions("boiler* serviced*", &phrasings, 5);
        assert_eq!(out, vec!["boiler* service* date*", "heating* maintenance*"]);
    }

    #[test]
    fn test_dedup_respects_cap() {
        let phrasings: Vec<String> = (0..10).map(|i| format!("term{}", i)).collect();
        assert_eq!(dedup_expansions("", &phrasings, 3).len(), 3);
        assert!(dedup_expansions("", &phrasings, 0).is_empty());
    }

    #[tokio::test]
    async fn test_expand_normalizes_provider_output() {
        let e = expander(
            FixedGenerator(vec!["Heating engineer visit".to_string()]),
            3,
        );
        let out = e.expand("boiler* serviced*", "When was the boiler serviced?").await;
        assert_eq!(out, vec!["heating* engineer* visit*"]);
    }

    #[tokio::test]
    async fn test_expand_failure_degrades_to_empty() {
        let e = expander(FailingGenerator, 3);
        assert!(e.expand("boiler*", "boiler?").await.is_empty());
    }

    #[tokio::test]
    async fn test_expand_timeout_degrades_to_empty() {
        let e = expander(SlowGenerator, 3);
        let started = std::time::Instant::now();
        assert!(e.expand("boiler*", "boiler?").await.is_empty());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_expand_zero_cap_skips_provider() {
        let e = expander(SlowGenerator, 0);
        let started = std::time::Instant::now();
        assert!(e.expand("boiler*", "boiler?").await.is_empty());
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
