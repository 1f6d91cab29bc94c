//! Text-generation providers for query expansion.
//!
//! Implements the core [`TextGenerator`] trait over HTTP:
//! - **[`OpenAIGenerator`]** calls the OpenAI chat-completions API.
//!   Requires `OPENAI_API_KEY`.
//! - **[`OllamaGenerator`]** calls `POST /api/generate` on a local Ollama
//!   instance (default `http://localhost:11434`).
//!
//! Both ask for one alternate phrasing per line and parse the reply with
//! [`parse_phrasings`]. Neither retries: the expander already bounds each
//! call with `expansion.timeout_ms`, and a failed expansion only means the
//! question is answered from the direct query.
//!
//! # Provider Selection
//!
//! ```rust
//! # use household_memory::config::Config;
//! # use household_memory::generation::create_generator;
//! let config = Config::minimal("./data/hm.sqlite3"); // provider = "disabled"
//! assert!(create_generator(&config).unwrap().is_none());
//! ```

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use household_memory_core::expand::TextGenerator;

use crate::config::{Config, ExpansionConfig, DEFAULT_OLLAMA_URL};

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

fn expansion_prompt(question: &str, max_expansions: usize) -> String {
    format!(
        "Rewrite the following question about a household as up to {} short keyword \
         search queries for a notes database. Use synonyms a person might have written \
         in a note, receipt or invoice. Reply with one query per line and nothing else.\n\n\
         Question: {}",
        max_expansions, question
    )
}

/// Split a generated reply into phrasings.
///
/// Strips list bullets, numbering and surrounding quotes; drops blank
/// lines.
pub fn parse_phrasings(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| {
            let line = line.trim();
            let line = line.trim_start_matches(['-', '*', '•']).trim_start();
            let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
            let line = if digits > 0 && line[digits..].starts_with(['.', ')']) {
                line[digits + 1..].trim_start()
            } else {
                line
            };
            line.trim_matches(|c| c == '"' || c == '\'').trim().to_string()
        })
        .filter(|line| !line.is_empty())
        .collect()
}

fn http_client(config: &ExpansionConfig) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_millis(config.timeout_ms))
        .build()?)
}

// ============ OpenAI ============

pub struct OpenAIGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_expansions: usize,
}

impl OpenAIGenerator {
    pub fn new(config: &ExpansionConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("expansion.model required for OpenAI provider"))?;

        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;

        Ok(Self {
            client: http_client(config)?,
            api_key,
            model,
            max_expansions: config.max_expansions,
        })
    }
}

#[async_trait]
impl TextGenerator for OpenAIGenerator {
    fn name(&self) -> &str {
        "openai"
    }

    async fn expand(&self, question: &str) -> Result<Vec<String>> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": 0.2,
            "messages": [
                {"role": "user", "content": expansion_prompt(question, self.max_expansions)}
            ],
        });

        let response = self
            .client
            .post(OPENAI_CHAT_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("OpenAI API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        parse_openai_response(&json)
    }
}

fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<String>> {
    let content = json
        .pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing message content"))?;
    Ok(parse_phrasings(content))
}

// ============ Ollama ============

pub struct OllamaGenerator {
    client: reqwest::Client,
    url: String,
    model: String,
    max_expansions: usize,
}

impl OllamaGenerator {
    pub fn new(config: &ExpansionConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("expansion.model required for Ollama provider"))?;
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());

        Ok(Self {
            client: http_client(config)?,
            url: url.trim_end_matches('/').to_string(),
            model,
            max_expansions: config.max_expansions,
        })
    }
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn expand(&self, question: &str) -> Result<Vec<String>> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": expansion_prompt(question, self.max_expansions),
            "stream": false,
        });

        let response = self
            .client
            .post(format!("{}/api/generate", self.url))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                anyhow::anyhow!(
                    "Ollama connection error (is Ollama running at {}?): {}",
                    self.url,
                    e
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Ollama API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        parse_ollama_response(&json)
    }
}

fn parse_ollama_response(json: &serde_json::Value) -> Result<Vec<String>> {
    let content = json
        .get("response")
        .and_then(|r| r.as_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing response field"))?;
    Ok(parse_phrasings(content))
}

/// Build the configured generator, or `None` when expansion is disabled.
pub fn create_generator(config: &Config) -> Result<Option<Arc<dyn TextGenerator>>> {
    let expansion = &config.expansion;
    if !expansion.is_enabled() {
        return Ok(None);
    }
    match expansion.provider.as_str() {
        "openai" => Ok(Some(Arc::new(OpenAIGenerator::new(expansion)?))),
        "ollama" => Ok(Some(Arc::new(OllamaGenerator::new(expansion)?))),
        other => bail!("Unknown expansion provider: {}", other),
    }
}
