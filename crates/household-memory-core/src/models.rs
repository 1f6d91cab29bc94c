//! Core data models used throughout Household Memory.
//!
//! [`Record`]s are owned by the storage backend and are read-only to the
//! core. [`RawHit`]s come back from the full-text index, [`Hit`]s are the
//! merged and ranked view of them, and an [`Answer`] is the final result of
//! one question.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a record came from. Closed set, validated when parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Manual,
    Web,
    #[serde(alias = "pdf")]
    Document,
    Email,
    Photo,
}

impl SourceKind {
    pub const ALL: [SourceKind; 5] = [
        SourceKind::Manual,
        SourceKind::Web,
        SourceKind::Document,
        SourceKind::Email,
        SourceKind::Photo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Manual => "manual",
            SourceKind::Web => "web",
            SourceKind::Document => "document",
            SourceKind::Email => "email",
            SourceKind::Photo => "photo",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "manual" => Ok(SourceKind::Manual),
            "web" => Ok(SourceKind::Web),
            // "pdf" is the label older databases were written with.
            "document" | "pdf" => Ok(SourceKind::Document),
            "email" => Ok(SourceKind::Email),
            "photo" => Ok(SourceKind::Photo),
            other => Err(format!(
                "unknown source kind '{}': expected one of manual, web, document, email, photo",
                other
            )),
        }
    }
}

/// A stored memory record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub source_kind: SourceKind,
    pub source_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One entry of a full-text provider's result list.
///
/// `raw_score` follows the provider convention: lower is more relevant,
/// non-negative, unbounded.
#[derive(Debug, Clone, PartialEq)]
pub struct RawHit {
    pub record_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub snippet: String,
    pub raw_score: f64,
}

/// A ranked retrieval hit. `rank` is always in `[0.0, 1.0]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub record_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub snippet: String,
    pub rank: f64,
}

/// Confidence label attached to an [`Answer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The result of answering one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
    pub confidence: Confidence,
    /// At most three hits, rank descending.
    pub citations: Vec<Hit>,
    /// Non-empty only when `confidence` is [`Confidence::Low`].
    pub follow_up_to_store: Vec<String>,
}

/// Format a timestamp the way answers and CLI output show it.
pub fn format_ts_iso(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_kind_parse_known() {
        for kind in SourceKind::ALL {
            assert_eq!(kind.as_str().parse::<SourceKind>().unwrap(), kind);
        }
        assert_eq!("PDF".parse::<SourceKind>().unwrap(), SourceKind::Document);
        assert_eq!(" Email ".parse::<SourceKind>().unwrap(), SourceKind::Email);
    }

    #[test]
    fn test_source_kind_rejects_free_text() {
        let err = "receipt".parse::<SourceKind>().unwrap_err();
        assert!(err.contains("receipt"));
        assert!(err.contains("manual"));
    }

    #[test]
    fn test_answer_serializes_lowercase_confidence() {
        let answer = Answer {
            answer: "nothing yet".to_string(),
            confidence: Confidence::Low,
            citations: Vec::new(),
            follow_up_to_store: vec!["store it".to_string()],
        };
        let json = serde_json::to_value(&answer).unwrap();
        assert_eq!(json["confidence"], "low");
        assert_eq!(json["follow_up_to_store"][0], "store it");
    }

    #[test]
    fn test_record_source_kind_serde() {
        let json = serde_json::json!({
            "id": "r1",
            "title": "Boiler",
            "content": "serviced",
            "tags": [],
            "source_kind": "photo",
            "source_ref": null,
            "created_at": "2025-10-12T09:00:00Z"
        });
        let record: Record = serde_json::from_value(json).unwrap();
        assert_eq!(record.source_kind, SourceKind::Photo);
    }
}
