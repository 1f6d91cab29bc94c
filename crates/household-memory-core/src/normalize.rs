//! Question → full-text query normalization.
//!
//! Lowercases, replaces every non-alphanumeric character with a separator,
//! drops stopwords and repeated tokens, and suffixes each surviving token
//! with `*`. Index backends read the result as a conjunction of prefix
//! terms, which is the syntax SQLite FTS5 accepts directly:
//!
//! ```rust
//! use household_memory_core::normalize::normalize_query;
//!
//! assert_eq!(
//!     normalize_query("When was the boiler last serviced?"),
//!     "boiler* serviced*"
//! );
//! ```
//!
//! The transform is idempotent, and a question made only of stopwords
//! normalizes to the empty string.

/// Marker appended to every token to request prefix matching.
pub const PREFIX_MARKER: char = '*';

/// Words that carry no retrieval signal in a question.
pub const STOPWORDS: &[&str] = &[
    "a", "about", "after", "again", "all", "am", "an", "and", "any", "are", "as", "at", "be",
    "been", "before", "being", "but", "by", "can", "could", "did", "do", "does", "doing", "done",
    "ever", "for", "from", "get", "got", "had", "has", "have", "having", "he", "her", "here",
    "him", "his", "how", "i", "if", "in", "into", "is", "it", "its", "just", "last", "me", "my",
    "of", "on", "or", "our", "ours", "she", "should", "so", "some", "than", "that", "the",
    "their", "them", "then", "there", "these", "they", "this", "those", "to", "up", "us", "was",
    "we", "were", "what", "when", "where", "which", "who", "whom", "why", "will", "with",
    "would", "you", "your",
];

pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.binary_search(&token).is_ok()
}

/// Split text into lowercase alphanumeric tokens, in order.
///
/// Shared by the normalizer and the in-memory index so that both agree on
/// what a term is.
pub fn tokenize(text: &str) -> Vec<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    cleaned.split_whitespace().map(str::to_string).collect()
}

/// Normalize a question into a conjunctive prefix query.
pub fn normalize_query(text: &str) -> String {
    let mut terms: Vec<String> = Vec::new();
    for token in tokenize(text) {
        if is_stopword(&token) || terms.contains(&token) {
            continue;
        }
        terms.push(token);
    }

    terms
        .iter()
        .map(|t| format!("{}{}", t, PREFIX_MARKER))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Terms of an already-normalized query, without prefix markers.
pub fn query_terms(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(|t| t.trim_end_matches(PREFIX_MARKER).to_string())
        .filter(|t| !t.is_empty())
        .collect()
}
