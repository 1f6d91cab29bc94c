//! Grounded answer assembly.
//!
//! The sufficient-evidence answer is extractive: one bullet per cited hit,
//! made of its title, timestamp and snippet, nothing else. Drafts composed
//! elsewhere go through [`grounded_lines`] first, which drops every line
//! that cannot be traced back to one citation.

use crate::evidence::EvidenceThresholds;
use crate::models::{format_ts_iso, Answer, Confidence, Hit};

/// Maximum number of citations attached to an answer.
pub const MAX_CITATIONS: usize = 3;

pub const REFUSAL_TEXT: &str =
    "I don't have enough grounded information in Household Memory to answer that yet.";

pub const ANSWER_HEADER: &str =
    "Here's what I found in Household Memory (grounded in stored notes):";

/// Prompts telling the user what to store so the question can be answered.
pub const FOLLOW_UPS: [&str; 2] = [
    "Add a note/receipt/invoice related to this (with date, item/model, and outcome).",
    "If it's a service event, store the provider name and the service date.",
];

/// Build the answer for ranked hits (rank descending).
pub fn assemble(hits: &[Hit], thresholds: &EvidenceThresholds) -> Answer {
    let citations: Vec<Hit> = hits.iter().take(MAX_CITATIONS).cloned().collect();
    let confidence = thresholds.confidence(hits);

    if confidence == Confidence::Low {
        return Answer {
            answer: REFUSAL_TEXT.to_string(),
            confidence,
            citations,
            follow_up_to_store: FOLLOW_UPS.iter().map(|s| s.to_string()).collect(),
        };
    }

    Answer {
        answer: extractive_answer(&citations),
        confidence,
        citations,
        follow_up_to_store: Vec::new(),
    }
}

/// Like [`assemble`], but prefers an externally composed `draft` when
/// evidence is sufficient.
///
/// Only the grounded lines of the draft are kept. If none survive, the
/// extractive answer is used instead.
pub fn assemble_with_draft(hits: &[Hit], thresholds: &EvidenceThresholds, draft: &str) -> Answer {
    let mut answer = assemble(hits, thresholds);
    if answer.confidence == Confidence::Low {
        return answer;
    }

    let kept = grounded_lines(draft, &answer.citations);
    if kept.is_empty() {
        tracing::debug!("draft had no grounded lines, using extractive answer");
    } else {
        answer.answer = kept.join("\n");
    }
    answer
}

fn extractive_answer(citations: &[Hit]) -> String {
    let mut lines = vec![ANSWER_HEADER.to_string()];
    for hit in citations {
        lines.push(format!(
            "- {} ({}): {}",
            hit.title,
            format_ts_iso(&hit.created_at),
            hit.snippet.trim()
        ));
    }
    lines.join("\n")
}

/// Words a draft may add without a citation backing them. Articles and
/// auxiliaries only; temporal and negation words ("before", "again",
/// "not") change what a line claims and must be cited.
const FILLER_WORDS: &[&str] = &[
    "a", "an", "are", "be", "been", "being", "did", "do", "does", "had", "has", "have", "is",
    "the", "was", "were",
];

/// Split text into lowercase tokens for grounding.
///
/// Unlike [`tokenize`](crate::normalize::tokenize), separators between two
/// digits are kept, so `2025-10-12`, `0.8` and `09:30` each stay one token
/// and a draft cannot cite a fragment of a date or number.
fn grounding_tokens(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.to_lowercase().chars().collect();
    let mut tokens = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        let joins_digits = matches!(c, '-' | '.' | '/' | ':')
            && i > 0
            && chars[i - 1].is_ascii_digit()
            && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit());
        if c.is_alphanumeric() || joins_digits {
            current.push(c);
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn content_tokens(text: &str) -> Vec<String> {
    grounding_tokens(text)
        .into_iter()
        .filter(|t| FILLER_WORDS.binary_search(&t.as_str()).is_err())
        .collect()
}

/// The passages of a citation a draft line may quote from: title, the
/// date the record was stored, and the snippet.
fn citation_passages(hit: &Hit) -> Vec<Vec<String>> {
    vec![
        content_tokens(&hit.title),
        vec![hit.created_at.format("%Y-%m-%d").to_string()],
        content_tokens(&hit.snippet),
    ]
}

fn contains_run(passages: &[Vec<String>], run: &[String]) -> bool {
    passages
        .iter()
        .any(|passage| passage.windows(run.len()).any(|w| w == run))
}

/// Whether `tokens` can be cut into runs that each appear contiguously in
/// one of the passages. Runs are at least two tokens long, except a lone
/// date or number, so a line cannot be assembled from scattered words.
fn attributable(tokens: &[String], passages: &[Vec<String>]) -> bool {
    if let [only] = tokens {
        return contains_run(passages, std::slice::from_ref(only));
    }

    let n = tokens.len();
    let mut reachable = vec![false; n + 1];
    reachable[0] = true;
    for end in 1..=n {
        let ok = (0..end).any(|start| {
            let run = &tokens[start..end];
            let long_enough = run.len() >= 2 || run[0].chars().any(|c| c.is_ascii_digit());
            reachable[start] && long_enough && contains_run(passages, run)
        });
        reachable[end] = ok;
    }
    reachable[n]
}

/// Keep the lines of `draft` that can be attributed to a single citation.
///
/// Every content token must appear in that citation's title, date or
/// snippet, in the same order as phrases of the citation. Dates and
/// numbers match only as whole tokens. Blank lines and lines with no
/// content tokens are dropped.
pub fn grounded_lines(draft: &str, citations: &[Hit]) -> Vec<String> {
    let passages: Vec<Vec<Vec<String>>> = citations.iter().map(citation_passages).collect();

    draft
        .lines()
        .map(str::trim)
        .filter(|line| {
            let tokens = content_tokens(line);
            !tokens.is_empty() && passages.iter().any(|p| attributable(&tokens, p))
        })
        .map(str::to_string)
        .collect()
}
