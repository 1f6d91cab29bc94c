//! Merge per-variant hit lists into one ranked list.
//!
//! # Ranking
//!
//! 1. Normalize each raw score: `rank = 1 / (1 + max(raw, 0))`, in `(0, 1]`.
//! 2. Deduplicate by record id, keeping the best rank across variants and
//!    counting how many distinct variants surfaced the record.
//! 3. Boost: `min(1, best × (1 + 0.15 × (consensus − 1)))`.
//! 4. Sort by boosted rank (desc), created_at (desc), record id (asc).
//!
//! A record found by a single variant keeps exactly its own rank; one found
//! by several never ranks lower than its best single-variant rank.

use std::collections::{HashMap, HashSet};

use crate::executor::VariantResult;
use crate::models::{Hit, RawHit};

/// Per-extra-variant boost factor.
pub const CONSENSUS_BOOST: f64 = 0.15;

/// Map a lower-is-better raw score into `[0, 1]`, higher-is-better.
///
/// NaN and infinite scores carry no usable relevance and map to `0.0`.
pub fn normalize_rank(raw_score: f64) -> f64 {
    if !raw_score.is_finite() {
        return 0.0;
    }
    1.0 / (1.0 + raw_score.max(0.0))
}

/// Apply the consensus boost to a best-variant rank.
pub fn consensus_boost(best_rank: f64, consensus: usize) -> f64 {
    let extra = consensus.saturating_sub(1) as f64;
    (best_rank * (1.0 + CONSENSUS_BOOST * extra)).clamp(0.0, 1.0)
}

struct Merged {
    best: RawHit,
    best_rank: f64,
    variants: usize,
}

/// Merge raw hit lists (one per variant) into a deduplicated, ranked list.
pub fn merge_hits(lists: &[Vec<RawHit>]) -> Vec<Hit> {
    let mut by_id: HashMap<&str, Merged> = HashMap::new();

    for list in lists {
        // A record listed twice by the same variant counts once.
        let mut seen_in_variant: HashSet<&str> = HashSet::new();
        for raw in list {
            let rank = normalize_rank(raw.raw_score);
            let first_in_variant = seen_in_variant.insert(raw.record_id.as_str());
            match by_id.get_mut(raw.record_id.as_str()) {
                Some(entry) => {
                    if first_in_variant {
                        entry.variants += 1;
                    }
                    if rank > entry.best_rank {
                        entry.best_rank = rank;
                        entry.best = raw.clone();
                    }
                }
                None => {
                    by_id.insert(
                        raw.record_id.as_str(),
                        Merged {
                            best: raw.clone(),
                            best_rank: rank,
                            variants: 1,
                        },
                    );
                }
            }
        }
    }

    let mut hits: Vec<Hit> = by_id
        .into_values()
        .map(|m| Hit {
            record_id: m.best.record_id,
            title: m.best.title,
            created_at: m.best.created_at,
            snippet: m.best.snippet,
            rank: consensus_boost(m.best_rank, m.variants),
        })
        .collect();

    sort_hits(&mut hits);
    hits
}

/// Merge the successful variants of an executor run.
pub fn merge_variants(results: &[VariantResult]) -> Vec<Hit> {
    let lists: Vec<Vec<RawHit>> = results
        .iter()
        .filter_map(|r| r.hits.as_ref().ok().cloned())
        .collect();
    merge_hits(&lists)
}

/// Sort: rank desc, created_at desc, record_id asc.
pub fn sort_hits(hits: &mut [Hit]) {
    hits.sort_by(|a, b| {
        b.rank
            .partial_cmp(&a.rank)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.created_at.cmp(&a.created_at))
            .then(a.record_id.cmp(&b.record_id))
    });
}
