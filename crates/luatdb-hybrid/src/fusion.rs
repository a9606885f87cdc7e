//! Reciprocal-rank fusion of the lexical and vector hit lists.
//!
//! RRF only trusts each path's ranking, never its score magnitude, which
//! is the right invariant here: a BM25 score and a cosine similarity are
//! not commensurable.

use std::collections::HashMap;

use luatdb_core::types::{round_to, FusedHit, FusionSource, ScoredHit, Unit, UnitKey};

/// Fusion constant with no documented derivation; configurable, not an
/// invariant.
pub const DEFAULT_RRF_K: f64 = 60.0;

/// Rank assigned on the side that never saw a unit. Used for tie-breaking
/// only; it contributes nothing to the pooled score.
const ABSENT_RANK: usize = usize::MAX;

struct PoolEntry {
    unit: Unit,
    rrf: f64,
    lexical_rank: usize,
    vector_rank: usize,
    lexical_score: Option<f64>,
    vector_score: Option<f64>,
}

/// Merge two ranked lists into one ordering. Each input hit contributes
/// `1 / (k + rank)` (ranks are 1-indexed) to its unit's pooled score.
/// Ties on the pooled score prefer the better lexical rank, then the
/// better vector rank. Returns at most `top_k` hits, each annotated with
/// the pooled score rounded to 6 decimal places.
pub fn rrf_merge(lexical: &[ScoredHit], vector: &[ScoredHit], top_k: usize, k: f64) -> Vec<FusedHit> {
    let mut pool: HashMap<UnitKey, PoolEntry> = HashMap::new();

    for (i, hit) in lexical.iter().enumerate() {
        let rank = i + 1;
        let entry = pool.entry(hit.unit.key()).or_insert_with(|| PoolEntry {
            unit: hit.unit.clone(),
            rrf: 0.0,
            lexical_rank: rank,
            vector_rank: ABSENT_RANK,
            lexical_score: Some(hit.score),
            vector_score: None,
        });
        entry.rrf += 1.0 / (k + rank as f64);
    }

    for (i, hit) in vector.iter().enumerate() {
        let rank = i + 1;
        let entry = pool.entry(hit.unit.key()).or_insert_with(|| PoolEntry {
            unit: hit.unit.clone(),
            rrf: 0.0,
            lexical_rank: ABSENT_RANK,
            vector_rank: rank,
            lexical_score: None,
            vector_score: None,
        });
        entry.rrf += 1.0 / (k + rank as f64);
        if entry.vector_rank == ABSENT_RANK {
            entry.vector_rank = rank;
        }
        if entry.vector_score.is_none() {
            entry.vector_score = Some(hit.score);
        }
    }

    let mut merged: Vec<PoolEntry> = pool.into_values().collect();
    merged.sort_by(|a, b| {
        b.rrf
            .partial_cmp(&a.rrf)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.lexical_rank.cmp(&b.lexical_rank))
            .then(a.vector_rank.cmp(&b.vector_rank))
    });
    merged.truncate(top_k);

    merged
        .into_iter()
        .map(|entry| {
            let source = match (entry.lexical_score.is_some(), entry.vector_score.is_some()) {
                (true, true) => FusionSource::Both,
                (true, false) => FusionSource::Lexical,
                _ => FusionSource::Vector,
            };
            // Uniform display score: lexical when present, vector otherwise.
            let display_score = entry
                .lexical_score
                .or(entry.vector_score)
                .unwrap_or(0.0);
            FusedHit {
                unit: entry.unit,
                display_score,
                rrf: round_to(entry.rrf, 6),
                source,
            }
        })
        .collect()
}
