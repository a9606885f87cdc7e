use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use tracing::info;

use luatdb_core::types::{round_to, truncate_chars, ScoredHit, Unit};

use crate::parse::scan_units;
use crate::tokenize::tokenize;

/// Character cap applied to a unit's stored display text. Scoring still
/// runs over the full tokenized text.
pub const LEXICAL_TEXT_CAP: usize = 800;

const K1: f64 = 1.5;
const B: f64 = 0.75;
// Negative-IDF floor factor for terms present in most of the corpus.
const EPSILON: f64 = 0.25;

/// In-memory BM25 (Okapi) index over retrievable units. Immutable once
/// built; reload means constructing a fresh index from a directory scan.
pub struct LexicalIndex {
    units: Vec<Unit>,
    term_freqs: Vec<HashMap<String, usize>>,
    doc_len: Vec<f64>,
    avgdl: f64,
    idf: HashMap<String, f64>,
}

impl LexicalIndex {
    /// Build the index from a full directory scan. Returns the index; the
    /// unit count is available via [`LexicalIndex::len`].
    pub fn load(data_dir: &Path) -> Result<Self> {
        let parsed = scan_units(data_dir)?;
        let index = Self::from_units(parsed);
        info!(units = index.len(), dir = %data_dir.display(), "lexical index loaded");
        Ok(index)
    }

    /// Build the index from already-extracted units.
    pub fn from_units(parsed: Vec<Unit>) -> Self {
        let mut units = Vec::with_capacity(parsed.len());
        let mut term_freqs = Vec::with_capacity(parsed.len());
        let mut doc_len = Vec::with_capacity(parsed.len());
        let mut doc_count: HashMap<String, usize> = HashMap::new();

        for mut unit in parsed {
            let tokens = tokenize(&unit.text);
            unit.text = truncate_chars(&unit.text, LEXICAL_TEXT_CAP).to_string();

            let mut freqs: HashMap<String, usize> = HashMap::new();
            for token in &tokens {
                *freqs.entry(token.clone()).or_insert(0) += 1;
            }
            for term in freqs.keys() {
                *doc_count.entry(term.clone()).or_insert(0) += 1;
            }
            doc_len.push(tokens.len() as f64);
            term_freqs.push(freqs);
            units.push(unit);
        }

        let n = units.len();
        let avgdl = if n > 0 { doc_len.iter().sum::<f64>() / n as f64 } else { 0.0 };
        let idf = compute_idf(&doc_count, n);

        Self { units, term_freqs, doc_len, avgdl, idf }
    }

    pub fn len(&self) -> usize { self.units.len() }
    pub fn is_empty(&self) -> bool { self.units.is_empty() }
    pub fn units(&self) -> &[Unit] { &self.units }

    /// Distinct document titles in the corpus, sorted.
    pub fn titles(&self) -> Vec<String> {
        let mut titles: Vec<String> = self.units.iter().map(|u| u.title.clone()).collect();
        titles.sort();
        titles.dedup();
        titles
    }

    /// BM25 search. Candidates are narrowed to `allowed_titles` (when given
    /// and non-empty) before ranking; results are sorted strictly
    /// descending by score with corpus position as the deterministic
    /// tie-break, and capped at `top_k`. An empty query is an empty result,
    /// never an error.
    pub fn search(&self, query: &str, top_k: usize, allowed_titles: Option<&[String]>) -> Vec<ScoredHit> {
        if self.units.is_empty() || query.trim().is_empty() {
            return Vec::new();
        }
        let query_tokens = tokenize(query);
        if query_tokens.is_empty() {
            return Vec::new();
        }

        let restrict = allowed_titles.filter(|titles| !titles.is_empty());
        let mut ranked: Vec<(usize, f64)> = (0..self.units.len())
            .filter(|&i| restrict.map_or(true, |titles| titles.contains(&self.units[i].title)))
            .map(|i| (i, self.score_doc(i, &query_tokens)))
            .collect();

        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        ranked.truncate(top_k);

        ranked
            .into_iter()
            .map(|(i, score)| ScoredHit { unit: self.units[i].clone(), score: round_to(score, 4) })
            .collect()
    }

    fn score_doc(&self, doc: usize, query_tokens: &[String]) -> f64 {
        let freqs = &self.term_freqs[doc];
        let dl = self.doc_len[doc];
        let mut score = 0.0;
        for token in query_tokens {
            let Some(&tf) = freqs.get(token) else { continue };
            let Some(&idf) = self.idf.get(token) else { continue };
            let tf = tf as f64;
            let denom = tf + K1 * (1.0 - B + B * dl / self.avgdl);
            score += idf * tf * (K1 + 1.0) / denom;
        }
        score
    }
}

/// Okapi IDF: `ln((N - df + 0.5) / (df + 0.5))`, with terms that come out
/// negative (present in more than half the corpus) floored at
/// `EPSILON * average_idf` so they still contribute positively.
fn compute_idf(doc_count: &HashMap<String, usize>, n: usize) -> HashMap<String, f64> {
    if n == 0 || doc_count.is_empty() {
        return HashMap::new();
    }
    let mut idf: HashMap<String, f64> = HashMap::with_capacity(doc_count.len());
    let mut idf_sum = 0.0;
    let mut negative: Vec<String> = Vec::new();
    for (term, &df) in doc_count {
        let value = ((n as f64 - df as f64 + 0.5) / (df as f64 + 0.5)).ln();
        idf_sum += value;
        if value < 0.0 {
            negative.push(term.clone());
        }
        idf.insert(term.clone(), value);
    }
    let floor = EPSILON * (idf_sum / idf.len() as f64);
    for term in negative {
        idf.insert(term, floor);
    }
    idf
}
