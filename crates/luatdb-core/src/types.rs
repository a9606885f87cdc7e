//! Domain types shared by the lexical, vector, and fusion paths.

use serde::{Deserialize, Serialize};

/// The atomic indexed passage: one article, clause, or point of a legal
/// document.
///
/// - `title`: source document identifier (filename stem)
/// - `article`: top-level article key within the document
/// - `clause`: sub-article clause or point; a point nested under a clause
///   uses the composite `"<clause>.<point>"` encoding
/// - `text`: passage content, capped at ingestion
/// - `source`: stable `file://` locator for provenance display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub title: String,
    pub article: String,
    #[serde(default)]
    pub clause: Option<String>,
    pub text: String,
    pub source: String,
}

impl Unit {
    pub fn key(&self) -> UnitKey {
        UnitKey {
            title: self.title.clone(),
            article: self.article.clone(),
            clause: self.clause.clone(),
            source: self.source.clone(),
        }
    }
}

/// Identity of a unit within one corpus load. Two units with the same key
/// are the same passage regardless of which search path produced them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnitKey {
    pub title: String,
    pub article: String,
    pub clause: Option<String>,
    pub source: String,
}

/// A unit as stored in the vector index file, embedding included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedUnit {
    #[serde(flatten)]
    pub unit: Unit,
    #[serde(default)]
    pub embedding: Vec<f32>,
}

/// A unit scored by one retrieval path. The score scale is path-specific
/// (BM25 for lexical, cosine similarity for vector); higher is better on
/// both, but the two scales are not comparable to each other.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredHit {
    #[serde(flatten)]
    pub unit: Unit,
    pub score: f64,
}

/// Which retrieval path(s) contributed a fused hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FusionSource {
    Lexical,
    Vector,
    Both,
}

/// A unit after reciprocal-rank fusion.
///
/// `display_score` is the lexical score when the lexical path saw the unit,
/// otherwise the vector score, so consumers always have one number to show.
/// `rrf` is the pooled fusion score and the primary ordering key.
#[derive(Debug, Clone, Serialize)]
pub struct FusedHit {
    #[serde(flatten)]
    pub unit: Unit,
    pub display_score: f64,
    pub rrf: f64,
    pub source: FusionSource,
}

/// Round to `places` decimal places, for stable score display.
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

/// Truncate on a character boundary, never mid-codepoint. Vietnamese legal
/// text is multi-byte almost everywhere, so byte slicing is not an option.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        let s = "điều khoản";
        assert_eq!(truncate_chars(s, 4), "điều");
        assert_eq!(truncate_chars(s, 100), s);
        assert_eq!(truncate_chars("", 5), "");
    }

    #[test]
    fn round_to_places() {
        assert_eq!(round_to(0.123456789, 6), 0.123457);
        assert_eq!(round_to(2.71828, 4), 2.7183);
    }
}
