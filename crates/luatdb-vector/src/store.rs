use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, info};

use luatdb_core::error::Result;
use luatdb_core::traits::Embedder;
use luatdb_core::types::{EmbeddedUnit, ScoredHit};

const NORM_EPSILON: f32 = 1e-8;

/// Immutable in-memory vector store. One record per JSONL line; records
/// without a usable embedding are skipped at load, never a load error.
pub struct VectorStore {
    units: Vec<EmbeddedUnit>,
}

impl VectorStore {
    pub fn load(index_path: &Path) -> Result<Self> {
        let file = File::open(index_path)?;
        let reader = BufReader::new(file);
        let mut units = Vec::new();
        let mut skipped = 0usize;
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<EmbeddedUnit>(&line) {
                Ok(record) if !record.embedding.is_empty() => units.push(record),
                Ok(_) => {
                    skipped += 1;
                    debug!(line = line_no + 1, "skipping record without embedding");
                }
                Err(e) => {
                    skipped += 1;
                    debug!(line = line_no + 1, error = %e, "skipping malformed index line");
                }
            }
        }
        info!(units = units.len(), skipped, path = %index_path.display(), "vector store loaded");
        Ok(Self { units })
    }

    pub fn len(&self) -> usize { self.units.len() }
    pub fn is_empty(&self) -> bool { self.units.is_empty() }

    /// Cosine-similarity search. Obtains the query embedding from the
    /// collaborator exactly once, then scores every in-scope unit. An empty
    /// query or an empty store short-circuits before the embedding call.
    pub async fn search(
        &self,
        embedder: &dyn Embedder,
        query: &str,
        top_k: usize,
        allowed_titles: Option<&[String]>,
        embed_model: Option<&str>,
    ) -> Result<Vec<ScoredHit>> {
        if self.units.is_empty() || query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mut embeddings = embedder.embed(&[query.to_string()], embed_model).await?;
        let query_vec = embeddings.remove(0);

        let restrict = allowed_titles.filter(|titles| !titles.is_empty());
        let mut scored: Vec<(f64, &EmbeddedUnit)> = self
            .units
            .iter()
            .filter(|u| restrict.map_or(true, |titles| titles.contains(&u.unit.title)))
            .map(|u| (f64::from(cosine(&query_vec, &u.embedding)), u))
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(score, u)| ScoredHit { unit: u.unit.clone(), score })
            .collect())
    }
}

/// Dot product over regularized norms; the epsilon keeps a zero vector
/// from dividing by zero.
fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt() + NORM_EPSILON;
    let norm_b = b.iter().map(|y| y * y).sum::<f32>().sqrt() + NORM_EPSILON;
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::cosine;

    #[test]
    fn cosine_of_parallel_vectors_is_near_one() {
        let c = cosine(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]);
        assert!((c - 1.0).abs() < 1e-5);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_near_zero() {
        let c = cosine(&[1.0, 0.0], &[0.0, 1.0]);
        assert!(c.abs() < 1e-5);
    }

    #[test]
    fn zero_vector_does_not_divide_by_zero() {
        let c = cosine(&[0.0, 0.0], &[1.0, 1.0]);
        assert!(c.is_finite());
        assert_eq!(c, 0.0);
    }
}
