//! luatdb-vector
//!
//! In-memory store of precomputed passage embeddings, loaded from a
//! newline-delimited JSON index and scored by cosine similarity against a
//! per-query embedding obtained from the external embedding collaborator.

pub mod store;

pub use store::VectorStore;
