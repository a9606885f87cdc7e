//! luatdb-hybrid
//!
//! The query-time half of the engine: scope selection, reciprocal-rank
//! fusion of the lexical and vector paths, context assembly, mode routing,
//! and the snapshot-owning query engine itself.

pub mod context;
pub mod engine;
pub mod fusion;
pub mod scope;

pub use context::{assemble_context, direct_cite, route_mode, AnswerMode};
pub use engine::{Answer, CorpusSnapshot, QueryEngine, Timings};
pub use fusion::{rrf_merge, DEFAULT_RRF_K};
pub use scope::select_titles;
