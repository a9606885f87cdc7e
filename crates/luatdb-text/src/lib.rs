//! luatdb-text
//!
//! Lexical (BM25) indexing and search over structured Vietnamese legal
//! documents. See `parse` for the article/clause/point document shapes and
//! `index` for scoring.

pub mod index;
pub mod parse;
pub mod tokenize;

pub use index::{LexicalIndex, LEXICAL_TEXT_CAP};
pub use parse::scan_units;
