//! Context assembly and mode routing: turn the fused hit list into a
//! bounded context string, and decide direct-citation vs generative
//! answering for a query.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

use luatdb_core::types::{round_to, truncate_chars, FusedHit, Unit};

const BLOCK_SEPARATOR: &str = "\n---\n";
const EXCERPT_CHARS: usize = 220;

/// How a query gets answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnswerMode {
    #[serde(rename = "direct-cite")]
    DirectCite,
    #[serde(rename = "generative")]
    Generative,
}

/// `[title | Điều X, Khoản Y]` provenance header for one unit.
pub fn citation_tag(unit: &Unit) -> String {
    match &unit.clause {
        Some(clause) => format!("[{} | Điều {}, Khoản {}]", unit.title, unit.article, clause),
        None => format!("[{} | Điều {}]", unit.title, unit.article),
    }
}

/// Concatenate formatted hit blocks in ranking order, stopping before the
/// block (plus its separator) that would push the total past `max_chars`.
/// Blocks are atomic: the assembler never truncates inside one.
pub fn assemble_context(hits: &[FusedHit], max_chars: usize) -> String {
    let mut out = String::new();
    let mut total = 0usize;
    for hit in hits {
        let block = format!(
            "{}\n{}\nSOURCE: {}\n",
            citation_tag(&hit.unit),
            hit.unit.text,
            hit.unit.source
        );
        let cost = block.chars().count() + if out.is_empty() { 0 } else { BLOCK_SEPARATOR.len() };
        if total + cost > max_chars {
            break;
        }
        if !out.is_empty() {
            out.push_str(BLOCK_SEPARATOR);
        }
        out.push_str(&block);
        total += cost;
    }
    out
}

/// Render hits as a direct-citation answer: one bullet per hit with a
/// short excerpt and its score, plus the automatic-citation disclaimer.
/// Pure formatting, no model call.
pub fn direct_cite(hits: &[FusedHit]) -> String {
    let bullets: Vec<String> = hits
        .iter()
        .map(|hit| {
            format!(
                "- **{}** — {} … (score: {})",
                citation_tag(&hit.unit),
                truncate_chars(&hit.unit.text, EXCERPT_CHARS).trim(),
                round_to(hit.display_score, 4)
            )
        })
        .collect();
    format!(
        "# Kết quả trích dẫn nhanh\n{}\n\n> *Lưu ý:* Đây là trích dẫn tự động; để phân tích tình huống, bật chế độ phân tích.",
        bullets.join("\n")
    )
}

fn direct_cite_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(điều\s+\d+|khoản\s+\d+|trích|khái\s*niệm|định\s*nghĩa|mức\s*phạt|xử\s*phạt|phạt)\b")
            .expect("direct-cite regex is valid")
    })
}

/// Pick the answer strategy. Direct citation wins when the query asks for
/// a citation/definition/penalty (and direct-cite-first is enabled), when
/// generation is unavailable, or when there is no context to reason over.
pub fn route_mode(query: &str, has_context: bool, direct_cite_first: bool, llm_enabled: bool) -> AnswerMode {
    if (direct_cite_first && direct_cite_re().is_match(query)) || !llm_enabled || !has_context {
        AnswerMode::DirectCite
    } else {
        AnswerMode::Generative
    }
}
