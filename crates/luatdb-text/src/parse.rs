//! Parser for the legal-document source format: one JSON object per file,
//! mapping article key -> article body. An article body has a heading
//! (`"tiêu_đề"`) and one of three shapes:
//!
//! 1. a clause map (`"khoản"`) whose entries are either plain text or a
//!    nested point map (`"điểm"`); each point, or the clause itself when
//!    no points exist, becomes one unit, and nested points encode their id
//!    as `"<clause>.<point>"`;
//! 2. a point map directly on the article, where each point is a unit;
//! 3. neither, in which case the full-text field (`"toàn_văn"`), falling
//!    back to the heading, becomes one unit.
//!
//! Malformed files, articles, or values are skipped with a warning; a load
//! is never aborted by bad input.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde_json::{Map, Value};
use tracing::warn;

use luatdb_core::types::Unit;

const HEADING_KEY: &str = "tiêu_đề";
const CLAUSE_KEY: &str = "khoản";
const POINT_KEY: &str = "điểm";
const FULL_TEXT_KEY: &str = "toàn_văn";

/// Scan a data directory and extract every retrievable unit, in stable
/// (file name, article key, clause key) order. Unit text is untruncated;
/// ingestion caps are applied by the consumers.
pub fn scan_units(data_dir: &Path) -> Result<Vec<Unit>> {
    let mut units = Vec::new();
    for path in list_json_files(data_dir) {
        let title = match path.file_stem() {
            Some(stem) => stem.to_string_lossy().to_string(),
            None => continue,
        };
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable document");
                continue;
            }
        };
        let doc: Value = match serde_json::from_str(&raw) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping malformed document");
                continue;
            }
        };
        let Some(articles) = doc.as_object() else {
            warn!(path = %path.display(), "skipping document: top level is not an object");
            continue;
        };
        let source = source_locator(&path);
        for (article, body) in articles {
            parse_article(&title, article, body, &source, &mut units);
        }
    }
    Ok(units)
}

/// Distinct document titles available under a data directory, sorted.
pub fn scan_titles(data_dir: &Path) -> Vec<String> {
    let mut titles: Vec<String> = list_json_files(data_dir)
        .into_iter()
        .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().to_string()))
        .collect();
    titles.sort();
    titles.dedup();
    titles
}

fn list_json_files(data_dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(data_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        })
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

fn source_locator(path: &Path) -> String {
    let absolute = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    format!("file://{}", absolute.display())
}

fn parse_article(title: &str, article: &str, body: &Value, source: &str, out: &mut Vec<Unit>) {
    let Some(obj) = body.as_object() else {
        warn!(title, article, "skipping article: body is not an object");
        return;
    };
    let heading = obj.get(HEADING_KEY).and_then(Value::as_str).unwrap_or("");

    if let Some(clauses) = non_empty_object(obj.get(CLAUSE_KEY)) {
        for (clause, value) in clauses {
            if let Some(points) = non_empty_object(value.get(POINT_KEY)) {
                for (point, text) in points {
                    let Some(text) = text.as_str() else {
                        warn!(title, article, clause, point, "skipping non-text point");
                        continue;
                    };
                    push_unit(out, title, article, Some(format!("{clause}.{point}")), heading, text, source);
                }
            } else if let Some(text) = value.as_str() {
                push_unit(out, title, article, Some(clause.clone()), heading, text, source);
            } else {
                warn!(title, article, clause, "skipping clause with unrecognized shape");
            }
        }
    } else if let Some(points) = non_empty_object(obj.get(POINT_KEY)) {
        for (point, text) in points {
            let Some(text) = text.as_str() else {
                warn!(title, article, point, "skipping non-text point");
                continue;
            };
            push_unit(out, title, article, Some(point.clone()), heading, text, source);
        }
    } else {
        let full_text = obj
            .get(FULL_TEXT_KEY)
            .and_then(Value::as_str)
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(heading);
        let text = full_text.trim();
        if !text.is_empty() {
            out.push(Unit {
                title: title.to_string(),
                article: article.to_string(),
                clause: None,
                text: text.to_string(),
                source: source.to_string(),
            });
        }
    }
}

fn non_empty_object<'a>(value: Option<&'a Value>) -> Option<&'a Map<String, Value>> {
    value.and_then(Value::as_object).filter(|m| !m.is_empty())
}

fn push_unit(
    out: &mut Vec<Unit>,
    title: &str,
    article: &str,
    clause: Option<String>,
    heading: &str,
    body: &str,
    source: &str,
) {
    // Unit text carries the article heading so term matches on the
    // heading rank the clause, not just its body.
    let text = format!("{heading}\n{body}").trim().to_string();
    if text.is_empty() {
        return;
    }
    out.push(Unit {
        title: title.to_string(),
        article: article.to_string(),
        clause,
        text,
        source: source.to_string(),
    });
}
