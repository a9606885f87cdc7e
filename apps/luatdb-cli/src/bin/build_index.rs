use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use indicatif::{ProgressBar, ProgressStyle};

use luatdb_core::config::Settings;
use luatdb_core::traits::Embedder;
use luatdb_core::types::{truncate_chars, EmbeddedUnit, Unit};
use luatdb_llm::OllamaClient;
use luatdb_text::scan_units;

struct Args {
    data: PathBuf,
    index: PathBuf,
    batch_size: usize,
    truncate: usize,
    resume: bool,
}

fn parse_args() -> Args {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let mut args = Args {
        data: PathBuf::from("data"),
        index: PathBuf::from("index"),
        batch_size: 64,
        truncate: 1000,
        resume: false,
    };
    let mut i = 0;
    while i < argv.len() {
        match argv[i].as_str() {
            "--data" => {
                if i + 1 < argv.len() {
                    args.data = PathBuf::from(&argv[i + 1]);
                    i += 1;
                } else {
                    eprintln!("Error: --data requires a path");
                    std::process::exit(1);
                }
            }
            "--index" => {
                if i + 1 < argv.len() {
                    args.index = PathBuf::from(&argv[i + 1]);
                    i += 1;
                } else {
                    eprintln!("Error: --index requires a path");
                    std::process::exit(1);
                }
            }
            "--batch-size" => {
                match argv.get(i + 1).and_then(|v| v.parse::<usize>().ok()) {
                    Some(n) if n > 0 => {
                        args.batch_size = n;
                        i += 1;
                    }
                    _ => {
                        eprintln!("Error: --batch-size requires a positive number");
                        std::process::exit(1);
                    }
                }
            }
            "--truncate-chars" => {
                match argv.get(i + 1).and_then(|v| v.parse::<usize>().ok()) {
                    Some(n) => {
                        args.truncate = n;
                        i += 1;
                    }
                    None => {
                        eprintln!("Error: --truncate-chars requires a number");
                        std::process::exit(1);
                    }
                }
            }
            "--resume" => args.resume = true,
            other => {
                eprintln!("Unknown argument: {}", other);
                std::process::exit(1);
            }
        }
        i += 1;
    }
    args
}

/// Stable dedup key for one unit: identity fields plus a content hash, so
/// re-running after a text edit re-embeds that unit.
fn unit_key(unit: &Unit) -> String {
    let hash = blake3::hash(unit.text.as_bytes()).to_hex();
    format!(
        "{}|{}|{}|{}",
        unit.title,
        unit.article,
        unit.clause.as_deref().unwrap_or("-"),
        hash
    )
}

fn load_existing_keys(path: &Path) -> HashSet<String> {
    let mut keys = HashSet::new();
    let Ok(file) = File::open(path) else { return keys };
    for line in BufReader::new(file).lines() {
        let Ok(line) = line else { continue };
        if line.trim().is_empty() {
            continue;
        }
        if let Ok(entry) = serde_json::from_str::<EmbeddedUnit>(&line) {
            keys.insert(unit_key(&entry.unit));
        }
    }
    keys
}

async fn embed_and_write(
    embedder: &OllamaClient,
    model: &str,
    batch: &mut Vec<Unit>,
    out: &mut File,
) -> anyhow::Result<usize> {
    if batch.is_empty() {
        return Ok(0);
    }
    let texts: Vec<String> = batch.iter().map(|u| u.text.clone()).collect();
    let embeddings = embedder.embed(&texts, Some(model)).await?;
    if embeddings.len() != batch.len() {
        bail!("embedding count {} does not match batch size {}", embeddings.len(), batch.len());
    }
    for (unit, embedding) in batch.drain(..).zip(embeddings) {
        if embedding.is_empty() {
            bail!("empty embedding for unit {}", unit_key(&unit));
        }
        let entry = EmbeddedUnit { unit, embedding };
        let line = serde_json::to_string(&entry)?;
        writeln!(out, "{}", line)?;
    }
    Ok(texts.len())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = parse_args();
    let settings = Settings::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;

    fs::create_dir_all(&args.index)
        .with_context(|| format!("creating index directory {}", args.index.display()))?;
    let out_path = args.index.join("index.jsonl");

    let existing = if args.resume { load_existing_keys(&out_path) } else { HashSet::new() };
    if !existing.is_empty() {
        println!("🔁 Resume: {} entries đã có trong {}", existing.len(), out_path.display());
    }

    println!("luatdb-build-index\n==================");
    println!("Data directory: {}", args.data.display());
    println!("Output: {}", out_path.display());

    let units = scan_units(&args.data)?;
    println!("📦 Tổng unit: {}", units.len());

    let embedder = OllamaClient::from_settings(&settings)?;
    let mut out = OpenOptions::new().create(true).append(true).open(&out_path)?;

    let bar = ProgressBar::new(units.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let mut written = 0usize;
    let mut skipped = 0usize;
    let mut pending: Vec<Unit> = Vec::with_capacity(args.batch_size);
    for mut unit in units {
        bar.inc(1);
        if existing.contains(&unit_key(&unit)) {
            skipped += 1;
            continue;
        }
        if args.truncate > 0 {
            unit.text = truncate_chars(&unit.text, args.truncate).to_string();
        }
        pending.push(unit);
        if pending.len() >= args.batch_size {
            written +=
                embed_and_write(&embedder, &settings.embed_model, &mut pending, &mut out).await?;
            bar.set_message(format!("đã ghi {}", written));
        }
    }
    written += embed_and_write(&embedder, &settings.embed_model, &mut pending, &mut out).await?;
    bar.finish_with_message(format!("đã ghi {}", written));

    if skipped > 0 {
        println!("⏭️  Bỏ qua {} unit đã có embedding", skipped);
    }
    println!("🎉 Xong. File: {} (mới ghi {} entries)", out_path.display(), written);
    println!("💡 Đặt LUATDB_EMBEDDINGS_ENABLED=true để dùng vector search.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(text: &str, clause: Option<&str>) -> Unit {
        Unit {
            title: "hon_nhan".to_string(),
            article: "3a".to_string(),
            clause: clause.map(str::to_string),
            text: text.to_string(),
            source: "file:///data/hon_nhan.json".to_string(),
        }
    }

    #[test]
    fn key_is_stable_for_identical_units() {
        assert_eq!(unit_key(&unit("một", Some("1"))), unit_key(&unit("một", Some("1"))));
    }

    #[test]
    fn key_changes_when_text_or_clause_changes() {
        let base = unit_key(&unit("một", Some("1")));
        assert_ne!(base, unit_key(&unit("hai", Some("1"))));
        assert_ne!(base, unit_key(&unit("một", Some("2"))));
        assert_ne!(base, unit_key(&unit("một", None)));
    }

    #[test]
    fn key_embeds_the_identity_fields() {
        let key = unit_key(&unit("một", None));
        assert!(key.starts_with("hon_nhan|3a|-|"));
    }
}
