use std::env;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use luatdb_core::config::Settings;
use luatdb_core::traits::{Embedder, Generator};
use luatdb_hybrid::QueryEngine;
use luatdb_llm::OllamaClient;

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.is_empty() {
        eprintln!("Usage: {} <ask|reload> [args...]", prog);
        std::process::exit(1);
    }
    let cmd = args.remove(0);
    (cmd, args)
}

fn build_engine(settings: Settings) -> anyhow::Result<QueryEngine> {
    let client = Arc::new(OllamaClient::from_settings(&settings)?);
    let embedder: Arc<dyn Embedder> = client.clone();
    let generator: Option<Arc<dyn Generator>> =
        if settings.llm_enabled { Some(client) } else { None };
    Ok(QueryEngine::load(settings, embedder, generator)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let settings = Settings::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    let (cmd, args) = parse_args();
    match cmd.as_str() {
        "ask" => {
            let question = args.iter().find(|a| !a.starts_with('-')).cloned().unwrap_or_else(|| {
                eprintln!("Usage: luatdb ask \"<câu hỏi>\" [--json]");
                std::process::exit(1)
            });
            let as_json = args.iter().any(|a| a == "--json");
            let engine = build_engine(settings)?;
            let answer = engine.answer(&question).await?;
            if as_json {
                println!("{}", serde_json::to_string_pretty(&answer)?);
            } else {
                println!("⚖️  luatdb\n=========");
                println!("Câu hỏi: {}", question);
                let scope = if answer.chosen_titles.is_empty() {
                    "toàn bộ".to_string()
                } else {
                    answer.chosen_titles.join(", ")
                };
                println!(
                    "Phạm vi: {} | units: {} (vector: {}) | model: {}",
                    scope, answer.available_units, answer.vector_units, answer.model
                );
                println!("\n{}", answer.answer);
                if !answer.citations.is_empty() {
                    println!("\n📚 Nguồn:");
                    for (i, hit) in answer.citations.iter().enumerate() {
                        println!(
                            "  {}. [{} | Điều {}{}] rrf={} — {}",
                            i + 1,
                            hit.unit.title,
                            hit.unit.article,
                            hit.unit
                                .clause
                                .as_ref()
                                .map(|c| format!(", Khoản {}", c))
                                .unwrap_or_default(),
                            hit.rrf,
                            hit.unit.source
                        );
                    }
                }
                let t = &answer.timings;
                println!(
                    "\n⏱️  bm25 {:.2}ms | vector {:.2}ms | llm {:.2}ms | tổng {:.2}ms",
                    t.bm25_ms, t.vector_ms, t.llm_ms, t.total_ms
                );
            }
        }
        "reload" => {
            let engine = build_engine(settings)?;
            let (lexical_units, vector_units) = engine.reload()?;
            println!("✅ Reload xong: {} units (vector: {})", lexical_units, vector_units);
        }
        _ => {
            eprintln!("Unknown command: {}", cmd);
            std::process::exit(1);
        }
    }
    Ok(())
}
