use std::env;
use std::path::PathBuf;

use luatdb_core::types::truncate_chars;
use luatdb_text::LexicalIndex;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <query> [data_dir]", args[0]);
        eprintln!("Example: {} 'tuổi kết hôn tối thiểu' data", args[0]);
        std::process::exit(1);
    }
    let query_text = &args[1];
    let data_dir = args.get(2).map(PathBuf::from).unwrap_or_else(|| PathBuf::from("data"));
    println!("🔍 luatdb-search-only\n====================");
    println!("Query: {}", query_text);
    println!("Data directory: {}", data_dir.display());
    let index = LexicalIndex::load(&data_dir)?;
    let results = index.search(query_text, 10, None);
    println!("\n🔍 Found {} results for: \"{}\"", results.len(), query_text);
    for (i, hit) in results.iter().enumerate() {
        let clause = hit.unit.clause.as_deref().unwrap_or("-");
        println!(
            "\n  {}. score={:.4}  title={}  article={}  clause={}",
            i + 1,
            hit.score,
            hit.unit.title,
            hit.unit.article,
            clause
        );
        println!("     📝 {}", truncate_chars(&hit.unit.text, 160).replace('\n', " "));
    }
    println!("\n📊 Titles in corpus:");
    for title in index.titles() {
        println!("  {}", title);
    }
    Ok(())
}
