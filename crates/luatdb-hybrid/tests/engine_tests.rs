use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use luatdb_core::config::Settings;
use luatdb_core::error::{Error, Result};
use luatdb_core::traits::{ChatMessage, Embedder, GenerateOptions, Generator};
use luatdb_hybrid::{AnswerMode, QueryEngine};

struct MockEmbedder;

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, texts: &[String], _model: Option<&str>) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
    }
}

struct MockGenerator {
    fail: bool,
    calls: AtomicUsize,
}

impl MockGenerator {
    fn new(fail: bool) -> Self {
        Self { fail, calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl Generator for MockGenerator {
    async fn generate(&self, messages: &[ChatMessage], _opts: &GenerateOptions) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::provider("llm", "connection refused"));
        }
        assert_eq!(messages[0].role, "system");
        assert!(messages[1].content.starts_with("CONTEXT:\n"));
        assert!(messages[1].content.contains("CÂU HỎI:"));
        Ok("Theo [hon_nhan | Điều 3a, Khoản 1], nam phải đủ 20 tuổi.".to_string())
    }
}

fn write_corpus(data_dir: &Path) {
    fs::write(
        data_dir.join("hon_nhan.json"),
        r#"{
            "3a": {
                "tiêu_đề": "Điều kiện kết hôn",
                "khoản": {
                    "1": "Nam từ đủ 20 tuổi trở lên, nữ từ đủ 18 tuổi trở lên mới được kết hôn",
                    "2": "Việc kết hôn do nam và nữ tự nguyện quyết định"
                }
            }
        }"#,
    )
    .unwrap();
}

fn write_index(index_path: &Path) {
    let line = serde_json::json!({
        "title": "hon_nhan",
        "article": "3a",
        "clause": "1",
        "text": "Điều kiện kết hôn\nNam từ đủ 20 tuổi trở lên",
        "source": "file:///data/hon_nhan.json",
        "embedding": [1.0, 0.0],
    });
    fs::write(index_path, format!("{line}\n")).unwrap();
}

fn settings_for(dir: &TempDir) -> Settings {
    Settings {
        data_dir: dir.path().join("data").display().to_string(),
        index_path: dir.path().join("index.jsonl").display().to_string(),
        ..Settings::default()
    }
}

fn engine_with(
    settings: Settings,
    generator: Option<Arc<MockGenerator>>,
) -> luatdb_core::error::Result<QueryEngine> {
    let generator = generator.map(|g| g as Arc<dyn Generator>);
    QueryEngine::load(settings, Arc::new(MockEmbedder), generator)
}

fn fresh_workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("data")).unwrap();
    write_corpus(&dir.path().join("data"));
    write_index(&dir.path().join("index.jsonl"));
    dir
}

#[tokio::test]
async fn situational_question_is_answered_generatively_with_citations() {
    let dir = fresh_workspace();
    let generator = Arc::new(MockGenerator::new(false));
    let engine = engine_with(settings_for(&dir), Some(Arc::clone(&generator))).unwrap();

    let answer = engine.answer("tôi 21 tuổi có được kết hôn không").await.unwrap();

    assert_eq!(answer.mode, AnswerMode::Generative);
    assert!(answer.answer.contains("đủ 20 tuổi"));
    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    assert!(!answer.citations.is_empty());
    assert_eq!(answer.citations[0].unit.title, "hon_nhan");
    // No scope rule matches this phrasing, so the full corpus is searched.
    assert!(answer.chosen_titles.is_empty());
    assert_eq!(answer.available_units, 2);
    assert_eq!(answer.vector_units, 1);
    assert!(answer.timings.total_ms >= 0.0);
}

#[tokio::test]
async fn citation_question_never_reaches_the_generator() {
    let dir = fresh_workspace();
    let generator = Arc::new(MockGenerator::new(false));
    let engine = engine_with(settings_for(&dir), Some(Arc::clone(&generator))).unwrap();

    let answer = engine.answer("trích Điều 3 về điều kiện kết hôn").await.unwrap();

    assert_eq!(answer.mode, AnswerMode::DirectCite);
    assert!(answer.answer.starts_with("# Kết quả trích dẫn nhanh"));
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn generation_failure_degrades_to_direct_citation() {
    let dir = fresh_workspace();
    let generator = Arc::new(MockGenerator::new(true));
    let engine = engine_with(settings_for(&dir), Some(Arc::clone(&generator))).unwrap();

    let answer = engine.answer("tôi 21 tuổi có được kết hôn không").await.unwrap();

    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    assert_eq!(answer.mode, AnswerMode::DirectCite);
    assert!(answer.answer.contains("trích dẫn tự động"));
    assert!(!answer.citations.is_empty());
}

#[tokio::test]
async fn disabling_the_llm_forces_direct_citation() {
    let dir = fresh_workspace();
    let settings = Settings { llm_enabled: false, ..settings_for(&dir) };
    let generator = Arc::new(MockGenerator::new(false));
    let engine = engine_with(settings, Some(Arc::clone(&generator))).unwrap();

    let answer = engine.answer("tôi 21 tuổi có được kết hôn không").await.unwrap();

    assert_eq!(answer.mode, AnswerMode::DirectCite);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_vector_index_degrades_to_lexical_only() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("data")).unwrap();
    write_corpus(&dir.path().join("data"));
    // No index.jsonl written.
    let engine = engine_with(settings_for(&dir), None).unwrap();

    let answer = engine.answer("tôi 21 tuổi có được kết hôn không").await.unwrap();

    assert_eq!(answer.vector_units, 0);
    assert_eq!(answer.mode, AnswerMode::DirectCite);
    assert!(!answer.citations.is_empty());
}

#[tokio::test]
async fn embeddings_can_be_disabled_outright() {
    let dir = fresh_workspace();
    let settings = Settings { embeddings_enabled: false, ..settings_for(&dir) };
    let engine = engine_with(settings, None).unwrap();
    assert_eq!(engine.snapshot().unwrap().vector_units(), 0);
}

#[tokio::test]
async fn empty_question_yields_empty_citations_not_an_error() {
    let dir = fresh_workspace();
    let engine = engine_with(settings_for(&dir), None).unwrap();

    let answer = engine.answer("   ").await.unwrap();

    assert_eq!(answer.mode, AnswerMode::DirectCite);
    assert!(answer.citations.is_empty());
    assert_eq!(answer.context_head, "");
}

#[tokio::test]
async fn reload_swaps_in_a_fresh_snapshot() {
    let dir = fresh_workspace();
    let engine = engine_with(settings_for(&dir), None).unwrap();
    assert_eq!(engine.snapshot().unwrap().lexical.len(), 2);

    fs::write(
        dir.path().join("data").join("dat_dai.json"),
        r#"{"5": {"tiêu_đề": "Sổ đỏ", "toàn_văn": "Giấy chứng nhận quyền sử dụng đất"}}"#,
    )
    .unwrap();

    let (lexical_units, vector_units) = engine.reload().unwrap();
    assert_eq!(lexical_units, 3);
    assert_eq!(vector_units, 1);
    assert_eq!(engine.snapshot().unwrap().lexical.len(), 3);
}
