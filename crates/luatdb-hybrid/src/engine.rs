//! The query engine: owns the corpus snapshot, runs both search paths
//! concurrently, fuses, assembles context, and routes the answer mode.
//!
//! The snapshot is immutable once built. Readers clone an `Arc` under a
//! short read lock; reload builds a fresh snapshot off-lock and swaps the
//! reference, so in-flight queries see the old corpus in full or the new
//! one in full, never a partial mix.

use std::fs;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use luatdb_core::config::{expand_path, Settings};
use luatdb_core::error::{Error, Result};
use luatdb_core::traits::{ChatMessage, Embedder, GenerateOptions, Generator};
use luatdb_core::types::{round_to, truncate_chars, FusedHit};
use luatdb_text::LexicalIndex;
use luatdb_vector::VectorStore;

use crate::context::{assemble_context, direct_cite, route_mode, AnswerMode};
use crate::fusion::rrf_merge;
use crate::scope::select_titles;

const DEFAULT_SYSTEM_PROMPT: &str = "Bạn là Luật sư tư vấn pháp luật Việt Nam chuyên nghiệp. \
Sử dụng CONTEXT để tư vấn chính xác và thực tiễn. \
Mỗi kết luận phải có trích dẫn [title | Điều X, Khoản Y]. \
Trả lời đầy đủ, chi tiết như một luật sư chuyên nghiệp. \
Nếu thiếu thông tin, ghi 'Cần tham khảo thêm' và nêu rõ cần gì. \
Dùng markdown có cấu trúc rõ ràng.";

const HEAD_CHARS: usize = 50;

/// One immutable load of both corpora. The vector side is optional: a
/// missing or unreadable index degrades to lexical-only search.
pub struct CorpusSnapshot {
    pub lexical: LexicalIndex,
    pub vector: Option<VectorStore>,
}

impl CorpusSnapshot {
    pub fn load(settings: &Settings) -> Result<Self> {
        let data_dir = expand_path(&settings.data_dir);
        let lexical = LexicalIndex::load(&data_dir).map_err(|e| Error::Operation(e.to_string()))?;

        let vector = if settings.embeddings_enabled {
            let index_path = expand_path(&settings.index_path);
            match VectorStore::load(&index_path) {
                Ok(store) => Some(store),
                Err(e) => {
                    warn!(path = %index_path.display(), error = %e, "vector index unavailable, continuing lexical-only");
                    None
                }
            }
        } else {
            None
        };

        Ok(Self { lexical, vector })
    }

    pub fn vector_units(&self) -> usize {
        self.vector.as_ref().map_or(0, VectorStore::len)
    }
}

/// Per-step latencies in milliseconds.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Timings {
    pub bm25_ms: f64,
    pub vector_ms: f64,
    pub llm_ms: f64,
    pub total_ms: f64,
}

/// The full result of one query.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub mode: AnswerMode,
    pub answer: String,
    pub citations: Vec<FusedHit>,
    pub chosen_titles: Vec<String>,
    pub available_units: usize,
    pub vector_units: usize,
    pub question_head: String,
    pub context_head: String,
    pub model: String,
    pub timings: Timings,
}

pub struct QueryEngine {
    settings: Settings,
    snapshot: RwLock<Arc<CorpusSnapshot>>,
    embedder: Arc<dyn Embedder>,
    generator: Option<Arc<dyn Generator>>,
    system_prompt: String,
}

impl QueryEngine {
    /// Build the engine with an initial full corpus load.
    pub fn load(
        settings: Settings,
        embedder: Arc<dyn Embedder>,
        generator: Option<Arc<dyn Generator>>,
    ) -> Result<Self> {
        let snapshot = Arc::new(CorpusSnapshot::load(&settings)?);
        info!(
            lexical_units = snapshot.lexical.len(),
            vector_units = snapshot.vector_units(),
            "corpus snapshot loaded"
        );
        let system_prompt = load_system_prompt(&settings);
        Ok(Self {
            settings,
            snapshot: RwLock::new(snapshot),
            embedder,
            generator,
            system_prompt,
        })
    }

    /// Rebuild the snapshot from a fresh directory scan and swap it in
    /// wholesale. Returns (lexical unit count, vector unit count).
    pub fn reload(&self) -> Result<(usize, usize)> {
        let fresh = Arc::new(CorpusSnapshot::load(&self.settings)?);
        let counts = (fresh.lexical.len(), fresh.vector_units());
        let mut guard = self
            .snapshot
            .write()
            .map_err(|_| Error::Operation("snapshot lock poisoned".into()))?;
        *guard = fresh;
        info!(lexical_units = counts.0, vector_units = counts.1, "corpus snapshot reloaded");
        Ok(counts)
    }

    /// The current snapshot. Cheap: clones the `Arc`, not the corpus.
    pub fn snapshot(&self) -> Result<Arc<CorpusSnapshot>> {
        Ok(self
            .snapshot
            .read()
            .map_err(|_| Error::Operation("snapshot lock poisoned".into()))?
            .clone())
    }

    /// Answer one query end to end.
    pub async fn answer(&self, question: &str) -> Result<Answer> {
        let t_all = Instant::now();
        let question = question.trim().to_string();
        let snapshot = self.snapshot()?;
        let top_k = self.settings.top_k;

        let chosen_titles = select_titles(&question, &snapshot.lexical.titles());
        debug!(?chosen_titles, "scope selected");
        let allowed = if chosen_titles.is_empty() { None } else { Some(chosen_titles.clone()) };

        // The two paths have no data dependency; run them concurrently.
        // BM25 is CPU-bound, so it goes to the blocking pool while the
        // vector path awaits its single embedding call.
        let lexical_task = {
            let snapshot = Arc::clone(&snapshot);
            let query = question.clone();
            let allowed = allowed.clone();
            tokio::task::spawn_blocking(move || {
                let t = Instant::now();
                let hits = snapshot.lexical.search(&query, top_k, allowed.as_deref());
                (hits, elapsed_ms(t))
            })
        };
        let vector_fut = async {
            let t = Instant::now();
            let hits = match &snapshot.vector {
                Some(store) => {
                    match store
                        .search(
                            self.embedder.as_ref(),
                            &question,
                            top_k,
                            allowed.as_deref(),
                            Some(&self.settings.embed_model),
                        )
                        .await
                    {
                        Ok(hits) => hits,
                        Err(e) => {
                            warn!(error = %e, "vector search failed, answering from the lexical path only");
                            Vec::new()
                        }
                    }
                }
                None => Vec::new(),
            };
            (hits, elapsed_ms(t))
        };
        let (lexical_result, (vector_hits, vector_ms)) = tokio::join!(lexical_task, vector_fut);
        let (lexical_hits, bm25_ms) =
            lexical_result.map_err(|e| Error::Operation(e.to_string()))?;

        let citations = rrf_merge(&lexical_hits, &vector_hits, top_k, self.settings.rrf_k);
        let context = assemble_context(&citations, self.settings.max_context_chars);

        let llm_available = self.settings.llm_enabled && self.generator.is_some();
        let mode = route_mode(
            &question,
            !context.trim().is_empty(),
            self.settings.direct_cite_first,
            llm_available,
        );

        let (mode, answer, llm_ms) = match mode {
            AnswerMode::DirectCite => (AnswerMode::DirectCite, direct_cite(&citations), 0.0),
            AnswerMode::Generative => {
                let t = Instant::now();
                match self.generate_answer(&question, &context).await {
                    Ok(text) => (AnswerMode::Generative, text, elapsed_ms(t)),
                    Err(e) => {
                        warn!(error = %e, "generation unavailable, degrading to direct citation");
                        (AnswerMode::DirectCite, direct_cite(&citations), elapsed_ms(t))
                    }
                }
            }
        };

        Ok(Answer {
            mode,
            answer,
            citations,
            chosen_titles,
            available_units: snapshot.lexical.len(),
            vector_units: snapshot.vector_units(),
            question_head: truncate_chars(&question, HEAD_CHARS).to_string(),
            context_head: truncate_chars(&context, HEAD_CHARS).to_string(),
            model: self.settings.llm_model.clone(),
            timings: Timings {
                bm25_ms,
                vector_ms,
                llm_ms,
                total_ms: elapsed_ms(t_all),
            },
        })
    }

    async fn generate_answer(&self, question: &str, context: &str) -> Result<String> {
        let generator = self
            .generator
            .as_ref()
            .ok_or_else(|| Error::provider("llm", "no generator configured"))?;
        let messages = [
            ChatMessage::system(self.system_prompt.clone()),
            ChatMessage::user(format!("CONTEXT:\n{context}\n\nCÂU HỎI: {question}")),
        ];
        let opts = GenerateOptions {
            model: Some(self.settings.llm_model.clone()),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };
        generator.generate(&messages, &opts).await
    }
}

fn load_system_prompt(settings: &Settings) -> String {
    let Some(path) = &settings.prompt_path else {
        return DEFAULT_SYSTEM_PROMPT.to_string();
    };
    let path = expand_path(path);
    match fs::read_to_string(&path) {
        Ok(prompt) if !prompt.trim().is_empty() => prompt,
        Ok(_) => DEFAULT_SYSTEM_PROMPT.to_string(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "prompt file unreadable, using the built-in prompt");
            DEFAULT_SYSTEM_PROMPT.to_string()
        }
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    round_to(start.elapsed().as_secs_f64() * 1000.0, 2)
}
