//! Configuration loading and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `LUATDB_*`
//! env vars into a typed [`Settings`]. Provides helpers to expand `~` and
//! `${VAR}` and to resolve relative paths against a known base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Runtime settings for the whole engine. Defaults match a local Ollama
/// deployment and a `data/` + `index/index.jsonl` layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // IO & data
    pub data_dir: String,
    pub index_path: String,

    // Retrieval
    pub top_k: usize,
    pub max_context_chars: usize,
    pub rrf_k: f64,

    // LLM & embeddings
    pub base_url: String,
    pub api_key: String,
    pub llm_model: String,
    pub embed_model: String,
    pub llm_enabled: bool,
    pub embeddings_enabled: bool,
    pub max_tokens: u32,
    pub temperature: f32,

    // Modes
    pub direct_cite_first: bool,
    pub prompt_path: Option<String>,

    // HTTP collaborators
    pub http_timeout_sec: u64,
    pub http_retries: u32,
    pub http_backoff_sec: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            index_path: "index/index.jsonl".to_string(),
            top_k: 5,
            max_context_chars: 2600,
            rrf_k: 60.0,
            base_url: "http://localhost:11434".to_string(),
            api_key: "ollama".to_string(),
            llm_model: "qwen2.5:3b-instruct".to_string(),
            embed_model: "nomic-embed-text".to_string(),
            llm_enabled: true,
            embeddings_enabled: true,
            max_tokens: 320,
            temperature: 0.1,
            direct_cite_first: true,
            prompt_path: None,
            http_timeout_sec: 600,
            http_retries: 2,
            http_backoff_sec: 2.0,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("LUATDB_"));

        let settings: Settings = figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(Error::InvalidConfig("top_k must be at least 1".into()));
        }
        if self.rrf_k <= 0.0 {
            return Err(Error::InvalidConfig("rrf_k must be positive".into()));
        }
        Ok(())
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    // Expand env vars first
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    // Expand ~ at start
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
