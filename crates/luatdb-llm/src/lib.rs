//! luatdb-llm
//!
//! HTTP implementations of the external collaborator contracts: embedding
//! vectors and chat completions against an Ollama or OpenAI-compatible
//! endpoint. Retries and backoff live here, not in the fusion engine.

pub mod client;

pub use client::OllamaClient;
