use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use luatdb_core::config::Settings;
use luatdb_core::error::{Error, Result};
use luatdb_core::traits::{ChatMessage, Embedder, GenerateOptions, Generator};

/// Client for an Ollama or OpenAI-compatible endpoint. Embeddings prefer
/// the native `/api/embeddings` route and fall back to `/v1/embeddings`
/// when the native one is absent (404). Chat goes through
/// `/v1/chat/completions`. Ollama ignores the API key; it is still sent
/// for OpenAI-compatible servers that check it.
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    default_llm_model: String,
    default_embed_model: String,
    retries: u32,
    backoff_sec: f64,
}

impl OllamaClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.http_timeout_sec))
            .build()
            .map_err(|e| Error::provider("http", e.to_string()))?;
        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            default_llm_model: settings.llm_model.clone(),
            default_embed_model: settings.embed_model.clone(),
            retries: settings.http_retries,
            backoff_sec: settings.http_backoff_sec,
        })
    }

    async fn backoff(&self, attempt: u32) {
        let sleep_sec = self.backoff_sec * f64::from(attempt + 1);
        tokio::time::sleep(Duration::from_secs_f64(sleep_sec)).await;
    }

    async fn post_json(&self, url: &str, payload: &Value) -> std::result::Result<reqwest::Response, reqwest::Error> {
        self.http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(payload)
            .send()
            .await
    }

    /// One embedding for one text, with the native-then-openai fallback.
    async fn embed_one(&self, text: &str, model: &str) -> Result<Vec<f32>> {
        let native_url = format!("{}/api/embeddings", self.base_url);
        let openai_url = format!("{}/v1/embeddings", self.base_url);
        let native_payload = json!({ "model": model, "prompt": text });
        let openai_payload = json!({ "model": model, "input": text });

        let mut last_err = Error::provider("embed", "no attempt made");
        for attempt in 0..=self.retries {
            let outcome = async {
                let response = self
                    .post_json(&native_url, &native_payload)
                    .await
                    .map_err(|e| Error::provider("embed", e.to_string()))?;
                if response.status() == reqwest::StatusCode::NOT_FOUND {
                    debug!("native embeddings endpoint missing, falling back to /v1/embeddings");
                    let response = self
                        .post_json(&openai_url, &openai_payload)
                        .await
                        .map_err(|e| Error::provider("embed", e.to_string()))?;
                    let body = check_status("embed", response).await?;
                    parse_openai_embedding(&body, model)
                } else {
                    let body = check_status("embed", response).await?;
                    parse_native_embedding(&body, model)
                }
            }
            .await;

            match outcome {
                Ok(embedding) => return Ok(embedding),
                Err(e) => {
                    last_err = e;
                    if attempt < self.retries {
                        warn!(attempt = attempt + 1, error = %last_err, "embedding call failed, retrying");
                        self.backoff(attempt).await;
                    }
                }
            }
        }
        Err(last_err)
    }
}

#[async_trait]
impl Embedder for OllamaClient {
    async fn embed(&self, texts: &[String], model: Option<&str>) -> Result<Vec<Vec<f32>>> {
        let model = model.unwrap_or(&self.default_embed_model);
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed_one(text, model).await?);
        }
        Ok(out)
    }
}

#[async_trait]
impl Generator for OllamaClient {
    async fn generate(&self, messages: &[ChatMessage], opts: &GenerateOptions) -> Result<String> {
        let model = opts.model.as_deref().unwrap_or(&self.default_llm_model);
        let url = format!("{}/v1/chat/completions", self.base_url);
        let payload = json!({
            "model": model,
            "messages": messages
                .iter()
                .map(|m| json!({ "role": m.role, "content": m.content }))
                .collect::<Vec<_>>(),
            "max_tokens": opts.max_tokens,
            "temperature": opts.temperature,
        });

        let mut last_err = Error::provider("llm", "no attempt made");
        for attempt in 0..=self.retries {
            let outcome = async {
                let response = self
                    .post_json(&url, &payload)
                    .await
                    .map_err(|e| Error::provider("llm", e.to_string()))?;
                let body = check_status("llm", response).await?;
                parse_chat_completion(&body)
            }
            .await;

            match outcome {
                Ok(content) => return Ok(content),
                Err(e) => {
                    last_err = e;
                    if attempt < self.retries {
                        warn!(attempt = attempt + 1, error = %last_err, "chat call failed, retrying");
                        self.backoff(attempt).await;
                    }
                }
            }
        }
        Err(last_err)
    }
}

async fn check_status(provider: &str, response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::provider(provider, format!("HTTP {status}: {body}")));
    }
    response
        .json::<Value>()
        .await
        .map_err(|e| Error::provider(provider, e.to_string()))
}

#[derive(Deserialize)]
struct NativeEmbedding {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct OpenAiEmbeddings {
    data: Vec<NativeEmbedding>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

fn parse_native_embedding(body: &Value, model: &str) -> Result<Vec<f32>> {
    let parsed: NativeEmbedding = serde_json::from_value(body.clone())
        .map_err(|_| Error::provider("embed", format!("malformed embedding for model={model}")))?;
    if parsed.embedding.is_empty() {
        return Err(Error::provider("embed", format!("empty embedding for model={model}")));
    }
    Ok(parsed.embedding)
}

fn parse_openai_embedding(body: &Value, model: &str) -> Result<Vec<f32>> {
    let parsed: OpenAiEmbeddings = serde_json::from_value(body.clone())
        .map_err(|_| Error::provider("embed", format!("malformed embedding (v1) for model={model}")))?;
    let first = parsed
        .data
        .into_iter()
        .next()
        .ok_or_else(|| Error::provider("embed", format!("empty embedding (v1) for model={model}")))?;
    if first.embedding.is_empty() {
        return Err(Error::provider("embed", format!("empty embedding (v1) for model={model}")));
    }
    Ok(first.embedding)
}

fn parse_chat_completion(body: &Value) -> Result<String> {
    let parsed: ChatCompletion = serde_json::from_value(body.clone())
        .map_err(|_| Error::provider("llm", "malformed chat completion response"))?;
    parsed
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or_else(|| Error::provider("llm", "chat completion returned no choices"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_native_embedding_payload() {
        let body = json!({ "embedding": [0.1, 0.2, 0.3] });
        assert_eq!(parse_native_embedding(&body, "m").unwrap(), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn rejects_empty_or_non_numeric_embeddings() {
        assert!(parse_native_embedding(&json!({ "embedding": [] }), "m").is_err());
        assert!(parse_native_embedding(&json!({ "embedding": ["x"] }), "m").is_err());
        assert!(parse_native_embedding(&json!({}), "m").is_err());
    }

    #[test]
    fn parses_openai_embedding_payload() {
        let body = json!({ "data": [ { "embedding": [1.0, 2.0] }, { "embedding": [3.0] } ] });
        assert_eq!(parse_openai_embedding(&body, "m").unwrap(), vec![1.0, 2.0]);
        assert!(parse_openai_embedding(&json!({ "data": [] }), "m").is_err());
    }

    #[test]
    fn parses_chat_completion_content() {
        let body = json!({ "choices": [ { "message": { "role": "assistant", "content": "Trả lời" } } ] });
        assert_eq!(parse_chat_completion(&body).unwrap(), "Trả lời");
        assert!(parse_chat_completion(&json!({ "choices": [] })).is_err());
    }
}
