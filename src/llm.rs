//! Chat-completion call against an OpenAI-compatible endpoint.

use anyhow::{anyhow, bail, Context, Result};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, info};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const TEMPERATURE: f64 = 0.2;

pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

pub struct OpenAiConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl OpenAiConfig {
    /// Read `OPENAI_API_KEY` (required) plus optional `OPENAI_BASE_URL` and
    /// `OPENAI_MODEL` overrides.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| anyhow!("Missing OPENAI_API_KEY"))?;
        Ok(Self {
            base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            api_key,
            model: std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
        })
    }
}

pub async fn chat_completion(
    client: &Client,
    cfg: &OpenAiConfig,
    messages: &[ChatMessage],
) -> Result<String> {
    let start = std::time::Instant::now();
    let prompt_chars: usize = messages.iter().map(|m| m.content.len()).sum();
    debug!(
        "LLM call starting - model={}, prompt_length={} chars",
        cfg.model, prompt_chars
    );

    let msgs: Vec<Value> = messages
        .iter()
        .map(|m| json!({"role": m.role, "content": m.content}))
        .collect();
    let body = json!({
        "model": cfg.model,
        "messages": msgs,
        "temperature": TEMPERATURE,
    });

    let url = format!("{}/chat/completions", cfg.base_url.trim_end_matches('/'));
    let resp = client
        .post(&url)
        .header("Authorization", format!("Bearer {}", cfg.api_key))
        .header("Content-Type", "application/json")
        .json(&body)
        .send()
        .await
        .with_context(|| format!("LLM request failed ({})", url))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        bail!("LLM API error {}: {}", status, text);
    }

    let payload: Value = resp.json().await.context("Decoding LLM response JSON")?;
    let answer = payload
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("Malformed LLM response: no choices[0].message.content"))?
        .to_string();

    let elapsed = start.elapsed();
    info!(
        "LLM API call completed - duration={:.2}s, response_length={} chars",
        elapsed.as_secs_f32(),
        answer.len()
    );
    Ok(answer)
}
