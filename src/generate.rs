//! Language-model provider abstraction.
//!
//! `generate(prompt) -> text` against an external service. The call is
//! blocking from the pipeline's point of view: exactly one generation
//! is in flight at a time and latency is unbounded by contract, so the
//! only resilience applied is the same bounded retry used for
//! embeddings (429/5xx/network).

use anyhow::{bail, Result};
use std::time::Duration;

use crate::config::GenerationConfig;
use crate::embedding::post_with_retry;

/// Generate a completion for `prompt` with the configured provider.
pub async fn generate(config: &GenerationConfig, prompt: &str) -> Result<String> {
    match config.provider.as_str() {
        "ollama" => generate_ollama(config, prompt).await,
        "openai" => generate_openai(config, prompt).await,
        "disabled" => {
            bail!("Generation provider is disabled. Set [generation] provider in config.")
        }
        other => bail!("Unknown generation provider: {}", other),
    }
}

async fn generate_ollama(config: &GenerationConfig, prompt: &str) -> Result<String> {
    let model = config
        .model
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("generation.model required for Ollama provider"))?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    let url = format!("{}/api/generate", config.base_url.trim_end_matches('/'));

    let body = serde_json::json!({
        "model": model,
        "prompt": prompt,
        "stream": false,
    });

    let json = post_with_retry(&client, &url, None, &body, config.max_retries).await?;
    json.get("response")
        .and_then(|r| r.as_str())
        .map(|s| s.trim().to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing response field"))
}

async fn generate_openai(config: &GenerationConfig, prompt: &str) -> Result<String> {
    let api_key =
        std::env::var("OPENAI_API_KEY").map_err(|_| anyhow::anyhow!("OPENAI_API_KEY not set"))?;
    let model = config
        .model
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("generation.model required for OpenAI provider"))?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    let body = serde_json::json!({
        "model": model,
        "messages": [{ "role": "user", "content": prompt }],
    });

    let json = post_with_retry(
        &client,
        "https://api.openai.com/v1/chat/completions",
        Some(&api_key),
        &body,
        config.max_retries,
    )
    .await?;

    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.trim().to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing message content"))
}
