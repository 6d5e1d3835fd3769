use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};
use quarry_config::LlmProviderConfig;

/// Sends one chat completion request and returns the reply text.
pub async fn generate(cfg: &LlmProviderConfig, messages: &[Value]) -> Result<String> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = crate::endpoint(&cfg.api_base, &cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"stream": false,
		"messages": messages,
	});
	let res = client
		.post(&url)
		.headers(crate::auth_headers(cfg.api_key.as_deref(), &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_reply_text(&json)
}

/// Checks that the model server answers on its health endpoint.
pub async fn probe(cfg: &LlmProviderConfig) -> Result<()> {
	let Some(health_path) = cfg.health_path.as_deref() else {
		return Ok(());
	};
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = crate::endpoint(&cfg.api_base, health_path);

	client
		.get(&url)
		.headers(crate::auth_headers(cfg.api_key.as_deref(), &cfg.default_headers)?)
		.send()
		.await?
		.error_for_status()?;

	tracing::debug!(provider_id = cfg.provider_id.as_str(), %url, "Model health probe succeeded.");

	Ok(())
}

/// Accepts OpenAI-style `choices[0].message.content`, Ollama-style `message.content`, and
/// completion-style `response` bodies.
pub fn parse_reply_text(json: &Value) -> Result<String> {
	let candidates = [
		json.get("choices")
			.and_then(|v| v.as_array())
			.and_then(|arr| arr.first())
			.and_then(|choice| choice.get("message"))
			.and_then(|msg| msg.get("content")),
		json.get("message").and_then(|msg| msg.get("content")),
		json.get("response"),
	];

	candidates
		.into_iter()
		.flatten()
		.find_map(|value| value.as_str())
		.map(str::to_string)
		.ok_or_else(|| Error::InvalidResponse {
			message: "Model response is missing reply text.".to_string(),
		})
}
