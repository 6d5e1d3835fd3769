use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{BoxFuture, Result};
use quarry_config::LlmProviderConfig;
use quarry_providers::chat;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
	System,
	User,
}
impl ChatRole {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::System => "system",
			Self::User => "user",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
	pub role: ChatRole,
	pub content: String,
}
impl ChatMessage {
	pub fn system(content: impl Into<String>) -> Self {
		Self { role: ChatRole::System, content: content.into() }
	}

	pub fn user(content: impl Into<String>) -> Self {
		Self { role: ChatRole::User, content: content.into() }
	}

	pub fn to_value(&self) -> Value {
		serde_json::json!({ "role": self.role.as_str(), "content": self.content })
	}
}

/// Capability handle for a locally hosted language model.
///
/// The model is a shared, stateful resource. Implementations decide how concurrent
/// `generate` calls are handled; callers that abandon a request simply drop the future.
pub trait LanguageModel
where
	Self: Send + Sync,
{
	fn is_ready(&self) -> bool;

	fn generate<'a>(&'a self, messages: &'a [ChatMessage]) -> BoxFuture<'a, Result<String>>;

	/// Re-checks availability and returns the new readiness.
	fn refresh<'a>(&'a self) -> BoxFuture<'a, bool> {
		let ready = self.is_ready();

		Box::pin(async move { ready })
	}
}

/// `LanguageModel` backed by an HTTP chat endpoint.
pub struct ChatModel {
	cfg: LlmProviderConfig,
	ready: AtomicBool,
}
impl ChatModel {
	/// Starts not ready; call `refresh` before the first request.
	pub fn new(cfg: LlmProviderConfig) -> Self {
		Self { cfg, ready: AtomicBool::new(false) }
	}

	async fn probe(&self) -> bool {
		if !self.cfg.enabled {
			self.ready.store(false, Ordering::SeqCst);

			return false;
		}

		let ready = match chat::probe(&self.cfg).await {
			Ok(()) => true,
			Err(err) => {
				tracing::warn!(
					error = %err,
					provider_id = self.cfg.provider_id.as_str(),
					"Model health probe failed; semantic interpretation disabled."
				);

				false
			},
		};
		let was_ready = self.ready.swap(ready, Ordering::SeqCst);

		if ready && !was_ready {
			tracing::info!(
				provider_id = self.cfg.provider_id.as_str(),
				model = self.cfg.model.as_str(),
				"Model is ready."
			);
		}

		ready
	}
}

impl LanguageModel for ChatModel {
	fn is_ready(&self) -> bool {
		self.cfg.enabled && self.ready.load(Ordering::SeqCst)
	}

	fn generate<'a>(&'a self, messages: &'a [ChatMessage]) -> BoxFuture<'a, Result<String>> {
		Box::pin(async move {
			let values = messages.iter().map(ChatMessage::to_value).collect::<Vec<_>>();

			Ok(chat::generate(&self.cfg, &values).await?)
		})
	}

	fn refresh<'a>(&'a self) -> BoxFuture<'a, bool> {
		Box::pin(self.probe())
	}
}

/// A model that is never ready. Used when semantic interpretation is switched off.
pub struct DisabledModel;

impl LanguageModel for DisabledModel {
	fn is_ready(&self) -> bool {
		false
	}

	fn generate<'a>(&'a self, _messages: &'a [ChatMessage]) -> BoxFuture<'a, Result<String>> {
		Box::pin(async { Err(crate::Error::ModelNotReady) })
	}
}
