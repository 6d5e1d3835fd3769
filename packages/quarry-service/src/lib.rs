pub mod interpreter;
pub mod model;
pub mod plan;

mod error;

use std::{future::Future, pin::Pin, sync::Arc};

use time::OffsetDateTime;

pub use error::{Error, Result};
pub use interpreter::{Interpretation, interpret, interpret_query};
pub use model::{ChatMessage, ChatModel, ChatRole, DisabledModel, LanguageModel};
pub use plan::{QueryPlan, RoutingMode};
use quarry_config::Config;
use quarry_domain::{normalize, routing, temporal};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub struct QuarryService {
	pub cfg: Config,
	pub model: Arc<dyn LanguageModel>,
}
impl QuarryService {
	/// Uses the configured chat endpoint. Readiness starts false until `refresh_model` runs.
	pub fn new(cfg: Config) -> Self {
		let model: Arc<dyn LanguageModel> = if cfg.providers.llm.enabled {
			Arc::new(ChatModel::new(cfg.providers.llm.clone()))
		} else {
			Arc::new(DisabledModel)
		};

		Self { cfg, model }
	}

	pub fn with_model(cfg: Config, model: Arc<dyn LanguageModel>) -> Self {
		Self { cfg, model }
	}

	pub async fn refresh_model(&self) -> bool {
		self.model.refresh().await
	}

	/// Builds the search plan for `query` relative to `now`. Never fails.
	pub async fn plan(&self, query: &str, now: OffsetDateTime) -> QueryPlan {
		let mode = RoutingMode::from_config(&self.cfg);
		let (routed, routing_reason) = match mode {
			RoutingMode::Off => (false, "routing_off"),
			RoutingMode::Always => (true, "routing_always"),
			RoutingMode::Heuristic => match routing::matched_heuristic(query) {
				Some(heuristic) => (true, heuristic.as_str()),
				None => (false, "no_heuristic_matched"),
			},
		};

		tracing::debug!(
			routing_mode = mode.as_str(),
			routed,
			reason = routing_reason,
			"Routed query."
		);

		let temporal_filter = temporal::extract_temporal(query, now);
		let lexical_input =
			temporal_filter.as_ref().map(|filter| filter.query.as_str()).unwrap_or(query);
		let processed = normalize::normalize(lexical_input);
		let (interpretation, fallback_reason) = if routed {
			let outcome = interpret(query, self.model.as_ref()).await;

			(Some(outcome.result), outcome.fallback_reason.map(str::to_string))
		} else {
			(None, None)
		};

		QueryPlan {
			query: query.to_string(),
			routed,
			routing_reason: routing_reason.to_string(),
			processed,
			temporal_filter,
			interpretation,
			fallback_reason,
		}
	}
}
