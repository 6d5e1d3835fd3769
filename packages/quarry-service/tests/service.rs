use std::sync::{
	Arc, Mutex,
	atomic::{AtomicUsize, Ordering},
};

use serde_json::Map;
use time::macros::datetime;
use uuid::Uuid;

use quarry_config::{Config, LlmProviderConfig, Providers, Query, Service};
use quarry_domain::{AskNotesResult, MatchType, Note, SearchResult};
use quarry_service::{
	BoxFuture, ChatMessage, Error, LanguageModel, QuarryService, Result, interpret,
	interpret_query,
};

const VALID: &str =
	r#"{"searchTerms":["x"],"temporalHint":null,"topics":["y"],"interpretedQuery":"z"}"#;

enum Reply {
	Text(String),
	Failure,
}

struct SpyModel {
	ready: bool,
	reply: Reply,
	calls: Arc<AtomicUsize>,
	seen: Mutex<Vec<ChatMessage>>,
}
impl SpyModel {
	fn new(ready: bool, reply: Reply) -> Self {
		Self { ready, reply, calls: Arc::new(AtomicUsize::new(0)), seen: Mutex::new(Vec::new()) }
	}

	fn text(text: &str) -> Self {
		Self::new(true, Reply::Text(text.to_string()))
	}

	fn count(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl LanguageModel for SpyModel {
	fn is_ready(&self) -> bool {
		self.ready
	}

	fn generate<'a>(&'a self, messages: &'a [ChatMessage]) -> BoxFuture<'a, Result<String>> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		self.seen.lock().unwrap_or_else(|err| err.into_inner()).extend_from_slice(messages);

		let reply = match &self.reply {
			Reply::Text(text) => Ok(text.clone()),
			Reply::Failure => Err(Error::Provider { message: "connection refused".to_string() }),
		};

		Box::pin(async move { reply })
	}
}

fn test_config(routing: &str) -> Config {
	Config {
		service: Service { http_bind: "127.0.0.1:0".to_string(), log_level: "info".to_string() },
		providers: Providers {
			llm: LlmProviderConfig {
				enabled: true,
				provider_id: "local".to_string(),
				api_base: "http://127.0.0.1:9".to_string(),
				path: "/v1/chat/completions".to_string(),
				health_path: None,
				api_key: None,
				model: "m".to_string(),
				temperature: 0.1,
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
		},
		query: Query { routing: routing.to_string(), probe_interval_ms: None },
	}
}

fn note(created_at: time::OffsetDateTime) -> SearchResult {
	SearchResult {
		note: Note {
			id: Uuid::new_v4(),
			title: "t".to_string(),
			content: "c".to_string(),
			tags: Vec::new(),
			created_at,
			updated_at: created_at,
		},
		relevance_score: 1.0,
		match_type: MatchType::Keyword,
	}
}

#[tokio::test]
async fn not_ready_model_returns_fallback_without_generating() {
	let model = SpyModel::new(false, Reply::Text(VALID.to_string()));
	let result = interpret_query("what about the trip", &model).await;

	assert_eq!(result, AskNotesResult::fallback("what about the trip"));
	assert_eq!(model.count(), 0);
}

#[tokio::test]
async fn non_json_reply_returns_fallback() {
	let model = SpyModel::text("not json at all");
	let outcome = interpret("garden plans", &model).await;

	assert_eq!(outcome.result, AskNotesResult::fallback("garden plans"));
	assert_eq!(outcome.fallback_reason, Some("malformed_response"));
	assert_eq!(model.count(), 1);
}

#[tokio::test]
async fn generation_failure_returns_fallback() {
	let model = SpyModel::new(true, Reply::Failure);
	let outcome = interpret("garden plans", &model).await;

	assert!(outcome.is_fallback());
	assert_eq!(outcome.fallback_reason, Some("provider_error"));
	assert_eq!(outcome.result.search_terms, vec!["garden plans"]);
}

#[tokio::test]
async fn invalid_shape_returns_fallback() {
	let model = SpyModel::text(r#"{"searchTerms":["x"],"topics":["y"],"interpretedQuery":"z"}"#);
	let outcome = interpret("q", &model).await;

	assert_eq!(outcome.fallback_reason, Some("validation_error"));
	assert_eq!(outcome.result, AskNotesResult::fallback("q"));
}

#[tokio::test]
async fn valid_reply_is_returned_unmodified() {
	let model = SpyModel::text(VALID);
	let result = interpret_query("q", &model).await;

	assert_eq!(
		result,
		AskNotesResult {
			search_terms: vec!["x".to_string()],
			temporal_hint: None,
			topics: vec!["y".to_string()],
			interpreted_query: "z".to_string(),
		}
	);
}

#[tokio::test]
async fn sends_system_instruction_then_raw_query() {
	let model = SpyModel::text(VALID);

	interpret_query("  Raw Query?  ", &model).await;

	let seen = model.seen.lock().unwrap_or_else(|err| err.into_inner());

	assert_eq!(seen.len(), 2);
	assert_eq!(seen[0].role.as_str(), "system");
	assert!(seen[0].content.contains("interpretedQuery"));
	assert_eq!(seen[1].role.as_str(), "user");
	assert_eq!(seen[1].content, "  Raw Query?  ");
}

#[tokio::test]
async fn plain_keyword_queries_skip_the_model() {
	let model = Arc::new(SpyModel::text(VALID));
	let service = QuarryService::with_model(test_config("heuristic"), model.clone());
	let plan = service.plan("milk eggs bread", datetime!(2024-05-15 12:00 UTC)).await;

	assert!(!plan.routed);
	assert_eq!(plan.routing_reason, "no_heuristic_matched");
	assert!(plan.interpretation.is_none());
	assert_eq!(plan.processed.keywords, vec!["milk", "eggs", "bread"]);
	assert_eq!(model.count(), 0);
}

#[tokio::test]
async fn natural_questions_use_the_model_and_strip_temporal_words() {
	let model = Arc::new(SpyModel::text(
		r#"{"searchTerms":["kickoff","roadmap"],"temporalHint":"last week","topics":["work"],"interpretedQuery":"project kickoff notes"}"#,
	));
	let service = QuarryService::with_model(test_config("heuristic"), model.clone());
	let now = datetime!(2024-05-15 12:00 UTC);
	let plan = service.plan("what did I think about the kickoff last week", now).await;

	assert!(plan.routed);
	assert_eq!(plan.routing_reason, "question_opener");
	assert!(plan.has_semantic_interpretation());
	assert_eq!(plan.temporal_hint(), Some("last week"));
	assert_eq!(plan.processed.keywords, vec!["kickoff"]);

	let filter = plan.temporal_filter.as_ref().expect("Expected a temporal filter.");

	assert_eq!(filter.start_time, datetime!(2024-05-06 00:00 UTC));
	assert_eq!(filter.end_time, datetime!(2024-05-13 00:00 UTC));
	assert_eq!(plan.search_terms(), vec!["kickoff", "roadmap"]);
	assert_eq!(model.count(), 1);
}

#[tokio::test]
async fn routing_off_never_calls_the_model() {
	let model = Arc::new(SpyModel::text(VALID));
	let service = QuarryService::with_model(test_config("off"), model.clone());
	let plan = service.plan("what did I write yesterday?", datetime!(2024-05-15 12:00 UTC)).await;

	assert!(!plan.routed);
	assert!(plan.temporal_filter.is_some());
	assert_eq!(model.count(), 0);
}

#[tokio::test]
async fn routing_always_degrades_when_the_model_is_not_ready() {
	let model = Arc::new(SpyModel::new(false, Reply::Text(VALID.to_string())));
	let service = QuarryService::with_model(test_config("always"), model.clone());
	let plan = service.plan("milk eggs bread", datetime!(2024-05-15 12:00 UTC)).await;

	assert!(plan.routed);
	assert_eq!(plan.fallback_reason.as_deref(), Some("model_not_ready"));
	assert_eq!(plan.interpretation, Some(AskNotesResult::fallback("milk eggs bread")));
	assert!(!plan.has_semantic_interpretation());
	assert_eq!(plan.search_terms(), vec!["milk", "eggs", "bread"]);
	assert_eq!(model.count(), 0);
}

#[tokio::test]
async fn deterministic_window_governs_result_filtering() {
	let model = Arc::new(SpyModel::text(
		r#"{"searchTerms":["recipes"],"temporalHint":"a long time ago","topics":[],"interpretedQuery":"recipes"}"#,
	));
	let service = QuarryService::with_model(test_config("heuristic"), model);
	let now = datetime!(2024-05-15 12:00 UTC);
	let plan = service.plan("recipes I saved 2 days ago", now).await;
	let inside = note(datetime!(2024-05-14 09:00 UTC));
	let outside = note(datetime!(2024-05-01 09:00 UTC));
	let enhanced = plan.into_enhanced(vec![outside, inside.clone()]);

	assert_eq!(enhanced.results, vec![inside]);
	assert!(enhanced.temporal_filter.is_some());
	assert_eq!(enhanced.interpreted_query.as_deref(), Some("recipes"));
}

#[tokio::test]
async fn results_pass_through_without_a_window() {
	let service = QuarryService::with_model(test_config("off"), Arc::new(SpyModel::text(VALID)));
	let plan = service.plan("grocery list", datetime!(2024-05-15 12:00 UTC)).await;
	let results = vec![note(datetime!(2001-01-01 00:00 UTC)), note(datetime!(2024-05-15 11:00 UTC))];
	let enhanced = plan.into_enhanced(results.clone());

	assert_eq!(enhanced.results, results);
	assert!(enhanced.temporal_filter.is_none());
	assert!(enhanced.interpreted_query.is_none());
}

#[tokio::test]
async fn plan_serializes_with_camel_case_contracts() {
	let service = QuarryService::with_model(test_config("always"), Arc::new(SpyModel::text(VALID)));
	let plan = service.plan("trip \"packing list\" 3 days ago", datetime!(2024-05-15 12:00 UTC)).await;
	let value = serde_json::to_value(&plan).expect("Serialize failed.");

	assert_eq!(value["processed"]["keywordQuery"], "\"packing list\" trip packing list");
	assert_eq!(value["temporalFilter"]["startTime"], "2024-05-12T12:00:00Z");
	assert_eq!(value["interpretation"]["interpretedQuery"], "z");
	assert!(value.get("fallbackReason").is_none());
}
