use std::sync::Arc;

use axum::{
	Router,
	body::{self, Body},
	http::{Request, StatusCode},
};
use serde_json::{Map, Value};
use tower::util::ServiceExt;

use quarry_api::{routes, state::AppState};
use quarry_config::{Config, LlmProviderConfig, Providers, Query, Service};
use quarry_service::{BoxFuture, ChatMessage, LanguageModel, QuarryService, Result};

struct CannedModel {
	ready: bool,
	reply: &'static str,
}
impl LanguageModel for CannedModel {
	fn is_ready(&self) -> bool {
		self.ready
	}

	fn generate<'a>(&'a self, _messages: &'a [ChatMessage]) -> BoxFuture<'a, Result<String>> {
		let reply = self.reply.to_string();

		Box::pin(async move { Ok(reply) })
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

fn app(routing: &str, ready: bool, reply: &'static str) -> Router {
	let model = Arc::new(CannedModel { ready, reply });
	let service = QuarryService::with_model(test_config(routing), model);

	routes::router(AppState::from_service(service))
}

async fn post_json(app: Router, uri: &str, payload: Value) -> (StatusCode, Value) {
	let response = app
		.oneshot(
			Request::builder()
				.method("POST")
				.uri(uri)
				.header("content-type", "application/json")
				.body(Body::from(payload.to_string()))
				.expect("Failed to build request."),
		)
		.await
		.expect("Failed to call route.");
	let status = response.status();
	let body = body::to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Failed to read response body.");
	let json = serde_json::from_slice(&body).expect("Failed to parse response.");

	(status, json)
}

#[tokio::test]
async fn health_ok() {
	let response = app("heuristic", true, "{}")
		.oneshot(
			Request::builder().uri("/health").body(Body::empty()).expect("Failed to build request."),
		)
		.await
		.expect("Failed to call /health.");

	assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn model_status_reports_readiness_and_routing() {
	let response = app("always", false, "{}")
		.oneshot(
			Request::builder().uri("/v1/model").body(Body::empty()).expect("Failed to build request."),
		)
		.await
		.expect("Failed to call /v1/model.");

	assert_eq!(response.status(), StatusCode::OK);

	let body = body::to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Failed to read response body.");
	let json: Value = serde_json::from_slice(&body).expect("Failed to parse response.");

	assert_eq!(json["ready"], false);
	assert_eq!(json["routing"], "always");
}

#[tokio::test]
async fn plan_returns_window_and_interpretation() {
	let reply = r#"{"searchTerms":["hiking"],"temporalHint":"3 days ago","topics":["outdoors"],"interpretedQuery":"hiking notes"}"#;
	let (status, json) = post_json(
		app("always", true, reply),
		"/v1/query/plan",
		serde_json::json!({ "query": "hiking 3 days ago", "now": "2024-05-15T12:00:00Z" }),
	)
	.await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json["routed"], true);
	assert_eq!(json["temporalFilter"]["startTime"], "2024-05-12T12:00:00Z");
	assert_eq!(json["temporalFilter"]["endTime"], "2024-05-15T12:00:00Z");
	assert_eq!(json["processed"]["keywords"][0], "hiking");
	assert_eq!(json["interpretation"]["interpretedQuery"], "hiking notes");
}

#[tokio::test]
async fn plan_falls_back_when_the_model_is_not_ready() {
	let (status, json) = post_json(
		app("always", false, "{}"),
		"/v1/query/plan",
		serde_json::json!({ "query": "garden plans" }),
	)
	.await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json["fallbackReason"], "model_not_ready");
	assert_eq!(json["interpretation"]["searchTerms"][0], "garden plans");
	assert_eq!(json["interpretation"]["interpretedQuery"], "garden plans");
	assert!(json["interpretation"]["temporalHint"].is_null());
}

#[tokio::test]
async fn plan_rejects_blank_queries() {
	let (status, json) = post_json(
		app("heuristic", true, "{}"),
		"/v1/query/plan",
		serde_json::json!({ "query": "   " }),
	)
	.await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(json["error_code"], "invalid_request");
	assert_eq!(json["fields"][0], "query");
}

#[tokio::test]
async fn normalize_returns_the_lexical_view() {
	let (status, json) = post_json(
		app("off", true, "{}"),
		"/v1/query/normalize",
		serde_json::json!({ "query": "Show me notes about the \"Quarterly Report\"" }),
	)
	.await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json["phrases"][0], "Quarterly Report");
	assert_eq!(json["keywords"], serde_json::json!(["quarterly", "report"]));
}

#[tokio::test]
async fn route_reports_the_heuristic_decision() {
	let (status, json) = post_json(
		app("heuristic", true, "{}"),
		"/v1/query/route",
		serde_json::json!({ "query": "milk eggs bread" }),
	)
	.await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json["useLlm"], false);
	assert!(json["heuristic"].is_null());

	let (_, json) = post_json(
		app("heuristic", true, "{}"),
		"/v1/query/route",
		serde_json::json!({ "query": "what did I plan for the garden?" }),
	)
	.await;

	assert_eq!(json["useLlm"], true);
	assert_eq!(json["heuristic"], "question_opener");
}

#[tokio::test]
async fn overlong_queries_are_rejected() {
	let query = "a".repeat(routes::MAX_QUERY_CHARS + 1);
	let (status, json) =
		post_json(app("off", true, "{}"), "/v1/query/route", serde_json::json!({ "query": query }))
			.await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(json["error_code"], "invalid_request");
}
