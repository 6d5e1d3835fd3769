use axum::{
	Json, Router,
	extract::State,
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::state::AppState;
use quarry_domain::{ProcessedQuery, normalize, routing};
use quarry_service::{QueryPlan, RoutingMode};

pub const MAX_QUERY_CHARS: usize = 2_000;

#[derive(Debug, Deserialize)]
pub struct PlanRequest {
	pub query: String,
	/// Optional. Reference instant for relative-time phrases; defaults to the server clock.
	#[serde(default, with = "quarry_domain::time_serde::option")]
	pub now: Option<OffsetDateTime>,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
	pub query: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteResponse {
	pub use_llm: bool,
	pub heuristic: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelStatusResponse {
	pub ready: bool,
	pub routing: RoutingMode,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}

	fn invalid_query(message: impl Into<String>) -> Self {
		Self::new(
			StatusCode::BAD_REQUEST,
			"invalid_request",
			message,
			Some(vec!["query".to_string()]),
		)
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body =
			ErrorBody { error_code: self.error_code, message: self.message, fields: self.fields };

		(self.status, Json(body)).into_response()
	}
}

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/model", get(model_status))
		.route("/v1/query/plan", post(plan))
		.route("/v1/query/normalize", post(normalize_query))
		.route("/v1/query/route", post(route_query))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn model_status(State(state): State<AppState>) -> Json<ModelStatusResponse> {
	Json(ModelStatusResponse {
		ready: state.service.model.is_ready(),
		routing: RoutingMode::from_config(&state.service.cfg),
	})
}

async fn plan(
	State(state): State<AppState>,
	Json(payload): Json<PlanRequest>,
) -> Result<Json<QueryPlan>, ApiError> {
	check_query(&payload.query)?;

	let now = payload.now.unwrap_or_else(OffsetDateTime::now_utc);
	let plan = state.service.plan(&payload.query, now).await;

	Ok(Json(plan))
}

async fn normalize_query(
	Json(payload): Json<QueryRequest>,
) -> Result<Json<ProcessedQuery>, ApiError> {
	check_length(&payload.query)?;

	Ok(Json(normalize::normalize(&payload.query)))
}

async fn route_query(Json(payload): Json<QueryRequest>) -> Result<Json<RouteResponse>, ApiError> {
	check_length(&payload.query)?;

	let heuristic = routing::matched_heuristic(&payload.query);

	Ok(Json(RouteResponse {
		use_llm: heuristic.is_some(),
		heuristic: heuristic.map(|heuristic| heuristic.as_str().to_string()),
	}))
}

fn check_query(query: &str) -> Result<(), ApiError> {
	if query.trim().is_empty() {
		return Err(ApiError::invalid_query("query must be non-empty."));
	}

	check_length(query)
}

fn check_length(query: &str) -> Result<(), ApiError> {
	if query.chars().count() > MAX_QUERY_CHARS {
		return Err(ApiError::invalid_query(format!(
			"query must be at most {MAX_QUERY_CHARS} characters."
		)));
	}

	Ok(())
}
