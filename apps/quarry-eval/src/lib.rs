use std::{
	fs,
	path::{Path, PathBuf},
	sync::Arc,
	time::Instant,
};

use clap::Parser;
use color_eyre::eyre;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use quarry_config::Config;
use quarry_service::{DisabledModel, QuarryService, QueryPlan, RoutingMode};

#[derive(Debug, Parser)]
#[command(
	version = quarry_cli::VERSION,
	rename_all = "kebab",
	styles = quarry_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[arg(long, short = 'd', value_name = "FILE")]
	pub dataset: PathBuf,
	/// Reference instant for relative-time phrases. Defaults to the current time.
	#[arg(long, value_name = "RFC3339", value_parser = parse_now)]
	pub now: Option<OffsetDateTime>,
	/// Probe and call the configured model instead of running the deterministic stages only.
	#[arg(long)]
	pub with_model: bool,
}

#[derive(Debug, Deserialize)]
pub struct EvalDataset {
	pub name: Option<String>,
	pub queries: Vec<EvalQuery>,
}

#[derive(Debug, Deserialize)]
pub struct EvalQuery {
	pub id: Option<String>,
	pub query: String,
	pub expect_llm: Option<bool>,
	pub expect_keywords: Option<Vec<String>>,
	pub expect_temporal: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct EvalOutput {
	pub dataset: EvalDatasetInfo,
	pub settings: EvalSettings,
	pub summary: EvalSummary,
	pub queries: Vec<QueryReport>,
}

#[derive(Debug, Serialize)]
pub struct EvalDatasetInfo {
	pub name: String,
	pub query_count: usize,
}

#[derive(Debug, Serialize)]
pub struct EvalSettings {
	pub config_path: String,
	pub routing: RoutingMode,
	pub with_model: bool,
	pub model_ready: bool,
	#[serde(with = "quarry_domain::time_serde")]
	pub now: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct EvalSummary {
	pub passed_queries: usize,
	pub pass_rate: f64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub routing_pass_rate: Option<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub keywords_pass_rate: Option<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub temporal_pass_rate: Option<f64>,
	pub fallback_count: usize,
	pub latency_ms_p50: f64,
	pub latency_ms_p95: f64,
}

#[derive(Debug, Serialize)]
pub struct QueryReport {
	pub id: String,
	pub query: String,
	pub routed: bool,
	pub routing_reason: String,
	pub keywords: Vec<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub temporal_description: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub fallback_reason: Option<String>,
	pub search_terms: Vec<String>,
	pub latency_ms: f64,
	pub checks: Vec<CheckReport>,
	pub passed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
	Routing,
	Keywords,
	Temporal,
}

#[derive(Debug, Serialize)]
pub struct CheckReport {
	pub check: CheckKind,
	pub passed: bool,
	pub expected: serde_json::Value,
	pub actual: serde_json::Value,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = quarry_config::load(&args.config)?;

	quarry_cli::init_tracing(&config.service.log_level)?;

	let dataset = load_dataset(&args.dataset)?;
	let now = args.now.unwrap_or_else(OffsetDateTime::now_utc);
	let service = build_service(config, args.with_model).await;
	let output = evaluate(&service, &dataset, now, &args.config, args.with_model).await;
	let json = serde_json::to_string_pretty(&output)?;

	println!("{json}");

	Ok(())
}

pub fn load_dataset(path: &Path) -> color_eyre::Result<EvalDataset> {
	let raw = fs::read_to_string(path)?;
	let dataset: EvalDataset = serde_json::from_str(&raw)?;

	if dataset.queries.is_empty() {
		return Err(eyre::eyre!("Dataset must include at least one query."));
	}
	if let Some(index) = dataset.queries.iter().position(|query| query.query.trim().is_empty()) {
		return Err(eyre::eyre!("Dataset query at index {index} is empty."));
	}

	Ok(dataset)
}

/// Runs every dataset query through the pipeline and scores the declared expectations.
pub async fn evaluate(
	service: &QuarryService,
	dataset: &EvalDataset,
	now: OffsetDateTime,
	config_path: &Path,
	with_model: bool,
) -> EvalOutput {
	let mut queries = Vec::with_capacity(dataset.queries.len());

	for (index, query) in dataset.queries.iter().enumerate() {
		let started = Instant::now();
		let plan = service.plan(&query.query, now).await;
		let latency_ms = started.elapsed().as_secs_f64() * 1_000.0;
		let id = query.id.clone().unwrap_or_else(|| format!("q{}", index + 1));

		tracing::debug!(id = %id, routed = plan.routed, latency_ms, "Evaluated query.");

		queries.push(build_report(id, query, plan, latency_ms));
	}

	let summary = summarize(&queries);

	EvalOutput {
		dataset: EvalDatasetInfo {
			name: dataset.name.clone().unwrap_or_else(|| "unnamed".to_string()),
			query_count: dataset.queries.len(),
		},
		settings: EvalSettings {
			config_path: config_path.display().to_string(),
			routing: RoutingMode::from_config(&service.cfg),
			with_model,
			model_ready: service.model.is_ready(),
			now,
		},
		summary,
		queries,
	}
}

async fn build_service(config: Config, with_model: bool) -> QuarryService {
	if !with_model {
		return QuarryService::with_model(config, Arc::new(DisabledModel));
	}

	let service = QuarryService::new(config);
	let ready = service.refresh_model().await;

	if !ready {
		tracing::warn!("Model is not ready; routed queries will use the fallback interpretation.");
	}

	service
}

fn build_report(id: String, query: &EvalQuery, plan: QueryPlan, latency_ms: f64) -> QueryReport {
	let mut checks = Vec::new();

	if let Some(expected) = query.expect_llm {
		checks.push(CheckReport {
			check: CheckKind::Routing,
			passed: plan.routed == expected,
			expected: expected.into(),
			actual: plan.routed.into(),
		});
	}
	if let Some(expected) = query.expect_keywords.as_ref() {
		let missing = expected.iter().any(|keyword| {
			!plan.processed.keywords.iter().any(|actual| actual.eq_ignore_ascii_case(keyword))
		});

		checks.push(CheckReport {
			check: CheckKind::Keywords,
			passed: !missing,
			expected: expected.clone().into(),
			actual: plan.processed.keywords.clone().into(),
		});
	}
	if let Some(expected) = query.expect_temporal {
		let actual = plan.temporal_filter.is_some();

		checks.push(CheckReport {
			check: CheckKind::Temporal,
			passed: actual == expected,
			expected: expected.into(),
			actual: actual.into(),
		});
	}

	let passed = checks.iter().all(|check| check.passed);
	let search_terms = plan.search_terms();

	QueryReport {
		id,
		query: plan.query,
		routed: plan.routed,
		routing_reason: plan.routing_reason,
		keywords: plan.processed.keywords,
		temporal_description: plan.temporal_filter.map(|filter| filter.description),
		fallback_reason: plan.fallback_reason,
		search_terms,
		latency_ms,
		checks,
		passed,
	}
}

fn summarize(queries: &[QueryReport]) -> EvalSummary {
	let passed_queries = queries.iter().filter(|query| query.passed).count();
	let fallback_count = queries.iter().filter(|query| query.fallback_reason.is_some()).count();
	let mut latencies: Vec<f64> = queries.iter().map(|query| query.latency_ms).collect();

	latencies.sort_by(|a, b| a.total_cmp(b));

	EvalSummary {
		passed_queries,
		pass_rate: ratio(passed_queries, queries.len()),
		routing_pass_rate: check_pass_rate(queries, CheckKind::Routing),
		keywords_pass_rate: check_pass_rate(queries, CheckKind::Keywords),
		temporal_pass_rate: check_pass_rate(queries, CheckKind::Temporal),
		fallback_count,
		latency_ms_p50: percentile(&latencies, 0.50),
		latency_ms_p95: percentile(&latencies, 0.95),
	}
}

fn check_pass_rate(queries: &[QueryReport], kind: CheckKind) -> Option<f64> {
	let (total, passed) = queries
		.iter()
		.flat_map(|query| query.checks.iter())
		.filter(|check| check.check == kind)
		.fold((0_usize, 0_usize), |(total, passed), check| {
			(total + 1, passed + usize::from(check.passed))
		});

	(total > 0).then(|| ratio(passed, total))
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
	if denominator == 0 {
		return 0.0;
	}

	numerator as f64 / denominator as f64
}

fn percentile(values: &[f64], percentile: f64) -> f64 {
	if values.is_empty() {
		return 0.0;
	}

	let clamped = percentile.clamp(0.0, 1.0);
	let pos = clamped * (values.len() as f64 - 1.0);
	let lower = pos.floor() as usize;
	let upper = pos.ceil() as usize;

	if lower == upper {
		values[lower]
	} else {
		let weight = pos - lower as f64;

		values[lower] * (1.0 - weight) + values[upper] * weight
	}
}

fn parse_now(raw: &str) -> Result<OffsetDateTime, String> {
	quarry_domain::time_serde::parse(raw).map_err(|err| format!("Invalid RFC 3339 instant: {err}."))
}
