use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub providers: Providers,
	#[serde(default)]
	pub query: Query,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Providers {
	pub llm: LlmProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmProviderConfig {
	#[serde(default = "default_true")]
	pub enabled: bool,
	pub provider_id: String,
	pub api_base: String,
	pub path: String,
	/// Optional. Probed with GET to decide whether the model is ready to serve.
	pub health_path: Option<String>,
	/// Optional. Locally hosted models usually accept unauthenticated requests.
	pub api_key: Option<String>,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Query {
	/// One of "off", "always", or "heuristic".
	pub routing: String,
	/// Optional. Interval for re-probing model readiness in long-running services.
	pub probe_interval_ms: Option<u64>,
}
impl Default for Query {
	fn default() -> Self {
		Self { routing: "heuristic".to_string(), probe_interval_ms: None }
	}
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_true() -> bool {
	true
}
