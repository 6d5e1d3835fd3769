mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Config, LlmProviderConfig, Providers, Query, Service};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	parse(&raw).map_err(|err| match err {
		Error::ParseConfig { source, .. } =>
			Error::ParseConfig { path: path.to_path_buf(), source },
		other => other,
	})
}

pub fn parse(raw: &str) -> Result<Config> {
	let mut cfg: Config = toml::from_str(raw)
		.map_err(|err| Error::ParseConfig { path: Default::default(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}

	let routing = cfg.query.routing.as_str();

	if !matches!(routing, "off" | "always" | "heuristic") {
		return Err(Error::Validation {
			message: "query.routing must be one of off, always, or heuristic.".to_string(),
		});
	}

	if let Some(interval) = cfg.query.probe_interval_ms
		&& interval == 0
	{
		return Err(Error::Validation {
			message: "query.probe_interval_ms must be greater than zero.".to_string(),
		});
	}

	let llm = &cfg.providers.llm;

	if llm.enabled {
		for (label, value) in [
			("providers.llm.api_base", &llm.api_base),
			("providers.llm.path", &llm.path),
			("providers.llm.model", &llm.model),
		] {
			if value.trim().is_empty() {
				return Err(Error::Validation {
					message: format!("{label} must be non-empty when the model is enabled."),
				});
			}
		}
	}
	if !llm.temperature.is_finite() {
		return Err(Error::Validation {
			message: "providers.llm.temperature must be a finite number.".to_string(),
		});
	}
	if !(0.0..=2.0).contains(&llm.temperature) {
		return Err(Error::Validation {
			message: "providers.llm.temperature must be in the range 0.0-2.0.".to_string(),
		});
	}
	if llm.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "providers.llm.timeout_ms must be greater than zero.".to_string(),
		});
	}

	for (key, value) in &llm.default_headers {
		if !value.is_string() {
			return Err(Error::Validation {
				message: format!("providers.llm.default_headers.{key} must be a string."),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	let llm = &mut cfg.providers.llm;

	if llm.api_key.as_deref().map(|key| key.trim().is_empty()).unwrap_or(false) {
		llm.api_key = None;
	}
	if llm.health_path.as_deref().map(|path| path.trim().is_empty()).unwrap_or(false) {
		llm.health_path = None;
	}

	cfg.query.routing = cfg.query.routing.trim().to_ascii_lowercase();
}
