use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use quarry_config::Config;
use quarry_domain::{
	AskNotesResult, EnhancedSearchResult, ProcessedQuery, SearchResult, TemporalFilter,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingMode {
	Off,
	Always,
	Heuristic,
}
impl RoutingMode {
	pub fn from_config(cfg: &Config) -> Self {
		match cfg.query.routing.as_str() {
			"off" => Self::Off,
			"always" => Self::Always,
			"heuristic" => Self::Heuristic,
			_ => Self::Heuristic,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Off => "off",
			Self::Always => "always",
			Self::Heuristic => "heuristic",
		}
	}
}

/// Everything the ranking stage needs to search for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPlan {
	pub query: String,
	pub routed: bool,
	pub routing_reason: String,
	/// Lexical view of the query, computed on the temporal residual when a window was found.
	pub processed: ProcessedQuery,
	pub temporal_filter: Option<TemporalFilter>,
	pub interpretation: Option<AskNotesResult>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub fallback_reason: Option<String>,
}
impl QueryPlan {
	/// True when the semantic interpretation came from a successful model call.
	pub fn has_semantic_interpretation(&self) -> bool {
		self.interpretation.is_some() && self.fallback_reason.is_none()
	}

	/// Quoted phrases, then keywords, then model search terms, deduplicated case-insensitively.
	///
	/// Fallback interpretations add nothing here: their single term is the raw query, which the
	/// lexical terms already cover.
	pub fn search_terms(&self) -> Vec<String> {
		let semantic = self
			.interpretation
			.as_ref()
			.filter(|_| self.has_semantic_interpretation())
			.map(|interpretation| interpretation.search_terms.as_slice())
			.unwrap_or_default();
		let mut seen = HashSet::new();
		let mut out = Vec::new();

		for term in self.processed.phrases.iter().chain(&self.processed.keywords).chain(semantic) {
			let trimmed = term.trim();

			if trimmed.is_empty() {
				continue;
			}
			if seen.insert(trimmed.to_lowercase()) {
				out.push(trimmed.to_string());
			}
		}

		out
	}

	/// Free-text time reference from the model. Display only; filtering uses `temporal_filter`.
	pub fn temporal_hint(&self) -> Option<&str> {
		self.interpretation
			.as_ref()
			.and_then(|interpretation| interpretation.temporal_hint.as_deref())
	}

	/// Applies the deterministic window to ranked results and attaches the interpreted query.
	pub fn into_enhanced(self, results: Vec<SearchResult>) -> EnhancedSearchResult {
		let interpreted_query = if self.has_semantic_interpretation() {
			self.interpretation.map(|interpretation| interpretation.interpreted_query)
		} else {
			None
		};
		let results = match self.temporal_filter.as_ref() {
			Some(filter) =>
				results.into_iter().filter(|result| result.note.touched_within(filter)).collect(),
			None => results,
		};

		EnhancedSearchResult { results, temporal_filter: self.temporal_filter, interpreted_query }
	}
}
