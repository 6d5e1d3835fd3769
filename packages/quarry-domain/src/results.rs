use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::temporal::TemporalFilter;

/// Semantic interpretation of a query. Always fully populated, including on fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskNotesResult {
	pub search_terms: Vec<String>,
	pub temporal_hint: Option<String>,
	pub topics: Vec<String>,
	pub interpreted_query: String,
}
impl AskNotesResult {
	/// Treats the whole query as its own search term.
	pub fn fallback(query: &str) -> Self {
		Self {
			search_terms: vec![query.to_string()],
			temporal_hint: None,
			topics: Vec::new(),
			interpreted_query: query.to_string(),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
	Semantic,
	Keyword,
	Both,
}
impl MatchType {
	/// Combines the match types of two hits on the same note.
	pub fn merge(self, other: Self) -> Self {
		if self == other { self } else { Self::Both }
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
	pub id: Uuid,
	pub title: String,
	pub content: String,
	#[serde(default)]
	pub tags: Vec<String>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}
impl Note {
	/// A note falls in a window when it was created or last edited inside it.
	pub fn touched_within(&self, filter: &TemporalFilter) -> bool {
		filter.contains(self.created_at) || filter.contains(self.updated_at)
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
	#[serde(flatten)]
	pub note: Note,
	pub relevance_score: f32,
	pub match_type: MatchType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedSearchResult {
	pub results: Vec<SearchResult>,
	pub temporal_filter: Option<TemporalFilter>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub interpreted_query: Option<String>,
}
