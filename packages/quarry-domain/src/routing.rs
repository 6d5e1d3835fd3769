//! Decides whether a query is worth a semantic interpretation pass.
//!
//! The heuristics are OR-ed and deliberately recall-oriented: a false positive only costs a
//! model call with a cheap fallback, while a false negative loses recall on natural questions.

use std::sync::LazyLock;

use regex::Regex;

/// Only this many leading characters are inspected, which bounds the per-keystroke cost.
pub const MAX_ROUTING_CHARS: usize = 512;

static HEURISTICS: LazyLock<Vec<(RoutingHeuristic, Regex)>> = LazyLock::new(build_heuristics);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoutingHeuristic {
	QuestionOpener,
	SelfReference,
	RelativeTime,
	TopicReference,
	IdeaPhrasing,
	QuestionMark,
}
impl RoutingHeuristic {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::QuestionOpener => "question_opener",
			Self::SelfReference => "self_reference",
			Self::RelativeTime => "relative_time",
			Self::TopicReference => "topic_reference",
			Self::IdeaPhrasing => "idea_phrasing",
			Self::QuestionMark => "question_mark",
		}
	}
}

pub fn should_use_llm(query: &str) -> bool {
	matched_heuristic(query).is_some()
}

/// The first heuristic, in table order, that matches the query.
pub fn matched_heuristic(query: &str) -> Option<RoutingHeuristic> {
	let bounded = bounded_prefix(query, MAX_ROUTING_CHARS);

	if bounded.trim().is_empty() {
		return None;
	}

	HEURISTICS
		.iter()
		.find(|(_, pattern)| pattern.is_match(bounded))
		.map(|(heuristic, _)| *heuristic)
}

pub fn heuristic_count() -> usize {
	HEURISTICS.len()
}

fn build_heuristics() -> Vec<(RoutingHeuristic, Regex)> {
	let table = [
		(
			RoutingHeuristic::QuestionOpener,
			r"(?i)^\s*(?:what|who|whom|whose|when|where|why|how|which|find|show|tell\s+me|list|search|remind\s+me|did|do|does|have|has|can|could|was|were)\b",
		),
		(
			RoutingHeuristic::SelfReference,
			r"(?i)\b(?:i\s+(?:wrote|write|written|noted|jotted|mentioned|said|saved|thought|think|was\s+thinking|had|read|learned|met)|my\s+(?:notes?|ideas?|thoughts?|journal|entries|entry))\b",
		),
		(
			RoutingHeuristic::RelativeTime,
			r"(?i)\b(?:yesterday|today|tonight|recently|lately|earlier|ago|(?:last|this|past|previous)\s+(?:week|weekend|month|year|night|monday|tuesday|wednesday|thursday|friday|saturday|sunday))\b",
		),
		(
			RoutingHeuristic::TopicReference,
			r"(?i)\b(?:about|regarding|concerning|related\s+to|relating\s+to|on\s+the\s+topic\s+of)\s+\w",
		),
		(
			RoutingHeuristic::IdeaPhrasing,
			r"(?i)\b(?:ideas?|thoughts?|notes?|plans?|insights?)\s+(?:about|on|for|regarding|around)\b",
		),
		(RoutingHeuristic::QuestionMark, r"\?\s*$"),
	];

	table
		.into_iter()
		.filter_map(|(heuristic, pattern)| Regex::new(pattern).ok().map(|re| (heuristic, re)))
		.collect()
}

fn bounded_prefix(query: &str, max_chars: usize) -> &str {
	match query.char_indices().nth(max_chars) {
		Some((idx, _)) => &query[..idx],
		None => query,
	}
}
