//! Semantic query interpretation through a capability-gated language model.
//!
//! Model output is untrusted. It is parsed and validated against a fixed schema, and every
//! failure collapses into the fallback [`AskNotesResult`] at a single exit point.

use serde_json::{Map, Value};

use crate::{
	Error, Result,
	model::{ChatMessage, LanguageModel},
};
use quarry_domain::AskNotesResult;

/// Balanced `{...}` spans that may fail to parse before the scan gives up. Stray unbalanced
/// braces do not count.
const MAX_REJECTED_CANDIDATES: usize = 64;

/// Result of one interpretation attempt, including why it degraded when it did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpretation {
	pub result: AskNotesResult,
	/// Failure kind that forced the fallback, if any.
	pub fallback_reason: Option<&'static str>,
}
impl Interpretation {
	pub fn is_fallback(&self) -> bool {
		self.fallback_reason.is_some()
	}
}

/// Interprets `query`, returning the fallback interpretation on any failure.
pub async fn interpret_query(query: &str, model: &dyn LanguageModel) -> AskNotesResult {
	interpret(query, model).await.result
}

pub async fn interpret(query: &str, model: &dyn LanguageModel) -> Interpretation {
	match try_interpret(query, model).await {
		Ok(result) => Interpretation { result, fallback_reason: None },
		Err(err) => {
			if matches!(err, Error::ModelNotReady) {
				tracing::debug!("Model is not ready; using fallback interpretation.");
			} else {
				tracing::warn!(
					error = %err,
					failure = err.kind(),
					"Query interpretation failed; falling back to the raw query."
				);
			}

			Interpretation {
				result: AskNotesResult::fallback(query),
				fallback_reason: Some(err.kind()),
			}
		},
	}
}

pub fn build_messages(query: &str) -> Vec<ChatMessage> {
	vec![ChatMessage::system(system_prompt()), ChatMessage::user(query)]
}

pub fn system_prompt() -> String {
	let schema = serde_json::json!({
		"searchTerms": ["string"],
		"temporalHint": "string or null",
		"topics": ["string"],
		"interpretedQuery": "string"
	});
	format!(
		"You interpret search questions about a person's private notes. \
Extract the concrete search terms, any time reference, and the topics the question is about, \
then restate the question as a short search query. \
Output must be valid JSON only and must match this exact schema:\n{schema:#}\n\
Rules:\n\
- searchTerms: distinctive words or short phrases likely to appear in matching notes.\n\
- temporalHint: the time reference as written (for example \"last week\"), or null.\n\
- topics: broad subjects of the question.\n\
- interpretedQuery: one sentence describing what to search for.\n\
Do not add explanations, code fences, or extra fields."
	)
}

/// Parses and validates raw model output.
pub fn parse_interpretation(raw: &str) -> Result<AskNotesResult> {
	validate(parse_json_payload(raw)?)
}

async fn try_interpret(query: &str, model: &dyn LanguageModel) -> Result<AskNotesResult> {
	if !model.is_ready() {
		return Err(Error::ModelNotReady);
	}

	let messages = build_messages(query);
	let raw = model.generate(&messages).await?;

	parse_interpretation(&raw)
}

fn parse_json_payload(raw: &str) -> Result<Value> {
	let trimmed = raw.trim();
	let direct = serde_json::from_str::<Value>(trimmed);

	if let Ok(value @ Value::Object(_)) = direct {
		return Ok(value);
	}
	if let Some(value) = find_embedded_object(trimmed) {
		return Ok(value);
	}

	match direct {
		Ok(_) => Err(Error::Validation { message: "Model output is not a JSON object.".to_string() }),
		Err(err) => Err(Error::MalformedResponse {
			message: format!("No JSON object found in model output ({err})."),
		}),
	}
}

fn find_embedded_object(text: &str) -> Option<Value> {
	let mut rejected = 0_usize;

	for (start, _) in text.char_indices().filter(|(_, ch)| *ch == '{') {
		let Some(end) = balanced_object_end(text, start) else {
			continue;
		};

		if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(&text[start..end]) {
			return Some(value);
		}

		rejected += 1;

		if rejected >= MAX_REJECTED_CANDIDATES {
			return None;
		}
	}

	None
}

/// Byte offset just past the `}` closing the object that opens at `start`, honoring strings.
fn balanced_object_end(text: &str, start: usize) -> Option<usize> {
	let mut depth = 0_usize;
	let mut in_string = false;
	let mut escaped = false;

	for (offset, ch) in text[start..].char_indices() {
		if in_string {
			match ch {
				_ if escaped => escaped = false,
				'\\' => escaped = true,
				'"' => in_string = false,
				_ => {},
			}

			continue;
		}

		match ch {
			'"' => in_string = true,
			'{' => depth += 1,
			'}' => {
				depth = depth.checked_sub(1)?;

				if depth == 0 {
					return Some(start + offset + ch.len_utf8());
				}
			},
			_ => {},
		}
	}

	None
}

fn validate(value: Value) -> Result<AskNotesResult> {
	let Value::Object(map) = value else {
		return Err(Error::Validation { message: "Model output is not a JSON object.".to_string() });
	};
	let search_terms = string_array(&map, "searchTerms")?;
	let topics = string_array(&map, "topics")?;
	let interpreted_query = match map.get("interpretedQuery") {
		Some(Value::String(text)) => text.clone(),
		_ => return Err(invalid_field("interpretedQuery", "a string")),
	};
	let temporal_hint = match map.get("temporalHint") {
		Some(Value::Null) => None,
		Some(Value::String(text)) => Some(text.clone()),
		_ => return Err(invalid_field("temporalHint", "a string or null")),
	};

	Ok(AskNotesResult { search_terms, temporal_hint, topics, interpreted_query })
}

fn string_array(map: &Map<String, Value>, field: &str) -> Result<Vec<String>> {
	let Some(Value::Array(items)) = map.get(field) else {
		return Err(invalid_field(field, "an array of strings"));
	};

	items
		.iter()
		.map(|item| item.as_str().map(str::to_string))
		.collect::<Option<Vec<_>>>()
		.ok_or_else(|| invalid_field(field, "an array of strings"))
}

fn invalid_field(field: &str, expected: &str) -> Error {
	Error::Validation { message: format!("Field {field} must be {expected}.") }
}
