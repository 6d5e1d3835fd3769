use std::{collections::HashSet, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// Upper bound on the inner length of a quoted phrase. Longer quotes are treated as plain text.
pub const MAX_QUOTED_PHRASE_CHARS: usize = 80;
/// Tokens shorter than this never become keywords.
pub const MIN_KEYWORD_CHARS: usize = 2;

const STOPWORDS: &[&str] = &[
	// Function words.
	"a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
	"are", "aren't", "as", "at", "be", "because", "been", "before", "being", "below", "between",
	"both", "but", "by", "can", "could", "did", "didn't", "do", "does", "doing", "don't", "down",
	"during", "each", "few", "for", "from", "further", "get", "got", "had", "has", "have",
	"having", "he", "her", "here", "hers", "him", "his", "how", "i", "i'd", "i'll", "i'm", "i've",
	"if", "in", "into", "is", "isn't", "it", "it's", "its", "just", "me", "more", "most", "my",
	"myself", "no", "nor", "not", "of", "off", "on", "once", "only", "or", "other", "our", "ours",
	"out", "over", "own", "regarding", "same", "she", "should", "so", "some", "such", "than",
	"that", "the", "their", "them", "then", "there", "these", "they", "this", "those", "through",
	"to", "too", "under", "until", "up", "very", "was", "wasn't", "we", "were", "what", "when",
	"where", "which", "while", "who", "whom", "why", "will", "with", "would", "you", "your",
	// Question and command openers.
	"find", "give", "please", "search", "show", "tell",
	// Note-domain filler.
	"anything", "entries", "entry", "jot", "jotted", "mention", "mentioned", "note", "noted",
	"notes", "saved", "something", "stuff", "think", "thinking", "thought", "thoughts", "wrote",
	"write", "writing", "written",
];

static STOPWORD_SET: LazyLock<HashSet<&'static str>> =
	LazyLock::new(|| STOPWORDS.iter().copied().collect());
static QUOTED_PHRASE: LazyLock<Option<Regex>> = LazyLock::new(|| {
	Regex::new(&format!(r#"["“”]([^"“”\n]{{1,{MAX_QUOTED_PHRASE_CHARS}}})["“”]"#)).ok()
});

/// Lexical representation of a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedQuery {
	pub original: String,
	pub normalized: String,
	/// Quoted phrases (wrapped in double quotes) followed by keywords, space-joined.
	pub keyword_query: String,
	/// Unique, stopword-free tokens in first-occurrence order.
	pub keywords: Vec<String>,
	/// Double-quoted substrings of the original query, verbatim.
	#[serde(default)]
	pub phrases: Vec<String>,
}

pub fn normalize(query: &str) -> ProcessedQuery {
	let normalized = normalize_text(query);
	let phrases = extract_quoted_phrases(query);
	let keywords = extract_keywords(&normalized);
	let keyword_query = phrases
		.iter()
		.map(|phrase| format!("\"{phrase}\""))
		.chain(keywords.iter().cloned())
		.collect::<Vec<_>>()
		.join(" ");

	ProcessedQuery {
		original: query.to_string(),
		normalized,
		keyword_query: keyword_query.trim().to_string(),
		keywords,
		phrases,
	}
}

/// NFKC-folds and lowercases the input, replaces everything except letters, digits, whitespace,
/// and apostrophes with spaces, and collapses whitespace.
pub fn normalize_text(input: &str) -> String {
	let lowered = input.nfkc().collect::<String>().to_lowercase();
	let mut out = String::with_capacity(lowered.len());

	for ch in lowered.chars() {
		let ch = fold_apostrophe(ch);

		if ch.is_alphabetic() || ch.is_numeric() || ch == '\'' {
			out.push(ch);
		} else {
			out.push(' ');
		}
	}

	out.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn is_stopword(token: &str) -> bool {
	STOPWORD_SET.contains(token)
}

pub fn extract_quoted_phrases(input: &str) -> Vec<String> {
	let Some(pattern) = QUOTED_PHRASE.as_ref() else {
		return Vec::new();
	};
	let mut seen = HashSet::new();
	let mut out = Vec::new();

	for caps in pattern.captures_iter(input) {
		let Some(inner) = caps.get(1) else {
			continue;
		};
		let phrase = inner.as_str().trim();

		if phrase.is_empty() {
			continue;
		}
		if seen.insert(phrase.to_lowercase()) {
			out.push(phrase.to_string());
		}
	}

	out
}

fn extract_keywords(normalized: &str) -> Vec<String> {
	let mut seen = HashSet::new();
	let mut out = Vec::new();

	for raw in normalized.split_whitespace() {
		let token = raw.trim_matches('\'');

		if token.chars().count() < MIN_KEYWORD_CHARS || is_stopword(token) {
			continue;
		}
		if seen.insert(token) {
			out.push(token.to_string());
		}
	}

	out
}

fn fold_apostrophe(ch: char) -> char {
	match ch {
		'\u{2018}' | '\u{2019}' | '\u{02BC}' | '`' => '\'',
		other => other,
	}
}
