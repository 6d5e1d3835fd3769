//! Relative-time extraction.
//!
//! Rules are an ordered table evaluated top to bottom; the first rule whose pattern matches and
//! whose window resolves wins, regardless of where in the text other rules would match. Every
//! window is computed from the caller-supplied `now`.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use time::{Date, Duration, Month, OffsetDateTime};

/// Days treated as "recently" by the full-query rule.
pub const RECENT_WINDOW_DAYS: i64 = 7;

static RULES: LazyLock<Vec<TemporalRule>> = LazyLock::new(build_rules);
// A residual made only of question or command filler carries no topic.
static FILLER_ONLY: LazyLock<Option<Regex>> = LazyLock::new(|| {
	Regex::new(
		r"(?i)^(?:(?:what|which)(?:\s+notes?)?\s+(?:did|have)\s+i\s+(?:write|written|wrote|note|noted|jot(?:ted)?(?:\s+down)?|save|saved|add|added)|(?:show|list|give)(?:\s+me)?(?:\s+(?:my|all|the))?\s+notes?|(?:all\s+)?(?:my\s+)?notes?)(?:\s+(?:from|in|during|since))?$",
	)
	.ok()
});

/// Explicit `[start_time, end_time]` window extracted from a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalFilter {
	#[serde(with = "crate::time_serde")]
	pub start_time: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub end_time: OffsetDateTime,
	pub description: String,
	/// The query with the temporal phrase removed.
	pub query: String,
}
impl TemporalFilter {
	/// Half-open membership test, so adjacent windows never both claim the shared boundary.
	pub fn contains(&self, instant: OffsetDateTime) -> bool {
		self.start_time <= instant && instant < self.end_time
	}

	/// True when the query was only a temporal question with no topical content.
	pub fn is_window_only(&self) -> bool {
		self.query.is_empty()
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TemporalRuleKind {
	/// "<N> <unit> ago".
	RelativeAgo,
	/// "last week", "this month", and similar calendar phrases.
	NamedWindow,
	/// A query that asks only about a time window, e.g. "what did I write yesterday?".
	WindowOnlyQuery,
	/// "today" or "yesterday" inside a topical query.
	DayWindow,
}

struct TemporalRule {
	kind: TemporalRuleKind,
	pattern: Regex,
	resolve: fn(&Captures<'_>, OffsetDateTime) -> Option<Window>,
}

struct Window {
	start: OffsetDateTime,
	end: OffsetDateTime,
	label: String,
}

pub fn extract_temporal(query: &str, now: OffsetDateTime) -> Option<TemporalFilter> {
	extract_temporal_with_kind(query, now).map(|(filter, _)| filter)
}

pub fn extract_temporal_with_kind(
	query: &str,
	now: OffsetDateTime,
) -> Option<(TemporalFilter, TemporalRuleKind)> {
	for rule in RULES.iter() {
		let Some(caps) = rule.pattern.captures(query) else {
			continue;
		};
		let Some(window) = (rule.resolve)(&caps, now) else {
			continue;
		};
		let Some(span) = caps.get(0) else {
			continue;
		};

		if window.start > window.end {
			continue;
		}

		let mut residual = residual_query(query, span.start(), span.end());

		if is_filler_only(&residual) {
			residual.clear();
		}

		let description = if residual.is_empty() {
			format!("All notes from {}", window.label)
		} else {
			format!("Notes from {}", window.label)
		};

		return Some((
			TemporalFilter {
				start_time: window.start,
				end_time: window.end,
				description,
				query: residual,
			},
			rule.kind,
		));
	}

	None
}

/// Number of rules that compiled; equals the size of the rule table in a healthy build.
pub fn rule_count() -> usize {
	RULES.len()
}

fn build_rules() -> Vec<TemporalRule> {
	let table: [(TemporalRuleKind, &str, fn(&Captures<'_>, OffsetDateTime) -> Option<Window>); 9] = [
		(
			TemporalRuleKind::RelativeAgo,
			r"(?i)\b(\d{1,4}|an?|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve)\s+(minute|min|hour|hr|day|week|month)s?\s+ago\b",
			resolve_relative_ago,
		),
		(TemporalRuleKind::NamedWindow, r"(?i)\blast\s+week\b", |_, now| last_week(now)),
		(TemporalRuleKind::NamedWindow, r"(?i)\bthis\s+week\b", |_, now| this_week(now)),
		(TemporalRuleKind::NamedWindow, r"(?i)\blast\s+month\b", |_, now| last_month(now)),
		(TemporalRuleKind::NamedWindow, r"(?i)\bthis\s+month\b", |_, now| this_month(now)),
		(TemporalRuleKind::NamedWindow, r"(?i)\blast\s+year\b", |_, now| last_year(now)),
		(TemporalRuleKind::NamedWindow, r"(?i)\bthis\s+year\b", |_, now| this_year(now)),
		(
			TemporalRuleKind::WindowOnlyQuery,
			r"(?i)^\s*(?:(?:what|which)\s+(?:notes\s+)?(?:did|have)\s+i\s+(?:write|written|wrote|note|noted|jot(?:ted)?(?:\s+down)?|save|saved|add|added)|(?:show|list|give)(?:\s+me)?(?:\s+(?:my|all|the))?\s+notes?(?:\s+from)?|(?:my\s+)?notes?\s+from)\s+(today|yesterday|recently|lately)\s*[?.!]*\s*$",
			|caps, now| day_phrase(caps.get(1)?.as_str(), now),
		),
		(
			TemporalRuleKind::DayWindow,
			r"(?i)\b(today|yesterday)(?:'s)?\b",
			|caps, now| day_phrase(caps.get(1)?.as_str(), now),
		),
	];

	table
		.into_iter()
		.filter_map(|(kind, pattern, resolve)| {
			Regex::new(pattern).ok().map(|pattern| TemporalRule { kind, pattern, resolve })
		})
		.collect()
}

fn resolve_relative_ago(caps: &Captures<'_>, now: OffsetDateTime) -> Option<Window> {
	let amount = parse_amount(caps.get(1)?.as_str())?;
	let unit = caps.get(2)?.as_str().to_ascii_lowercase();
	let (start, unit_label) = match unit.as_str() {
		"minute" | "min" => (now.checked_sub(Duration::minutes(amount))?, "minute"),
		"hour" | "hr" => (now.checked_sub(Duration::hours(amount))?, "hour"),
		"day" => (now.checked_sub(Duration::days(amount))?, "day"),
		"week" => (now.checked_sub(Duration::weeks(amount))?, "week"),
		"month" => (subtract_months(now, amount)?, "month"),
		_ => return None,
	};
	let label = if amount == 1 {
		format!("the past {unit_label}")
	} else {
		format!("the past {amount} {unit_label}s")
	};

	Some(Window { start, end: now, label })
}

fn parse_amount(raw: &str) -> Option<i64> {
	let lowered = raw.to_ascii_lowercase();
	let amount = match lowered.as_str() {
		"a" | "an" | "one" => 1,
		"two" => 2,
		"three" => 3,
		"four" => 4,
		"five" => 5,
		"six" => 6,
		"seven" => 7,
		"eight" => 8,
		"nine" => 9,
		"ten" => 10,
		"eleven" => 11,
		"twelve" => 12,
		digits => digits.parse().ok()?,
	};

	Some(amount)
}

fn day_phrase(phrase: &str, now: OffsetDateTime) -> Option<Window> {
	let today = start_of_day(now.date(), now)?;

	match phrase.to_ascii_lowercase().as_str() {
		"today" => Some(Window { start: today, end: now, label: "today".to_string() }),
		"yesterday" => Some(Window {
			start: today.checked_sub(Duration::days(1))?,
			end: today,
			label: "yesterday".to_string(),
		}),
		"recently" | "lately" => Some(Window {
			start: now.checked_sub(Duration::days(RECENT_WINDOW_DAYS))?,
			end: now,
			label: format!("the past {RECENT_WINDOW_DAYS} days"),
		}),
		_ => None,
	}
}

fn this_week(now: OffsetDateTime) -> Option<Window> {
	Some(Window { start: start_of_week(now)?, end: now, label: "this week".to_string() })
}

fn last_week(now: OffsetDateTime) -> Option<Window> {
	let end = start_of_week(now)?;

	Some(Window { start: end.checked_sub(Duration::weeks(1))?, end, label: "last week".to_string() })
}

fn this_month(now: OffsetDateTime) -> Option<Window> {
	Some(Window { start: start_of_month(now)?, end: now, label: "this month".to_string() })
}

fn last_month(now: OffsetDateTime) -> Option<Window> {
	let end = start_of_month(now)?;
	let start = subtract_months(end, 1)?;

	Some(Window { start, end, label: "last month".to_string() })
}

fn this_year(now: OffsetDateTime) -> Option<Window> {
	Some(Window { start: start_of_year(now.year(), now)?, end: now, label: "this year".to_string() })
}

fn last_year(now: OffsetDateTime) -> Option<Window> {
	Some(Window {
		start: start_of_year(now.year().checked_sub(1)?, now)?,
		end: start_of_year(now.year(), now)?,
		label: "last year".to_string(),
	})
}

fn start_of_day(date: Date, now: OffsetDateTime) -> Option<OffsetDateTime> {
	Some(date.midnight().assume_offset(now.offset()))
}

// Weeks start on Monday.
fn start_of_week(now: OffsetDateTime) -> Option<OffsetDateTime> {
	let offset_days = i64::from(now.weekday().number_days_from_monday());
	let date = now.date().checked_sub(Duration::days(offset_days))?;

	start_of_day(date, now)
}

fn start_of_month(now: OffsetDateTime) -> Option<OffsetDateTime> {
	let date = Date::from_calendar_date(now.year(), now.month(), 1).ok()?;

	start_of_day(date, now)
}

fn start_of_year(year: i32, now: OffsetDateTime) -> Option<OffsetDateTime> {
	let date = Date::from_calendar_date(year, Month::January, 1).ok()?;

	start_of_day(date, now)
}

/// Calendar month subtraction; the day is clamped to the length of the target month.
fn subtract_months(at: OffsetDateTime, months: i64) -> Option<OffsetDateTime> {
	let index = i64::from(at.year()) * 12 + i64::from(u8::from(at.month())) - 1 - months;
	let year = i32::try_from(index.div_euclid(12)).ok()?;
	let month = Month::try_from(u8::try_from(index.rem_euclid(12) + 1).ok()?).ok()?;
	let day = at.day().min(month.length(year));
	let date = Date::from_calendar_date(year, month, day).ok()?;

	Some(at.replace_date(date))
}

fn is_filler_only(residual: &str) -> bool {
	FILLER_ONLY.as_ref().is_some_and(|pattern| pattern.is_match(residual))
}

fn residual_query(query: &str, start: usize, end: usize) -> String {
	let joined = format!("{} {}", &query[..start], &query[end..]);

	joined
		.split_whitespace()
		.filter(|token| token.chars().any(char::is_alphanumeric))
		.collect::<Vec<_>>()
		.join(" ")
}
