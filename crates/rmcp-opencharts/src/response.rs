//! Interpretation of OpenCharts API bodies.
//!
//! Success bodies look like `{"data": {"link": {"href": "..."}}}`. Error
//! bodies carry a list of messages under `error`; when a valid time is not
//! served, the first message embeds the served times as a bracketed list of
//! quoted timestamps.

use std::sync::LazyLock;

use chrono::DateTime;
use regex::Regex;
use serde::Deserialize;

use crate::error::{ChartError, ChartResult};

const UNKNOWN_ERROR: &str = "Unknown error";
const VALID_TIMES_MARKER: &str = "available valid_time";

static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[.*?\]").expect("static regex is valid"));

#[derive(Debug, Deserialize)]
struct ProductResponse {
    data: Option<ProductData>,
}

#[derive(Debug, Deserialize)]
struct ProductData {
    link: Option<Link>,
}

#[derive(Debug, Deserialize)]
struct Link {
    href: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: Vec<serde_json::Value>,
}

/// Outcome of probing the API for the valid times of a base time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidTimes {
    Available(Vec<String>),
    Undetermined,
}

/// First message of an error body, if the body has the expected shape.
pub fn error_message(body: &[u8]) -> Option<String> {
    let parsed: ErrorResponse = serde_json::from_slice(body).ok()?;
    parsed.error.into_iter().next().map(|msg| match msg {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}

/// Failure for a non-200 products response.
pub fn upstream_failure(body: &[u8]) -> ChartError {
    ChartError::Upstream(error_message(body).unwrap_or_else(|| UNKNOWN_ERROR.to_string()))
}

/// Image URL from a 200 products response.
pub fn image_link(body: &[u8]) -> ChartResult<String> {
    let parsed: ProductResponse = serde_json::from_slice(body)?;
    parsed
        .data
        .and_then(|d| d.link)
        .and_then(|l| l.href)
        .ok_or(ChartError::MissingLink)
}

/// Valid times recovered from the body of a rejected sentinel request.
pub fn rejected_valid_times(status: u16, body: &[u8]) -> ValidTimes {
    if status == 200 {
        return ValidTimes::Undetermined;
    }

    let Some(message) = error_message(body) else {
        return ValidTimes::Undetermined;
    };
    if !message.contains(VALID_TIMES_MARKER) {
        tracing::debug!(%message, "error does not list valid times");
        return ValidTimes::Undetermined;
    }

    match extract_valid_times(&message) {
        Some(times) if !times.is_empty() => ValidTimes::Available(times),
        _ => ValidTimes::Undetermined,
    }
}

/// Parses the first bracketed list in `message`.
pub fn extract_valid_times(message: &str) -> Option<Vec<String>> {
    let literal = BRACKETED.find(message)?;
    let times = parse_time_list(literal.as_str());
    if times.is_none() {
        tracing::warn!(literal = literal.as_str(), "rejected valid time list");
    }
    times
}

/// Parses a bracketed list of quoted ISO-8601 timestamps such as
/// `['2026-01-20T00:00:00Z', '2026-01-27T00:00:00Z']`.
///
/// Returns `None` if any element is not a quoted timestamp.
pub fn parse_time_list(literal: &str) -> Option<Vec<String>> {
    let inner = literal.trim().strip_prefix('[')?.strip_suffix(']')?;

    let tokens = split_top_level(inner)?;
    let mut times = Vec::with_capacity(tokens.len());
    let last = tokens.len().saturating_sub(1);
    for (i, token) in tokens.iter().enumerate() {
        let token = token.trim();
        // a single trailing comma is allowed
        if token.is_empty() && i == last && i > 0 {
            continue;
        }
        times.push(parse_timestamp_token(token)?);
    }
    Some(times)
}

/// Splits on commas that sit outside quotes and nested brackets.
fn split_top_level(inner: &str) -> Option<Vec<&str>> {
    if inner.trim().is_empty() {
        return Some(Vec::new());
    }

    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in inner.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' => quote = Some(c),
                '[' | '(' | '{' => depth += 1,
                ']' | ')' | '}' => depth = depth.checked_sub(1)?,
                ',' if depth == 0 => {
                    tokens.push(&inner[start..i]);
                    start = i + 1;
                }
                _ => {}
            },
        }
    }
    if quote.is_some() || depth != 0 {
        return None;
    }
    tokens.push(&inner[start..]);
    Some(tokens)
}

fn parse_timestamp_token(token: &str) -> Option<String> {
    let mut chars = token.chars();
    let open = chars.next()?;
    if open != '\'' && open != '"' {
        return None;
    }
    let value = token.strip_prefix(open)?.strip_suffix(open)?;
    if value.contains(['\'', '"', '\\']) || value.chars().any(char::is_whitespace) {
        return None;
    }
    DateTime::parse_from_rfc3339(value).ok()?;
    Some(value.to_string())
}
