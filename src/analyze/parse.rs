//! Defensive parsing of model responses.
//!
//! Strict-then-lenient: strip markdown fences, parse as a JSON array into a
//! fixed schema, then pad anything missing with placeholders. A malformed
//! response degrades per-entry; it never aborts the batch.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::article::{Sentiment, SentimentLabel, SentimentOrigin};

static RE_FENCE_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*```(?:json)?\s*").expect("fence-open regex"));
static RE_FENCE_CLOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*```\s*$").expect("fence-close regex"));

/// Remove a leading ```json / ``` fence and a trailing ``` if present.
pub fn strip_code_fences(raw: &str) -> String {
    let out = RE_FENCE_OPEN.replace(raw, "");
    RE_FENCE_CLOSE.replace(&out, "").trim().to_string()
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default)]
    sentiment: String,
    #[serde(default)]
    confidence: f32,
    #[serde(default)]
    summary: String,
}

/// Parse the model reply into exactly `expected` sentiments.
///
/// Short arrays are padded with `ParseFailed` placeholders, extra entries are
/// dropped, unknown labels fall back to neutral, and confidences are clamped.
pub fn parse_sentiments(raw: &str, expected: usize) -> Vec<Sentiment> {
    let cleaned = strip_code_fences(raw);

    let entries: Vec<RawEntry> = match serde_json::from_str(&cleaned) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "model response is not a JSON array; degrading batch");
            Vec::new()
        }
    };

    let mut out: Vec<Sentiment> = entries
        .into_iter()
        .take(expected)
        .map(|e| {
            let label = match e.sentiment.to_ascii_lowercase().as_str() {
                "positive" | "bullish" => SentimentLabel::Positive,
                "negative" | "bearish" => SentimentLabel::Negative,
                _ => SentimentLabel::Neutral,
            };
            let summary = if e.summary.trim().is_empty() {
                "No rationale provided.".to_string()
            } else {
                e.summary
            };
            Sentiment::new(label, e.confidence, summary, SentimentOrigin::Computed)
        })
        .collect();

    if out.len() < expected {
        tracing::warn!(
            got = out.len(),
            expected,
            "model returned fewer entries than articles; padding"
        );
        out.resize_with(expected, || Sentiment::placeholder(SentimentOrigin::ParseFailed));
    }

    out
}
