//! Core data types shared across the service: articles, per-article
//! sentiment, and the aggregated market verdict.

use serde::{Deserialize, Serialize};

/// One news article as served by the dashboard. Immutable within a request
/// cycle once fetched; `sentiment` is attached by the analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub summary: String,
    /// e.g. "Reuters", "WSJ".
    pub source: String,
    /// Publication time, unix seconds.
    pub published_at: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
}

impl Article {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        summary: impl Into<String>,
        source: impl Into<String>,
        published_at: u64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            summary: summary.into(),
            source: source.into(),
            published_at,
            url: None,
            sentiment: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// Sentiment category for one article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
        }
    }
}

/// Where a sentiment value came from. Degraded slots carry `Unavailable`
/// (model disabled or call failed) or `ParseFailed` (model replied, but the
/// entry could not be recovered from the response).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentOrigin {
    Cached,
    Computed,
    Unavailable,
    ParseFailed,
}

/// Sentiment attached to one article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    pub label: SentimentLabel,
    /// Confidence in <0.0, 1.0>.
    pub confidence: f32,
    /// Short free-text justification from the model (or a placeholder note).
    pub summary: String,
    pub origin: SentimentOrigin,
}

impl Sentiment {
    pub fn new(
        label: SentimentLabel,
        confidence: f32,
        summary: impl Into<String>,
        origin: SentimentOrigin,
    ) -> Self {
        Self {
            label,
            confidence: clamp01(confidence),
            summary: summary.into(),
            origin,
        }
    }

    /// Neutral placeholder used on every degrade path; confidence is 0 so the
    /// aggregation gives these entries no weight.
    pub fn placeholder(origin: SentimentOrigin) -> Self {
        let note = match origin {
            SentimentOrigin::Unavailable => "Sentiment analysis unavailable.",
            SentimentOrigin::ParseFailed => "Unable to analyze this article.",
            _ => "No sentiment recorded.",
        };
        Self::new(SentimentLabel::Neutral, 0.0, note, origin)
    }

    /// Copy of this sentiment re-tagged as served-from-cache.
    pub fn as_cached(&self) -> Self {
        let mut s = self.clone();
        s.origin = SentimentOrigin::Cached;
        s
    }
}

/// Per-label article counts among rated articles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentBreakdown {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
}

/// The folded market verdict. Derived, never stored; recomputed from the
/// current article set whenever requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallSentiment {
    pub label: SentimentLabel,
    pub confidence: f32,
    pub summary: String,
    pub breakdown: SentimentBreakdown,
}

pub(crate) fn clamp01(x: f32) -> f32 {
    if x < 0.0 {
        0.0
    } else if x > 1.0 {
        1.0
    } else {
        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentiment_serializes_with_lowercase_label_and_snake_case_origin() {
        let s = Sentiment::new(
            SentimentLabel::Positive,
            0.9,
            "Strong earnings beat.",
            SentimentOrigin::Computed,
        );
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["label"], serde_json::json!("positive"));
        assert_eq!(v["origin"], serde_json::json!("computed"));
    }

    #[test]
    fn confidence_is_clamped_on_construction() {
        let s = Sentiment::new(
            SentimentLabel::Negative,
            1.7,
            "x",
            SentimentOrigin::Computed,
        );
        assert_eq!(s.confidence, 1.0);
        let s = Sentiment::new(
            SentimentLabel::Negative,
            -0.2,
            "x",
            SentimentOrigin::Computed,
        );
        assert_eq!(s.confidence, 0.0);
    }

    #[test]
    fn placeholder_is_neutral_zero_confidence() {
        let p = Sentiment::placeholder(SentimentOrigin::Unavailable);
        assert_eq!(p.label, SentimentLabel::Neutral);
        assert_eq!(p.confidence, 0.0);
        assert_eq!(p.origin, SentimentOrigin::Unavailable);
    }
}
