//! Folds per-article sentiments into one market-wide verdict.
//! Pure logic, no I/O; suitable for unit tests and offline evaluation.

use crate::article::{
    Article, OverallSentiment, SentimentBreakdown, SentimentLabel,
};

/// Floor applied to the neutral share before the confidence multiplication.
const NEUTRAL_SHARE_FLOOR: f32 = 0.3;
/// Overall confidence never reports above this.
const CONFIDENCE_CAP: f32 = 0.95;

/// Compute the overall market sentiment from the current article set.
/// Articles without an attached sentiment are ignored; an empty or unrated
/// set yields a neutral, zero-confidence "no data" verdict. Never fails.
pub fn overall_sentiment(articles: &[Article]) -> OverallSentiment {
    let rated: Vec<_> = articles.iter().filter_map(|a| a.sentiment.as_ref()).collect();

    if rated.is_empty() {
        return OverallSentiment {
            label: SentimentLabel::Neutral,
            confidence: 0.0,
            summary: "No sentiment data available for the current articles.".to_string(),
            breakdown: SentimentBreakdown::default(),
        };
    }

    let mut breakdown = SentimentBreakdown::default();
    let mut weights = [0.0f32; 3]; // positive, negative, neutral
    let mut confidence_sum = 0.0f32;

    for s in &rated {
        let slot = match s.label {
            SentimentLabel::Positive => {
                breakdown.positive += 1;
                0
            }
            SentimentLabel::Negative => {
                breakdown.negative += 1;
                1
            }
            SentimentLabel::Neutral => {
                breakdown.neutral += 1;
                2
            }
        };
        weights[slot] += s.confidence;
        confidence_sum += s.confidence;
    }

    let winner = winning_label(&weights);
    let total_weight: f32 = weights.iter().sum();
    let win_weight = match winner {
        SentimentLabel::Positive => weights[0],
        SentimentLabel::Negative => weights[1],
        SentimentLabel::Neutral => weights[2],
    };

    let mut share = if total_weight > 0.0 {
        win_weight / total_weight
    } else {
        0.0
    };
    if winner == SentimentLabel::Neutral {
        share = share.max(NEUTRAL_SHARE_FLOOR);
    }

    let avg_confidence = confidence_sum / rated.len() as f32;
    let confidence = (share * avg_confidence).min(CONFIDENCE_CAP);

    OverallSentiment {
        label: winner,
        confidence,
        summary: summary_line(rated.len(), &breakdown, winner),
        breakdown,
    }
}

/// Strictly highest weighted score wins; any tie falls back to neutral.
fn winning_label(weights: &[f32; 3]) -> SentimentLabel {
    let [pos, neg, neu] = *weights;
    if pos > neg && pos > neu {
        SentimentLabel::Positive
    } else if neg > pos && neg > neu {
        SentimentLabel::Negative
    } else {
        SentimentLabel::Neutral
    }
}

fn summary_line(count: usize, b: &SentimentBreakdown, winner: SentimentLabel) -> String {
    let mood = match winner {
        SentimentLabel::Positive => "leaning optimistic",
        SentimentLabel::Negative => "leaning pessimistic",
        SentimentLabel::Neutral => "mixed with no clear direction",
    };
    format!(
        "Across {} rated article{}, coverage is {} ({} positive, {} negative, {} neutral).",
        count,
        if count == 1 { "" } else { "s" },
        mood,
        b.positive,
        b.negative,
        b.neutral
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::{Sentiment, SentimentOrigin};

    fn rated(label: SentimentLabel, confidence: f32) -> Article {
        let mut a = Article::new("id", "t", "s", "Reuters", 0);
        a.sentiment = Some(Sentiment::new(
            label,
            confidence,
            "why",
            SentimentOrigin::Computed,
        ));
        a
    }

    #[test]
    fn positive_majority_wins() {
        let arts = vec![
            rated(SentimentLabel::Positive, 0.9),
            rated(SentimentLabel::Positive, 0.8),
            rated(SentimentLabel::Neutral, 0.5),
        ];
        let o = overall_sentiment(&arts);
        assert_eq!(o.label, SentimentLabel::Positive);
        assert_eq!(o.breakdown.positive, 2);
        assert_eq!(o.breakdown.neutral, 1);
        // share = 1.7/2.2, avg = 2.2/3 -> ~0.567
        assert!((o.confidence - 0.5667).abs() < 1e-3, "got {}", o.confidence);
    }

    #[test]
    fn empty_input_yields_neutral_no_data() {
        let o = overall_sentiment(&[]);
        assert_eq!(o.label, SentimentLabel::Neutral);
        assert_eq!(o.confidence, 0.0);
        assert!(o.summary.contains("No sentiment data"));
    }

    #[test]
    fn unrated_articles_are_ignored() {
        let arts = vec![
            Article::new("1", "t", "s", "WSJ", 0),
            rated(SentimentLabel::Negative, 0.7),
        ];
        let o = overall_sentiment(&arts);
        assert_eq!(o.label, SentimentLabel::Negative);
        assert_eq!(o.breakdown.negative, 1);
        assert_eq!(o.breakdown.positive + o.breakdown.neutral, 0);
    }

    #[test]
    fn exact_tie_defaults_to_neutral() {
        let arts = vec![
            rated(SentimentLabel::Positive, 0.6),
            rated(SentimentLabel::Negative, 0.6),
        ];
        let o = overall_sentiment(&arts);
        assert_eq!(o.label, SentimentLabel::Neutral);
    }

    #[test]
    fn neutral_share_floor_applies() {
        // All-placeholder batch: neutral wins with zero weight; the floor
        // keeps share at 0.3 but zero average confidence still yields 0.
        let arts = vec![
            rated(SentimentLabel::Neutral, 0.0),
            rated(SentimentLabel::Neutral, 0.0),
        ];
        let o = overall_sentiment(&arts);
        assert_eq!(o.label, SentimentLabel::Neutral);
        assert_eq!(o.confidence, 0.0);

        // Tie falls back to neutral with zero neutral weight: the raw share
        // is 0 and the floor lifts it to 0.3 before the multiplication.
        let arts = vec![
            rated(SentimentLabel::Positive, 0.6),
            rated(SentimentLabel::Negative, 0.6),
        ];
        let o = overall_sentiment(&arts);
        assert_eq!(o.label, SentimentLabel::Neutral);
        let expected = 0.3f32 * 0.6;
        assert!((o.confidence - expected).abs() < 1e-4, "got {}", o.confidence);
    }

    #[test]
    fn confidence_is_capped() {
        let arts = vec![rated(SentimentLabel::Positive, 1.0)];
        let o = overall_sentiment(&arts);
        assert_eq!(o.confidence, CONFIDENCE_CAP);
    }

    #[test]
    fn summary_cites_count_and_breakdown() {
        let arts = vec![
            rated(SentimentLabel::Positive, 0.9),
            rated(SentimentLabel::Negative, 0.2),
        ];
        let o = overall_sentiment(&arts);
        assert!(o.summary.contains("2 rated articles"));
        assert!(o.summary.contains("1 positive"));
        assert!(o.summary.contains("1 negative"));
    }
}
