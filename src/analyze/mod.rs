//! Quota-aware sentiment analysis.
//!
//! Two cache tiers sit in front of the model: a per-article cache (24h) and a
//! batch-result cache keyed over the uncached remainder of a request (10 min
//! by default). The model is called at most once per `analyze_batch`, with a
//! single prompt covering every uncached article. Every failure path degrades
//! to neutral placeholders; callers never see an error.

pub mod parse;
pub mod provider;

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;

use crate::article::{Article, Sentiment, SentimentOrigin};
use crate::cache::{now_ms, TtlCache};
use crate::config::CacheConfig;
use crate::hash;
use crate::usage::{CallOutcome, UsageTracker};

use provider::DynModelProvider;

pub struct SentimentAnalyzer {
    provider: DynModelProvider,
    item_cache: TtlCache<Sentiment>,
    batch_cache: TtlCache<Vec<Sentiment>>,
    usage: Arc<UsageTracker>,
}

impl SentimentAnalyzer {
    pub fn new(provider: DynModelProvider, cache: &CacheConfig, usage: Arc<UsageTracker>) -> Self {
        Self {
            provider,
            item_cache: TtlCache::new(Duration::from_secs(cache.item_ttl_secs)),
            batch_cache: TtlCache::new(Duration::from_secs(cache.batch_ttl_secs)),
            usage,
        }
    }

    /// One sentiment per input article, same order.
    pub async fn analyze_batch(&self, articles: &[Article]) -> Vec<Sentiment> {
        let now = now_ms();
        let mut slots: Vec<Option<Sentiment>> = articles
            .iter()
            .map(|a| {
                self.item_cache
                    .get_at(&hash::article_key(a), now)
                    .map(|s| s.as_cached())
            })
            .collect();

        let uncached: Vec<(usize, &Article)> = slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_none())
            .map(|(i, _)| (i, &articles[i]))
            .collect();

        let hits = articles.len() - uncached.len();
        if hits > 0 {
            counter!("sentiment_item_cache_hits_total").increment(hits as u64);
        }

        // Full per-item coverage means zero upstream usage for this call.
        if uncached.is_empty() {
            counter!("sentiment_full_cache_batches_total").increment(1);
            tracing::debug!(batch = articles.len(), "batch fully served from item cache");
            return slots.into_iter().flatten().collect();
        }

        if !self.provider.available() {
            tracing::debug!(
                missing = uncached.len(),
                "model unavailable; serving placeholders"
            );
            counter!("sentiment_degraded_slots_total").increment(uncached.len() as u64);
            for (i, _) in &uncached {
                slots[*i] = Some(Sentiment::placeholder(SentimentOrigin::Unavailable));
            }
            return slots.into_iter().flatten().collect();
        }

        let subset: Vec<&Article> = uncached.iter().map(|(_, a)| *a).collect();
        let batch_key = hash::batch_key(&subset);

        // A batch seen twice within the window skips the model entirely.
        let fresh = match self.batch_cache.get_at(&batch_key, now) {
            Some(hit) if hit.len() == uncached.len() => {
                counter!("sentiment_batch_cache_hits_total").increment(1);
                tracing::debug!(key = %batch_key, "uncached subset served from batch cache");
                hit.iter().map(|s| s.as_cached()).collect()
            }
            _ => self.call_model(&subset, &batch_key, now).await,
        };

        for ((i, _), sentiment) in uncached.iter().zip(fresh) {
            slots[*i] = Some(sentiment);
        }
        slots.into_iter().flatten().collect()
    }

    /// Single model round-trip for the uncached subset, with write-back.
    async fn call_model(&self, subset: &[&Article], batch_key: &str, now: u64) -> Vec<Sentiment> {
        let prompt = build_prompt(subset);

        self.usage.record_call_start();
        counter!("sentiment_model_calls_total").increment(1);
        tracing::info!(
            articles = subset.len(),
            provider = self.provider.name(),
            "requesting sentiment for uncached articles"
        );

        match self.provider.complete(&prompt).await {
            Ok(raw) => {
                let estimated = estimate_tokens(&prompt, &raw);
                self.usage.record_call_result(CallOutcome::Success, estimated);

                let parsed = parse::parse_sentiments(&raw, subset.len());
                let degraded = parsed
                    .iter()
                    .filter(|s| s.origin != SentimentOrigin::Computed)
                    .count();
                if degraded > 0 {
                    counter!("sentiment_degraded_slots_total").increment(degraded as u64);
                }

                // Write-back: the full subset result under its batch key, and
                // each successfully computed entry under its article key.
                // Placeholders stay out of the 24h tier so a later retry can
                // still compute them.
                self.batch_cache.put_at(batch_key, parsed.clone(), now);
                for (article, sentiment) in subset.iter().zip(&parsed) {
                    if sentiment.origin == SentimentOrigin::Computed {
                        self.item_cache
                            .put_at(hash::article_key(article), sentiment.clone(), now);
                    }
                }
                parsed
            }
            Err(e) => {
                self.usage.record_call_result(e.outcome(), 0);
                counter!("sentiment_degraded_slots_total").increment(subset.len() as u64);
                tracing::warn!(
                    error = %e,
                    articles = subset.len(),
                    "model call failed; serving placeholders"
                );
                subset
                    .iter()
                    .map(|_| Sentiment::placeholder(SentimentOrigin::Unavailable))
                    .collect()
            }
        }
    }

    /// Attach per-article sentiments in place and return the articles.
    pub async fn attach(&self, mut articles: Vec<Article>) -> Vec<Article> {
        let sentiments = self.analyze_batch(&articles).await;
        for (article, sentiment) in articles.iter_mut().zip(sentiments) {
            article.sentiment = Some(sentiment);
        }
        articles
    }

    /// (item entries, batch entries) including not-yet-swept expired ones.
    pub fn cache_sizes(&self) -> (usize, usize) {
        (self.item_cache.len(), self.batch_cache.len())
    }

    /// Drop expired entries from both tiers; returns counts removed.
    pub fn sweep_expired(&self) -> (usize, usize) {
        (self.item_cache.sweep(), self.batch_cache.sweep())
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }
}

/// Numbered article list for a single batched prompt; one model call covers
/// the whole uncached subset to conserve quota.
fn build_prompt(subset: &[&Article]) -> String {
    let mut out = String::with_capacity(subset.len() * 160);
    out.push_str("Rate the sentiment of each article for the stock market:\n");
    for (i, a) in subset.iter().enumerate() {
        out.push_str(&format!("{}. {} - {}\n", i + 1, a.title, a.summary));
    }
    out
}

/// Rough chars/4 heuristic; only feeds the diagnostics counter.
fn estimate_tokens(prompt: &str, response: &str) -> u64 {
    ((prompt.len() + response.len()) / 4) as u64
}
