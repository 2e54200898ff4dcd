use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use metrics::counter;
use tower_http::cors::CorsLayer;

use crate::aggregate::overall_sentiment;
use crate::analyze::{provider, SentimentAnalyzer};
use crate::article::{Article, OverallSentiment};
use crate::cache::now_ms;
use crate::config::ServiceConfig;
use crate::news::{self, NewsProvider, SampleNewsProvider};
use crate::ratelimit::{FixedWindowLimiter, RateLimitDecision};
use crate::snapshot::SnapshotStore;
use crate::usage::{UsageStats, UsageTracker};

/// Owned service state, constructed once at startup and injected into every
/// handler. Nothing here is ambient or global.
#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<SentimentAnalyzer>,
    pub usage: Arc<UsageTracker>,
    pub news_limiter: Arc<FixedWindowLimiter>,
    pub analysis_limiter: Arc<FixedWindowLimiter>,
    pub news: Arc<dyn NewsProvider>,
    pub snapshot: Arc<SnapshotStore>,
    pub fetch_timeout: Duration,
}

impl AppState {
    pub fn from_config(cfg: &ServiceConfig) -> Self {
        let usage = Arc::new(UsageTracker::new(cfg.model.daily_ceiling));
        let model = provider::build_provider(&cfg.model);
        let analyzer = Arc::new(SentimentAnalyzer::new(model, &cfg.cache, usage.clone()));

        Self {
            analyzer,
            usage,
            news_limiter: Arc::new(FixedWindowLimiter::new(
                cfg.limits.news.max_requests,
                Duration::from_secs(cfg.limits.news.window_secs),
            )),
            analysis_limiter: Arc::new(FixedWindowLimiter::new(
                cfg.limits.analysis.max_requests,
                Duration::from_secs(cfg.limits.analysis.window_secs),
            )),
            news: Arc::new(SampleNewsProvider),
            snapshot: Arc::new(SnapshotStore::new(cfg.snapshot.path.clone())),
            fetch_timeout: Duration::from_secs(cfg.model.request_timeout_secs),
        }
    }

    /// Drop expired cache entries and elapsed rate-limit windows.
    pub fn sweep(&self) {
        let (items, batches) = self.analyzer.sweep_expired();
        let now = now_ms();
        let news_keys = self.news_limiter.sweep_at(now);
        let analysis_keys = self.analysis_limiter.sweep_at(now);
        tracing::debug!(items, batches, news_keys, analysis_keys, "sweep pass finished");
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/news", get(get_news))
        .route("/api/analysis", post(post_analysis))
        .route("/api/usage", get(get_usage))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Client key for rate limiting: first `X-Forwarded-For` hop, else "local".
fn client_key(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "local".to_string())
}

fn rate_limit_headers(decision: &RateLimitDecision) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("x-ratelimit-limit", int_header(decision.limit as u64));
    headers.insert("x-ratelimit-remaining", int_header(decision.remaining as u64));
    headers.insert("x-ratelimit-reset", int_header(decision.reset_at_ms / 1000));
    headers
}

fn int_header(v: u64) -> HeaderValue {
    HeaderValue::from_str(&v.to_string()).unwrap_or(HeaderValue::from_static("0"))
}

/// The one error that intentionally reaches clients: HTTP 429 with retry
/// metadata.
fn rejected(decision: &RateLimitDecision) -> Response {
    counter!("rate_limit_rejections_total").increment(1);
    let retry_after = decision.retry_after_secs(now_ms());
    let mut headers = rate_limit_headers(decision);
    headers.insert(header::RETRY_AFTER, int_header(retry_after));
    (
        StatusCode::TOO_MANY_REQUESTS,
        headers,
        Json(serde_json::json!({
            "error": "rate limit exceeded",
            "retry_after_secs": retry_after,
        })),
    )
        .into_response()
}

#[derive(serde::Deserialize)]
struct NewsQuery {
    #[serde(default)]
    sentiment: bool,
}

#[derive(serde::Serialize)]
struct NewsMeta {
    count: usize,
    sentiment: bool,
    source: &'static str,
    generated_at_ms: u64,
}

#[derive(serde::Serialize)]
struct NewsResponse {
    articles: Vec<Article>,
    overall_sentiment: OverallSentiment,
    meta: NewsMeta,
}

async fn get_news(
    State(state): State<AppState>,
    Query(q): Query<NewsQuery>,
    headers: HeaderMap,
) -> Response {
    let decision = state.news_limiter.check(&client_key(&headers));
    if !decision.allowed {
        return rejected(&decision);
    }

    let mut articles = news::fetch_or_fallback(state.news.as_ref(), state.fetch_timeout).await;
    if q.sentiment {
        articles = state.analyzer.attach(articles).await;
    }
    let overall = overall_sentiment(&articles);

    let body = NewsResponse {
        meta: NewsMeta {
            count: articles.len(),
            sentiment: q.sentiment,
            source: state.news.name(),
            generated_at_ms: now_ms(),
        },
        overall_sentiment: overall,
        articles,
    };
    (rate_limit_headers(&decision), Json(body)).into_response()
}

#[derive(serde::Deserialize)]
struct AnalysisReq {
    query: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

#[derive(serde::Serialize)]
struct AnalysisResp {
    recommendations: Vec<String>,
    analysis: String,
}

/// Recommendation generation is stubbed in the shipped configuration: the
/// endpoint stays rate-limited and shaped for the UI, but returns a static
/// explanatory message instead of model output.
async fn post_analysis(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AnalysisReq>,
) -> Response {
    let decision = state.analysis_limiter.check(&client_key(&headers));
    if !decision.allowed {
        return rejected(&decision);
    }

    tracing::debug!(
        query = %crate::hash::anon_id(&req.query),
        kind = req.kind.as_deref().unwrap_or("general"),
        "analysis request"
    );

    let body = AnalysisResp {
        recommendations: Vec::new(),
        analysis: "Personalized recommendations are disabled in this deployment. \
                   Sentiment-rated headlines are available from the news endpoint."
            .to_string(),
    };
    (rate_limit_headers(&decision), Json(body)).into_response()
}

#[derive(serde::Serialize)]
struct CacheDiagnostics {
    item_entries: usize,
    batch_entries: usize,
    news_limiter_keys: usize,
    analysis_limiter_keys: usize,
}

#[derive(serde::Serialize)]
struct UsageResponse {
    usage: UsageStats,
    caches: CacheDiagnostics,
    provider: &'static str,
}

async fn get_usage(State(state): State<AppState>) -> Json<UsageResponse> {
    let (item_entries, batch_entries) = state.analyzer.cache_sizes();
    Json(UsageResponse {
        usage: state.usage.stats(),
        caches: CacheDiagnostics {
            item_entries,
            batch_entries,
            news_limiter_keys: state.news_limiter.tracked_keys(),
            analysis_limiter_keys: state.analysis_limiter.tracked_keys(),
        },
        provider: state.analyzer.provider_name(),
    })
}

/// Periodic cache/limiter sweep, decoupled from request handling.
pub fn spawn_sweep_task(state: AppState, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            state.sweep();
        }
    })
}

/// Periodic refresh: fetch news, rate it, and persist the snapshot so a
/// restart can serve last-known data immediately.
pub fn spawn_refresh_task(state: AppState, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let articles = news::fetch_or_fallback(state.news.as_ref(), state.fetch_timeout).await;
            let articles = state.analyzer.attach(articles).await;
            let overall = overall_sentiment(&articles);
            if let Err(e) = state.snapshot.save(&articles, &overall) {
                tracing::warn!(error = ?e, "snapshot refresh failed");
            } else {
                tracing::debug!(count = articles.len(), "snapshot refreshed");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_key_prefers_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        assert_eq!(client_key(&headers), "203.0.113.9");
    }

    #[test]
    fn client_key_defaults_to_local() {
        assert_eq!(client_key(&HeaderMap::new()), "local");
    }
}
