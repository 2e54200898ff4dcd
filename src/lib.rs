// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod aggregate;
pub mod analyze;
pub mod api;
pub mod article;
pub mod cache;
pub mod config;
pub mod hash;
pub mod metrics;
pub mod news;
pub mod ratelimit;
pub mod snapshot;
pub mod usage;

// ---- Re-exports for stable public API ----
pub use crate::aggregate::overall_sentiment;
pub use crate::analyze::SentimentAnalyzer;
pub use crate::api::{create_router, AppState};
pub use crate::article::{Article, OverallSentiment, Sentiment, SentimentLabel, SentimentOrigin};
pub use crate::config::ServiceConfig;
