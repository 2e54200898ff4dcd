//! News source abstraction.
//!
//! Real scrapers live behind this trait as external collaborators; the
//! service itself ships only the embedded sample provider, which doubles as
//! the fallback whenever a live fetch fails or times out.

use std::time::Duration;

use anyhow::Result;

use crate::article::Article;

#[async_trait::async_trait]
pub trait NewsProvider: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<Article>>;
    fn name(&self) -> &'static str;
}

/// Embedded sample headlines; also the degraded-mode data set.
pub struct SampleNewsProvider;

impl SampleNewsProvider {
    pub fn articles() -> Vec<Article> {
        vec![
            Article::new(
                "sample-1",
                "Dow climbs as industrials rally on upbeat earnings",
                "Blue-chip stocks extended gains after several industrial bellwethers topped profit estimates.",
                "Sample Wire",
                1_755_000_000,
            )
            .with_url("https://example.com/news/dow-climbs"),
            Article::new(
                "sample-2",
                "Fed officials signal patience on rate cuts",
                "Policymakers reiterated a wait-and-see stance, citing sticky services inflation.",
                "Sample Wire",
                1_755_003_600,
            )
            .with_url("https://example.com/news/fed-patience"),
            Article::new(
                "sample-3",
                "Tech megacaps slip ahead of earnings week",
                "Investors trimmed positions in the largest technology names before a heavy reporting calendar.",
                "Sample Wire",
                1_755_007_200,
            )
            .with_url("https://example.com/news/tech-slip"),
            Article::new(
                "sample-4",
                "Oil steadies after two-day slide",
                "Crude prices found a floor as supply concerns balanced soft demand data.",
                "Sample Wire",
                1_755_010_800,
            ),
            Article::new(
                "sample-5",
                "Treasury yields edge lower on soft jobs data",
                "A cooler-than-expected payrolls print pushed yields down across the curve.",
                "Sample Wire",
                1_755_014_400,
            ),
        ]
    }
}

#[async_trait::async_trait]
impl NewsProvider for SampleNewsProvider {
    async fn fetch_latest(&self) -> Result<Vec<Article>> {
        Ok(Self::articles())
    }

    fn name(&self) -> &'static str {
        "sample"
    }
}

/// Fetch with a bounded timeout, falling back to the sample set on any
/// failure. Upstream trouble is logged and never surfaces to the caller.
pub async fn fetch_or_fallback(provider: &dyn NewsProvider, timeout: Duration) -> Vec<Article> {
    match tokio::time::timeout(timeout, provider.fetch_latest()).await {
        Ok(Ok(articles)) if !articles.is_empty() => articles,
        Ok(Ok(_)) => {
            tracing::warn!(provider = provider.name(), "provider returned no articles; using samples");
            SampleNewsProvider::articles()
        }
        Ok(Err(e)) => {
            tracing::warn!(provider = provider.name(), error = ?e, "news fetch failed; using samples");
            SampleNewsProvider::articles()
        }
        Err(_) => {
            tracing::warn!(provider = provider.name(), "news fetch timed out; using samples");
            SampleNewsProvider::articles()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingSource;

    #[async_trait::async_trait]
    impl NewsProvider for FailingSource {
        async fn fetch_latest(&self) -> Result<Vec<Article>> {
            anyhow::bail!("upstream 503")
        }
        fn name(&self) -> &'static str {
            "failing"
        }
    }

    struct HangingSource;

    #[async_trait::async_trait]
    impl NewsProvider for HangingSource {
        async fn fetch_latest(&self) -> Result<Vec<Article>> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(vec![])
        }
        fn name(&self) -> &'static str {
            "hanging"
        }
    }

    #[tokio::test]
    async fn sample_provider_serves_fixed_articles() {
        let arts = SampleNewsProvider.fetch_latest().await.unwrap();
        assert_eq!(arts.len(), 5);
        assert!(arts.iter().all(|a| a.sentiment.is_none()));
    }

    #[tokio::test]
    async fn failing_provider_falls_back_to_samples() {
        let arts = fetch_or_fallback(&FailingSource, Duration::from_secs(1)).await;
        assert_eq!(arts.len(), SampleNewsProvider::articles().len());
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_provider_times_out_to_samples() {
        let arts = fetch_or_fallback(&HangingSource, Duration::from_millis(50)).await;
        assert!(!arts.is_empty());
    }
}
