//! Model provider boundary: the one place that performs a real remote call.
//! Separated from the analyzer so the same orchestration runs against the
//! production provider, a disabled stub, and a deterministic mock in tests.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ModelConfig;
use crate::usage::CallOutcome;

/// Why a provider call produced no usable response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Disabled by configuration or no API key present.
    MissingCredentials,
    /// Upstream returned a non-success status.
    Http { status: u16, body: String },
    /// Transport-level failure, including timeouts.
    Network(String),
    /// 2xx but nothing usable in the payload.
    EmptyResponse,
}

impl ProviderError {
    /// Classification recorded into the usage tracker. Quota exhaustion is
    /// reported by OpenAI inside a 429 body, so the body check runs first.
    pub fn outcome(&self) -> CallOutcome {
        match self {
            ProviderError::Http { status, body } => {
                let lowered = body.to_ascii_lowercase();
                if lowered.contains("quota") {
                    CallOutcome::QuotaExceeded
                } else if *status == 429 {
                    CallOutcome::RateLimited
                } else {
                    CallOutcome::Failed
                }
            }
            _ => CallOutcome::Failed,
        }
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderError::MissingCredentials => write!(f, "model disabled or no credentials"),
            ProviderError::Http { status, .. } => write!(f, "upstream status {status}"),
            ProviderError::Network(e) => write!(f, "network error: {e}"),
            ProviderError::EmptyResponse => write!(f, "empty model response"),
        }
    }
}

/// Low-level provider: takes the finished prompt, returns the raw model text.
pub trait ModelProvider: Send + Sync + 'static {
    fn complete<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, ProviderError>> + Send + 'a>>;
    fn name(&self) -> &'static str;
    /// False when the analyzer should skip the call entirely and degrade.
    fn available(&self) -> bool {
        true
    }
}

pub type DynModelProvider = Arc<dyn ModelProvider>;

/// Build a provider according to config and environment.
///
/// * `MODEL_TEST_MODE=mock` forces a deterministic mock (test/local runs).
/// * `enabled=false` or a missing API key yields the disabled provider.
pub fn build_provider(config: &ModelConfig) -> DynModelProvider {
    if std::env::var("MODEL_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Arc::new(MockProvider::new("[]"));
    }

    if !config.enabled {
        return Arc::new(DisabledProvider);
    }

    match config.provider.as_str() {
        "openai" => {
            let p = OpenAiProvider::new(config);
            if p.available() {
                Arc::new(p)
            } else {
                tracing::warn!("OPENAI_API_KEY missing; sentiment analysis disabled");
                Arc::new(DisabledProvider)
            }
        }
        other => {
            tracing::warn!(provider = other, "unsupported model provider; disabling");
            Arc::new(DisabledProvider)
        }
    }
}

/// OpenAI Chat Completions provider. Requires `OPENAI_API_KEY`.
pub struct OpenAiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(config: &ModelConfig) -> Self {
        let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
        let http = reqwest::Client::builder()
            .user_agent("market-pulse/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            http,
            api_key,
            model: config.model.clone(),
        }
    }
}

impl ModelProvider for OpenAiProvider {
    fn complete<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, ProviderError>> + Send + 'a>> {
        Box::pin(async move {
            if self.api_key.is_empty() {
                return Err(ProviderError::MissingCredentials);
            }

            #[derive(Serialize)]
            struct Msg<'a> {
                role: &'a str,
                content: &'a str,
            }
            #[derive(Serialize)]
            struct Req<'a> {
                model: &'a str,
                messages: Vec<Msg<'a>>,
                temperature: f32,
            }
            #[derive(Deserialize)]
            struct Resp {
                choices: Vec<Choice>,
            }
            #[derive(Deserialize)]
            struct Choice {
                message: ChoiceMsg,
            }
            #[derive(Deserialize)]
            struct ChoiceMsg {
                content: String,
            }

            let sys = "You are a financial news sentiment rater. For each numbered \
                       article, output one object {\"sentiment\": \"positive\"|\"negative\"|\"neutral\", \
                       \"confidence\": 0.0-1.0, \"summary\": \"one short sentence\"}. \
                       Respond with ONLY a JSON array, one object per article, in input order.";
            let req = Req {
                model: &self.model,
                messages: vec![
                    Msg {
                        role: "system",
                        content: sys,
                    },
                    Msg {
                        role: "user",
                        content: prompt,
                    },
                ],
                temperature: 0.2,
            };

            let resp = self
                .http
                .post("https://api.openai.com/v1/chat/completions")
                .bearer_auth(&self.api_key)
                .json(&req)
                .send()
                .await
                .map_err(|e| ProviderError::Network(e.to_string()))?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(ProviderError::Http {
                    status: status.as_u16(),
                    body,
                });
            }

            let body: Resp = resp
                .json()
                .await
                .map_err(|e| ProviderError::Network(e.to_string()))?;
            let content = body
                .choices
                .first()
                .map(|c| c.message.content.trim().to_string())
                .unwrap_or_default();
            if content.is_empty() {
                Err(ProviderError::EmptyResponse)
            } else {
                Ok(content)
            }
        })
    }

    fn name(&self) -> &'static str {
        "openai"
    }

    fn available(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// Always unavailable; used when analysis is disabled.
pub struct DisabledProvider;

impl ModelProvider for DisabledProvider {
    fn complete<'a>(
        &'a self,
        _prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, ProviderError>> + Send + 'a>> {
        Box::pin(async { Err(ProviderError::MissingCredentials) })
    }

    fn name(&self) -> &'static str {
        "disabled"
    }

    fn available(&self) -> bool {
        false
    }
}

/// Deterministic provider for tests and `MODEL_TEST_MODE=mock` runs.
#[derive(Clone)]
pub struct MockProvider {
    fixed: String,
}

impl MockProvider {
    pub fn new(fixed: impl Into<String>) -> Self {
        Self {
            fixed: fixed.into(),
        }
    }
}

impl ModelProvider for MockProvider {
    fn complete<'a>(
        &'a self,
        _prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, ProviderError>> + Send + 'a>> {
        let out = self.fixed.clone();
        Box::pin(async move { Ok(out) })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
