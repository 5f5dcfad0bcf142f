//! The provider abstraction.
//!
//! Each vendor adapter implements [`ChatProvider`] and returns a boxed
//! stream of canonical [`StreamEvent`]s, so the runtime consumes tokens
//! incrementally regardless of the underlying wire format.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use lope_core::events::StreamEvent;
use lope_core::message::ChatRequest;

use crate::anthropic::AnthropicProvider;
use crate::openai::OpenAiProvider;

/// Result type alias for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Boxed stream of canonical events returned by [`ChatProvider::stream`].
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, ProviderError>> + Send>>;

/// Errors that can occur during provider operations.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The provider returned an API error.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error description.
        message: String,
        /// Provider-specific error code.
        code: Option<String>,
        /// Whether this error can be retried.
        retryable: bool,
    },

    /// The SSE stream reported an in-band error event.
    #[error("Stream error: {message}")]
    Stream {
        /// Error description.
        message: String,
    },
}

impl ProviderError {
    /// Whether this error is retryable. Informational only; no retry layer
    /// lives in this crate.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status().is_some_and(|s| {
                        s == reqwest::StatusCode::TOO_MANY_REQUESTS || s.is_server_error()
                    })
            }
            Self::Api { retryable, .. } => *retryable,
            Self::Json(_) | Self::Stream { .. } => false,
        }
    }
}

/// Which vendor wire format an adapter speaks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Chat-completions style SSE (`choices[0].delta`).
    OpenAi,
    /// Messages style SSE (`content_block_*` events).
    Anthropic,
}

/// Connection settings for an adapter.
#[derive(Clone, Debug)]
pub struct ProviderConfig {
    /// API key sent with every request.
    pub api_key: String,
    /// Model ID.
    pub model: String,
    /// Base URL override; defaults to the vendor endpoint.
    pub base_url: Option<String>,
    /// Default max output tokens when the request does not set one.
    pub max_tokens: Option<u32>,
}

impl ProviderConfig {
    /// Config with vendor-default base URL and token limit.
    #[must_use]
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
            max_tokens: None,
        }
    }
}

/// Streaming chat provider.
///
/// Implementors must be `Send + Sync`. [`stream`](ChatProvider::stream)
/// returns canonical events; the caller consumes until `Finish` or `Error`.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Which wire format this adapter speaks.
    fn provider_kind(&self) -> ProviderKind;

    /// Current model ID.
    fn model(&self) -> &str;

    /// Stream a response for the request.
    async fn stream(&self, request: &ChatRequest) -> ProviderResult<EventStream>;
}

/// Construct the adapter for a vendor kind.
#[must_use]
pub fn provider_for(kind: ProviderKind, config: ProviderConfig) -> Box<dyn ChatProvider> {
    match kind {
        ProviderKind::OpenAi => Box::new(OpenAiProvider::new(config)),
        ProviderKind::Anthropic => Box::new(AnthropicProvider::new(config)),
    }
}
