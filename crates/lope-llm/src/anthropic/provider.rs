//! Messages-style provider: request building and HTTP stream wiring.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde_json::{json, Value};
use tracing::{debug, error, instrument, warn};

use lope_core::message::{AssistantBlock, ChatMessage, ChatRequest};

use crate::error_parsing::parse_api_error;
use crate::provider::{
    ChatProvider, EventStream, ProviderConfig, ProviderError, ProviderKind, ProviderResult,
};
use crate::sse::{parse_sse_lines, SseParserOptions};

use super::stream_handler::{process_sse_event, StreamState};
use super::types::{
    AnthropicMessage, AnthropicRequest, AnthropicSseEvent, AnthropicTool,
    DEFAULT_MAX_OUTPUT_TOKENS,
};

/// Default base URL for the messages endpoint.
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// API version header value.
const API_VERSION: &str = "2023-06-01";

static SSE_OPTIONS: SseParserOptions = SseParserOptions {
    process_remaining_buffer: true,
};

/// Messages-style streaming provider.
pub struct AnthropicProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl AnthropicProvider {
    /// Create a provider from connection settings.
    #[must_use]
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn build_headers(&self) -> ProviderResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let _ = headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let _ = headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));
        let _ = headers.insert(
            "x-api-key",
            HeaderValue::from_str(&self.config.api_key).map_err(|e| ProviderError::Api {
                status: 0,
                message: format!("Invalid API key header: {e}"),
                code: None,
                retryable: false,
            })?,
        );
        Ok(headers)
    }

    fn build_tools(request: &ChatRequest) -> Option<Vec<AnthropicTool>> {
        if request.tools.is_empty() {
            return None;
        }
        Some(
            request
                .tools
                .iter()
                .map(|t| AnthropicTool {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    input_schema: serde_json::to_value(&t.parameters).unwrap_or_default(),
                })
                .collect(),
        )
    }

    fn build_request(&self, request: &ChatRequest) -> AnthropicRequest {
        AnthropicRequest {
            model: self.config.model.clone(),
            max_tokens: request
                .max_tokens
                .or(self.config.max_tokens)
                .unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS),
            messages: convert_messages(&request.messages),
            system: request.system_prompt.clone(),
            tools: Self::build_tools(request),
            stream: true,
        }
    }

    #[instrument(skip_all, fields(model = %self.config.model))]
    async fn stream_internal(&self, request: &ChatRequest) -> ProviderResult<EventStream> {
        let body = self.build_request(request);

        let base_url = self.config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let url = format!("{base_url}/v1/messages");
        let headers = self.build_headers()?;

        debug!(
            max_tokens = body.max_tokens,
            message_count = body.messages.len(),
            has_tools = body.tools.is_some(),
            "sending messages request"
        );

        let response = self
            .client
            .post(&url)
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(ProviderError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            let info = parse_api_error(&body_text, status.as_u16());
            error!(
                status = status.as_u16(),
                code = info.code.as_deref().unwrap_or("unknown"),
                "messages API error"
            );
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: info.message,
                code: info.code,
                retryable: info.retryable,
            });
        }

        let byte_stream = response.bytes_stream();
        let sse_lines = parse_sse_lines(byte_stream, &SSE_OPTIONS);

        let event_stream = sse_lines
            .scan(StreamState::default(), |state, line| {
                let event: AnthropicSseEvent = match serde_json::from_str(&line) {
                    Ok(e) => e,
                    Err(e) => {
                        warn!(line = %line, error = %e, "failed to parse SSE event");
                        return std::future::ready(Some(vec![]));
                    }
                };
                std::future::ready(Some(process_sse_event(&event, state)))
            })
            .flat_map(stream::iter)
            .map(Ok);

        Ok(Box::pin(event_stream))
    }
}

/// Convert neutral messages into the messages-endpoint shape.
///
/// Tool results become `tool_result` blocks inside user-role messages;
/// consecutive results merge into one user message, preserving pairing with
/// the preceding assistant `tool_use` blocks.
fn convert_messages(messages: &[ChatMessage]) -> Vec<AnthropicMessage> {
    let mut out: Vec<AnthropicMessage> = Vec::new();

    for message in messages {
        match message {
            ChatMessage::User { content } => out.push(AnthropicMessage {
                role: "user".into(),
                content: vec![json!({"type": "text", "text": content})],
            }),
            ChatMessage::Assistant { content } => {
                let blocks: Vec<Value> = content
                    .iter()
                    .map(|block| match block {
                        AssistantBlock::Text { text } => json!({"type": "text", "text": text}),
                        AssistantBlock::Reasoning { text } => {
                            json!({"type": "thinking", "thinking": text})
                        }
                        AssistantBlock::ToolUse { id, name, input } => json!({
                            "type": "tool_use",
                            "id": id,
                            "name": name,
                            "input": input,
                        }),
                    })
                    .collect();
                out.push(AnthropicMessage {
                    role: "assistant".into(),
                    content: blocks,
                });
            }
            ChatMessage::ToolResult {
                tool_call_id,
                content,
                is_error,
            } => {
                let mut block = json!({
                    "type": "tool_result",
                    "tool_use_id": tool_call_id,
                    "content": content,
                });
                if let Some(true) = is_error {
                    block["is_error"] = json!(true);
                }

                // Merge into the previous message when it is already a
                // tool-result carrier, so paired results share one user turn.
                match out.last_mut() {
                    Some(last)
                        if last.role == "user"
                            && last
                                .content
                                .iter()
                                .all(|b| b["type"] == "tool_result") =>
                    {
                        last.content.push(block);
                    }
                    _ => out.push(AnthropicMessage {
                        role: "user".into(),
                        content: vec![block],
                    }),
                }
            }
        }
    }

    out
}

#[async_trait]
impl ChatProvider for AnthropicProvider {
    fn provider_kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn stream(&self, request: &ChatRequest) -> ProviderResult<EventStream> {
        self.stream_internal(request).await
    }
}
