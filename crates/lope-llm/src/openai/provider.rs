//! Chat-completions provider: request building and HTTP stream wiring.

use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::{json, Value};
use tracing::{debug, error, instrument};

use lope_core::message::{AssistantBlock, ChatMessage, ChatRequest, ToolSpec};

use crate::error_parsing::parse_api_error;
use crate::provider::{
    ChatProvider, EventStream, ProviderConfig, ProviderError, ProviderKind, ProviderResult,
};
use crate::sse::{parse_sse_data, parse_sse_lines, SseParserOptions};

use super::stream_handler::{finish_event, process_chunk, StreamState};
use super::types::{ChatCompletionChunk, OpenAiRequest};

/// Default base URL for the chat-completions endpoint.
const DEFAULT_BASE_URL: &str = "https://api.openai.com";

// The dialect terminates with an explicit [DONE]; trailing bytes are noise.
static SSE_OPTIONS: SseParserOptions = SseParserOptions {
    process_remaining_buffer: false,
};

/// Chat-completions streaming provider.
pub struct OpenAiProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl OpenAiProvider {
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
        let auth = format!("Bearer {}", self.config.api_key);
        let _ = headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth).map_err(|e| ProviderError::Api {
                status: 0,
                message: format!("Invalid authorization header: {e}"),
                code: None,
                retryable: false,
            })?,
        );
        Ok(headers)
    }

    fn build_request(&self, request: &ChatRequest) -> OpenAiRequest {
        OpenAiRequest {
            model: self.config.model.clone(),
            messages: convert_messages(request.system_prompt.as_deref(), &request.messages),
            tools: build_tools(&request.tools),
            stream: true,
            stream_options: json!({"include_usage": true}),
            max_tokens: request.max_tokens.or(self.config.max_tokens),
        }
    }

    #[instrument(skip_all, fields(model = %self.config.model))]
    async fn stream_internal(&self, request: &ChatRequest) -> ProviderResult<EventStream> {
        let body = self.build_request(request);

        let base_url = self.config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let url = format!("{base_url}/v1/chat/completions");
        let headers = self.build_headers()?;

        debug!(
            message_count = body.messages.len(),
            has_tools = body.tools.is_some(),
            "sending chat-completions request"
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
                "chat-completions API error"
            );
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: info.message,
                code: info.code,
                retryable: info.retryable,
            });
        }

        let byte_stream = response.bytes_stream();

        // No terminal wire event in this dialect, so the Finish is built from
        // last-seen state once the byte stream closes.
        let event_stream = stream! {
            let lines = parse_sse_lines(byte_stream, &SSE_OPTIONS);
            tokio::pin!(lines);

            let mut state = StreamState::default();
            while let Some(line) = lines.next().await {
                let Some(chunk): Option<ChatCompletionChunk> =
                    parse_sse_data(&line, "openai") else { continue };
                for event in process_chunk(&chunk, &mut state) {
                    yield Ok(event);
                }
            }
            yield Ok(finish_event(&state));
        };

        Ok(Box::pin(event_stream))
    }
}

/// Convert neutral messages into the chat-completions wire shape.
///
/// The system prompt becomes the leading `system` message. Assistant tool
/// calls become `tool_calls` entries with JSON-encoded argument strings; tool
/// results become `role: "tool"` messages paired by `tool_call_id`.
/// Reasoning blocks have no slot in this dialect and are omitted.
fn convert_messages(system_prompt: Option<&str>, messages: &[ChatMessage]) -> Vec<Value> {
    let mut out = Vec::new();

    if let Some(system) = system_prompt {
        out.push(json!({"role": "system", "content": system}));
    }

    for message in messages {
        match message {
            ChatMessage::User { content } => {
                out.push(json!({"role": "user", "content": content}));
            }
            ChatMessage::Assistant { content } => {
                let text: String = content
                    .iter()
                    .filter_map(|b| match b {
                        AssistantBlock::Text { text } => Some(text.as_str()),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
                    .join("");

                let tool_calls: Vec<Value> = content
                    .iter()
                    .filter_map(|b| match b {
                        AssistantBlock::ToolUse { id, name, input } => Some(json!({
                            "id": id,
                            "type": "function",
                            "function": {
                                "name": name,
                                "arguments": serde_json::to_string(input).unwrap_or_default(),
                            },
                        })),
                        _ => None,
                    })
                    .collect();

                let mut msg = json!({"role": "assistant"});
                msg["content"] = if text.is_empty() {
                    Value::Null
                } else {
                    json!(text)
                };
                if !tool_calls.is_empty() {
                    msg["tool_calls"] = json!(tool_calls);
                }
                out.push(msg);
            }
            ChatMessage::ToolResult {
                tool_call_id,
                content,
                ..
            } => {
                out.push(json!({
                    "role": "tool",
                    "tool_call_id": tool_call_id,
                    "content": content,
                }));
            }
        }
    }

    out
}

/// Build `tools` declarations in the `{type: "function", function: …}` shape.
fn build_tools(tools: &[ToolSpec]) -> Option<Vec<Value>> {
    if tools.is_empty() {
        return None;
    }
    Some(
        tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    },
                })
            })
            .collect(),
    )
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    fn provider_kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn stream(&self, request: &ChatRequest) -> ProviderResult<EventStream> {
        self.stream_internal(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use lope_core::events::StreamEvent;
    use lope_core::ids::ToolCallId;
    use lope_core::schema::ParameterSchema;
    use lope_core::usage::FinishReason;

    fn provider_at(base_url: &str) -> OpenAiProvider {
        OpenAiProvider::new(ProviderConfig {
            api_key: "test-key".into(),
            model: "test-model".into(),
            base_url: Some(base_url.to_owned()),
            max_tokens: None,
        })
    }

    // ── convert_messages ─────────────────────────────────────────────────

    #[test]
    fn system_prompt_leads() {
        let converted = convert_messages(Some("be brief"), &[ChatMessage::user("q")]);
        assert_eq!(converted[0]["role"], "system");
        assert_eq!(converted[0]["content"], "be brief");
        assert_eq!(converted[1]["role"], "user");
    }

    #[test]
    fn assistant_tool_calls_encode_arguments_as_string() {
        let mut input = serde_json::Map::new();
        let _ = input.insert("text".into(), json!("hi"));
        let converted = convert_messages(
            None,
            &[ChatMessage::Assistant {
                content: vec![
                    AssistantBlock::text("calling"),
                    AssistantBlock::ToolUse {
                        id: ToolCallId::from("call_1"),
                        name: "echo".into(),
                        input,
                    },
                ],
            }],
        );
        let msg = &converted[0];
        assert_eq!(msg["content"], "calling");
        assert_eq!(msg["tool_calls"][0]["id"], "call_1");
        assert_eq!(msg["tool_calls"][0]["type"], "function");
        assert_eq!(
            msg["tool_calls"][0]["function"]["arguments"],
            "{\"text\":\"hi\"}"
        );
    }

    #[test]
    fn tool_only_assistant_message_has_null_content() {
        let converted = convert_messages(
            None,
            &[ChatMessage::Assistant {
                content: vec![AssistantBlock::ToolUse {
                    id: ToolCallId::from("call_1"),
                    name: "echo".into(),
                    input: serde_json::Map::new(),
                }],
            }],
        );
        assert!(converted[0]["content"].is_null());
    }

    #[test]
    fn tool_results_become_tool_role_messages() {
        let converted = convert_messages(
            None,
            &[ChatMessage::ToolResult {
                tool_call_id: ToolCallId::from("call_1"),
                content: "out".into(),
                is_error: None,
            }],
        );
        assert_eq!(converted[0]["role"], "tool");
        assert_eq!(converted[0]["tool_call_id"], "call_1");
        assert_eq!(converted[0]["content"], "out");
    }

    #[test]
    fn reasoning_blocks_omitted() {
        let converted = convert_messages(
            None,
            &[ChatMessage::Assistant {
                content: vec![
                    AssistantBlock::Reasoning {
                        text: "thinking".into(),
                    },
                    AssistantBlock::text("answer"),
                ],
            }],
        );
        assert_eq!(converted[0]["content"], "answer");
        assert!(converted[0].get("tool_calls").is_none());
    }

    #[test]
    fn tools_declared_in_function_shape() {
        let tools = build_tools(&[ToolSpec {
            name: "echo".into(),
            description: "echo text".into(),
            parameters: ParameterSchema::object([(
                "text",
                ParameterSchema::string("text to echo"),
                true,
            )]),
        }])
        .unwrap();
        assert_eq!(tools[0]["type"], "function");
        assert_eq!(tools[0]["function"]["name"], "echo");
        assert_eq!(tools[0]["function"]["parameters"]["type"], "object");
    }

    // ── HTTP-level stream ────────────────────────────────────────────────

    const SSE_BODY: &str = concat!(
        "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\",\"content\":\"\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
        "data: {\"choices\":[],\"usage\":{\"prompt_tokens\":8,\"completion_tokens\":2}}\n\n",
        "data: [DONE]\n\n",
    );

    #[tokio::test]
    async fn streams_canonical_events_from_sse_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(SSE_BODY),
            )
            .mount(&server)
            .await;

        let provider = provider_at(&server.uri());
        let request = ChatRequest {
            messages: vec![ChatMessage::user("hi")],
            ..ChatRequest::default()
        };

        let stream = provider.stream(&request).await.unwrap();
        let events: Vec<_> = stream.map(Result::unwrap).collect().await;

        assert_eq!(
            events[0],
            StreamEvent::TextDelta {
                delta: "Hel".into()
            }
        );
        assert_eq!(
            events[1],
            StreamEvent::TextDelta {
                delta: "lo".into()
            }
        );
        assert_matches!(
            &events[2],
            StreamEvent::Finish {
                reason: FinishReason::EndTurn,
                usage: Some(u),
            } if u.input_tokens == 8 && u.output_tokens == 2
        );
        assert_eq!(events.len(), 3);
    }

    const TOOL_SSE_BODY: &str = concat!(
        "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"id\":\"call_1\",\"function\":{\"name\":\"echo\",\"arguments\":\"\"}}]}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"function\":{\"arguments\":\"{\\\"text\\\"\"}}]}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"function\":{\"arguments\":\":\\\"hi\\\"}\"}}]}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"tool_calls\"}]}\n\n",
        "data: [DONE]\n\n",
    );

    #[tokio::test]
    async fn streams_tool_call_events() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(TOOL_SSE_BODY),
            )
            .mount(&server)
            .await;

        let provider = provider_at(&server.uri());
        let request = ChatRequest {
            messages: vec![ChatMessage::user("say hi")],
            ..ChatRequest::default()
        };

        let stream = provider.stream(&request).await.unwrap();
        let events: Vec<_> = stream.map(Result::unwrap).collect().await;

        assert_eq!(
            events[0],
            StreamEvent::ToolCallStart {
                tool_call_id: ToolCallId::from("call_1"),
                name: "echo".into(),
            }
        );
        assert_eq!(
            events[1],
            StreamEvent::ToolCallDelta {
                tool_call_id: ToolCallId::from("call_1"),
                arguments_delta: "{\"text\"".into(),
            }
        );
        assert_eq!(
            events[2],
            StreamEvent::ToolCallDelta {
                tool_call_id: ToolCallId::from("call_1"),
                arguments_delta: ":\"hi\"}".into(),
            }
        );
        assert_matches!(
            &events[3],
            StreamEvent::Finish {
                reason: FinishReason::ToolUse,
                ..
            }
        );
    }

    #[tokio::test]
    async fn non_success_status_maps_to_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_string(r#"{"error":{"message":"Invalid key","type":"invalid_request_error"}}"#),
            )
            .mount(&server)
            .await;

        let provider = provider_at(&server.uri());
        let request = ChatRequest {
            messages: vec![ChatMessage::user("hi")],
            ..ChatRequest::default()
        };

        let Err(err) = provider.stream(&request).await else {
            panic!("expected an API error");
        };
        assert_matches!(
            err,
            ProviderError::Api {
                status: 401,
                retryable: false,
                ..
            }
        );
    }
}
