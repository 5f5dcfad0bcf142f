//! API error response body parsing shared by both adapters.
//!
//! Handles the common error envelopes:
//! - Standard: `{"error": {"message": "...", "type": "..."}}`
//! - Detail:   `{"detail": "..."}`
//! - Flat:     `{"message": "...", "code": "..."}`

use serde_json::Value;

/// Parsed API error information.
pub struct ApiErrorInfo {
    /// Human-readable error message.
    pub message: String,
    /// Provider-specific error code (e.g. `"overloaded_error"`).
    pub code: Option<String>,
    /// Whether the request can be retried (429 or 5xx).
    pub retryable: bool,
}

/// Parse an API error response body into structured error info.
///
/// Tries the known JSON envelopes in order of specificity, falling back to
/// the raw body text when nothing matches.
#[must_use]
pub fn parse_api_error(body: &str, status: u16) -> ApiErrorInfo {
    let retryable = status == 429 || status >= 500;

    if let Ok(json) = serde_json::from_str::<Value>(body) {
        if let Some(msg) = json["error"]["message"].as_str() {
            let code = json["error"]["type"]
                .as_str()
                .or_else(|| json["error"]["code"].as_str())
                .map(String::from);
            return ApiErrorInfo {
                message: msg.to_string(),
                code,
                retryable,
            };
        }

        if let Some(msg) = json["detail"].as_str().or_else(|| json["message"].as_str()) {
            let code = json["code"]
                .as_str()
                .or_else(|| json["type"].as_str())
                .map(String::from);
            return ApiErrorInfo {
                message: msg.to_string(),
                code,
                retryable,
            };
        }

        return ApiErrorInfo {
            message: format!("HTTP {status}: {body}"),
            code: None,
            retryable,
        };
    }

    ApiErrorInfo {
        message: format!("HTTP {status}: {body}"),
        code: None,
        retryable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_envelope() {
        let body = r#"{"error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        let info = parse_api_error(body, 529);
        assert_eq!(info.message, "Overloaded");
        assert_eq!(info.code.as_deref(), Some("overloaded_error"));
        assert!(info.retryable);
    }

    #[test]
    fn detail_format() {
        let info = parse_api_error(r#"{"detail":"Model not found"}"#, 404);
        assert_eq!(info.message, "Model not found");
        assert!(info.code.is_none());
        assert!(!info.retryable);
    }

    #[test]
    fn flat_message_format() {
        let info =
            parse_api_error(r#"{"message":"Invalid model","code":"model_not_found"}"#, 400);
        assert_eq!(info.message, "Invalid model");
        assert_eq!(info.code.as_deref(), Some("model_not_found"));
    }

    #[test]
    fn unrecognized_json_includes_body() {
        let info = parse_api_error(r#"{"error":{}}"#, 400);
        assert!(info.message.contains("400"));
        assert!(info.message.contains(r#"{"error":{}}"#));
    }

    #[test]
    fn non_json_body_passed_through() {
        let info = parse_api_error("Bad Gateway", 502);
        assert_eq!(info.message, "HTTP 502: Bad Gateway");
        assert!(info.retryable);
    }
}
