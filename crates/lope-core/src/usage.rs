//! Token usage, cost, and finish reasons.

use serde::{Deserialize, Serialize};

/// Token usage reported by a provider for one step.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    /// Input tokens consumed.
    pub input_tokens: u64,
    /// Output tokens generated.
    pub output_tokens: u64,
    /// Reasoning tokens, where the provider reports them separately.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_tokens: Option<u64>,
    /// Tokens read from prompt cache.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_read_tokens: Option<u64>,
    /// Tokens written to prompt cache.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_creation_tokens: Option<u64>,
}

impl TokenUsage {
    /// Merge another usage report into this one, summing counts.
    ///
    /// Optional counts stay `None` unless at least one side reports them.
    pub fn merge(&mut self, other: &Self) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.reasoning_tokens = sum_opt(self.reasoning_tokens, other.reasoning_tokens);
        self.cache_read_tokens = sum_opt(self.cache_read_tokens, other.cache_read_tokens);
        self.cache_creation_tokens =
            sum_opt(self.cache_creation_tokens, other.cache_creation_tokens);
    }
}

fn sum_opt(a: Option<u64>, b: Option<u64>) -> Option<u64> {
    match (a, b) {
        (None, None) => None,
        (x, y) => Some(x.unwrap_or(0) + y.unwrap_or(0)),
    }
}

/// Cost information in USD. Cost computation is out of scope; steps carry a
/// zero placeholder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cost {
    /// Input cost.
    pub input_cost: f64,
    /// Output cost.
    pub output_cost: f64,
    /// Total cost.
    pub total: f64,
    /// Currency code (always `"USD"`).
    pub currency: String,
}

impl Default for Cost {
    fn default() -> Self {
        Self {
            input_cost: 0.0,
            output_cost: 0.0,
            total: 0.0,
            currency: "USD".into(),
        }
    }
}

/// Reasons why the model stopped generating.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural end of response.
    EndTurn,
    /// Model wants to use a tool.
    ToolUse,
    /// Hit the max output token limit.
    MaxTokens,
    /// Hit a stop sequence.
    StopSequence,
    /// The stream failed.
    Error,
    /// The run was cancelled mid-stream.
    Canceled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_usage_serde_skips_absent_fields() {
        let usage = TokenUsage {
            input_tokens: 100,
            output_tokens: 50,
            reasoning_tokens: None,
            cache_read_tokens: Some(30),
            cache_creation_tokens: None,
        };
        let json = serde_json::to_value(&usage).unwrap();
        assert_eq!(json["inputTokens"], 100);
        assert_eq!(json["cacheReadTokens"], 30);
        assert!(json.get("reasoningTokens").is_none());
        assert!(json.get("cacheCreationTokens").is_none());
    }

    #[test]
    fn token_usage_merge_sums_counts() {
        let mut a = TokenUsage {
            input_tokens: 10,
            output_tokens: 5,
            reasoning_tokens: None,
            cache_read_tokens: Some(2),
            cache_creation_tokens: None,
        };
        let b = TokenUsage {
            input_tokens: 3,
            output_tokens: 7,
            reasoning_tokens: Some(4),
            cache_read_tokens: None,
            cache_creation_tokens: None,
        };
        a.merge(&b);
        assert_eq!(a.input_tokens, 13);
        assert_eq!(a.output_tokens, 12);
        assert_eq!(a.reasoning_tokens, Some(4));
        assert_eq!(a.cache_read_tokens, Some(2));
        assert!(a.cache_creation_tokens.is_none());
    }

    #[test]
    fn cost_default_is_zero_usd() {
        let cost = Cost::default();
        assert_eq!(cost.total, 0.0);
        assert_eq!(cost.currency, "USD");
    }

    #[test]
    fn finish_reason_serde() {
        assert_eq!(
            serde_json::to_string(&FinishReason::EndTurn).unwrap(),
            "\"end_turn\""
        );
        assert_eq!(
            serde_json::to_string(&FinishReason::ToolUse).unwrap(),
            "\"tool_use\""
        );
        assert_eq!(
            serde_json::to_string(&FinishReason::Canceled).unwrap(),
            "\"canceled\""
        );
    }
}
