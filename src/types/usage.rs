use std::ops::Add;

use serde::{Deserialize, Serialize};

/// Token usage reported by the provider at the end of a stream.
///
/// Cache counts are only present when the request carried cache points.
#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    /// The number of input tokens which were used.
    pub input_tokens: u32,

    /// The number of output tokens which were used.
    pub output_tokens: u32,

    /// Input plus output tokens, as reported by the provider.
    #[serde(default)]
    pub total_tokens: u32,

    /// The number of input tokens read from the cache.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_read_input_tokens: Option<u32>,

    /// The number of input tokens written to the cache.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_write_input_tokens: Option<u32>,
}

impl TokenUsage {
    /// Create a new `TokenUsage` with the given input and output tokens.
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens.saturating_add(output_tokens),
            cache_read_input_tokens: None,
            cache_write_input_tokens: None,
        }
    }

    /// Set the cache read input tokens.
    pub fn with_cache_read_input_tokens(mut self, tokens: u32) -> Self {
        self.cache_read_input_tokens = Some(tokens);
        self
    }

    /// Set the cache write input tokens.
    pub fn with_cache_write_input_tokens(mut self, tokens: u32) -> Self {
        self.cache_write_input_tokens = Some(tokens);
        self
    }

    /// Returns true when every count is zero or absent.
    pub fn is_zero(&self) -> bool {
        self.input_tokens == 0
            && self.output_tokens == 0
            && self.cache_read_input_tokens.unwrap_or(0) == 0
            && self.cache_write_input_tokens.unwrap_or(0) == 0
    }
}

impl Add for TokenUsage {
    type Output = TokenUsage;

    fn add(self, rhs: TokenUsage) -> TokenUsage {
        fn add_opt(lhs: Option<u32>, rhs: Option<u32>) -> Option<u32> {
            match (lhs, rhs) {
                (None, None) => None,
                (lhs, rhs) => Some(lhs.unwrap_or(0).saturating_add(rhs.unwrap_or(0))),
            }
        }
        TokenUsage {
            input_tokens: self.input_tokens.saturating_add(rhs.input_tokens),
            output_tokens: self.output_tokens.saturating_add(rhs.output_tokens),
            total_tokens: self.total_tokens.saturating_add(rhs.total_tokens),
            cache_read_input_tokens: add_opt(
                self.cache_read_input_tokens,
                rhs.cache_read_input_tokens,
            ),
            cache_write_input_tokens: add_opt(
                self.cache_write_input_tokens,
                rhs.cache_write_input_tokens,
            ),
        }
    }
}

/// Latency figures reported alongside a response.
#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StreamMetrics {
    /// Server-side latency of the request in milliseconds.
    pub latency_ms: u64,
}

impl StreamMetrics {
    /// Create a new `StreamMetrics` with the given latency.
    pub fn new(latency_ms: u64) -> Self {
        Self { latency_ms }
    }
}
