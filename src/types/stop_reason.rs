use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Reasons why the model stopped generating a response.
///
/// Serialized as the provider's snake_case string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// The model reached the end of a generated turn
    EndTurn,

    /// The model indicated it wants to use a tool
    ToolUse,

    /// The response reached the maximum token limit for the response
    MaxTokens,

    /// The model reached a specified stop sequence
    StopSequence,

    /// A guardrail intervened and replaced or blocked the output
    GuardrailIntervened,

    /// The output was withheld by content filtering
    ContentFiltered,

    /// The response stopped because it exceeded the model's context window
    ModelContextWindowExceeded,

    /// A reason this crate does not know about yet, kept verbatim
    Unknown(String),
}

impl StopReason {
    /// Returns true for the normal end of a turn.
    ///
    /// Any other reason is surfaced to the user as an informational notice.
    pub fn is_end_turn(&self) -> bool {
        matches!(self, StopReason::EndTurn)
    }

    /// The wire value.
    pub fn as_str(&self) -> &str {
        match self {
            StopReason::EndTurn => "end_turn",
            StopReason::ToolUse => "tool_use",
            StopReason::MaxTokens => "max_tokens",
            StopReason::StopSequence => "stop_sequence",
            StopReason::GuardrailIntervened => "guardrail_intervened",
            StopReason::ContentFiltered => "content_filtered",
            StopReason::ModelContextWindowExceeded => "model_context_window_exceeded",
            StopReason::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for StopReason {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for StopReason {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.parse() {
            Ok(reason) => Ok(reason),
            Err(_) => Ok(StopReason::Unknown(s)),
        }
    }
}

/// Error returned when parsing an invalid stop reason string.
#[derive(Debug)]
pub struct StopReasonParseError {
    /// The invalid string value that could not be parsed.
    pub invalid_value: String,
}

impl fmt::Display for StopReasonParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown stop reason: {}", self.invalid_value)
    }
}

impl std::error::Error for StopReasonParseError {}

impl FromStr for StopReason {
    type Err = StopReasonParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "end_turn" => Ok(StopReason::EndTurn),
            "tool_use" => Ok(StopReason::ToolUse),
            "max_tokens" => Ok(StopReason::MaxTokens),
            "stop_sequence" => Ok(StopReason::StopSequence),
            "guardrail_intervened" => Ok(StopReason::GuardrailIntervened),
            "content_filtered" => Ok(StopReason::ContentFiltered),
            "model_context_window_exceeded" => Ok(StopReason::ModelContextWindowExceeded),
            _ => Err(StopReasonParseError {
                invalid_value: s.to_string(),
            }),
        }
    }
}
