use serde::{Deserialize, Serialize};

use crate::types::{InferenceConfig, Message, SystemContentBlock};

/// The body of a Converse Stream request.
///
/// The model is addressed by the request path, so `model_id` is not part of
/// the JSON body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConverseStreamRequest {
    /// The model the request is routed to.
    #[serde(skip)]
    pub model_id: String,

    /// Conversation history, oldest first.
    pub messages: Vec<Message>,

    /// System prompt blocks; absent when there is no system prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<Vec<SystemContentBlock>>,

    /// Sampling parameters.
    pub inference_config: InferenceConfig,
}

impl ConverseStreamRequest {
    /// Create a new request with no system prompt.
    pub fn new(
        model_id: impl Into<String>,
        messages: Vec<Message>,
        inference_config: InferenceConfig,
    ) -> Self {
        Self {
            model_id: model_id.into(),
            messages,
            system: None,
            inference_config,
        }
    }

    /// Set the system blocks.
    pub fn with_system(mut self, system: Vec<SystemContentBlock>) -> Self {
        self.system = Some(system);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn model_id_stays_out_of_body() {
        let request = ConverseStreamRequest::new(
            "global.anthropic.claude-sonnet-4-5-20250929-v1:0",
            vec![Message::user("Hello")],
            InferenceConfig::new(1024).with_temperature(0.25),
        );
        assert_eq!(
            to_value(&request).unwrap(),
            json!({
                "messages": [{"role": "user", "content": [{"text": "Hello"}]}],
                "inferenceConfig": {"maxTokens": 1024, "temperature": 0.25}
            })
        );
    }

    #[test]
    fn system_blocks() {
        let request = ConverseStreamRequest::new("m", vec![], InferenceConfig::new(1))
            .with_system(vec![SystemContentBlock::Text("Be brief.".to_string())]);
        let json = to_value(&request).unwrap();
        assert_eq!(json["system"], json!([{"text": "Be brief."}]));
    }
}
