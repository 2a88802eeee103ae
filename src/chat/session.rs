//! Core chat session management.
//!
//! A [`ChatSession`] owns the provider handle, the configuration, the
//! conversation, and everything capabilities have generated.  One request is
//! in flight at a time: every operation that talks to the provider takes
//! `&mut self`.

use serde_json::Value;

use crate::capability::{Artifact, Capability};
use crate::chat::config::ChatConfig;
use crate::client::{BedrockRuntime, ConverseProvider};
use crate::error::{Error, Result};
use crate::observability::{SESSION_RESETS, SESSION_TURNS};
use crate::render::Renderer;
use crate::request_builder;
use crate::store::ConversationStore;
use crate::stream_consumer;
use crate::telemetry;
use crate::types::{Attachment, ConverseStreamRequest, Model, TokenUsage, Turn};

/// A chat session that manages conversation state and provider interactions.
pub struct ChatSession<P: ConverseProvider = BedrockRuntime> {
    provider: P,
    config: ChatConfig,
    store: ConversationStore,
    artifacts: Vec<Artifact>,
    usage_totals: TokenUsage,
    last_turn_usage: Option<TokenUsage>,
    request_count: u64,
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone)]
pub struct SessionStats {
    /// The model used for the session.
    pub model: Model,
    /// The number of turns in the conversation.
    pub message_count: usize,
    /// The number of generated artifacts.
    pub artifact_count: usize,
    /// The maximum tokens per response.
    pub max_tokens: u32,
    /// The sampling temperature.
    pub temperature: f32,
    /// The system prompt.
    pub system_prompt: String,
    /// Whether the system prompt is cached.
    pub cache_system: bool,
    /// Whether new documents are cached.
    pub cache_documents: bool,
    /// Total input tokens across all requests.
    pub total_input_tokens: u64,
    /// Total output tokens across all requests.
    pub total_output_tokens: u64,
    /// Total input tokens read from the cache.
    pub total_cache_read_tokens: u64,
    /// Total input tokens written to the cache.
    pub total_cache_write_tokens: u64,
    /// Total number of requests made.
    pub total_requests: u64,
    /// Input tokens for the last turn, if available.
    pub last_turn_input_tokens: Option<u64>,
    /// Output tokens for the last turn, if available.
    pub last_turn_output_tokens: Option<u64>,
}

impl<P: ConverseProvider> ChatSession<P> {
    /// Creates a new chat session with the given provider and configuration.
    pub fn new(provider: P, config: ChatConfig) -> Self {
        Self {
            provider,
            config,
            store: ConversationStore::new(),
            artifacts: Vec::new(),
            usage_totals: TokenUsage::default(),
            last_turn_usage: None,
            request_count: 0,
        }
    }

    /// Sends a user turn and streams the response into `renderer`.
    ///
    /// This method:
    /// 1. Stamps a document attachment with the current document cache flag
    ///    then validates and appends the user turn
    /// 2. Builds a request from the whole conversation
    /// 3. Renders response text as it arrives
    /// 4. Appends the complete assistant turn with its metadata
    /// 5. Renders the telemetry caption
    ///
    /// # Errors
    ///
    /// Returns a validation error when the turn has neither text nor an
    /// attachment; nothing is appended in that case.  Any failure after the
    /// request is issued is rendered inline and returned.  The user turn stays
    /// in the conversation; whether the failure is recorded as well depends on
    /// [`ChatConfig::record_errors`].
    pub async fn submit(
        &mut self,
        text: Option<String>,
        attachment: Option<Attachment>,
        renderer: &mut dyn Renderer,
    ) -> Result<()> {
        let attachment = attachment.map(|a| a.with_cached(self.config.cache_documents));
        let turn = match Turn::user(text, attachment) {
            Ok(turn) => turn,
            Err(err) => {
                renderer.print_error(&describe_error(&err));
                return Err(err);
            }
        };
        self.store.append(turn);
        SESSION_TURNS.click();

        let request = self.build_request();
        self.request_count = self.request_count.saturating_add(1);
        match stream_consumer::run(&self.provider, &request, renderer).await {
            Ok(state) => {
                let metadata = state.metadata();
                if let Some(usage) = metadata.usage {
                    self.last_turn_usage = Some(usage);
                    self.usage_totals = self.usage_totals + usage;
                }
                if let Some(summary) = telemetry::format(&metadata) {
                    renderer.print_telemetry(&summary);
                }
                let metadata = (!metadata.is_empty()).then_some(metadata);
                self.store.append(Turn::assistant(state.text, metadata));
                Ok(())
            }
            Err(err) => Err(self.fail(err, renderer)),
        }
    }

    /// Runs a capability on behalf of the user and records the exchange.
    ///
    /// `prompt` becomes the user turn.  The capability's text becomes the
    /// assistant turn and its artifacts are appended to the session's list.
    /// Returns the artifacts this invocation produced.
    pub async fn invoke_capability(
        &mut self,
        prompt: &str,
        capability: &dyn Capability,
        args: Value,
        renderer: &mut dyn Renderer,
    ) -> Result<&[Artifact]> {
        let turn = match Turn::user(Some(prompt.to_string()), None) {
            Ok(turn) => turn,
            Err(err) => {
                renderer.print_error(&describe_error(&err));
                return Err(err);
            }
        };
        self.store.append(turn);
        SESSION_TURNS.click();

        let output = match capability.invoke(args).await {
            Ok(output) => output,
            Err(err) => return Err(self.fail(err, renderer)),
        };
        tracing::debug!(
            capability = capability.name(),
            artifacts = output.artifacts.len(),
            "capability finished"
        );
        renderer.start_response();
        renderer.print_text(&output.text, &output.text);
        renderer.finish_response(&output.text);

        let start = self.artifacts.len();
        self.artifacts.extend(output.artifacts);
        self.store.append(Turn::assistant(output.text, None));
        Ok(&self.artifacts[start..])
    }

    /// Clears the conversation and the generated artifacts.
    pub fn reset(&mut self) {
        SESSION_RESETS.click();
        self.store.clear();
        self.artifacts.clear();
    }

    /// Returns the request the next submission would send, without the new turn.
    pub fn build_request(&self) -> ConverseStreamRequest {
        request_builder::build(
            self.store.all(),
            &self.config.system_prompt,
            self.config.cache_flags(),
            &self.config.model_params(),
        )
    }

    /// Returns the turns so far.
    pub fn turns(&self) -> &[Turn] {
        self.store.all()
    }

    /// Returns the number of turns in the conversation.
    pub fn message_count(&self) -> usize {
        self.store.len()
    }

    /// Returns everything capabilities have generated since the last reset.
    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Returns the provider handle.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Changes the model used for responses.
    pub fn set_model(&mut self, model: Model) {
        self.config.model = model;
    }

    /// Returns the current model.
    pub fn model(&self) -> &Model {
        &self.config.model
    }

    /// Sets the system prompt; an empty prompt sends no system block.
    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.config.system_prompt = prompt.into();
    }

    /// Returns the current system prompt.
    pub fn system_prompt(&self) -> &str {
        &self.config.system_prompt
    }

    /// Sets the maximum tokens per response.
    pub fn set_max_tokens(&mut self, max_tokens: u32) {
        self.config.max_tokens = max_tokens;
    }

    /// Sets the sampling temperature.
    pub fn set_temperature(&mut self, temperature: f32) {
        self.config.temperature = temperature;
    }

    /// Sets whether the system prompt is cached from the next request on.
    pub fn set_cache_system(&mut self, enabled: bool) {
        self.config.cache_system = enabled;
    }

    /// Sets whether documents submitted from now on are cached.
    ///
    /// Attachments already in the conversation keep the flag they were
    /// submitted with.
    pub fn set_cache_documents(&mut self, enabled: bool) {
        self.config.cache_documents = enabled;
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        let config = &self.config;
        SessionStats {
            model: config.model.clone(),
            message_count: self.message_count(),
            artifact_count: self.artifacts.len(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            system_prompt: config.system_prompt.clone(),
            cache_system: config.cache_system,
            cache_documents: config.cache_documents,
            total_input_tokens: u64::from(self.usage_totals.input_tokens),
            total_output_tokens: u64::from(self.usage_totals.output_tokens),
            total_cache_read_tokens: u64::from(
                self.usage_totals.cache_read_input_tokens.unwrap_or(0),
            ),
            total_cache_write_tokens: u64::from(
                self.usage_totals.cache_write_input_tokens.unwrap_or(0),
            ),
            total_requests: self.request_count,
            last_turn_input_tokens: self
                .last_turn_usage
                .map(|usage| u64::from(usage.input_tokens)),
            last_turn_output_tokens: self
                .last_turn_usage
                .map(|usage| u64::from(usage.output_tokens)),
        }
    }

    fn fail(&mut self, err: Error, renderer: &mut dyn Renderer) -> Error {
        renderer.print_error(&describe_error(&err));
        if self.config.record_errors && !err.is_provider() {
            self.store
                .append(Turn::assistant(format!("Error: {}", err.message()), None));
        }
        err
    }
}

/// The inline text shown for a failed turn.
///
/// Provider errors read `Provider error (Code): message`; everything else reads
/// `Error: message`.
pub fn describe_error(err: &Error) -> String {
    match err.error_code() {
        Some(code) if err.is_provider() => format!("Provider error ({code}): {}", err.message()),
        _ => format!("Error: {}", err.message()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::EventStream;
    use crate::render::RecordingRenderer;
    use crate::types::{ConversationRole, ConverseStreamEvent, KnownModel, StopReason};
    use async_trait::async_trait;
    use futures::stream;

    struct EchoProvider;

    #[async_trait]
    impl ConverseProvider for EchoProvider {
        async fn converse_stream(&self, request: &ConverseStreamRequest) -> Result<EventStream> {
            let count = request.messages.len();
            Ok(Box::pin(stream::iter(vec![
                Ok(ConverseStreamEvent::text_delta(0, format!("{count} messages"))),
                Ok(ConverseStreamEvent::message_stop(StopReason::EndTurn)),
            ])))
        }
    }

    #[test]
    fn new_session_empty() {
        let session = ChatSession::new(EchoProvider, ChatConfig::default());
        assert_eq!(session.message_count(), 0);
        assert!(session.artifacts().is_empty());
    }

    #[tokio::test]
    async fn submit_appends_both_turns() {
        let mut session = ChatSession::new(EchoProvider, ChatConfig::default());
        let mut renderer = RecordingRenderer::new();
        session
            .submit(Some("Hi".to_string()), None, &mut renderer)
            .await
            .unwrap();
        session
            .submit(Some("Again".to_string()), None, &mut renderer)
            .await
            .unwrap();

        let turns = session.turns();
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[1].role(), ConversationRole::Assistant);
        assert_eq!(turns[1].text(), Some("1 messages"));
        assert_eq!(turns[3].text(), Some("3 messages"));
        assert_eq!(session.stats().total_requests, 2);
    }

    #[tokio::test]
    async fn empty_submission_is_rejected() {
        let mut session = ChatSession::new(EchoProvider, ChatConfig::default());
        let mut renderer = RecordingRenderer::new();
        let err = session
            .submit(Some("   ".to_string()), None, &mut renderer)
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(session.message_count(), 0);
        assert_eq!(renderer.errors.len(), 1);
    }

    #[test]
    fn set_model() {
        let mut session = ChatSession::new(EchoProvider, ChatConfig::default());
        assert_eq!(session.model(), &Model::Known(KnownModel::ClaudeSonnet45));

        session.set_model(Model::Known(KnownModel::ClaudeHaiku45));
        assert_eq!(session.model(), &Model::Known(KnownModel::ClaudeHaiku45));
        assert_eq!(
            session.build_request().model_id,
            "global.anthropic.claude-haiku-4-5-20251001-v1:0"
        );
    }

    #[test]
    fn empty_system_prompt_sends_no_system_block() {
        let mut session = ChatSession::new(EchoProvider, ChatConfig::default());
        assert!(session.build_request().system.is_some());

        session.set_system_prompt("");
        assert!(session.build_request().system.is_none());
    }

    #[test]
    fn describe_errors() {
        let provider = Error::provider("ThrottlingException", "slow down", Some(429), None);
        assert_eq!(
            describe_error(&provider),
            "Provider error (ThrottlingException): slow down"
        );
        let generic = Error::streaming("connection reset", None);
        assert_eq!(describe_error(&generic), "Error: connection reset");
    }
}
