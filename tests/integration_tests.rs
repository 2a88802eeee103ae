//! Integration tests for the converse library.
//!
//! Most tests drive a session against a scripted provider.  The live test at
//! the bottom requires a bearer token in the environment to run.

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use bytes::{BufMut, Bytes, BytesMut};
    use futures::stream;
    use serde_json::{Value, json};

    use converse::chat::{ChatConfig, ChatSession};
    use converse::event_stream::process_event_stream;
    use converse::{
        Capability, CapabilityOutput, ConversationRole, ConverseProvider, ConverseStreamEvent,
        ConverseStreamRequest, Error, EventStream, ImageGeneration, InvokeModel,
        RecordingRenderer, Result, StopReason, StreamMetrics, TokenUsage, normalize,
    };

    /// Replays one scripted response per request and keeps every request body.
    struct ScriptedProvider {
        responses: Mutex<VecDeque<Vec<Result<ConverseStreamEvent>>>>,
        requests: Mutex<Vec<Value>>,
    }

    impl ScriptedProvider {
        fn new(responses: Vec<Vec<Result<ConverseStreamEvent>>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn request(&self, index: usize) -> Value {
            self.requests.lock().unwrap()[index].clone()
        }
    }

    #[async_trait]
    impl ConverseProvider for ScriptedProvider {
        async fn converse_stream(&self, request: &ConverseStreamRequest) -> Result<EventStream> {
            self.requests
                .lock()
                .unwrap()
                .push(serde_json::to_value(request).unwrap());
            let events = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("no scripted response left");
            Ok(Box::pin(stream::iter(events)))
        }
    }

    /// Feeds raw event-stream frames through the frame decoder.
    struct WireProvider {
        chunks: Vec<Bytes>,
    }

    #[async_trait]
    impl ConverseProvider for WireProvider {
        async fn converse_stream(&self, _: &ConverseStreamRequest) -> Result<EventStream> {
            let chunks: Vec<std::result::Result<Bytes, std::io::Error>> =
                self.chunks.iter().cloned().map(Ok).collect();
            Ok(Box::pin(process_event_stream(stream::iter(chunks))))
        }
    }

    fn frame(headers: &[(&str, &str)], payload: &str) -> Bytes {
        let mut header_buf = BytesMut::new();
        for (name, value) in headers {
            header_buf.put_u8(name.len() as u8);
            header_buf.put_slice(name.as_bytes());
            header_buf.put_u8(7);
            header_buf.put_u16(value.len() as u16);
            header_buf.put_slice(value.as_bytes());
        }
        let total = 16 + header_buf.len() + payload.len();
        let mut buf = BytesMut::with_capacity(total);
        buf.put_u32(total as u32);
        buf.put_u32(header_buf.len() as u32);
        buf.put_u32(0);
        buf.put_slice(&header_buf);
        buf.put_slice(payload.as_bytes());
        buf.put_u32(0);
        buf.freeze()
    }

    fn event_frame(event_type: &str, payload: &str) -> Bytes {
        frame(
            &[
                (":message-type", "event"),
                (":event-type", event_type),
                (":content-type", "application/json"),
            ],
            payload,
        )
    }

    fn hello_response() -> Vec<Result<ConverseStreamEvent>> {
        vec![
            Ok(ConverseStreamEvent::text_delta(0, "Hel")),
            Ok(ConverseStreamEvent::text_delta(0, "lo")),
            Ok(ConverseStreamEvent::message_stop(StopReason::EndTurn)),
            Ok(ConverseStreamEvent::metadata(
                Some(TokenUsage::new(5, 2)),
                Some(StreamMetrics::new(0)),
            )),
        ]
    }

    #[tokio::test]
    async fn successful_turn_appends_assistant_with_metadata() {
        let provider = ScriptedProvider::new(vec![hello_response()]);
        let mut session = ChatSession::new(provider, ChatConfig::new());
        let mut renderer = RecordingRenderer::new();

        session
            .submit(Some("Hi".to_string()), None, &mut renderer)
            .await
            .unwrap();

        let turns = session.turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role(), ConversationRole::User);
        assert_eq!(turns[1].role(), ConversationRole::Assistant);
        assert_eq!(turns[1].text(), Some("Hello"));
        let metadata = turns[1].metadata().unwrap();
        assert_eq!(metadata.usage, Some(TokenUsage::new(5, 2)));
        assert_eq!(metadata.stop_reason, Some(StopReason::EndTurn));

        assert_eq!(renderer.partials, vec!["Hel▌", "Hello▌"]);
        assert_eq!(renderer.finished, vec!["Hello"]);
        assert_eq!(renderer.telemetry, vec!["Input: 5 | Output: 2"]);

        let stats = session.stats();
        assert_eq!(stats.total_input_tokens, 5);
        assert_eq!(stats.total_output_tokens, 2);
        assert_eq!(stats.last_turn_output_tokens, Some(2));
    }

    #[tokio::test]
    async fn request_carries_whole_conversation() {
        let provider = ScriptedProvider::new(vec![hello_response(), hello_response()]);
        let config = ChatConfig::new()
            .with_system_prompt("Be brief.")
            .with_temperature(0.5);
        let mut session = ChatSession::new(provider, config);
        let mut renderer = RecordingRenderer::new();

        session
            .submit(Some("Hi".to_string()), None, &mut renderer)
            .await
            .unwrap();
        session
            .submit(Some("And again".to_string()), None, &mut renderer)
            .await
            .unwrap();

        assert_eq!(
            session.provider().request(1),
            json!({
                "messages": [
                    {"role": "user", "content": [{"text": "Hi"}]},
                    {"role": "assistant", "content": [{"text": "Hello"}]},
                    {"role": "user", "content": [{"text": "And again"}]}
                ],
                "system": [{"text": "Be brief."}],
                "inferenceConfig": {"maxTokens": 4096, "temperature": 0.5}
            })
        );
    }

    #[tokio::test]
    async fn failed_stream_keeps_only_the_user_turn() {
        let provider = ScriptedProvider::new(vec![vec![
            Ok(ConverseStreamEvent::text_delta(0, "Hel")),
            Err(Error::provider(
                "throttlingException",
                "Too many requests",
                None,
                None,
            )),
        ]]);
        let config = ChatConfig::new().with_record_errors(true);
        let mut session = ChatSession::new(provider, config);
        let mut renderer = RecordingRenderer::new();

        let err = session
            .submit(Some("Hi".to_string()), None, &mut renderer)
            .await
            .unwrap_err();

        assert!(err.is_provider());
        assert_eq!(session.message_count(), 1);
        assert_eq!(session.turns()[0].role(), ConversationRole::User);
        assert_eq!(
            renderer.errors,
            vec!["Provider error (throttlingException): Too many requests"]
        );
        assert!(renderer.finished.is_empty());
        assert!(renderer.telemetry.is_empty());
    }

    #[tokio::test]
    async fn generic_errors_are_recorded_when_enabled() {
        let failing = || {
            vec![
                Ok(ConverseStreamEvent::text_delta(0, "partial")),
                Err(Error::streaming("connection reset", None)),
            ]
        };

        let provider = ScriptedProvider::new(vec![failing()]);
        let mut session = ChatSession::new(provider, ChatConfig::new());
        let mut renderer = RecordingRenderer::new();
        let err = session
            .submit(Some("Hi".to_string()), None, &mut renderer)
            .await
            .unwrap_err();
        assert!(!err.is_provider());
        assert_eq!(session.message_count(), 1);
        assert_eq!(renderer.errors, vec!["Error: connection reset"]);

        let provider = ScriptedProvider::new(vec![failing()]);
        let mut session = ChatSession::new(provider, ChatConfig::new().with_record_errors(true));
        let mut renderer = RecordingRenderer::new();
        session
            .submit(Some("Hi".to_string()), None, &mut renderer)
            .await
            .unwrap_err();
        assert_eq!(session.message_count(), 2);
        assert_eq!(session.turns()[1].text(), Some("Error: connection reset"));
        assert!(session.turns()[1].metadata().is_none());
    }

    #[tokio::test]
    async fn document_cache_flag_is_captured_at_submit() {
        let provider = ScriptedProvider::new(vec![hello_response(), hello_response()]);
        let mut session = ChatSession::new(provider, ChatConfig::new().with_cache_documents(true));
        let mut renderer = RecordingRenderer::new();

        let report = normalize(
            &b"quarterly numbers"[..],
            "q3 report.txt",
            "text/plain",
            session.config().cache_documents,
        );
        session
            .submit(Some("Summarize".to_string()), Some(report), &mut renderer)
            .await
            .unwrap();

        session.set_cache_documents(false);
        session
            .submit(Some("Shorter".to_string()), None, &mut renderer)
            .await
            .unwrap();

        let request = session.provider().request(1);
        let first = &request["messages"][0]["content"];
        assert_eq!(first[0]["document"]["name"], "q3 report txt");
        assert_eq!(first[0]["document"]["format"], "txt");
        assert_eq!(first[1], json!({"cachePoint": {"type": "default"}}));
        assert_eq!(first[2], json!({"text": "Summarize"}));
    }

    #[tokio::test]
    async fn enabling_document_cache_after_attaching_applies_on_send() {
        let provider = ScriptedProvider::new(vec![hello_response(), hello_response()]);
        let mut session = ChatSession::new(provider, ChatConfig::new());
        let mut renderer = RecordingRenderer::new();

        let pending = normalize(&b"line one"[..], "notes.txt", "text/plain", false);
        session.set_cache_documents(true);
        session
            .submit(Some("sum".to_string()), Some(pending), &mut renderer)
            .await
            .unwrap();

        let request = session.provider().request(0);
        let content = &request["messages"][0]["content"];
        assert_eq!(content[0]["document"]["name"], "notes txt");
        assert_eq!(content[1], json!({"cachePoint": {"type": "default"}}));
        assert_eq!(content[2], json!({"text": "sum"}));

        let pending = normalize(&b"line two"[..], "more.txt", "text/plain", true);
        session.set_cache_documents(false);
        session
            .submit(Some("again".to_string()), Some(pending), &mut renderer)
            .await
            .unwrap();

        let request = session.provider().request(1);
        assert_eq!(
            request["messages"][0]["content"][1],
            json!({"cachePoint": {"type": "default"}})
        );
        let latest = &request["messages"][2]["content"];
        assert_eq!(latest.as_array().map(Vec::len), Some(2));
        assert_eq!(latest[1], json!({"text": "again"}));
    }

    #[test]
    fn public_attachments_hold_name_and_cache_invariants() {
        let doc = normalize(&b"x"[..], "  evil//name\t.pdf", "application/pdf", false);
        assert_eq!(doc.name(), "evil name pdf");
        assert_eq!(doc.original_name(), "  evil//name\t.pdf");

        let image = normalize(&b"x"[..], "cat.png", "image/png", true);
        assert!(!image.cached());
        assert!(!image.with_cached(true).cached());

        let doc = doc.with_cached(true);
        assert!(doc.cached());
        assert_eq!(doc.name(), "evil name pdf");
    }

    #[tokio::test]
    async fn system_cache_toggle_applies_to_next_request() {
        let provider = ScriptedProvider::new(vec![hello_response(), hello_response()]);
        let mut session = ChatSession::new(provider, ChatConfig::new());
        let mut renderer = RecordingRenderer::new();

        session
            .submit(Some("One".to_string()), None, &mut renderer)
            .await
            .unwrap();
        session.set_cache_system(true);
        session
            .submit(Some("Two".to_string()), None, &mut renderer)
            .await
            .unwrap();

        assert_eq!(
            session.provider().request(0)["system"],
            json!([{"text": "You are a helpful AI assistant."}])
        );
        assert_eq!(
            session.provider().request(1)["system"],
            json!([
                {"text": "You are a helpful AI assistant."},
                {"cachePoint": {"type": "default"}}
            ])
        );
    }

    #[tokio::test]
    async fn wire_frames_drive_a_turn() {
        let mut wire = BytesMut::new();
        wire.extend_from_slice(&event_frame("messageStart", r#"{"role":"assistant"}"#));
        wire.extend_from_slice(&event_frame(
            "contentBlockDelta",
            r#"{"contentBlockIndex":0,"delta":{"text":"Hi "}}"#,
        ));
        wire.extend_from_slice(&event_frame(
            "contentBlockDelta",
            r#"{"contentBlockIndex":0,"delta":{"text":"there"}}"#,
        ));
        wire.extend_from_slice(&event_frame("contentBlockStop", r#"{"contentBlockIndex":0}"#));
        wire.extend_from_slice(&event_frame("messageStop", r#"{"stopReason":"end_turn"}"#));
        wire.extend_from_slice(&event_frame(
            "metadata",
            r#"{"usage":{"inputTokens":1234,"outputTokens":56,"totalTokens":1290},"metrics":{"latencyMs":812}}"#,
        ));
        let wire = wire.freeze();
        // Split at awkward offsets so frames straddle chunks.
        let chunks = vec![wire.slice(..7), wire.slice(7..100), wire.slice(100..)];

        let mut session = ChatSession::new(WireProvider { chunks }, ChatConfig::new());
        let mut renderer = RecordingRenderer::new();
        session
            .submit(Some("Hello".to_string()), None, &mut renderer)
            .await
            .unwrap();

        assert_eq!(session.turns()[1].text(), Some("Hi there"));
        assert_eq!(
            renderer.telemetry,
            vec!["Input: 1,234 | Output: 56 | Latency: 812ms"]
        );
    }

    #[tokio::test]
    async fn exception_frame_is_a_provider_error() {
        let mut wire = BytesMut::new();
        wire.extend_from_slice(&event_frame(
            "contentBlockDelta",
            r#"{"contentBlockIndex":0,"delta":{"text":"Hel"}}"#,
        ));
        wire.extend_from_slice(&frame(
            &[
                (":message-type", "exception"),
                (":exception-type", "throttlingException"),
                (":content-type", "application/json"),
            ],
            r#"{"message":"Too many requests, please wait before trying again."}"#,
        ));
        let chunks = vec![wire.freeze()];

        let mut session = ChatSession::new(WireProvider { chunks }, ChatConfig::new());
        let mut renderer = RecordingRenderer::new();
        let err = session
            .submit(Some("Hello".to_string()), None, &mut renderer)
            .await
            .unwrap_err();

        assert!(err.is_provider());
        assert_eq!(err.error_code(), Some("throttlingException"));
        assert_eq!(session.message_count(), 1);
        assert_eq!(renderer.partials, vec!["Hel▌"]);
    }

    struct FixedImage;

    #[async_trait]
    impl InvokeModel for FixedImage {
        async fn invoke_model(&self, _model_id: &str, body: Value) -> Result<Value> {
            assert_eq!(body["mode"], "text-to-image");
            Ok(json!({"images": ["iVBORw=="], "finish_reasons": [null], "seeds": [42]}))
        }
    }

    #[tokio::test]
    async fn image_generation_artifacts_are_recorded_and_reset() {
        let provider = ScriptedProvider::new(vec![]);
        let mut session = ChatSession::new(provider, ChatConfig::new());
        let mut renderer = RecordingRenderer::new();
        let capability = ImageGeneration::new(FixedImage);

        let produced = session
            .invoke_capability(
                "a lighthouse",
                &capability,
                json!({"prompt": "a lighthouse", "seed": 42}),
                &mut renderer,
            )
            .await
            .unwrap()
            .to_vec();

        assert_eq!(produced.len(), 1);
        assert_eq!(produced[0].file_name(), "image-42.png");
        assert_eq!(session.artifacts().len(), 1);
        assert_eq!(session.message_count(), 2);
        assert_eq!(
            session.turns()[1].text(),
            Some("Image generated successfully! (seed: 42)")
        );
        assert_eq!(
            renderer.finished,
            vec!["Image generated successfully! (seed: 42)"]
        );

        session.reset();
        assert_eq!(session.message_count(), 0);
        assert!(session.artifacts().is_empty());
    }

    struct BrokenCapability;

    #[async_trait]
    impl Capability for BrokenCapability {
        fn name(&self) -> &str {
            "broken"
        }

        async fn invoke(&self, _args: Value) -> Result<CapabilityOutput> {
            Err(Error::provider(
                "ValidationException",
                "prompt rejected",
                Some(400),
                None,
            ))
        }
    }

    #[tokio::test]
    async fn failed_capability_leaves_user_turn() {
        let provider = ScriptedProvider::new(vec![]);
        let mut session = ChatSession::new(provider, ChatConfig::new().with_record_errors(true));
        let mut renderer = RecordingRenderer::new();

        let err = session
            .invoke_capability("anything", &BrokenCapability, json!({}), &mut renderer)
            .await
            .unwrap_err();

        assert!(err.is_provider());
        assert_eq!(session.message_count(), 1);
        assert!(session.artifacts().is_empty());
        assert_eq!(
            renderer.errors,
            vec!["Provider error (ValidationException): prompt rejected"]
        );
    }

    #[tokio::test]
    async fn test_streaming_response() {
        // This test requires AWS_BEARER_TOKEN_BEDROCK to be set
        if std::env::var("AWS_BEARER_TOKEN_BEDROCK").is_err() {
            eprintln!("Skipping test: AWS_BEARER_TOKEN_BEDROCK not set");
            return;
        }

        let client = converse::BedrockRuntime::new("us-east-1", None).expect("Failed to create client");
        let mut session = ChatSession::new(client, ChatConfig::new().with_max_tokens(16));
        let mut renderer = RecordingRenderer::new();
        let result = session
            .submit(Some("Say 'test passed'".to_string()), None, &mut renderer)
            .await;
        assert!(result.is_ok(), "Stream request should succeed");
        assert_eq!(session.message_count(), 2);
    }
}
