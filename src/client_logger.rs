//! Logging trait for provider client operations.
//!
//! This module provides the [`ClientLogger`] trait that allows users to capture
//! and log all interactions passing through the [`BedrockRuntime`] client.
//!
//! [`BedrockRuntime`]: crate::BedrockRuntime

use crate::accumulating_stream::StreamState;
use crate::types::{ConverseStreamEvent, ConverseStreamRequest};

/// A trait for logging provider client operations.
///
/// Implement this trait to capture and record every request, the individual
/// streaming events, and the state accumulated from each completed stream.
///
/// # Example
///
/// ```rust,ignore
/// use converse::{ClientLogger, ConverseStreamEvent, ConverseStreamRequest, StreamState};
/// use std::sync::Mutex;
///
/// struct FileLogger {
///     file: Mutex<std::fs::File>,
/// }
///
/// impl ClientLogger for FileLogger {
///     fn log_request(&self, request: &ConverseStreamRequest) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "Request: {}", serde_json::to_string(request).unwrap()).unwrap();
///     }
///
///     fn log_stream_event(&self, event: &ConverseStreamEvent) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "Stream event: {}", serde_json::to_string(event).unwrap()).unwrap();
///     }
///
///     fn log_stream_state(&self, state: &StreamState) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "Stream complete: {} chars", state.text.len()).unwrap();
///     }
/// }
/// ```
pub trait ClientLogger: Send + Sync {
    /// Log a request just before it is sent.
    fn log_request(&self, request: &ConverseStreamRequest);

    /// Log an individual streaming event.
    ///
    /// This method is called for each [`ConverseStreamEvent`] received during
    /// a streaming request.
    fn log_stream_event(&self, event: &ConverseStreamEvent);

    /// Log the state accumulated from a completed stream.
    ///
    /// This method is called once when a stream completes successfully.
    fn log_stream_state(&self, state: &StreamState);
}

/// A [`ClientLogger`] that emits `tracing` events at debug level.
///
/// Attachment bytes are never logged; requests are summarized.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl ClientLogger for TracingLogger {
    fn log_request(&self, request: &ConverseStreamRequest) {
        tracing::debug!(
            model_id = %request.model_id,
            messages = request.messages.len(),
            has_system = request.system.is_some(),
            max_tokens = request.inference_config.max_tokens,
            "converse-stream request"
        );
    }

    fn log_stream_event(&self, event: &ConverseStreamEvent) {
        tracing::trace!(event_type = event.event_type(), "stream event");
    }

    fn log_stream_state(&self, state: &StreamState) {
        tracing::debug!(
            chars = state.text.len(),
            stop_reason = ?state.stop_reason,
            usage = ?state.usage,
            "stream complete"
        );
    }
}
