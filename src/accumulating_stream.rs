//! Accumulates streaming events into a response while passing events through.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;

use crate::types::{
    ConverseStreamEvent, ResponseMetadata, StopReason, StreamMetrics, TokenUsage,
};
use crate::Error;

/// Everything learned from one streamed response.
///
/// The text only ever grows; usage and metrics are overwritten field by field
/// as metadata events arrive, so the last report wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamState {
    /// The response text so far.
    pub text: String,
    /// The most recently reported token usage.
    pub usage: Option<TokenUsage>,
    /// The most recently reported latency.
    pub metrics: Option<StreamMetrics>,
    /// Why generation stopped, once known.
    pub stop_reason: Option<StopReason>,
}

impl StreamState {
    /// Fold one event into the state.
    pub fn apply(&mut self, event: &ConverseStreamEvent) {
        match event {
            ConverseStreamEvent::ContentBlockDelta(delta) => {
                if let Some(text) = &delta.delta.text {
                    self.text.push_str(text);
                }
            }
            ConverseStreamEvent::MessageStop(stop) => {
                self.stop_reason = Some(stop.stop_reason.clone());
            }
            ConverseStreamEvent::Metadata(metadata) => {
                if let Some(usage) = metadata.usage {
                    self.usage = Some(usage);
                }
                if let Some(metrics) = metadata.metrics {
                    self.metrics = Some(metrics);
                }
            }
            ConverseStreamEvent::MessageStart(_)
            | ConverseStreamEvent::ContentBlockStart(_)
            | ConverseStreamEvent::ContentBlockStop(_) => {}
        }
    }

    /// The metadata to attach to the assistant turn.
    pub fn metadata(&self) -> ResponseMetadata {
        ResponseMetadata {
            usage: self.usage,
            metrics: self.metrics,
            stop_reason: self.stop_reason.clone(),
        }
    }
}

/// A stream wrapper that accumulates `ConverseStreamEvent`s into a [`StreamState`].
///
/// This allows streaming tokens to the user while simultaneously building the
/// final response.  When the stream is fully drained the state is sent via the
/// oneshot channel returned by `new()`.  If the inner stream yields an error,
/// the error is passed through, also sent on the channel, and the stream ends.
pub struct AccumulatingStream {
    inner: Pin<Box<dyn Stream<Item = Result<ConverseStreamEvent, Error>> + Send>>,
    state_tx: Option<tokio::sync::oneshot::Sender<Result<StreamState, Error>>>,
    state: StreamState,
    done: bool,
}

impl AccumulatingStream {
    /// Wraps a `ConverseStreamEvent` stream to accumulate events into a `StreamState`.
    ///
    /// Returns the stream and a receiver that will contain the accumulated
    /// state once the stream is fully drained.
    pub fn new<S>(stream: S) -> (Self, tokio::sync::oneshot::Receiver<Result<StreamState, Error>>)
    where
        S: Stream<Item = Result<ConverseStreamEvent, Error>> + Send + 'static,
    {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let this = Self {
            inner: Box::pin(stream),
            state_tx: Some(tx),
            state: StreamState::default(),
            done: false,
        };
        (this, rx)
    }

    /// The text accumulated so far.
    pub fn buffer(&self) -> &str {
        &self.state.text
    }

    /// The state accumulated so far.
    pub fn state(&self) -> &StreamState {
        &self.state
    }
}

impl Stream for AccumulatingStream {
    type Item = Result<ConverseStreamEvent, Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }
        match self.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(event))) => {
                self.state.apply(&event);
                Poll::Ready(Some(Ok(event)))
            }
            Poll::Ready(Some(Err(e))) => {
                self.done = true;
                if let Some(tx) = self.state_tx.take() {
                    let _ = tx.send(Err(e.clone()));
                }
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                self.done = true;
                if let Some(tx) = self.state_tx.take() {
                    let state = std::mem::take(&mut self.state);
                    let _ = tx.send(Ok(state));
                }
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{stream, StreamExt};

    #[tokio::test]
    async fn accumulates_text_and_metadata() {
        let events = vec![
            Ok(ConverseStreamEvent::text_delta(0, "Hel")),
            Ok(ConverseStreamEvent::text_delta(0, "lo")),
            Ok(ConverseStreamEvent::metadata(Some(TokenUsage::new(5, 2)), None)),
            Ok(ConverseStreamEvent::message_stop(StopReason::EndTurn)),
        ];
        let (mut acc, rx) = AccumulatingStream::new(stream::iter(events));

        let mut seen = Vec::new();
        while let Some(event) = acc.next().await {
            event.unwrap();
            seen.push(acc.buffer().to_string());
        }
        assert_eq!(seen, vec!["Hel", "Hello", "Hello", "Hello"]);

        let state = rx.await.unwrap().unwrap();
        assert_eq!(state.text, "Hello");
        assert_eq!(state.usage, Some(TokenUsage::new(5, 2)));
        assert_eq!(state.stop_reason, Some(StopReason::EndTurn));
    }

    #[tokio::test]
    async fn last_metadata_wins_per_field() {
        let events = vec![
            Ok(ConverseStreamEvent::metadata(
                Some(TokenUsage::new(1, 1)),
                Some(StreamMetrics::new(10)),
            )),
            Ok(ConverseStreamEvent::metadata(Some(TokenUsage::new(7, 3)), None)),
        ];
        let (mut acc, rx) = AccumulatingStream::new(stream::iter(events));
        while acc.next().await.is_some() {}

        let state = rx.await.unwrap().unwrap();
        assert_eq!(state.usage, Some(TokenUsage::new(7, 3)));
        assert_eq!(state.metrics, Some(StreamMetrics::new(10)));
    }

    #[tokio::test]
    async fn error_ends_the_stream() {
        let events = vec![
            Ok(ConverseStreamEvent::text_delta(0, "partial")),
            Err(Error::provider("internalServerException", "boom", None, None)),
            Ok(ConverseStreamEvent::text_delta(0, "never")),
        ];
        let (mut acc, rx) = AccumulatingStream::new(stream::iter(events));

        assert!(acc.next().await.unwrap().is_ok());
        assert!(acc.next().await.unwrap().is_err());
        assert!(acc.next().await.is_none());

        let err = rx.await.unwrap().unwrap_err();
        assert_eq!(err.error_code(), Some("internalServerException"));
    }
}
