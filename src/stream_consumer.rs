//! Driving a Converse Stream response to completion.
//!
//! [`open`] issues the request and hands back a lazy, non-restartable stream
//! of events together with a receiver for the final [`StreamState`].
//! [`run`] drains that stream into a renderer and returns the final state.

use std::time::Instant;

use futures::{Stream, StreamExt};
use tokio::sync::oneshot;

use crate::accumulating_stream::{AccumulatingStream, StreamState};
use crate::client::ConverseProvider;
use crate::error::{Error, Result};
use crate::observability::{STREAM_DURATION, STREAM_ERRORS, STREAM_EVENTS};
use crate::render::Renderer;
use crate::types::{ConverseStreamEvent, ConverseStreamRequest};

/// Issue one request and return the accumulating event stream.
///
/// Nothing is consumed until the stream is polled.  The receiver resolves
/// once the stream is drained or fails.
pub async fn open<P>(
    provider: &P,
    request: &ConverseStreamRequest,
) -> Result<(AccumulatingStream, oneshot::Receiver<Result<StreamState>>)>
where
    P: ConverseProvider + ?Sized,
{
    let events = provider
        .converse_stream(request)
        .await
        .inspect_err(|_| STREAM_ERRORS.click())?;
    Ok(AccumulatingStream::new(events))
}

/// Issue one request and drain its response into `renderer`.
///
/// Returns the final state on success.  A fault reported by the provider,
/// before or during the stream, comes back as a provider error; anything
/// else comes back as the matching generic error.  Either way nothing is
/// retried.
pub async fn run<P>(
    provider: &P,
    request: &ConverseStreamRequest,
    renderer: &mut dyn Renderer,
) -> Result<StreamState>
where
    P: ConverseProvider + ?Sized,
{
    let start = Instant::now();
    let (stream, rx) = open(provider, request).await?;
    let result = drain(stream, rx, renderer).await;
    STREAM_DURATION.add(start.elapsed().as_secs_f64());
    result
}

/// Drain an already-open event stream into `renderer`.
pub async fn consume<S>(events: S, renderer: &mut dyn Renderer) -> Result<StreamState>
where
    S: Stream<Item = Result<ConverseStreamEvent>> + Send + 'static,
{
    let (stream, rx) = AccumulatingStream::new(events);
    drain(stream, rx, renderer).await
}

async fn drain(
    mut stream: AccumulatingStream,
    rx: oneshot::Receiver<Result<StreamState>>,
    renderer: &mut dyn Renderer,
) -> Result<StreamState> {
    renderer.start_response();
    while let Some(event) = stream.next().await {
        STREAM_EVENTS.click();
        let event = match event {
            Ok(event) => event,
            Err(err) => {
                STREAM_ERRORS.click();
                tracing::warn!(error = %err, provider = err.is_provider(), "stream aborted");
                return Err(err);
            }
        };
        match &event {
            ConverseStreamEvent::ContentBlockDelta(delta) => {
                if let Some(text) = &delta.delta.text {
                    renderer.print_text(stream.buffer(), text);
                }
            }
            ConverseStreamEvent::MessageStop(stop) if !stop.stop_reason.is_end_turn() => {
                renderer.print_info(&format!("Stop reason: {}", stop.stop_reason));
            }
            _ => {}
        }
    }
    let state = rx
        .await
        .map_err(|_| Error::streaming("stream ended without a final state", None))??;
    renderer.finish_response(&state.text);
    tracing::debug!(
        chars = state.text.len(),
        stop_reason = ?state.stop_reason,
        "stream complete"
    );
    Ok(state)
}
