// Public modules
pub mod accumulating_stream;
pub mod capability;
pub mod chat;
pub mod client;
pub mod client_logger;
pub mod error;
pub mod event_stream;
pub mod normalize;
pub mod observability;
pub mod render;
pub mod request_builder;
pub mod store;
pub mod stream_consumer;
pub mod telemetry;
pub mod types;
pub mod utils;

// Re-exports
pub use accumulating_stream::{AccumulatingStream, StreamState};
pub use capability::{Artifact, Capability, CapabilityOutput, ImageGeneration};
pub use client::{BedrockRuntime, ConverseProvider, EventStream, InvokeModel};
pub use client_logger::{ClientLogger, TracingLogger};
pub use error::{Error, Result};
pub use normalize::{normalize, sanitize_name};
pub use observability::register_biometrics;
pub use render::{PlainTextRenderer, RecordingRenderer, Renderer};
pub use request_builder::{CacheFlags, ModelParams};
pub use store::ConversationStore;
pub use types::*;
