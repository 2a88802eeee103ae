// Public modules
pub mod attachment;
pub mod blob_source;
pub mod cache_point;
pub mod content_block;
pub mod converse_stream_request;
pub mod document_block;
pub mod image_block;
pub mod inference_config;
pub mod message;
pub mod model;
pub mod stop_reason;
pub mod stream_event;
pub mod turn;
pub mod usage;

// Re-exports
pub use attachment::{Attachment, AttachmentFormat, AttachmentKind, DocumentFormat, ImageFormat};
pub use blob_source::BlobSource;
pub use cache_point::CachePointBlock;
pub use content_block::{ContentBlock, SystemContentBlock};
pub use converse_stream_request::ConverseStreamRequest;
pub use document_block::DocumentBlock;
pub use image_block::ImageBlock;
pub use inference_config::InferenceConfig;
pub use message::Message;
pub use model::{KnownModel, Model};
pub use stop_reason::{StopReason, StopReasonParseError};
pub use stream_event::{
    ContentBlockDelta, ContentBlockDeltaEvent, ContentBlockStartEvent, ContentBlockStopEvent,
    ConverseStreamEvent, MessageStartEvent, MessageStopEvent, MetadataEvent,
};
pub use turn::{ConversationRole, ResponseMetadata, Turn};
pub use usage::{StreamMetrics, TokenUsage};
