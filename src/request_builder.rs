//! Projecting a conversation into a Converse Stream request.
//!
//! The builder is pure: it reads the turns and the current configuration and
//! produces a request.  Cache points are placed after the system prompt when
//! system caching is on, and after every document whose attachment was cached
//! when its turn was submitted.  Nothing is capped or validated here; a
//! request the provider rejects fails on the stream.

use crate::types::{
    Attachment, AttachmentFormat, BlobSource, ContentBlock, ConverseStreamRequest, DocumentBlock,
    ImageBlock, InferenceConfig, Message, Model, SystemContentBlock, Turn,
};

/// Cache toggles read at request time.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct CacheFlags {
    /// Place a cache point after the system prompt.
    pub system: bool,
}

/// Model and sampling parameters read at request time.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParams {
    /// The model the request is routed to.
    pub model: Model,
    /// The maximum number of tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

/// Build a request from the turns and the current configuration.
pub fn build(
    turns: &[Turn],
    system_prompt: &str,
    cache: CacheFlags,
    params: &ModelParams,
) -> ConverseStreamRequest {
    let system = system_blocks(system_prompt, cache);
    let messages: Vec<Message> = turns.iter().map(turn_to_message).collect();

    let inference_config =
        InferenceConfig::new(params.max_tokens).with_temperature(params.temperature);
    let request = ConverseStreamRequest::new(params.model.model_id(), messages, inference_config);
    match system {
        Some(system) => request.with_system(system),
        None => request,
    }
}

fn system_blocks(system_prompt: &str, cache: CacheFlags) -> Option<Vec<SystemContentBlock>> {
    if system_prompt.trim().is_empty() {
        return None;
    }
    let mut blocks = vec![SystemContentBlock::Text(system_prompt.to_string())];
    if cache.system {
        blocks.push(SystemContentBlock::CachePoint(Default::default()));
    }
    Some(blocks)
}

/// Project one turn into a message: attachment blocks first, text last.
pub fn turn_to_message(turn: &Turn) -> Message {
    let mut content = Vec::with_capacity(3);
    if let Some(attachment) = turn.attachment() {
        push_attachment(&mut content, attachment);
    }
    if let Some(text) = turn.text() {
        content.push(ContentBlock::text(text));
    }
    Message::new(turn.role(), content)
}

fn push_attachment(content: &mut Vec<ContentBlock>, attachment: &Attachment) {
    // Bytes clones share the upload's buffer.
    let source = BlobSource::new(attachment.bytes().clone());
    match attachment.format() {
        AttachmentFormat::Image(format) => {
            content.push(ContentBlock::Image(ImageBlock::new(format, source)));
        }
        AttachmentFormat::Document(format) => {
            content.push(ContentBlock::Document(DocumentBlock::new(
                format,
                attachment.name(),
                source,
            )));
            if attachment.cached() {
                content.push(ContentBlock::cache_point());
            }
        }
    }
}

/// Count the cache points in a request, system section included.
pub fn count_cache_points(request: &ConverseStreamRequest) -> usize {
    let system = request
        .system
        .as_ref()
        .map(|blocks| blocks.iter().filter(|b| b.is_cache_point()).count())
        .unwrap_or(0);
    let messages: usize = request
        .messages
        .iter()
        .map(|m| m.content.iter().filter(|b| b.is_cache_point()).count())
        .sum();
    system + messages
}
