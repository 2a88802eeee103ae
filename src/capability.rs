//! Capabilities the session can invoke on the user's behalf.
//!
//! A capability is awaited to completion and hands back everything it made in
//! its result, so the caller decides where generated artifacts are kept.

use std::time::Instant;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use rand::Rng;
use serde_json::{Value, json};

use crate::client::InvokeModel;
use crate::error::{Error, Result};
use crate::observability::{CAPABILITY_CALLS, CAPABILITY_DURATION, CAPABILITY_ERRORS};
use crate::types::ImageFormat;

/// Image generation model used by [`ImageGeneration`].
pub const IMAGE_MODEL_ID: &str = "stability.sd3-5-large-v1:0";

/// Longest prompt the image model accepts, in characters.
pub const MAX_IMAGE_PROMPT_CHARS: usize = 10_000;

/// Aspect ratio used when the caller does not ask for one.
pub const DEFAULT_ASPECT_RATIO: &str = "1:1";

/// Something a capability produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// The image format.
    pub format: ImageFormat,
    /// The encoded image.
    pub bytes: Bytes,
    /// The seed the image was generated with.
    pub seed: u32,
}

impl Artifact {
    /// A file name for saving this artifact.
    pub fn file_name(&self) -> String {
        format!("image-{}.{}", self.seed, self.format.as_str())
    }
}

/// The result of a capability invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilityOutput {
    /// Text to show the user and record as the assistant's reply.
    pub text: String,
    /// Everything the invocation produced.
    pub artifacts: Vec<Artifact>,
}

/// A capability invoked as `invoke(args) -> result`.
#[async_trait]
pub trait Capability: Send + Sync {
    /// A short name for logs and help text.
    fn name(&self) -> &str;

    /// Run the capability to completion.
    async fn invoke(&self, args: Value) -> Result<CapabilityOutput>;
}

/// Text-to-image generation through a model invocation.
pub struct ImageGeneration<I: InvokeModel> {
    invoker: I,
    model_id: String,
}

impl<I: InvokeModel> ImageGeneration<I> {
    /// Create a new image generation capability using the default model.
    pub fn new(invoker: I) -> Self {
        Self {
            invoker,
            model_id: IMAGE_MODEL_ID.to_string(),
        }
    }

    /// Use a different image model.
    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    async fn generate(&self, args: &Value) -> Result<CapabilityOutput> {
        let prompt = args
            .get("prompt")
            .and_then(Value::as_str)
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| {
                Error::validation("image generation needs a prompt", Some("prompt".to_string()))
            })?;
        let prompt: String = prompt.chars().take(MAX_IMAGE_PROMPT_CHARS).collect();
        let aspect_ratio = args
            .get("aspect_ratio")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_ASPECT_RATIO);
        let seed = match args.get("seed").and_then(Value::as_u64) {
            Some(seed) => u32::try_from(seed).map_err(|_| {
                Error::validation("seed must fit in 32 bits", Some("seed".to_string()))
            })?,
            None => rand::thread_rng().r#gen::<u32>(),
        };

        let body = json!({
            "prompt": prompt,
            "mode": "text-to-image",
            "aspect_ratio": aspect_ratio,
            "output_format": "png",
            "seed": seed,
        });
        tracing::debug!(model_id = %self.model_id, seed, "generating image");
        let response = self.invoker.invoke_model(&self.model_id, body).await?;

        let finish_reason = response
            .get("finish_reasons")
            .and_then(Value::as_array)
            .and_then(|reasons| reasons.first())
            .filter(|reason| !reason.is_null());
        if let Some(reason) = finish_reason {
            let reason = reason.as_str().map(str::to_string).unwrap_or_else(|| reason.to_string());
            return Ok(CapabilityOutput {
                text: format!("Image generation error: {reason}"),
                artifacts: Vec::new(),
            });
        }

        let image = response
            .get("images")
            .and_then(Value::as_array)
            .and_then(|images| images.first())
            .and_then(Value::as_str)
            .ok_or_else(|| Error::unknown("image generation response carried no image"))?;
        let bytes = STANDARD.decode(image).map_err(|e| {
            Error::encoding(format!("invalid base64 image: {e}"), Some(Box::new(e)))
        })?;

        Ok(CapabilityOutput {
            text: format!("Image generated successfully! (seed: {seed})"),
            artifacts: vec![Artifact {
                format: ImageFormat::Png,
                bytes: Bytes::from(bytes),
                seed,
            }],
        })
    }
}

#[async_trait]
impl<I: InvokeModel> Capability for ImageGeneration<I> {
    fn name(&self) -> &str {
        "generate_image"
    }

    async fn invoke(&self, args: Value) -> Result<CapabilityOutput> {
        CAPABILITY_CALLS.click();
        let start = Instant::now();
        let result = self.generate(&args).await;
        CAPABILITY_DURATION.add(start.elapsed().as_secs_f64());
        if let Err(err) = &result {
            CAPABILITY_ERRORS.click();
            tracing::warn!(capability = self.name(), error = %err, "capability failed");
        }
        result
    }
}
