//! Configuration types for the chat application.
//!
//! Settings come from three layers, later ones winning: built-in defaults, an
//! optional YAML file named with `--config`, and command-line arguments parsed
//! via `arrrg`.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use arrrg_derive::CommandLine;
use serde::Deserialize;

use crate::client::{DEFAULT_REGION, DEFAULT_TIMEOUT};
use crate::error::{Error, Result};
use crate::request_builder::{CacheFlags, ModelParams};
use crate::types::Model;

/// Default system prompt.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

/// Default maximum tokens per response.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Largest accepted maximum tokens per response.
pub const MAX_TOKENS_LIMIT: u32 = DEFAULT_MAX_TOKENS * 3;

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.1;

/// Command-line arguments for the converse-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Model to use for chat.
    #[arrrg(optional, "Model alias or id (default: claude-sonnet-4-5)", "MODEL")]
    pub model: Option<String>,

    /// System prompt to set context for the conversation.
    #[arrrg(optional, "System prompt for the conversation", "PROMPT")]
    pub system: Option<String>,

    /// Maximum tokens per response.
    #[arrrg(optional, "Max tokens per response (default: 4096)", "TOKENS")]
    pub max_tokens: Option<u32>,

    /// Sampling temperature, parsed when the configuration is resolved.
    #[arrrg(optional, "Sampling temperature 0.0-1.0 (default: 0.1)", "TEMP")]
    pub temperature: Option<String>,

    /// Region whose runtime endpoint is used.
    #[arrrg(optional, "Region of the runtime endpoint (default: us-east-1)", "REGION")]
    pub region: Option<String>,

    /// YAML file with default settings.
    #[arrrg(optional, "YAML configuration file", "PATH")]
    pub config: Option<String>,

    /// Place a cache point after the system prompt.
    #[arrrg(flag, "Cache the system prompt")]
    pub cache_system: bool,

    /// Place a cache point after uploaded documents.
    #[arrrg(flag, "Cache uploaded documents")]
    pub cache_documents: bool,

    /// Record generic failures in the conversation.
    #[arrrg(flag, "Record non-provider errors as assistant turns")]
    pub record_errors: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Settings read from a YAML configuration file.
///
/// Every field is optional; absent fields keep their defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub model: Option<String>,
    pub system: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub region: Option<String>,
    pub timeout_secs: Option<u64>,
    pub cache_system: Option<bool>,
    pub cache_documents: Option<bool>,
    pub record_errors: Option<bool>,
    pub color: Option<bool>,
}

impl ConfigFile {
    /// Load a configuration file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| {
            Error::io(format!("failed to open config file {}", path.display()), err)
        })?;
        Self::from_reader(BufReader::new(file))
    }

    /// Parse configuration from YAML.
    pub fn from_reader(reader: impl std::io::Read) -> Result<Self> {
        serde_yaml::from_reader(reader).map_err(|err| {
            Error::serialization("failed to parse config file", Some(Box::new(err)))
        })
    }
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// the config file and command-line arguments with appropriate defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// The model to use for generating responses.
    pub model: Model,

    /// System prompt; empty means no system block is sent.
    pub system_prompt: String,

    /// Maximum tokens per response.
    pub max_tokens: u32,

    /// Sampling temperature.
    pub temperature: f32,

    /// Whether a cache point follows the system prompt.
    /// Read each time a request is built.
    pub cache_system: bool,

    /// Whether newly uploaded documents are cached.
    /// Captured on each document attachment when its turn is submitted.
    pub cache_documents: bool,

    /// Region of the runtime endpoint.
    pub region: String,

    /// Request timeout.
    pub timeout: Duration,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Whether generic errors are recorded as assistant turns.
    pub record_errors: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Model: Claude Sonnet 4.5
    /// - System prompt: "You are a helpful AI assistant."
    /// - Max tokens: 4096, temperature: 0.1
    /// - Caching: off
    /// - Region: us-east-1, timeout: 900 seconds
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            model: Model::default(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            cache_system: false,
            cache_documents: false,
            region: DEFAULT_REGION.to_string(),
            timeout: DEFAULT_TIMEOUT,
            use_color: true,
            record_errors: false,
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    /// Sets the system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Sets the maximum tokens per response.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets whether the system prompt is cached.
    pub fn with_cache_system(mut self, enabled: bool) -> Self {
        self.cache_system = enabled;
        self
    }

    /// Sets whether uploaded documents are cached.
    pub fn with_cache_documents(mut self, enabled: bool) -> Self {
        self.cache_documents = enabled;
        self
    }

    /// Sets the region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Sets whether generic errors are recorded in the conversation.
    pub fn with_record_errors(mut self, enabled: bool) -> Self {
        self.record_errors = enabled;
        self
    }

    /// Overlay the settings present in `file`.
    pub fn merge_file(mut self, file: ConfigFile) -> Self {
        if let Some(model) = file.model {
            self.model = parse_model(&model);
        }
        if let Some(system) = file.system {
            self.system_prompt = system;
        }
        if let Some(max_tokens) = file.max_tokens {
            self.max_tokens = max_tokens;
        }
        if let Some(temperature) = file.temperature {
            self.temperature = temperature;
        }
        if let Some(region) = file.region {
            self.region = region;
        }
        if let Some(secs) = file.timeout_secs {
            self.timeout = Duration::from_secs(secs);
        }
        if let Some(cache_system) = file.cache_system {
            self.cache_system = cache_system;
        }
        if let Some(cache_documents) = file.cache_documents {
            self.cache_documents = cache_documents;
        }
        if let Some(record_errors) = file.record_errors {
            self.record_errors = record_errors;
        }
        if let Some(color) = file.color {
            self.use_color = color;
        }
        self
    }

    /// Check the numeric settings against the accepted ranges.
    pub fn validate(&self) -> Result<()> {
        validate_max_tokens(self.max_tokens)?;
        validate_temperature(self.temperature)?;
        Ok(())
    }

    /// The cache toggles read when a request is built.
    pub fn cache_flags(&self) -> CacheFlags {
        CacheFlags {
            system: self.cache_system,
        }
    }

    /// The model parameters read when a request is built.
    pub fn model_params(&self) -> ModelParams {
        ModelParams {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<ChatArgs> for ChatConfig {
    type Error = Error;

    fn try_from(args: ChatArgs) -> Result<Self> {
        let mut config = ChatConfig::new();
        if let Some(path) = &args.config {
            config = config.merge_file(ConfigFile::load(path)?);
        }
        if let Some(model) = args.model {
            config.model = parse_model(&model);
        }
        if let Some(system) = args.system {
            config.system_prompt = system;
        }
        if let Some(max_tokens) = args.max_tokens {
            config.max_tokens = max_tokens;
        }
        if let Some(temperature) = args.temperature {
            config.temperature = temperature.trim().parse().map_err(|_| {
                Error::validation(
                    format!("temperature must be a number, got {temperature:?}"),
                    Some("temperature".to_string()),
                )
            })?;
        }
        if let Some(region) = args.region {
            config.region = region;
        }
        config.cache_system |= args.cache_system;
        config.cache_documents |= args.cache_documents;
        config.record_errors |= args.record_errors;
        if args.no_color {
            config.use_color = false;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Parse a model alias or id, keeping unknown names as custom models.
pub fn parse_model(name: &str) -> Model {
    name.parse()
        .unwrap_or_else(|_| Model::Custom(name.trim().to_string()))
}

/// Reject max tokens outside `1..=MAX_TOKENS_LIMIT`.
pub fn validate_max_tokens(max_tokens: u32) -> Result<()> {
    if (1..=MAX_TOKENS_LIMIT).contains(&max_tokens) {
        Ok(())
    } else {
        Err(Error::validation(
            format!("max_tokens must be between 1 and {MAX_TOKENS_LIMIT}, got {max_tokens}"),
            Some("max_tokens".to_string()),
        ))
    }
}

/// Reject temperatures outside `0.0..=1.0`.
pub fn validate_temperature(temperature: f32) -> Result<()> {
    if temperature.is_finite() && (0.0..=1.0).contains(&temperature) {
        Ok(())
    } else {
        Err(Error::validation(
            format!("temperature must be between 0.0 and 1.0, got {temperature}"),
            Some("temperature".to_string()),
        ))
    }
}
