use std::fmt;
use std::str::FromStr;

/// Identifies the model a request is routed to.
///
/// This can be one of the known inference profiles or a custom identifier
/// for models (or provisioned throughput ARNs) that are not listed here.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Model {
    /// Known model versions
    Known(KnownModel),

    /// Custom model identifier
    Custom(String),
}

/// Known model inference profiles.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum KnownModel {
    /// Claude Sonnet 4.5 (global inference profile)
    ClaudeSonnet45,

    /// Claude Haiku 4.5 (global inference profile)
    ClaudeHaiku45,

    /// Claude Sonnet 4 (US inference profile)
    ClaudeSonnet4,
}

impl KnownModel {
    /// All known models, in the order they are offered to the user.
    pub const ALL: [KnownModel; 3] = [
        KnownModel::ClaudeSonnet45,
        KnownModel::ClaudeHaiku45,
        KnownModel::ClaudeSonnet4,
    ];

    /// The provider's model identifier.
    pub fn model_id(&self) -> &'static str {
        match self {
            KnownModel::ClaudeSonnet45 => "global.anthropic.claude-sonnet-4-5-20250929-v1:0",
            KnownModel::ClaudeHaiku45 => "global.anthropic.claude-haiku-4-5-20251001-v1:0",
            KnownModel::ClaudeSonnet4 => "us.anthropic.claude-sonnet-4-20250514-v1:0",
        }
    }

    /// A short alias accepted on the command line.
    pub fn alias(&self) -> &'static str {
        match self {
            KnownModel::ClaudeSonnet45 => "claude-sonnet-4-5",
            KnownModel::ClaudeHaiku45 => "claude-haiku-4-5",
            KnownModel::ClaudeSonnet4 => "claude-sonnet-4",
        }
    }

    /// A human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            KnownModel::ClaudeSonnet45 => "Claude Sonnet 4.5",
            KnownModel::ClaudeHaiku45 => "Claude Haiku 4.5",
            KnownModel::ClaudeSonnet4 => "Claude Sonnet 4",
        }
    }
}

impl Model {
    /// The provider's model identifier used in request paths.
    pub fn model_id(&self) -> &str {
        match self {
            Model::Known(known) => known.model_id(),
            Model::Custom(custom) => custom,
        }
    }
}

impl Default for Model {
    fn default() -> Self {
        Model::Known(KnownModel::ClaudeSonnet45)
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.model_id())
    }
}

impl fmt::Display for KnownModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.model_id())
    }
}

impl FromStr for Model {
    type Err = std::convert::Infallible;

    /// Parses an alias or model id; anything unrecognized becomes `Custom`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        for known in KnownModel::ALL {
            if s.eq_ignore_ascii_case(known.alias()) || s == known.model_id() {
                return Ok(Model::Known(known));
            }
        }
        Ok(Model::Custom(s.to_string()))
    }
}

impl From<KnownModel> for Model {
    fn from(model: KnownModel) -> Self {
        Model::Known(model)
    }
}

impl From<String> for Model {
    fn from(model: String) -> Self {
        Model::Custom(model)
    }
}

impl From<&str> for Model {
    fn from(model: &str) -> Self {
        Model::Custom(model.to_string())
    }
}
