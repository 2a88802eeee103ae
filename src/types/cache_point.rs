use serde::{Deserialize, Serialize};

/// A cache boundary marker.
///
/// Everything in the request before a cache point may be served from the
/// provider's prompt cache on later requests with the same prefix.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CachePointBlock {
    /// The type is always "default" for now.
    #[serde(default = "default_type")]
    pub r#type: String,
}

fn default_type() -> String {
    "default".to_string()
}

impl CachePointBlock {
    /// Creates a new default cache point.
    pub fn new() -> Self {
        Self {
            r#type: default_type(),
        }
    }
}

impl Default for CachePointBlock {
    fn default() -> Self {
        Self::new()
    }
}
