//! Channel references: extracting a channel identifier from a
//! caller-supplied link such as `https://live.example/@alice/live`.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Segment after the first `@`, up to the next path, query or fragment
/// separator.
static CHANNEL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@([^/?#]+)").expect("channel pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReferenceError {
    #[error("reference has no @channel segment: {0}")]
    NoChannel(String),
}

/// Identifier of a live channel on the upstream platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    /// Extract the channel from a reference string.
    pub fn from_reference(reference: &str) -> Result<Self, ReferenceError> {
        CHANNEL_PATTERN
            .captures(reference)
            .and_then(|c| c.get(1))
            .map(|m| Self(m.as_str().to_string()))
            .ok_or_else(|| ReferenceError::NoChannel(reference.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
