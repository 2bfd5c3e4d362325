use livecast_core::ChannelId;

use crate::upstream::UpstreamError;

/// Failures of registry operations. All are scoped to one session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(String),
    #[error("failed to bind @{channel}: {source}")]
    UpstreamConnect {
        channel: ChannelId,
        #[source]
        source: UpstreamError,
    },
}
