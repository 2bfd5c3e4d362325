//! Upstream feed contract.
//!
//! A connector turns a channel id into a connected [`UpstreamFeed`]. The
//! feed hands out its events once, as a lazy stream that ends when the
//! source disconnects or when the feed is disconnected locally.

pub mod ws_feed;

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{AbortHandle, BoxStream, Stream, StreamExt};
use livecast_core::{ChannelId, ChatEvent};

pub use ws_feed::WsFeedConnector;

pub type EventStream = BoxStream<'static, ChatEvent>;

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("channel @{0} is not live")]
    NotLive(ChannelId),
    #[error("feed for @{channel} unreachable: {reason}")]
    Unreachable { channel: ChannelId, reason: String },
    #[error("connecting to @{0} timed out after {1:?}")]
    Timeout(ChannelId, Duration),
}

#[async_trait]
pub trait UpstreamConnector: Send + Sync {
    /// Connect to the live source for `channel`. Not retried on failure.
    async fn connect(&self, channel: &ChannelId) -> Result<UpstreamFeed, UpstreamError>;
}

/// A connected feed. Owned by exactly one session binding; dropping it
/// disconnects it.
pub struct UpstreamFeed {
    channel: ChannelId,
    events: Option<EventStream>,
    abort: AbortHandle,
    on_disconnect: Option<Box<dyn FnOnce() + Send + Sync>>,
    disconnected: bool,
}

impl UpstreamFeed {
    pub fn new<S>(channel: ChannelId, events: S) -> Self
    where
        S: Stream<Item = ChatEvent> + Send + 'static,
    {
        let (events, abort) = futures::stream::abortable(events);
        Self {
            channel,
            events: Some(events.boxed()),
            abort,
            on_disconnect: None,
            disconnected: false,
        }
    }

    /// Run `hook` once when the feed is disconnected, for connectors that
    /// hold resources outside the event stream.
    pub fn on_disconnect(mut self, hook: impl FnOnce() + Send + Sync + 'static) -> Self {
        self.on_disconnect = Some(Box::new(hook));
        self
    }

    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }

    /// Take the event stream. Returns `None` after the first call.
    pub fn subscribe(&mut self) -> Option<EventStream> {
        self.events.take()
    }

    /// Stop the event stream. Idempotent.
    pub fn disconnect(&mut self) {
        if self.disconnected {
            return;
        }
        self.disconnected = true;
        self.abort.abort();
        if let Some(hook) = self.on_disconnect.take() {
            hook();
        }
        tracing::debug!(channel = %self.channel, "upstream feed disconnected");
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }
}

impl Drop for UpstreamFeed {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl std::fmt::Debug for UpstreamFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamFeed")
            .field("channel", &self.channel)
            .field("disconnected", &self.disconnected)
            .finish()
    }
}
