//! WebSocket feed connector.
//!
//! Talks to a feed gateway that already speaks plain JSON: every text frame
//! carrying `nickname` and `comment` is a chat event, anything else is
//! skipped. The gateway answers the handshake with 404 for channels that
//! are not currently live.

use async_trait::async_trait;
use futures::{future, StreamExt};
use livecast_core::{ChannelId, ChatEvent};
use tokio_tungstenite::tungstenite::{self, http::StatusCode, Message};

use super::{UpstreamConnector, UpstreamError, UpstreamFeed};

pub struct WsFeedConnector {
    url_template: String,
}

impl WsFeedConnector {
    /// `url_template` must contain a `{channel}` placeholder.
    pub fn new(url_template: impl Into<String>) -> Self {
        Self {
            url_template: url_template.into(),
        }
    }

    pub fn feed_url(&self, channel: &ChannelId) -> String {
        self.url_template.replace("{channel}", channel.as_str())
    }
}

#[async_trait]
impl UpstreamConnector for WsFeedConnector {
    async fn connect(&self, channel: &ChannelId) -> Result<UpstreamFeed, UpstreamError> {
        let url = self.feed_url(channel);
        let (socket, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| classify(channel, e))?;
        tracing::info!(channel = %channel, url, "upstream feed connected");

        let label = channel.clone();
        let events = socket
            .take_while(move |msg| {
                if let Err(e) = msg {
                    tracing::warn!(channel = %label, error = %e, "upstream feed read failed");
                }
                future::ready(msg.is_ok())
            })
            .filter_map(|msg| future::ready(msg.ok().and_then(|m| parse_event(&m))));

        Ok(UpstreamFeed::new(channel.clone(), events))
    }
}

fn classify(channel: &ChannelId, err: tungstenite::Error) -> UpstreamError {
    match err {
        tungstenite::Error::Http(response) if response.status() == StatusCode::NOT_FOUND => {
            UpstreamError::NotLive(channel.clone())
        }
        other => UpstreamError::Unreachable {
            channel: channel.clone(),
            reason: other.to_string(),
        },
    }
}

fn parse_event(msg: &Message) -> Option<ChatEvent> {
    let Message::Text(text) = msg else {
        return None;
    };
    match serde_json::from_str::<ChatEvent>(text.as_str()) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::trace!(error = %e, "skipping non-chat upstream frame");
            None
        }
    }
}
