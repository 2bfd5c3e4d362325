//! Scripted upstream connectors for tests in this crate and downstream
//! crates (enable the `test-util` feature).
//!
//! Channel names pick the behaviour: `offline*` is never live, `slow*`
//! waits for [`ScriptedConnector::open_gate`] before connecting, anything
//! else connects at once.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use livecast_core::{ChannelId, ChatEvent};
use tokio::sync::{mpsc, Notify};

use crate::upstream::{UpstreamConnector, UpstreamError, UpstreamFeed};

#[derive(Default)]
pub struct ScriptedConnector {
    feeds: Mutex<HashMap<String, mpsc::UnboundedSender<ChatEvent>>>,
    disconnects: Arc<Mutex<HashMap<String, usize>>>,
    connects: AtomicUsize,
    gate: Notify,
}

impl ScriptedConnector {
    /// Emit a chat event on the bound feed for `channel`.
    pub fn push(&self, channel: &str, nickname: &str, comment: &str) {
        let feeds = self.feeds.lock().unwrap();
        let tx = feeds.get(channel).expect("channel was never connected");
        tx.send(ChatEvent::new(nickname, comment))
            .expect("feed already disconnected");
    }

    /// End the feed from the source side.
    pub fn end(&self, channel: &str) {
        self.feeds.lock().unwrap().remove(channel);
    }

    /// Let one pending `slow*` connect proceed.
    pub fn open_gate(&self) {
        self.gate.notify_one();
    }

    pub fn disconnects(&self, channel: &str) -> usize {
        self.disconnects.lock().unwrap().get(channel).copied().unwrap_or(0)
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UpstreamConnector for ScriptedConnector {
    async fn connect(&self, channel: &ChannelId) -> Result<UpstreamFeed, UpstreamError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if channel.as_str().starts_with("offline") {
            return Err(UpstreamError::NotLive(channel.clone()));
        }
        if channel.as_str().starts_with("slow") {
            self.gate.notified().await;
        }
        let (tx, mut rx) = mpsc::unbounded_channel();
        self.feeds.lock().unwrap().insert(channel.to_string(), tx);
        let events = futures::stream::poll_fn(move |cx| rx.poll_recv(cx));
        let disconnects = Arc::clone(&self.disconnects);
        let name = channel.to_string();
        Ok(UpstreamFeed::new(channel.clone(), events).on_disconnect(move || {
            *disconnects.lock().unwrap().entry(name).or_default() += 1;
        }))
    }
}

/// Connector whose dial never completes.
pub struct HangingConnector;

#[async_trait]
impl UpstreamConnector for HangingConnector {
    async fn connect(&self, _channel: &ChannelId) -> Result<UpstreamFeed, UpstreamError> {
        futures::future::pending().await
    }
}
