//! Downstream connection handles.
//!
//! The transport owns the socket; the registry only holds a handle to its
//! bounded outbound queue. Delivery never waits: a full queue means the
//! viewer is stuck and it gets kicked.

use std::sync::Arc;

use livecast_core::ServerFrame;
use serde::Serialize;
use tokio::sync::{mpsc, Notify};

pub type ConnectionId = u64;

/// A serialized frame, shared across every recipient of one broadcast.
pub type Frame = Arc<str>;

/// Result of a single non-blocking delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered,
    /// Queue full; the viewer is not draining.
    Stuck,
    /// The transport side has gone away.
    Closed,
}

#[derive(Debug, Clone)]
pub struct DownstreamConnection {
    id: ConnectionId,
    tx: mpsc::Sender<Frame>,
    kick: Arc<Notify>,
}

impl DownstreamConnection {
    /// Create a handle plus the receiving half the transport drains.
    pub fn channel(id: ConnectionId, buffer: usize) -> (Self, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let conn = Self {
            id,
            tx,
            kick: Arc::new(Notify::new()),
        };
        (conn, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    pub fn try_deliver(&self, frame: &Frame) -> SendOutcome {
        match self.tx.try_send(Arc::clone(frame)) {
            Ok(()) => SendOutcome::Delivered,
            Err(mpsc::error::TrySendError::Full(_)) => SendOutcome::Stuck,
            Err(mpsc::error::TrySendError::Closed(_)) => SendOutcome::Closed,
        }
    }

    /// Serialize and deliver a single frame to this connection only.
    pub fn send_frame(&self, frame: &ServerFrame) -> Result<SendOutcome, serde_json::Error> {
        self.send_json(frame)
    }

    fn send_json<T: Serialize>(&self, value: &T) -> Result<SendOutcome, serde_json::Error> {
        let json = serde_json::to_string(value)?;
        Ok(self.try_deliver(&Frame::from(json)))
    }

    /// Ask the transport to drop this connection.
    pub fn kick(&self) {
        self.kick.notify_one();
    }

    /// Resolves once [`kick`](Self::kick) has been called.
    pub async fn kicked(&self) {
        self.kick.notified().await;
    }
}
