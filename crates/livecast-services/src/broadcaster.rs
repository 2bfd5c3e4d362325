//! Throttled broadcaster: the delivery path from a bound feed to viewers.
//!
//! One relay task runs per bound feed. It pulls events in upstream order,
//! runs each through the session's throttle, and fans survivors out to the
//! session's downstream set as it is at delivery time.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use livecast_core::{ChatEvent, ServerFrame};
use tokio::time::Instant;

use crate::connection::Frame;
use crate::session::{Session, SessionRegistry};
use crate::upstream::EventStream;

#[derive(Debug, Clone, Copy)]
pub struct ThrottledBroadcaster {
    interval: Duration,
}

impl ThrottledBroadcaster {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Handle one event from the feed bound as `generation`. Returns true
    /// if it was relayed.
    ///
    /// The binding check, the throttle decision and the fan-out happen
    /// under one hold of the session lock, so an event from a feed that was
    /// replaced or released is never delivered and never uses up the
    /// throttle slot of its successor.
    pub async fn on_event(
        &self,
        registry: &SessionRegistry,
        session: &Session,
        generation: u64,
        event: &ChatEvent,
    ) -> bool {
        let frame: Frame = match ServerFrame::chat(event).to_json() {
            Ok(json) => Frame::from(json),
            Err(e) => {
                tracing::warn!(session_id = %session.id(), error = %e, "failed to serialize chat frame");
                return false;
            }
        };

        let gone = {
            let mut state = session.state().await;
            if !state.is_current(generation) {
                tracing::trace!(session_id = %session.id(), generation, "stale chat event dropped");
                return false;
            }
            if !state.admit(Instant::now()) {
                tracing::trace!(session_id = %session.id(), "chat event throttled");
                return false;
            }
            let (_, gone) = state.fan_out(session.id(), &frame);
            gone
        };
        registry.release_connections(session, gone).await;
        true
    }

    /// Drive `events` until the feed ends, then release the binding if it
    /// is still the one identified by `generation`.
    pub(crate) async fn relay(
        self,
        registry: SessionRegistry,
        session: Arc<Session>,
        generation: u64,
        mut events: EventStream,
    ) {
        let mut relayed = 0u64;
        let mut dropped = 0u64;
        while let Some(event) = events.next().await {
            if self.on_event(&registry, &session, generation, &event).await {
                relayed += 1;
            } else {
                dropped += 1;
            }
        }
        tracing::debug!(session_id = %session.id(), generation, relayed, dropped, "upstream relay finished");
        registry.feed_ended(&session, generation).await;
    }
}
