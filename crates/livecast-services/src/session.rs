//! Session registry: viewer sessions, their downstream connections, and
//! the upstream feed bound to each.
//!
//! The index is a sharded map, so sessions never contend with each other.
//! Each session serializes its own mutations behind an async mutex: no
//! caller can observe a half-updated downstream set or a partially bound
//! feed. A session leaves the index the moment its last downstream
//! connection is deregistered, and its feed is disconnected in the same
//! critical section.
//!
//! Binding never holds the session lock while dialling. Each bind takes a
//! ticket under the lock, dials, then installs its feed only if its ticket
//! is still the latest and the session is still open. Relayed events carry
//! the generation of the feed they came from and are dropped once that
//! feed is no longer the bound one.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use livecast_core::config::RelaySettings;
use livecast_core::{ChannelId, ServerFrame};
use serde::Serialize;
use tokio::sync::{mpsc, Mutex, MutexGuard};

use crate::broadcaster::ThrottledBroadcaster;
use crate::connection::{ConnectionId, DownstreamConnection, Frame, SendOutcome};
use crate::error::SessionError;
use crate::throttle::Throttle;
use crate::upstream::{UpstreamConnector, UpstreamError, UpstreamFeed};

/// Opaque session identifier handed to viewers on connect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for SessionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

struct Binding {
    feed: UpstreamFeed,
    generation: u64,
}

pub(crate) struct SessionState {
    downstreams: HashMap<ConnectionId, DownstreamConnection>,
    upstream: Option<Binding>,
    /// Set once the session has left the index. A late handle holder must
    /// not revive it.
    closed: bool,
    /// Ticket of the most recent bind. A dial that finishes after a newer
    /// bind started is discarded.
    bind_ticket: u64,
    throttle: Throttle,
}

impl SessionState {
    /// True while `generation` names the feed currently bound.
    pub(crate) fn is_current(&self, generation: u64) -> bool {
        !self.closed && self.upstream.as_ref().is_some_and(|b| b.generation == generation)
    }

    pub(crate) fn admit(&mut self, now: tokio::time::Instant) -> bool {
        self.throttle.admit(now)
    }

    /// Offer `frame` to every connection. Returns how many took it and the
    /// ids of those that must be deregistered.
    pub(crate) fn fan_out(&self, session_id: &SessionId, frame: &Frame) -> (usize, Vec<ConnectionId>) {
        let mut delivered = 0;
        let mut gone = Vec::new();
        for conn in self.downstreams.values() {
            match conn.try_deliver(frame) {
                SendOutcome::Delivered => delivered += 1,
                SendOutcome::Closed => gone.push(conn.id()),
                SendOutcome::Stuck => {
                    tracing::warn!(%session_id, conn_id = conn.id(), "dropping stuck connection");
                    conn.kick();
                    gone.push(conn.id());
                }
            }
        }
        (delivered, gone)
    }
}

/// One viewing session.
pub struct Session {
    id: SessionId,
    created_at: Instant,
    state: Mutex<SessionState>,
}

impl Session {
    fn new(id: SessionId, first: DownstreamConnection, interval: Duration) -> Self {
        let mut downstreams = HashMap::new();
        downstreams.insert(first.id(), first);
        Self {
            id,
            created_at: Instant::now(),
            state: Mutex::new(SessionState {
                downstreams,
                upstream: None,
                closed: false,
                bind_ticket: 0,
                throttle: Throttle::new(interval),
            }),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub(crate) async fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().await
    }

    pub async fn connection_count(&self) -> usize {
        self.state.lock().await.downstreams.len()
    }

    pub async fn bound_channel(&self) -> Option<ChannelId> {
        let state = self.state.lock().await;
        state.upstream.as_ref().map(|b| b.feed.channel().clone())
    }

    pub async fn summary(&self) -> SessionSummary {
        let state = self.state.lock().await;
        SessionSummary {
            session_id: self.id.to_string(),
            connections: state.downstreams.len(),
            channel: state.upstream.as_ref().map(|b| b.feed.channel().to_string()),
            uptime_secs: self.created_at.elapsed().as_secs(),
        }
    }
}

/// Point-in-time view of a session for the status API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub connections: usize,
    pub channel: Option<String>,
    pub uptime_secs: u64,
}

struct RegistryInner {
    sessions: DashMap<SessionId, Arc<Session>>,
    connector: Arc<dyn UpstreamConnector>,
    broadcaster: ThrottledBroadcaster,
    connect_timeout: Option<Duration>,
    downstream_buffer: usize,
    next_connection: AtomicU64,
    next_generation: AtomicU64,
}

/// Cloneable handle to the process-wide session table.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<RegistryInner>,
}

impl SessionRegistry {
    pub fn new(connector: Arc<dyn UpstreamConnector>, settings: &RelaySettings) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                sessions: DashMap::new(),
                connector,
                broadcaster: ThrottledBroadcaster::new(settings.throttle_interval()),
                connect_timeout: settings.connect_timeout(),
                downstream_buffer: settings.downstream_buffer,
                next_connection: AtomicU64::new(1),
                next_generation: AtomicU64::new(1),
            }),
        }
    }

    /// Allocate a downstream connection handle and the queue the transport
    /// drains into its socket.
    pub fn open_connection(&self) -> (DownstreamConnection, mpsc::Receiver<Frame>) {
        let id = self.inner.next_connection.fetch_add(1, Ordering::Relaxed);
        DownstreamConnection::channel(id, self.inner.downstream_buffer)
    }

    /// Create a fresh session whose only member is `conn`.
    pub fn create_session(&self, conn: DownstreamConnection) -> SessionId {
        let interval = self.inner.broadcaster.interval();
        loop {
            let id = SessionId::generate();
            match self.inner.sessions.entry(id.clone()) {
                Entry::Occupied(_) => continue,
                Entry::Vacant(slot) => {
                    let conn_id = conn.id();
                    slot.insert(Arc::new(Session::new(id.clone(), conn, interval)));
                    tracing::info!(session_id = %id, conn_id, "session created");
                    return id;
                }
            }
        }
    }

    /// Look up a live session.
    pub fn session(&self, session_id: &str) -> Option<Arc<Session>> {
        self.inner.sessions.get(session_id).map(|s| Arc::clone(s.value()))
    }

    fn live_session(&self, session_id: &str) -> Result<Arc<Session>, SessionError> {
        self.session(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))
    }

    pub async fn register_connection(
        &self,
        session_id: &str,
        conn: DownstreamConnection,
    ) -> Result<(), SessionError> {
        let session = self.live_session(session_id)?;
        let mut state = session.state.lock().await;
        if state.closed {
            return Err(SessionError::NotFound(session_id.to_string()));
        }
        let conn_id = conn.id();
        state.downstreams.insert(conn_id, conn);
        tracing::info!(
            session_id,
            conn_id,
            connections = state.downstreams.len(),
            "connection joined session"
        );
        Ok(())
    }

    /// Remove `conn_id` from the session. Removing the last connection
    /// disconnects the bound feed and destroys the session. Unknown
    /// sessions and connections are ignored.
    pub async fn deregister_connection(&self, session_id: &str, conn_id: ConnectionId) {
        let Some(session) = self.session(session_id) else {
            return;
        };
        let mut state = session.state.lock().await;
        if state.downstreams.remove(&conn_id).is_none() {
            return;
        }
        if !state.downstreams.is_empty() {
            tracing::debug!(
                session_id,
                conn_id,
                remaining = state.downstreams.len(),
                "connection left session"
            );
            return;
        }

        state.closed = true;
        if let Some(mut binding) = state.upstream.take() {
            binding.feed.disconnect();
            tracing::info!(session_id, channel = %binding.feed.channel(), "upstream released");
        }
        self.inner
            .sessions
            .remove_if(session_id, |_, s| Arc::ptr_eq(s, &session));
        tracing::info!(session_id, "session destroyed");
    }

    /// Attach a feed for `channel`, replacing any feed already bound.
    ///
    /// The previous feed is disconnected before the new one is dialled, and
    /// the session stays usable during the dial. When binds overlap, the
    /// one that started last wins and earlier dials are discarded. On
    /// failure the session stays alive with nothing bound.
    pub async fn bind_upstream(&self, session_id: &str, channel: ChannelId) -> Result<(), SessionError> {
        let session = self.live_session(session_id)?;
        let ticket = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        {
            let mut state = session.state.lock().await;
            if state.closed {
                return Err(SessionError::NotFound(session_id.to_string()));
            }
            if let Some(mut previous) = state.upstream.take() {
                previous.feed.disconnect();
                tracing::info!(session_id, channel = %previous.feed.channel(), "previous upstream released");
            }
            state.bind_ticket = ticket;
        }

        let dialled = self.connect(&channel).await;

        let mut state = session.state.lock().await;
        if state.closed {
            if let Ok(mut feed) = dialled {
                feed.disconnect();
            }
            tracing::debug!(session_id, channel = %channel, "session closed while dialling");
            return Err(SessionError::NotFound(session_id.to_string()));
        }
        let mut feed = match dialled {
            Ok(feed) => feed,
            Err(source) => {
                tracing::warn!(session_id, channel = %channel, error = %source, "upstream connect failed");
                return Err(SessionError::UpstreamConnect { channel, source });
            }
        };
        if state.bind_ticket != ticket {
            feed.disconnect();
            tracing::debug!(session_id, channel = %channel, ticket, "bind superseded while dialling");
            return Ok(());
        }

        let generation = ticket;
        if let Some(events) = feed.subscribe() {
            tokio::spawn(self.inner.broadcaster.relay(
                self.clone(),
                Arc::clone(&session),
                generation,
                events,
            ));
        }
        state.upstream = Some(Binding { feed, generation });
        tracing::info!(session_id, channel = %channel, generation, "upstream bound");
        Ok(())
    }

    async fn connect(&self, channel: &ChannelId) -> Result<UpstreamFeed, UpstreamError> {
        let attempt = self.inner.connector.connect(channel);
        match self.inner.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, attempt)
                .await
                .unwrap_or_else(|_| Err(UpstreamError::Timeout(channel.clone(), limit))),
            None => attempt.await,
        }
    }

    /// Deliver `frame` to every open connection of the session. Returns the
    /// number of connections it reached.
    pub async fn broadcast(&self, session_id: &str, frame: &ServerFrame) -> usize {
        match self.session(session_id) {
            Some(session) => self.broadcast_to(&session, frame).await,
            None => 0,
        }
    }

    pub(crate) async fn broadcast_to(&self, session: &Session, frame: &ServerFrame) -> usize {
        let json: Frame = match frame.to_json() {
            Ok(j) => Frame::from(j),
            Err(e) => {
                tracing::warn!(session_id = %session.id, error = %e, "failed to serialize frame");
                return 0;
            }
        };
        let (delivered, gone) = session.state.lock().await.fan_out(&session.id, &json);
        self.release_connections(session, gone).await;
        delivered
    }

    /// Deregister connections a fan-out found closed or stuck. Must be
    /// called without the session lock held, since deregistering may
    /// destroy the session.
    pub(crate) async fn release_connections(&self, session: &Session, gone: Vec<ConnectionId>) {
        for conn_id in gone {
            self.deregister_connection(session.id.as_str(), conn_id).await;
        }
    }

    /// Clear the binding for `generation` after its feed ended on its own.
    pub(crate) async fn feed_ended(&self, session: &Session, generation: u64) {
        let mut state = session.state.lock().await;
        if state.upstream.as_ref().is_some_and(|b| b.generation == generation) {
            if let Some(binding) = state.upstream.take() {
                tracing::info!(session_id = %session.id, channel = %binding.feed.channel(), "upstream feed ended");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.sessions.is_empty()
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.inner.sessions.contains_key(session_id)
    }

    pub async fn summaries(&self) -> Vec<SessionSummary> {
        let sessions: Vec<Arc<Session>> = self
            .inner
            .sessions
            .iter()
            .map(|e| Arc::clone(e.value()))
            .collect();
        let mut out = Vec::with_capacity(sessions.len());
        for session in sessions {
            out.push(session.summary().await);
        }
        out
    }

    /// Tear down every session: disconnect feeds and kick viewers.
    pub async fn shutdown(&self) {
        let sessions: Vec<Arc<Session>> = self
            .inner
            .sessions
            .iter()
            .map(|e| Arc::clone(e.value()))
            .collect();
        self.inner.sessions.clear();
        for session in &sessions {
            let mut state = session.state.lock().await;
            state.closed = true;
            if let Some(mut binding) = state.upstream.take() {
                binding.feed.disconnect();
            }
            for conn in state.downstreams.values() {
                conn.kick();
            }
            state.downstreams.clear();
        }
        tracing::info!(sessions = sessions.len(), "session registry cleared");
    }
}
