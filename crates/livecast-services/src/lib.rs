//! livecast-services: the relay engine.
//!
//! [`SessionRegistry`] owns viewer sessions and their feed bindings,
//! [`ThrottledBroadcaster`] moves chat events from feeds to viewers, and
//! [`UpstreamConnector`] is the seam to the live source.

pub mod attempts;
pub mod broadcaster;
pub mod connection;
pub mod error;
pub mod session;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod throttle;
pub mod upstream;

pub use attempts::ConnectAttemptLimiter;
pub use broadcaster::ThrottledBroadcaster;
pub use connection::{ConnectionId, DownstreamConnection, Frame, SendOutcome};
pub use error::SessionError;
pub use session::{Session, SessionId, SessionRegistry, SessionSummary};
pub use throttle::Throttle;
pub use upstream::{EventStream, UpstreamConnector, UpstreamError, UpstreamFeed, WsFeedConnector};
