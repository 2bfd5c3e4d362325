//! livecast-core: shared types, wire frames, and configuration.
//! All other livecast crates depend on this one.

pub mod config;
pub mod event;
pub mod reference;

pub use event::{ChatEvent, ClientFrame, ServerFrame};
pub use reference::{ChannelId, ReferenceError};
