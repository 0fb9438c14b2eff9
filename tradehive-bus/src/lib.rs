//! Pub/sub fabric coordinating agent lifecycle events, group insights and per-agent parameter
//! suggestions (§4.3). Implemented over the `redis` crate's synchronous `Connection` and
//! `PubSub` API; a single listener thread per [`CommunicationBus`] drains messages and
//! re-subscribes all prior `(channel, handler)` pairs whenever the connection is lost.

pub mod bus;
pub mod config;
pub mod error;

pub use bus::CommunicationBus;
pub use config::BusConfig;
pub use error::BusError;

pub use tradehive_integration::{
    Envelope, CHANNEL_AGENT_EVENTS, CHANNEL_GROUP_UPDATES, CHANNEL_LEARNING_MODULE,
};
