//! [`tradehive-integration`] provides the low-level plumbing shared by the rest of the
//! tradehive ecosystem: a signed-REST client framework (used by `tradehive-exchange`) and the
//! pub/sub wire envelope (used by `tradehive-bus` and `tradehive-core`).
//!
//! Nothing in this crate knows about agents, strategies or trades; it only knows how to build,
//! sign and parse HTTP requests, and how messages are shaped on the bus.

pub mod decimal;
pub mod envelope;
pub mod error;
pub mod protocol;

pub use envelope::{Envelope, CHANNEL_AGENT_EVENTS, CHANNEL_GROUP_UPDATES, CHANNEL_LEARNING_MODULE};
pub use error::TransportError;
