//! Typed facade over a remote spot-trading exchange: price lookups, limit-order placement,
//! cancellation and balance queries (§4.2), built as a signed `reqwest` REST client over
//! [`tradehive_integration`]'s `RestClient`/`Signer` framework.

pub mod client;
pub mod error;
pub mod http_parser;
pub mod requests;
pub mod signer;

pub use client::{ApiCredentials, AssetBalance, ExchangeClient, OpenOrderView, OrderStatus, PlacedOrder, SpotExchangeClient};
pub use error::ExchangeError;
pub use requests::OrderSide;
