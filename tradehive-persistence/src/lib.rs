//! Durable storage contract for the tradehive agent runtime: groups, agents and trades.
//!
//! Implemented once against [`sqlx::AnyPool`], parameterized at startup over SQLite or
//! Postgres via [`DbKind`]. No session crosses threads: callers open one [`Store`] handle
//! per worker thread and one per external-interface request.

pub mod error;
pub mod models;
pub mod store;

pub use error::PersistenceError;
pub use models::{
    Agent, AgentGroup, AgentPnlSummary, AgentStatus, ArbitrageConfig, GridConfig,
    GroupPnlSummary, NewTrade, StrategyConfig, StrategyKind, Trade, TradeSide,
};
pub use store::{DbKind, Store};
