//! Agent lifecycle manager, strategy worker runtime (grid + arbitrage) and performance
//! analyzer (§2). This is the hard part of the system: concurrent long-running workers,
//! consistency between durable and ephemeral state, retry/backoff against a rate-limited
//! exchange, and a runtime parameter-adaptation channel.

pub mod analyzer;
pub mod error;
pub mod manager;
pub mod reconcile;
pub mod runtime;
pub mod strategy;
#[cfg(test)]
mod test_support;
pub mod worker;

pub use analyzer::PerformanceAnalyzer;
pub use error::{ManagerError, WorkerError};
pub use manager::{AgentManager, RunningAgentInfo};
pub use reconcile::reconcile;
pub use runtime::{RuntimeParameters, WorkerContext};
pub use strategy::{arbitrage::ArbitrageStrategy, factory::StrategyFactory, grid::GridStrategy, Strategy};
pub use worker::{SpawnedWorker, StrategyWorker};
