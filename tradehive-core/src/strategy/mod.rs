pub mod arbitrage;
pub mod factory;
pub mod grid;

use crate::{error::WorkerError, runtime::WorkerContext};

/// Capability set shared by every strategy kind (§4.4.1). A strategy owns no thread of its
/// own; the base worker loop drives it through [`WorkerContext`].
pub trait Strategy: Send {
    /// Called once before the loop starts. Validates configuration, establishes whatever
    /// starting state the strategy needs (e.g. the grid's initial order placement), and fails
    /// fast if the exchange cannot be reached.
    fn init(&mut self, ctx: &WorkerContext) -> Result<(), WorkerError>;

    /// Called once per loop iteration.
    fn tick(&mut self, ctx: &WorkerContext) -> Result<(), WorkerError>;

    /// Called on stop, before the loop persists its terminal status. Best-effort: failures are
    /// logged, not propagated, since the worker is shutting down regardless.
    fn cancel_all(&mut self, ctx: &WorkerContext);

    /// Applies a validated adaptation payload to `runtime`. Never touches persisted config.
    fn adapt(&mut self, params: serde_json::Value, runtime: &mut crate::runtime::RuntimeParameters);
}
