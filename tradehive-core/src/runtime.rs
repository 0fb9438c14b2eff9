use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Runtime;
use tradehive_bus::CommunicationBus;
use tradehive_exchange::ExchangeClient;
use tradehive_persistence::Store;

/// The mutable in-memory view of a worker's parameters (§3 "Runtime parameters"). Seeded from
/// persisted config at start; adaptation overwrites fields here and never touches the
/// persisted document. `loop_interval_seconds` is promoted to a typed field since every
/// strategy consults it from the base loop; anything else a strategy wants to adapt rides the
/// `extra` overflow map.
#[derive(Debug, Clone)]
pub struct RuntimeParameters {
    pub loop_interval_seconds: u64,
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RuntimeParameters {
    pub fn new(loop_interval_seconds: u64) -> Self {
        Self {
            loop_interval_seconds,
            extra: serde_json::Map::new(),
        }
    }

    /// Merges an adaptation payload (§4.4 "adaptParameters"). A `loop_interval_seconds` field
    /// updates the typed field; everything else is merged into `extra`.
    pub fn apply(&mut self, params: serde_json::Value) {
        let serde_json::Value::Object(map) = params else {
            tracing::warn!("adaptation payload was not a JSON object, ignoring");
            return;
        };

        for (key, value) in map {
            if key == "loop_interval_seconds" {
                if let Some(seconds) = value.as_u64() {
                    self.loop_interval_seconds = seconds;
                    continue;
                }
            }
            self.extra.insert(key, value);
        }
    }
}

/// Everything a running strategy needs to reach the outside world, bundled once per worker
/// (§4.4 "created with agent id, initial config, persistence session, exchange client,
/// optional bus"). One [`WorkerContext`] lives for the lifetime of a single worker thread;
/// `runtime` bridges the synchronous loop to the async `reqwest`/`sqlx` stack (§4.2.1, §9).
pub struct WorkerContext {
    pub agent_id: i64,
    pub group_id: Option<i64>,
    pub exchange: Arc<dyn ExchangeClient>,
    pub store: Store,
    pub bus: Option<Arc<CommunicationBus>>,
    runtime: Runtime,
    stop: Arc<AtomicBool>,
}

impl WorkerContext {
    pub fn new(
        agent_id: i64,
        group_id: Option<i64>,
        exchange: Arc<dyn ExchangeClient>,
        store: Store,
        bus: Option<Arc<CommunicationBus>>,
        stop: Arc<AtomicBool>,
    ) -> Result<Self, std::io::Error> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            agent_id,
            group_id,
            exchange,
            store,
            bus,
            runtime,
            stop,
        })
    }

    /// Runs `future` to completion on this worker's private runtime (§4.2.1 "private
    /// current-thread Tokio runtime").
    pub fn block_on<F: std::future::Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}
