use crate::{
    error::WorkerError,
    runtime::{RuntimeParameters, WorkerContext},
    strategy::Strategy,
};
use parking_lot::Mutex;
use std::sync::{atomic::AtomicBool, Arc};
use std::thread;
use std::time::Duration;
use tradehive_bus::CommunicationBus;
use tradehive_exchange::ExchangeClient;
use tradehive_persistence::{AgentStatus, Store};

const RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(60);
const TRANSIENT_BACKOFF: Duration = Duration::from_secs(10);
const MAX_ERROR_MESSAGE_LEN: usize = 200;

/// Handle to a live worker thread, returned to the agent manager (§4.4, §4.6).
pub struct SpawnedWorker {
    pub thread: thread::JoinHandle<()>,
    pub stop: Arc<AtomicBool>,
}

/// Constructs and runs strategy worker threads (§4.4 base contract).
pub struct StrategyWorker;

impl StrategyWorker {
    /// Verifies the exchange client is ready, then spawns the worker loop thread. If the
    /// client is not ready, persists `error` and returns without spawning (§4.4 "On
    /// construction it verifies the exchange client is ready; otherwise it persists error and
    /// fails to construct").
    pub async fn start(
        agent_id: i64,
        group_id: Option<i64>,
        strategy: Box<dyn Strategy>,
        runtime_params: RuntimeParameters,
        exchange: Arc<dyn ExchangeClient>,
        store: Store,
        bus: Option<Arc<CommunicationBus>>,
    ) -> Result<SpawnedWorker, WorkerError> {
        if !exchange.is_ready() {
            let _ = store
                .update_agent_status(agent_id, AgentStatus::Error, Some("exchange client not ready"))
                .await;
            return Err(WorkerError::ConfigAuth("exchange client not ready".into()));
        }

        let stop = Arc::new(AtomicBool::new(false));
        let ctx = WorkerContext::new(agent_id, group_id, exchange, store, bus, Arc::clone(&stop))
            .map_err(|error| WorkerError::Transient(error.to_string()))?;

        let thread = thread::Builder::new()
            .name(format!("agent-{agent_id}"))
            .spawn(move || run(agent_id, strategy, runtime_params, ctx))
            .expect("failed to spawn worker thread");

        Ok(SpawnedWorker { thread, stop })
    }
}

/// The loop itself (§4.4 steps 1-5), executed entirely on the worker's own thread.
fn run(agent_id: i64, mut strategy: Box<dyn Strategy>, mut runtime_params: RuntimeParameters, ctx: WorkerContext) {
    let pending_adaptations: Arc<Mutex<Vec<serde_json::Value>>> = Arc::new(Mutex::new(Vec::new()));

    if let Some(bus) = ctx.bus.clone() {
        let queue = Arc::clone(&pending_adaptations);
        bus.subscribe(tradehive_bus::CHANNEL_LEARNING_MODULE, move |envelope| {
            if envelope.agent_id != Some(agent_id) {
                return;
            }
            queue.lock().push(envelope.payload);
        });
    }

    // Init runs before the running status is persisted: a caller polling status must never
    // observe `running` with the strategy not yet set up (§4.5).
    if let Err(error) = strategy.init(&ctx) {
        persist_terminal(&ctx, agent_id, AgentStatus::Error, Some(&truncate(&error.to_string())));
        return;
    }

    if let Err(error) = ctx.block_on(ctx.store.update_agent_status(agent_id, AgentStatus::Running, None)) {
        tracing::error!(agent_id, %error, "failed to persist running status");
    }

    let outcome = 'tick_loop: loop {
        if ctx.stop_requested() {
            break Outcome::Stopped;
        }

        for payload in pending_adaptations.lock().drain(..).collect::<Vec<_>>() {
            strategy.adapt(payload, &mut runtime_params);
        }

        match strategy.tick(&ctx) {
            Ok(()) => {}
            Err(WorkerError::RateLimited) => {
                tracing::warn!(agent_id, "exchange rate-limited, backing off 60s");
                thread::sleep(RATE_LIMIT_BACKOFF);
                continue 'tick_loop;
            }
            Err(WorkerError::IpBanned) => {
                tracing::error!(agent_id, "exchange banned this client, stopping worker");
                break Outcome::Error("exchange banned this client".into());
            }
            Err(error @ WorkerError::Transient(_)) => {
                tracing::warn!(agent_id, %error, "transient error, retrying in 10s");
                thread::sleep(TRANSIENT_BACKOFF);
                continue 'tick_loop;
            }
            Err(error) => {
                tracing::error!(agent_id, %error, "fatal worker error");
                break Outcome::Error(truncate(&error.to_string()));
            }
        }

        if ctx.stop_requested() {
            break Outcome::Stopped;
        }
        thread::sleep(Duration::from_secs(runtime_params.loop_interval_seconds));
    };

    strategy.cancel_all(&ctx);

    match outcome {
        Outcome::Stopped => persist_terminal(&ctx, agent_id, AgentStatus::Stopped, None),
        Outcome::Error(message) => persist_terminal(&ctx, agent_id, AgentStatus::Error, Some(&message)),
    }
}

enum Outcome {
    Stopped,
    Error(String),
}

fn persist_terminal(ctx: &WorkerContext, agent_id: i64, status: AgentStatus, message: Option<&str>) {
    if let Err(error) = ctx.block_on(ctx.store.update_agent_status(agent_id, status, message)) {
        // §7: a status-update failure inside a worker is logged as CRITICAL; the worker has
        // nothing left to retry against since it is already exiting.
        tracing::error!(agent_id, %error, "CRITICAL: failed to persist terminal worker status");
    }
}

fn truncate(message: &str) -> String {
    if message.len() <= MAX_ERROR_MESSAGE_LEN {
        message.to_string()
    } else {
        message.chars().take(MAX_ERROR_MESSAGE_LEN).collect()
    }
}
