use crate::{error::ManagerError, runtime::RuntimeParameters, strategy::factory::StrategyFactory, worker::StrategyWorker};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{atomic::Ordering, Arc};
use std::thread;
use tradehive_bus::CommunicationBus;
use tradehive_exchange::ExchangeClient;
use tradehive_persistence::{Agent, DbKind, Store, StrategyKind};

struct RunningAgent {
    stop: Arc<std::sync::atomic::AtomicBool>,
    thread: thread::JoinHandle<()>,
    started_at: DateTime<Utc>,
    kind: StrategyKind,
    group_id: Option<i64>,
}

/// Process-wide registry of live worker threads (§4.6). A single shared exchange client and
/// optional bus are vended to every worker it starts; the map itself is guarded by a single
/// mutex with no I/O performed while holding it.
pub struct AgentManager {
    workers: Mutex<HashMap<i64, RunningAgent>>,
    exchange: Arc<dyn ExchangeClient>,
    bus: Option<Arc<CommunicationBus>>,
    factory: StrategyFactory,
    db_kind: DbKind,
    db_url: String,
}

/// A snapshot of one live worker, returned by [`AgentManager::get_running_agent_info`].
#[derive(Debug, Clone)]
pub struct RunningAgentInfo {
    pub agent_id: i64,
    pub kind: StrategyKind,
    pub group_id: Option<i64>,
    pub started_at: DateTime<Utc>,
}

impl AgentManager {
    pub fn new(
        exchange: Arc<dyn ExchangeClient>,
        bus: Option<Arc<CommunicationBus>>,
        db_kind: DbKind,
        db_url: impl Into<String>,
    ) -> Self {
        Self {
            workers: Mutex::new(HashMap::new()),
            exchange,
            bus,
            factory: StrategyFactory,
            db_kind,
            db_url: db_url.into(),
        }
    }

    /// Starts `agent`'s worker. Refuses if already tracked (§4.6); opens a fresh persistence
    /// session for the worker's own exclusive use (§5 "session per thread").
    pub async fn start_agent_process(&self, agent: &Agent) -> Result<(), ManagerError> {
        if self.is_agent_running(agent.id) {
            return Err(ManagerError::AlreadyRunning(agent.id));
        }
        if !self.exchange.is_ready() {
            return Err(ManagerError::ExchangeNotReady);
        }

        let worker_store = Store::connect(self.db_kind, &self.db_url).await?;
        let strategy = self.factory.build(&agent.config);
        let runtime_params = RuntimeParameters::new(agent.config.loop_interval_seconds());

        let spawned = StrategyWorker::start(
            agent.id,
            agent.group_id,
            strategy,
            runtime_params,
            Arc::clone(&self.exchange),
            worker_store,
            self.bus.clone(),
        )
        .await?;

        self.workers.lock().insert(
            agent.id,
            RunningAgent {
                stop: spawned.stop,
                thread: spawned.thread,
                started_at: Utc::now(),
                kind: agent.strategy_kind,
                group_id: agent.group_id,
            },
        );
        Ok(())
    }

    /// Signals the worker to stop and removes it from the map immediately — non-blocking; the
    /// worker self-cleans and self-persists its terminal status (§4.6).
    pub fn stop_agent_process(&self, agent_id: i64) -> Result<(), ManagerError> {
        let running = self
            .workers
            .lock()
            .remove(&agent_id)
            .ok_or(ManagerError::NotRunning(agent_id))?;
        running.stop.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Present AND thread alive; a present-but-dead entry is stale and is removed here,
    /// returning `false` (§4.6).
    pub fn is_agent_running(&self, agent_id: i64) -> bool {
        let mut guard = self.workers.lock();
        match guard.get(&agent_id) {
            Some(running) if running.thread.is_finished() => {
                guard.remove(&agent_id);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    pub fn get_running_agent_info(&self, agent_id: i64) -> Option<RunningAgentInfo> {
        let mut guard = self.workers.lock();
        if matches!(guard.get(&agent_id), Some(running) if running.thread.is_finished()) {
            guard.remove(&agent_id);
            return None;
        }
        guard.get(&agent_id).map(|running| RunningAgentInfo {
            agent_id,
            kind: running.kind,
            group_id: running.group_id,
            started_at: running.started_at,
        })
    }

    /// Lists every currently-tracked agent id, performing stale-entry cleanup first (§4.6).
    pub fn list_running_agent_ids(&self) -> Vec<i64> {
        let mut guard = self.workers.lock();
        let stale: Vec<i64> = guard
            .iter()
            .filter(|(_, running)| running.thread.is_finished())
            .map(|(id, _)| *id)
            .collect();
        for id in stale {
            guard.remove(&id);
        }
        guard.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tradehive_exchange::{ApiCredentials, SpotExchangeClient};
    use tradehive_persistence::{GridConfig, StrategyConfig};

    fn manager() -> AgentManager {
        let exchange: Arc<dyn ExchangeClient> = Arc::new(SpotExchangeClient::new(ApiCredentials {
            key: String::new(),
            secret: String::new(),
        }));
        AgentManager::new(exchange, None, DbKind::Sqlite, "sqlite::memory:")
    }

    fn grid_agent(id: i64) -> Agent {
        Agent {
            id,
            name: "g1".into(),
            strategy_kind: StrategyKind::Grid,
            config: StrategyConfig::Grid(GridConfig {
                symbol: "BTCUSDT".into(),
                lower_price: dec!(60000),
                upper_price: dec!(70000),
                grid_levels: 11,
                order_amount_usd: dec!(50),
                loop_interval_seconds: 10,
            }),
            status: tradehive_persistence::AgentStatus::Created,
            status_message: None,
            group_id: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn start_fails_when_exchange_is_not_ready() {
        let manager = manager();
        let result = manager.start_agent_process(&grid_agent(1)).await;
        assert!(matches!(result, Err(ManagerError::ExchangeNotReady)));
    }

    #[test]
    fn stopping_an_untracked_agent_is_not_running() {
        let manager = manager();
        assert!(!manager.is_agent_running(42));
        assert!(matches!(
            manager.stop_agent_process(42),
            Err(ManagerError::NotRunning(42))
        ));
    }

    #[test]
    fn list_running_agent_ids_starts_empty() {
        let manager = manager();
        assert!(manager.list_running_agent_ids().is_empty());
    }
}
