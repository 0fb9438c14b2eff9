use rust_decimal_macros::dec;
use std::sync::Arc;
use tradehive_core::{reconcile, AgentManager, ManagerError};
use tradehive_exchange::{ApiCredentials, ExchangeClient, SpotExchangeClient};
use tradehive_persistence::{AgentStatus, DbKind, GridConfig, Store, StrategyConfig};

fn grid_config() -> StrategyConfig {
    StrategyConfig::Grid(GridConfig {
        symbol: "BTCUSDT".into(),
        lower_price: dec!(60000),
        upper_price: dec!(70000),
        grid_levels: 11,
        order_amount_usd: dec!(50),
        loop_interval_seconds: 10,
    })
}

/// End-to-end scenario 1/2 from the spec, as far as this sandbox can reach without live
/// exchange credentials: an agent is created against a real in-memory store, a manager with a
/// not-ready exchange client refuses to start it, and the refusal does not leave the agent
/// row's status touched by the manager (only the worker construction path persists `error`,
/// and that path is never reached when the manager itself rejects the start).
#[tokio::test]
async fn manager_refuses_to_start_without_a_ready_exchange() {
    let store = Store::connect(DbKind::Sqlite, "sqlite::memory:")
        .await
        .expect("in-memory store");
    let agent = store
        .create_agent("g1", grid_config(), None)
        .await
        .expect("create agent");
    assert_eq!(agent.status, AgentStatus::Created);

    let exchange: Arc<dyn ExchangeClient> = Arc::new(SpotExchangeClient::new(ApiCredentials {
        key: String::new(),
        secret: String::new(),
    }));
    let manager = AgentManager::new(exchange, None, DbKind::Sqlite, "sqlite::memory:");

    let result = manager.start_agent_process(&agent).await;
    assert!(matches!(result, Err(ManagerError::ExchangeNotReady)));
    assert!(!manager.is_agent_running(agent.id));
}

/// §6.1: a persisted `running` status with no live worker thread must be reconciled to
/// `error`; a persisted non-running status with no live thread needs no correction.
#[tokio::test]
async fn reconciliation_flags_running_status_with_no_live_worker() {
    let exchange: Arc<dyn ExchangeClient> = Arc::new(SpotExchangeClient::new(ApiCredentials {
        key: String::new(),
        secret: String::new(),
    }));
    let manager = AgentManager::new(exchange, None, DbKind::Sqlite, "sqlite::memory:");

    assert_eq!(
        reconcile(AgentStatus::Running, &manager, 1),
        Some((
            AgentStatus::Error,
            "process not found by manager".to_string()
        ))
    );
    assert_eq!(reconcile(AgentStatus::Created, &manager, 1), None);
}

/// §8 boundary scenario: a duplicate group name is rejected and the store is left untouched.
#[tokio::test]
async fn duplicate_group_name_round_trips_as_a_conflict() {
    let store = Store::connect(DbKind::Sqlite, "sqlite::memory:")
        .await
        .expect("in-memory store");
    store.create_group("alpha", None).await.expect("first create");

    let error = store.create_group("alpha", None).await.unwrap_err();
    assert!(matches!(
        error,
        tradehive_persistence::PersistenceError::DuplicateGroupName(_)
    ));
}
