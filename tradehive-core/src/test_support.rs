//! Shared test fixtures for strategy/worker unit tests. Not compiled outside `#[cfg(test)]`.
#![cfg(test)]

use crate::runtime::WorkerContext;
use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tradehive_exchange::{
    ApiCredentials, AssetBalance, ExchangeClient, ExchangeError, OpenOrderView, OrderSide,
    OrderStatus, PlacedOrder, SpotExchangeClient,
};
use tradehive_persistence::{DbKind, Store};

/// A [`WorkerContext`] wired to an in-memory sqlite store and a not-ready exchange client
/// (no credentials). Suitable for tests that never actually call the exchange, or that expect
/// a `ConfigAuth` failure from it.
pub(crate) async fn memory_context(agent_id: i64, group_id: Option<i64>) -> WorkerContext {
    let exchange: Arc<dyn ExchangeClient> = Arc::new(SpotExchangeClient::new(ApiCredentials {
        key: String::new(),
        secret: String::new(),
    }));
    memory_context_with_exchange(agent_id, group_id, exchange).await
}

/// Same as [`memory_context`], but with a caller-supplied exchange client — for tests that
/// need to script order placement/resolution through [`MockExchangeClient`].
pub(crate) async fn memory_context_with_exchange(
    agent_id: i64,
    group_id: Option<i64>,
    exchange: Arc<dyn ExchangeClient>,
) -> WorkerContext {
    let store = Store::connect(DbKind::Sqlite, "sqlite::memory:")
        .await
        .expect("in-memory sqlite store");

    WorkerContext::new(
        agent_id,
        group_id,
        exchange,
        store,
        None,
        Arc::new(AtomicBool::new(false)),
    )
    .expect("worker context runtime")
}

/// In-memory [`ExchangeClient`] double. Tracks resting orders keyed by client order id, so a
/// test can script a fill by removing an entry with [`MockExchangeClient::mark_filled`] before
/// the next `get_open_orders` call observes it gone.
pub(crate) struct MockExchangeClient {
    state: Mutex<MockState>,
}

struct MockState {
    price: Decimal,
    next_order_id: u64,
    resting: HashMap<String, OpenOrderView>,
}

impl MockExchangeClient {
    pub(crate) fn new(price: Decimal) -> Self {
        Self {
            state: Mutex::new(MockState {
                price,
                next_order_id: 0,
                resting: HashMap::new(),
            }),
        }
    }

    /// Removes `client_order_id` from the resting set, as if the venue had filled it.
    pub(crate) fn mark_filled(&self, client_order_id: &str) {
        self.state.lock().resting.remove(client_order_id);
    }
}

#[async_trait]
impl ExchangeClient for MockExchangeClient {
    fn is_ready(&self) -> bool {
        true
    }

    async fn ping(&self) -> Result<(), ExchangeError> {
        Ok(())
    }

    async fn get_symbol_ticker(&self, _symbol: &str) -> Result<Decimal, ExchangeError> {
        Ok(self.state.lock().price)
    }

    async fn create_limit_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
        price: Decimal,
        client_order_id: Option<String>,
    ) -> Result<PlacedOrder, ExchangeError> {
        let mut state = self.state.lock();
        state.next_order_id += 1;
        let order_id = state.next_order_id;
        let client_order_id = client_order_id.unwrap_or_else(|| order_id.to_string());

        state.resting.insert(
            client_order_id.clone(),
            OpenOrderView {
                symbol: symbol.to_string(),
                order_id,
                client_order_id: client_order_id.clone(),
                status: OrderStatus::New,
                side,
                price,
                orig_qty: quantity,
                executed_qty: Decimal::ZERO,
            },
        );

        Ok(PlacedOrder {
            order_id,
            client_order_id,
            status: OrderStatus::New,
            price,
            orig_qty: quantity,
        })
    }

    async fn get_open_orders(&self, _symbol: Option<&str>) -> Result<Vec<OpenOrderView>, ExchangeError> {
        Ok(self.state.lock().resting.values().cloned().collect())
    }

    async fn cancel_order(&self, _symbol: &str, order_id: u64) -> Result<(), ExchangeError> {
        self.state.lock().resting.retain(|_, order| order.order_id != order_id);
        Ok(())
    }

    async fn get_asset_balance(&self, asset: &str) -> Result<AssetBalance, ExchangeError> {
        Ok(AssetBalance {
            asset: asset.to_string(),
            free: Decimal::ZERO,
            locked: Decimal::ZERO,
        })
    }
}
