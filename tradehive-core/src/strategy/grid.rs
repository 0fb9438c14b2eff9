use crate::{error::WorkerError, runtime::WorkerContext, strategy::Strategy};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;
use tradehive_exchange::{OrderSide, OrderStatus};
use tradehive_integration::decimal::round_down;
use tradehive_persistence::{NewTrade, TradeSide};

const INITIAL_PLACEMENT_PACING: Duration = Duration::from_millis(200);
const TICK_RESOLUTION_PACING: Duration = Duration::from_millis(100);
const QUANTITY_SCALE: u32 = 8;

static CLIENT_ORDER_SEQ: AtomicU64 = AtomicU64::new(0);

/// One order this worker is currently tracking against the exchange, keyed by the client
/// order id it was placed with (§3 "two maps keyed by the exchange-assigned client order
/// id").
#[derive(Debug, Clone)]
struct PendingOrder {
    order_id: u64,
    side: OrderSide,
    price: Decimal,
    qty: Decimal,
}

/// Grid trading strategy: places a ladder of resting limit orders between `lower_price` and
/// `upper_price`, and replenishes one step out from the fill whenever a leg completes (§4.5).
pub struct GridStrategy {
    symbol: String,
    lower: Decimal,
    upper: Decimal,
    order_amount_usd: Decimal,
    step: Decimal,
    grid_lines: Vec<Decimal>,
    pending_buys: HashMap<String, PendingOrder>,
    pending_sells: HashMap<String, PendingOrder>,
}

impl GridStrategy {
    pub fn new(
        symbol: String,
        lower: Decimal,
        upper: Decimal,
        levels: u32,
        order_amount_usd: Decimal,
    ) -> Self {
        let step = (upper - lower) / Decimal::from(levels - 1);
        let grid_lines = (0..levels)
            .map(|i| lower + step * Decimal::from(i))
            .collect();

        Self {
            symbol,
            lower,
            upper,
            order_amount_usd,
            step,
            grid_lines,
            pending_buys: HashMap::new(),
            pending_sells: HashMap::new(),
        }
    }

    pub fn grid_lines(&self) -> &[Decimal] {
        &self.grid_lines
    }

    pub fn step(&self) -> Decimal {
        self.step
    }

    fn place_initial_grid(&mut self, ctx: &WorkerContext) -> Result<(), WorkerError> {
        let current_price = ctx.block_on(ctx.exchange.get_current_price(&self.symbol))?;

        let lines = self.grid_lines.clone();
        for line in lines {
            if ctx.stop_requested() {
                break;
            }
            let side = match line.cmp(&current_price) {
                std::cmp::Ordering::Less => OrderSide::Buy,
                std::cmp::Ordering::Greater => OrderSide::Sell,
                std::cmp::Ordering::Equal => continue,
            };
            self.place_order(ctx, side, line);
            thread::sleep(INITIAL_PLACEMENT_PACING);
        }
        Ok(())
    }

    /// Places a single resting order at `price`. Failures (including a quantity that rounds
    /// to zero) are logged and swallowed: per §4.5 they must not abort the surrounding grid
    /// placement or tick.
    fn place_order(&mut self, ctx: &WorkerContext, side: OrderSide, price: Decimal) {
        let qty = round_down(self.order_amount_usd / price, QUANTITY_SCALE);
        if qty <= Decimal::ZERO {
            tracing::debug!(symbol = %self.symbol, %price, "grid quantity rounds to zero, skipping");
            return;
        }

        let client_order_id = next_client_order_id(&self.symbol);
        match ctx.block_on(ctx.exchange.create_limit_order(
            &self.symbol,
            side,
            qty,
            price,
            Some(client_order_id.clone()),
        )) {
            Ok(placed) => {
                let pending = PendingOrder {
                    order_id: placed.order_id,
                    side,
                    price,
                    qty,
                };
                match side {
                    OrderSide::Buy => self.pending_buys.insert(client_order_id, pending),
                    OrderSide::Sell => self.pending_sells.insert(client_order_id, pending),
                };
            }
            Err(error) => {
                tracing::warn!(symbol = %self.symbol, ?side, %price, %error, "grid order placement failed");
            }
        }
    }

    /// Resolves one pending order against the freshly-fetched open-order set. Binance's
    /// `openOrders` endpoint, by construction, only lists orders still `NEW`/`PARTIALLY_FILLED`
    /// — there is no single-order status query in this core's exchange operation set (§4.2),
    /// so an order's disappearance from that list cannot be distinguished from a fill versus a
    /// cancellation observed from elsewhere. This strategy treats disappearance as a fill (the
    /// common case for a grid that only cancels through its own `cancel_all`), matching the
    /// optimistic assumption the prototype's own (explicitly simulated) status check made.
    fn resolve_pending(
        &mut self,
        ctx: &WorkerContext,
        client_order_id: &str,
        open: Option<&tradehive_exchange::OpenOrderView>,
    ) -> Result<(), WorkerError> {
        let still_resting = matches!(
            open.map(|o| o.status),
            Some(OrderStatus::New) | Some(OrderStatus::PartiallyFilled)
        );
        if still_resting {
            return Ok(());
        }

        let terminal_without_replenishment = open
            .map(|o| o.status.is_terminal_without_replenishment())
            .unwrap_or(false);

        let order = match self.pending_buys.remove(client_order_id) {
            Some(order) => order,
            None => match self.pending_sells.remove(client_order_id) {
                Some(order) => order,
                None => return Ok(()),
            },
        };

        if terminal_without_replenishment {
            tracing::info!(
                symbol = %self.symbol, order_id = order.order_id, ?order.side,
                "grid order cancelled/rejected/expired, letting the grid thin"
            );
            return Ok(());
        }

        self.record_fill(ctx, &order, client_order_id)?;
        self.replenish(ctx, &order);
        Ok(())
    }

    fn record_fill(
        &mut self,
        ctx: &WorkerContext,
        order: &PendingOrder,
        client_order_id: &str,
    ) -> Result<(), WorkerError> {
        let trade_side = match order.side {
            OrderSide::Buy => TradeSide::Buy,
            OrderSide::Sell => TradeSide::Sell,
        };

        // Simplified placeholder P&L: only sells are credited, using `price - step` as the
        // assumed cost basis of the buy leg that preceded it. True cost-basis tracking across
        // a whole grid is out of scope here (§4.5, §9).
        let pnl_usd = match order.side {
            OrderSide::Sell => {
                let assumed_cost_basis = order.price - self.step;
                Some((order.price - assumed_cost_basis) * order.qty)
            }
            OrderSide::Buy => None,
        };

        let new_trade = NewTrade {
            symbol: self.symbol.clone(),
            order_id: order.order_id.to_string(),
            client_order_id: Some(client_order_id.to_string()),
            side: trade_side,
            price: order.price,
            quantity: order.qty,
            quote_quantity: order.price * order.qty,
            commission: None,
            commission_asset: None,
            pnl_usd,
        };

        let trade = ctx.block_on(ctx.store.create_trade(ctx.agent_id, new_trade))?;

        if let Some(bus) = &ctx.bus {
            let envelope = tradehive_bus::Envelope::new(
                "trade_executed",
                serde_json::json!({
                    "trade_id": trade.id,
                    "symbol": trade.symbol,
                    "side": trade.side.as_str(),
                    "price": trade.price,
                    "quantity": trade.quantity,
                    "pnl_usd": trade.pnl_usd,
                }),
            )
            .with_agent_id(ctx.agent_id)
            .with_group_id(ctx.group_id);
            bus.publish(tradehive_bus::CHANNEL_AGENT_EVENTS, &envelope);
        }

        Ok(())
    }

    fn replenish(&mut self, ctx: &WorkerContext, filled: &PendingOrder) {
        match filled.side {
            OrderSide::Buy => {
                let next_price = filled.price + self.step;
                if next_price <= self.upper {
                    self.place_order(ctx, OrderSide::Sell, next_price);
                }
            }
            OrderSide::Sell => {
                let next_price = filled.price - self.step;
                if next_price >= self.lower {
                    self.place_order(ctx, OrderSide::Buy, next_price);
                }
            }
        }
    }
}

fn next_client_order_id(symbol: &str) -> String {
    let seq = CLIENT_ORDER_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("grid-{symbol}-{seq}")
}

impl Strategy for GridStrategy {
    fn init(&mut self, ctx: &WorkerContext) -> Result<(), WorkerError> {
        self.cancel_all(ctx);
        self.place_initial_grid(ctx)
    }

    fn tick(&mut self, ctx: &WorkerContext) -> Result<(), WorkerError> {
        if self.pending_buys.is_empty() && self.pending_sells.is_empty() {
            return self.place_initial_grid(ctx);
        }

        let open_orders = ctx.block_on(ctx.exchange.get_open_orders(Some(&self.symbol)))?;
        let open_by_client_id: HashMap<&str, &tradehive_exchange::OpenOrderView> = open_orders
            .iter()
            .map(|order| (order.client_order_id.as_str(), order))
            .collect();

        let snapshot: Vec<String> = self
            .pending_buys
            .keys()
            .chain(self.pending_sells.keys())
            .cloned()
            .collect();

        for client_order_id in snapshot {
            if ctx.stop_requested() {
                break;
            }
            let open = open_by_client_id.get(client_order_id.as_str()).copied();
            self.resolve_pending(ctx, &client_order_id, open)?;
            thread::sleep(TICK_RESOLUTION_PACING);
        }

        Ok(())
    }

    fn cancel_all(&mut self, ctx: &WorkerContext) {
        for (_, order) in self.pending_buys.drain().chain(self.pending_sells.drain()) {
            if let Err(error) = ctx.block_on(ctx.exchange.cancel_order(&self.symbol, order.order_id)) {
                tracing::warn!(symbol = %self.symbol, order_id = order.order_id, %error, "grid cancel failed");
            }
        }
    }

    fn adapt(&mut self, params: serde_json::Value, runtime: &mut crate::runtime::RuntimeParameters) {
        runtime.apply(params);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{memory_context_with_exchange, MockExchangeClient};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    #[test]
    fn grid_lines_cover_the_full_range_with_uniform_step() {
        let strategy = GridStrategy::new("BTCUSDT".into(), dec!(60000), dec!(70000), 11, dec!(50));
        assert_eq!(strategy.grid_lines().len(), 11);
        assert_eq!(strategy.step(), dec!(1000));
        assert_eq!(strategy.grid_lines()[0], dec!(60000));
        assert_eq!(strategy.grid_lines()[10], dec!(70000));
    }

    #[test]
    fn minimum_levels_produces_one_step_two_lines() {
        let strategy = GridStrategy::new("BTCUSDT".into(), dec!(60000), dec!(70000), 2, dec!(50));
        assert_eq!(strategy.grid_lines(), &[dec!(60000), dec!(70000)]);
        assert_eq!(strategy.step(), dec!(10000));
    }

    #[test]
    fn client_order_ids_are_unique_per_call() {
        let a = next_client_order_id("BTCUSDT");
        let b = next_client_order_id("BTCUSDT");
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn place_initial_grid_splits_lines_into_buys_and_sells_around_current_price() {
        let exchange = Arc::new(MockExchangeClient::new(dec!(101)));
        let ctx = memory_context_with_exchange(1, None, exchange).await;
        let mut strategy = GridStrategy::new("BTCUSDT".into(), dec!(100), dec!(106), 3, dec!(50));

        strategy.place_initial_grid(&ctx).expect("initial placement succeeds");

        // lines [100, 103, 106] against a current price of 101: 100 is a buy, 103/106 are sells.
        assert_eq!(strategy.pending_buys.len(), 1);
        assert_eq!(strategy.pending_sells.len(), 2);
        assert!(strategy.pending_buys.values().any(|order| order.price == dec!(100)));
    }

    #[tokio::test]
    async fn fill_on_a_buy_leg_replenishes_a_sell_one_step_out() {
        let exchange = Arc::new(MockExchangeClient::new(dec!(101)));
        let ctx = memory_context_with_exchange(1, None, Arc::clone(&exchange)).await;
        let mut strategy = GridStrategy::new("BTCUSDT".into(), dec!(100), dec!(106), 3, dec!(50));

        strategy.init(&ctx).expect("init places the initial grid");
        assert_eq!(strategy.pending_buys.len(), 1);
        assert_eq!(strategy.pending_sells.len(), 2);

        let (client_order_id, filled) = strategy
            .pending_buys
            .iter()
            .next()
            .map(|(id, order)| (id.clone(), order.clone()))
            .expect("one pending buy");
        assert_eq!(filled.price, dec!(100));

        // Simulate the venue filling this order: it drops out of the open-orders response.
        exchange.mark_filled(&client_order_id);

        strategy.tick(&ctx).expect("tick resolves the fill and replenishes");

        assert!(!strategy.pending_buys.contains_key(&client_order_id));
        // The original sell at 103 is still resting, plus a new one replenished at 100+step(3).
        assert_eq!(strategy.pending_sells.len(), 3);
        assert!(strategy.pending_sells.values().filter(|o| o.price == dec!(103)).count() == 2);

        let trades = ctx
            .store
            .list_trades_for_agent(1, 0, 10)
            .await
            .expect("fetch persisted trades");
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].side, TradeSide::Buy);
        assert_eq!(trades[0].pnl_usd, None);
    }

    #[tokio::test]
    async fn fill_on_a_sell_leg_replenishes_a_buy_one_step_in_and_credits_pnl() {
        let exchange = Arc::new(MockExchangeClient::new(dec!(101)));
        let ctx = memory_context_with_exchange(1, None, Arc::clone(&exchange)).await;
        let mut strategy = GridStrategy::new("BTCUSDT".into(), dec!(100), dec!(106), 3, dec!(50));

        strategy.init(&ctx).expect("init places the initial grid");

        let (client_order_id, filled) = strategy
            .pending_sells
            .iter()
            .find(|(_, order)| order.price == dec!(106))
            .map(|(id, order)| (id.clone(), order.clone()))
            .expect("a pending sell at the top of the grid");

        exchange.mark_filled(&client_order_id);
        strategy.tick(&ctx).expect("tick resolves the fill and replenishes");

        assert!(!strategy.pending_sells.contains_key(&client_order_id));
        assert!(strategy.pending_buys.values().any(|order| order.price == dec!(103)));

        let trades = ctx
            .store
            .list_trades_for_agent(1, 0, 10)
            .await
            .expect("fetch persisted trades");
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].side, TradeSide::Sell);
        assert_eq!(trades[0].pnl_usd, Some(filled.qty * strategy.step()));
    }

    #[tokio::test]
    async fn cancelled_order_is_dropped_without_replenishment() {
        let exchange = Arc::new(MockExchangeClient::new(dec!(101)));
        let ctx = memory_context_with_exchange(1, None, Arc::clone(&exchange)).await;
        let mut strategy = GridStrategy::new("BTCUSDT".into(), dec!(100), dec!(106), 3, dec!(50));

        strategy.init(&ctx).expect("init places the initial grid");
        let buy_count_before = strategy.pending_buys.len();

        let (client_order_id, _) = strategy
            .pending_buys
            .iter()
            .next()
            .map(|(id, order)| (id.clone(), order.clone()))
            .expect("one pending buy");

        let cancelled_view = tradehive_exchange::OpenOrderView {
            symbol: "BTCUSDT".into(),
            order_id: 999,
            client_order_id: client_order_id.clone(),
            status: OrderStatus::Canceled,
            side: OrderSide::Buy,
            price: dec!(100),
            orig_qty: dec!(0.5),
            executed_qty: Decimal::ZERO,
        };
        strategy
            .resolve_pending(&ctx, &client_order_id, Some(&cancelled_view))
            .expect("resolves the cancellation");

        assert_eq!(strategy.pending_buys.len(), buy_count_before - 1);
        let trades = ctx
            .store
            .list_trades_for_agent(1, 0, 10)
            .await
            .expect("fetch persisted trades");
        assert!(trades.is_empty());
    }
}
