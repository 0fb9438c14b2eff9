use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;
use tradehive_bus::{CommunicationBus, Envelope, CHANNEL_GROUP_UPDATES, CHANNEL_LEARNING_MODULE};
use tradehive_persistence::{PersistenceError, Store};

/// Most recent P&L-bearing trades considered for trend detection (§4.7.1).
const TREND_WINDOW: usize = 500;
/// A generous upper bound on raw trades scanned to assemble that window; the store's
/// `list_trades_for_agent` has no "P&L-bearing only" filter, so this analyzer fetches more
/// than it needs and filters in memory.
const RAW_TRADE_SCAN_LIMIT: i64 = 20_000;
/// Slope threshold below which a negative P&L trend suggestion fires (§4.7.1).
const SLOPE_THRESHOLD_USD_PER_SEC: f64 = -0.0001;

/// Reads trade history and group membership (read-only) and emits suggestions/insights onto
/// the bus (§4.7). A collaborator component: its internals beyond the message shapes below
/// are not otherwise specified.
pub struct PerformanceAnalyzer {
    store: Store,
    bus: Option<Arc<CommunicationBus>>,
}

impl PerformanceAnalyzer {
    pub fn new(store: Store, bus: Option<Arc<CommunicationBus>>) -> Self {
        Self { store, bus }
    }

    /// Fits an OLS line of cumulative realized P&L against elapsed seconds over the agent's
    /// last [`TREND_WINDOW`] P&L-bearing trades. Publishes a `suggestion` on *learning_module*
    /// when the slope falls below [`SLOPE_THRESHOLD_USD_PER_SEC`]. Returns the slope (`None` if
    /// there are fewer than two P&L-bearing trades to fit a line against).
    pub async fn analyze_agent(&self, agent_id: i64) -> Result<Option<f64>, PersistenceError> {
        let trades = self
            .store
            .list_trades_for_agent(agent_id, 0, RAW_TRADE_SCAN_LIMIT)
            .await?;

        // `list_trades_for_agent` orders by timestamp descending; take the most recent
        // P&L-bearing trades, then reverse into chronological order for the fit.
        let mut window: Vec<_> = trades
            .into_iter()
            .filter(|trade| trade.pnl_usd.is_some())
            .take(TREND_WINDOW)
            .collect();
        window.reverse();

        if window.len() < 2 {
            return Ok(None);
        }

        let t0 = window[0].timestamp;
        let mut cumulative = 0.0_f64;
        let points: Vec<(f64, f64)> = window
            .iter()
            .map(|trade| {
                cumulative += trade.pnl_usd.unwrap_or(Decimal::ZERO).to_f64().unwrap_or(0.0);
                let elapsed_secs = (trade.timestamp - t0).num_milliseconds() as f64 / 1000.0;
                (elapsed_secs, cumulative)
            })
            .collect();

        let slope = ols_slope(&points);

        if slope < SLOPE_THRESHOLD_USD_PER_SEC {
            if let Some(bus) = &self.bus {
                let envelope = Envelope::new(
                    "suggestion",
                    serde_json::json!({
                        "agent_id": agent_id,
                        "suggestion": "negative realized P&L trend detected",
                        "details": {"slope_usd_per_sec": slope},
                    }),
                )
                .with_agent_id(agent_id);
                bus.publish(CHANNEL_LEARNING_MODULE, &envelope);
            }
        }

        Ok(Some(slope))
    }

    /// Group insight: the unweighted mean of member agents' realized P&L totals (§4.7.1).
    pub async fn analyze_group(&self, group_id: i64) -> Result<Decimal, PersistenceError> {
        let summary = self.store.group_pnl_summary(group_id).await?;
        let insight = if summary.total_agents > 0 {
            summary.aggregated_realized_pnl / Decimal::from(summary.total_agents)
        } else {
            Decimal::ZERO
        };

        if let Some(bus) = &self.bus {
            let envelope = Envelope::new(
                "insight",
                serde_json::json!({
                    "group_id": group_id,
                    "insight": "mean realized P&L across members",
                    "details": {"mean_realized_pnl": insight.to_string()},
                }),
            )
            .with_group_id(Some(group_id));
            bus.publish(CHANNEL_GROUP_UPDATES, &envelope);
        }

        Ok(insight)
    }
}

fn ols_slope(points: &[(f64, f64)]) -> f64 {
    let n = points.len() as f64;
    let sum_x: f64 = points.iter().map(|(x, _)| x).sum();
    let sum_y: f64 = points.iter().map(|(_, y)| y).sum();
    let sum_xy: f64 = points.iter().map(|(x, y)| x * y).sum();
    let sum_xx: f64 = points.iter().map(|(x, _)| x * x).sum();

    let denom = n * sum_xx - sum_x * sum_x;
    if denom.abs() < f64::EPSILON {
        return 0.0;
    }
    (n * sum_xy - sum_x * sum_y) / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ols_slope_of_a_perfect_line_matches_its_gradient() {
        let points = vec![(0.0, 0.0), (1.0, 2.0), (2.0, 4.0), (3.0, 6.0)];
        assert!((ols_slope(&points) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn ols_slope_of_flat_line_is_zero() {
        let points = vec![(0.0, 5.0), (1.0, 5.0), (2.0, 5.0)];
        assert!(ols_slope(&points).abs() < 1e-9);
    }

    #[test]
    fn ols_slope_handles_single_point_without_dividing_by_zero() {
        assert_eq!(ols_slope(&[(0.0, 1.0)]), 0.0);
    }

    #[tokio::test]
    async fn analyze_agent_with_no_trades_returns_none() {
        let store = tradehive_persistence::Store::connect(
            tradehive_persistence::DbKind::Sqlite,
            "sqlite::memory:",
        )
        .await
        .expect("in-memory store");
        let analyzer = PerformanceAnalyzer::new(store, None);
        assert_eq!(analyzer.analyze_agent(1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn analyze_group_with_no_members_is_zero() {
        let store = tradehive_persistence::Store::connect(
            tradehive_persistence::DbKind::Sqlite,
            "sqlite::memory:",
        )
        .await
        .expect("in-memory store");
        let group = store.create_group("alpha", None).await.expect("create group");
        let analyzer = PerformanceAnalyzer::new(store, None);
        assert_eq!(analyzer.analyze_group(group.id).await.unwrap(), Decimal::ZERO);
    }
}
