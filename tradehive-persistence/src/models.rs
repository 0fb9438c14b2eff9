use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Lifecycle position of an [`Agent`]. Mirrors the worker state machine one-to-one; the
/// persisted value always lags the in-memory state by whatever it takes to issue the write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Created,
    Starting,
    Running,
    Stopping,
    Stopped,
    Error,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Created => "created",
            AgentStatus::Starting => "starting",
            AgentStatus::Running => "running",
            AgentStatus::Stopping => "stopping",
            AgentStatus::Stopped => "stopped",
            AgentStatus::Error => "error",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "created" => AgentStatus::Created,
            "starting" => AgentStatus::Starting,
            "running" => AgentStatus::Running,
            "stopping" => AgentStatus::Stopping,
            "stopped" => AgentStatus::Stopped,
            "error" => AgentStatus::Error,
            _ => return None,
        })
    }
}

/// Which strategy a given [`Agent`] runs. The kind is immutable once an agent is created;
/// only the configuration document under it can be updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Grid,
    Arbitrage,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Grid => "grid",
            StrategyKind::Arbitrage => "arbitrage",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "grid" => StrategyKind::Grid,
            "arbitrage" => StrategyKind::Arbitrage,
            _ => return None,
        })
    }
}

/// Grid strategy configuration (§3 grid kind). `loop_interval_seconds` defaults to 10 when
/// absent from the wire payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    pub symbol: String,
    pub lower_price: Decimal,
    pub upper_price: Decimal,
    pub grid_levels: u32,
    pub order_amount_usd: Decimal,
    #[serde(default = "default_loop_interval")]
    pub loop_interval_seconds: u64,
}

fn default_loop_interval() -> u64 {
    10
}

/// Arbitrage strategy configuration. Recognized and validated end-to-end even though the
/// runtime worker tick is a stub (see [`crate::error::PersistenceError`] is unaffected by
/// this; the stub lives in the strategy runtime, not here).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbitrageConfig {
    pub pair_1: String,
    pub pair_2: String,
    pub pair_3: String,
    pub min_profit_pct: Decimal,
    pub trade_amount_usd: Decimal,
}

/// Tagged union over the two recognized strategy configuration shapes. Stored as a JSON
/// document in the `agents.config` column; `kind` in the wrapping [`Agent`] row is what
/// selects which variant deserialises against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StrategyConfig {
    Grid(GridConfig),
    Arbitrage(ArbitrageConfig),
}

impl StrategyConfig {
    pub fn kind(&self) -> StrategyKind {
        match self {
            StrategyConfig::Grid(_) => StrategyKind::Grid,
            StrategyConfig::Arbitrage(_) => StrategyKind::Arbitrage,
        }
    }

    /// Loop interval a freshly-started worker seeds its runtime parameters with. Arbitrage
    /// configs carry no such field (§3); it falls back to the grid default.
    pub fn loop_interval_seconds(&self) -> u64 {
        match self {
            StrategyConfig::Grid(cfg) => cfg.loop_interval_seconds,
            StrategyConfig::Arbitrage(_) => default_loop_interval(),
        }
    }

    /// Validates the numeric/shape invariants from §3. Called on create and on update.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            StrategyConfig::Grid(cfg) => {
                if cfg.symbol.trim().is_empty() {
                    return Err("grid.symbol must not be empty".into());
                }
                if cfg.lower_price <= Decimal::ZERO {
                    return Err("grid.lower_price must be > 0".into());
                }
                if cfg.upper_price <= cfg.lower_price {
                    return Err("grid.upper_price must be > lower_price".into());
                }
                if cfg.grid_levels < 2 {
                    return Err("grid.grid_levels must be >= 2".into());
                }
                if cfg.order_amount_usd <= Decimal::ZERO {
                    return Err("grid.order_amount_usd must be > 0".into());
                }
                Ok(())
            }
            StrategyConfig::Arbitrage(cfg) => {
                if cfg.pair_1.trim().is_empty()
                    || cfg.pair_2.trim().is_empty()
                    || cfg.pair_3.trim().is_empty()
                {
                    return Err("arbitrage pairs must not be empty".into());
                }
                if cfg.min_profit_pct <= Decimal::ZERO {
                    return Err("arbitrage.min_profit_pct must be > 0".into());
                }
                if cfg.trade_amount_usd <= Decimal::ZERO {
                    return Err("arbitrage.trade_amount_usd must be > 0".into());
                }
                Ok(())
            }
        }
    }
}

/// Organizational container for agents (§3 AgentGroup).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentGroup {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The durable definition of a strategy instance (§3 Agent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: i64,
    pub name: String,
    pub strategy_kind: StrategyKind,
    pub config: StrategyConfig,
    pub status: AgentStatus,
    pub status_message: Option<String>,
    pub group_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Record of a filled order (§3 Trade). Immutable once written; `order_id` is globally
/// unique, enforced by the schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: i64,
    pub agent_id: i64,
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub order_id: String,
    pub client_order_id: Option<String>,
    pub side: TradeSide,
    pub price: Decimal,
    pub quantity: Decimal,
    pub quote_quantity: Decimal,
    pub commission: Option<Decimal>,
    pub commission_asset: Option<String>,
    pub pnl_usd: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "BUY",
            TradeSide::Sell => "SELL",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "BUY" => TradeSide::Buy,
            "SELL" => TradeSide::Sell,
            _ => return None,
        })
    }
}

/// Payload accepted by [`crate::store::Store::create_trade`]; timestamp/id are assigned by
/// the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTrade {
    pub symbol: String,
    pub order_id: String,
    pub client_order_id: Option<String>,
    pub side: TradeSide,
    pub price: Decimal,
    pub quantity: Decimal,
    pub quote_quantity: Decimal,
    pub commission: Option<Decimal>,
    pub commission_asset: Option<String>,
    pub pnl_usd: Option<Decimal>,
}

/// Derived read: §4.1 `agentPnlSummary`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentPnlSummary {
    pub realized_total: Decimal,
    pub unrealized: Decimal,
    pub pnl_24h: Decimal,
}

/// Derived read: §4.1 `groupPnlSummary`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupPnlSummary {
    pub total_agents: i64,
    pub aggregated_realized_pnl: Decimal,
    pub per_agent: Vec<(i64, Decimal)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn grid_config_rejects_inverted_range() {
        let cfg = StrategyConfig::Grid(GridConfig {
            symbol: "BTCUSDT".into(),
            lower_price: dec!(70000),
            upper_price: dec!(60000),
            grid_levels: 11,
            order_amount_usd: dec!(50),
            loop_interval_seconds: 10,
        });
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn grid_config_accepts_minimum_levels() {
        let cfg = StrategyConfig::Grid(GridConfig {
            symbol: "BTCUSDT".into(),
            lower_price: dec!(60000),
            upper_price: dec!(70000),
            grid_levels: 2,
            order_amount_usd: dec!(50),
            loop_interval_seconds: 10,
        });
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.kind(), StrategyKind::Grid);
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            AgentStatus::Created,
            AgentStatus::Starting,
            AgentStatus::Running,
            AgentStatus::Stopping,
            AgentStatus::Stopped,
            AgentStatus::Error,
        ] {
            assert_eq!(AgentStatus::parse(status.as_str()), Some(status));
        }
    }
}
