use crate::{
    error::PersistenceError,
    models::{
        Agent, AgentGroup, AgentPnlSummary, AgentStatus, GroupPnlSummary, NewTrade, StrategyConfig,
        StrategyKind, Trade, TradeSide,
    },
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{any::AnyPoolOptions, AnyPool, Row};
use std::str::FromStr;

/// Which backend a [`Store`] is pooling against, chosen at startup from configuration
/// (§6 "database kind ∈ {sqlite, postgres}").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbKind {
    Sqlite,
    Postgres,
}

/// Durable record of groups, agents and trades (§4.1). Backed by a single `sqlx::AnyPool` so
/// the same query text runs unmodified against either backend; only schema creation branches
/// on [`DbKind`], since primary-key auto-increment syntax is not portable.
#[derive(Clone)]
pub struct Store {
    pool: AnyPool,
    kind: DbKind,
}

impl Store {
    pub async fn connect(kind: DbKind, url: &str) -> Result<Self, PersistenceError> {
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new().max_connections(5).connect(url).await?;
        let store = Self { pool, kind };
        store.create_schema().await?;
        Ok(store)
    }

    async fn create_schema(&self) -> Result<(), PersistenceError> {
        let pk = match self.kind {
            DbKind::Sqlite => "INTEGER PRIMARY KEY AUTOINCREMENT",
            DbKind::Postgres => "BIGSERIAL PRIMARY KEY",
        };

        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS agent_groups (
                id {pk},
                name TEXT NOT NULL UNIQUE,
                description TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )"
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS agents (
                id {pk},
                name TEXT NOT NULL,
                strategy_kind TEXT NOT NULL,
                config TEXT NOT NULL,
                status TEXT NOT NULL,
                status_message TEXT,
                group_id BIGINT REFERENCES agent_groups(id),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )"
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS trades (
                id {pk},
                agent_id BIGINT NOT NULL REFERENCES agents(id) ON DELETE CASCADE,
                timestamp TEXT NOT NULL,
                symbol TEXT NOT NULL,
                order_id TEXT NOT NULL UNIQUE,
                client_order_id TEXT,
                side TEXT NOT NULL,
                price TEXT NOT NULL,
                quantity TEXT NOT NULL,
                quote_quantity TEXT NOT NULL,
                commission TEXT,
                commission_asset TEXT,
                pnl_usd TEXT
            )"
        ))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ---- groups -----------------------------------------------------------------------

    pub async fn create_group(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<AgentGroup, PersistenceError> {
        if self.get_group_by_name(name).await?.is_some() {
            return Err(PersistenceError::DuplicateGroupName(name.to_string()));
        }

        let now = Utc::now();
        let row = sqlx::query(
            "INSERT INTO agent_groups (name, description, created_at, updated_at)
             VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(name)
        .bind(description)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .fetch_one(&self.pool)
        .await?;

        let id: i64 = row.try_get("id")?;
        Ok(AgentGroup {
            id,
            name: name.to_string(),
            description: description.map(str::to_string),
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn get_group_by_id(&self, id: i64) -> Result<Option<AgentGroup>, PersistenceError> {
        let row = sqlx::query("SELECT * FROM agent_groups WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_group).transpose()
    }

    pub async fn get_group_by_name(&self, name: &str) -> Result<Option<AgentGroup>, PersistenceError> {
        let row = sqlx::query("SELECT * FROM agent_groups WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_group).transpose()
    }

    pub async fn list_groups(&self, skip: i64, limit: i64) -> Result<Vec<AgentGroup>, PersistenceError> {
        let rows = sqlx::query("SELECT * FROM agent_groups ORDER BY id LIMIT ? OFFSET ?")
            .bind(limit)
            .bind(skip)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_group).collect()
    }

    pub async fn update_group(
        &self,
        id: i64,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<AgentGroup, PersistenceError> {
        let mut group = self
            .get_group_by_id(id)
            .await?
            .ok_or(PersistenceError::GroupNotFound(id))?;

        if let Some(name) = name {
            if name != group.name {
                if self.get_group_by_name(name).await?.is_some() {
                    return Err(PersistenceError::DuplicateGroupName(name.to_string()));
                }
                group.name = name.to_string();
            }
        }
        if let Some(description) = description {
            group.description = Some(description.to_string());
        }
        group.updated_at = Utc::now();

        sqlx::query("UPDATE agent_groups SET name = ?, description = ?, updated_at = ? WHERE id = ?")
            .bind(&group.name)
            .bind(&group.description)
            .bind(group.updated_at.to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(group)
    }

    pub async fn delete_group(&self, id: i64) -> Result<bool, PersistenceError> {
        let member_count: i64 = sqlx::query("SELECT COUNT(*) AS n FROM agents WHERE group_id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await?
            .try_get("n")?;
        if member_count > 0 {
            return Err(PersistenceError::GroupNotEmpty(id));
        }

        let result = sqlx::query("DELETE FROM agent_groups WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ---- agents -----------------------------------------------------------------------

    pub async fn create_agent(
        &self,
        name: &str,
        config: StrategyConfig,
        group_id: Option<i64>,
    ) -> Result<Agent, PersistenceError> {
        config
            .validate()
            .map_err(PersistenceError::Validation)?;
        if let Some(group_id) = group_id {
            self.get_group_by_id(group_id)
                .await?
                .ok_or(PersistenceError::GroupNotFound(group_id))?;
        }

        let now = Utc::now();
        let kind = config.kind();
        let config_json = serde_json::to_string(&config)?;

        let row = sqlx::query(
            "INSERT INTO agents
                (name, strategy_kind, config, status, status_message, group_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, NULL, ?, ?, ?) RETURNING id",
        )
        .bind(name)
        .bind(kind.as_str())
        .bind(&config_json)
        .bind(AgentStatus::Created.as_str())
        .bind(group_id)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .fetch_one(&self.pool)
        .await?;

        let id: i64 = row.try_get("id")?;
        Ok(Agent {
            id,
            name: name.to_string(),
            strategy_kind: kind,
            config,
            status: AgentStatus::Created,
            status_message: None,
            group_id,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn get_agent_by_id(&self, id: i64) -> Result<Option<Agent>, PersistenceError> {
        let row = sqlx::query("SELECT * FROM agents WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_agent).transpose()
    }

    pub async fn list_agents(&self, skip: i64, limit: i64) -> Result<Vec<Agent>, PersistenceError> {
        let rows = sqlx::query("SELECT * FROM agents ORDER BY id LIMIT ? OFFSET ?")
            .bind(limit)
            .bind(skip)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_agent).collect()
    }

    pub async fn list_agents_in_group(&self, group_id: i64) -> Result<Vec<Agent>, PersistenceError> {
        let rows = sqlx::query("SELECT * FROM agents WHERE group_id = ? ORDER BY id")
            .bind(group_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_agent).collect()
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn update_agent(
        &self,
        id: i64,
        name: Option<&str>,
        config: Option<StrategyConfig>,
        group_id: Option<i64>,
        clear_group: bool,
    ) -> Result<Agent, PersistenceError> {
        let mut agent = self
            .get_agent_by_id(id)
            .await?
            .ok_or(PersistenceError::AgentNotFound(id))?;

        if let Some(name) = name {
            agent.name = name.to_string();
        }
        if let Some(config) = config {
            if config.kind() != agent.strategy_kind {
                return Err(PersistenceError::Validation(
                    "strategy kind is immutable".into(),
                ));
            }
            config.validate().map_err(PersistenceError::Validation)?;
            agent.config = config;
        }
        if clear_group {
            agent.group_id = None;
        } else if let Some(group_id) = group_id {
            self.get_group_by_id(group_id)
                .await?
                .ok_or(PersistenceError::GroupNotFound(group_id))?;
            agent.group_id = Some(group_id);
        }
        agent.updated_at = Utc::now();

        let config_json = serde_json::to_string(&agent.config)?;
        sqlx::query(
            "UPDATE agents SET name = ?, config = ?, group_id = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&agent.name)
        .bind(&config_json)
        .bind(agent.group_id)
        .bind(agent.updated_at.to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(agent)
    }

    pub async fn update_agent_status(
        &self,
        id: i64,
        status: AgentStatus,
        message: Option<&str>,
    ) -> Result<Agent, PersistenceError> {
        let now = Utc::now();
        sqlx::query(
            "UPDATE agents SET status = ?, status_message = ?, updated_at = ? WHERE id = ?",
        )
        .bind(status.as_str())
        .bind(message)
        .bind(now.to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.get_agent_by_id(id)
            .await?
            .ok_or(PersistenceError::AgentNotFound(id))
    }

    pub async fn delete_agent(&self, id: i64) -> Result<bool, PersistenceError> {
        let result = sqlx::query("DELETE FROM agents WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ---- trades -----------------------------------------------------------------------

    pub async fn create_trade(&self, agent_id: i64, trade: NewTrade) -> Result<Trade, PersistenceError> {
        self.get_agent_by_id(agent_id)
            .await?
            .ok_or(PersistenceError::AgentNotFound(agent_id))?;

        let existing = sqlx::query("SELECT id FROM trades WHERE order_id = ?")
            .bind(&trade.order_id)
            .fetch_optional(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(PersistenceError::DuplicateOrderId(trade.order_id));
        }

        let timestamp = Utc::now();
        let row = sqlx::query(
            "INSERT INTO trades
                (agent_id, timestamp, symbol, order_id, client_order_id, side, price, quantity,
                 quote_quantity, commission, commission_asset, pnl_usd)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(agent_id)
        .bind(timestamp.to_rfc3339())
        .bind(&trade.symbol)
        .bind(&trade.order_id)
        .bind(&trade.client_order_id)
        .bind(trade.side.as_str())
        .bind(trade.price.to_string())
        .bind(trade.quantity.to_string())
        .bind(trade.quote_quantity.to_string())
        .bind(trade.commission.map(|d| d.to_string()))
        .bind(&trade.commission_asset)
        .bind(trade.pnl_usd.map(|d| d.to_string()))
        .fetch_one(&self.pool)
        .await?;

        let id: i64 = row.try_get("id")?;
        Ok(Trade {
            id,
            agent_id,
            timestamp,
            symbol: trade.symbol,
            order_id: trade.order_id,
            client_order_id: trade.client_order_id,
            side: trade.side,
            price: trade.price,
            quantity: trade.quantity,
            quote_quantity: trade.quote_quantity,
            commission: trade.commission,
            commission_asset: trade.commission_asset,
            pnl_usd: trade.pnl_usd,
        })
    }

    pub async fn list_trades_for_agent(
        &self,
        agent_id: i64,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Trade>, PersistenceError> {
        let rows = sqlx::query(
            "SELECT * FROM trades WHERE agent_id = ? ORDER BY timestamp DESC LIMIT ? OFFSET ?",
        )
        .bind(agent_id)
        .bind(limit)
        .bind(skip)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_trade).collect()
    }

    // ---- derived reads ------------------------------------------------------------------

    pub async fn agent_pnl_summary(&self, agent_id: i64) -> Result<AgentPnlSummary, PersistenceError> {
        let trades = self.list_trades_for_agent(agent_id, 0, i64::MAX).await?;
        let realized_total = trades.iter().filter_map(|t| t.pnl_usd).sum();

        let cutoff = Utc::now() - chrono::Duration::hours(24);
        let pnl_24h = trades
            .iter()
            .filter(|t| t.timestamp >= cutoff)
            .filter_map(|t| t.pnl_usd)
            .sum();

        Ok(AgentPnlSummary {
            realized_total,
            unrealized: Decimal::ZERO,
            pnl_24h,
        })
    }

    pub async fn group_pnl_summary(&self, group_id: i64) -> Result<GroupPnlSummary, PersistenceError> {
        let agents = self.list_agents_in_group(group_id).await?;
        let mut per_agent = Vec::with_capacity(agents.len());
        let mut aggregated = Decimal::ZERO;

        for agent in &agents {
            let summary = self.agent_pnl_summary(agent.id).await?;
            aggregated += summary.realized_total;
            per_agent.push((agent.id, summary.realized_total));
        }

        Ok(GroupPnlSummary {
            total_agents: agents.len() as i64,
            aggregated_realized_pnl: aggregated,
            per_agent,
        })
    }
}

fn row_to_group(row: &sqlx::any::AnyRow) -> Result<AgentGroup, PersistenceError> {
    Ok(AgentGroup {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        created_at: parse_timestamp(row, "created_at")?,
        updated_at: parse_timestamp(row, "updated_at")?,
    })
}

fn row_to_agent(row: &sqlx::any::AnyRow) -> Result<Agent, PersistenceError> {
    let kind_raw: String = row.try_get("strategy_kind")?;
    let strategy_kind = StrategyKind::parse(&kind_raw)
        .ok_or_else(|| PersistenceError::Validation(format!("unknown strategy_kind '{kind_raw}'")))?;
    let config_raw: String = row.try_get("config")?;
    let config: StrategyConfig = serde_json::from_str(&config_raw)?;

    let status_raw: String = row.try_get("status")?;
    let status = AgentStatus::parse(&status_raw)
        .ok_or_else(|| PersistenceError::Validation(format!("unknown status '{status_raw}'")))?;

    Ok(Agent {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        strategy_kind,
        config,
        status,
        status_message: row.try_get("status_message")?,
        group_id: row.try_get("group_id")?,
        created_at: parse_timestamp(row, "created_at")?,
        updated_at: parse_timestamp(row, "updated_at")?,
    })
}

fn row_to_trade(row: &sqlx::any::AnyRow) -> Result<Trade, PersistenceError> {
    let side_raw: String = row.try_get("side")?;
    let side = TradeSide::parse(&side_raw)
        .ok_or_else(|| PersistenceError::Validation(format!("unknown trade side '{side_raw}'")))?;

    Ok(Trade {
        id: row.try_get("id")?,
        agent_id: row.try_get("agent_id")?,
        timestamp: parse_timestamp(row, "timestamp")?,
        symbol: row.try_get("symbol")?,
        order_id: row.try_get("order_id")?,
        client_order_id: row.try_get("client_order_id")?,
        side,
        price: parse_decimal(row, "price")?,
        quantity: parse_decimal(row, "quantity")?,
        quote_quantity: parse_decimal(row, "quote_quantity")?,
        commission: parse_decimal_opt(row, "commission")?,
        commission_asset: row.try_get("commission_asset")?,
        pnl_usd: parse_decimal_opt(row, "pnl_usd")?,
    })
}

fn parse_timestamp(row: &sqlx::any::AnyRow, column: &str) -> Result<DateTime<Utc>, PersistenceError> {
    let raw: String = row.try_get(column)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| PersistenceError::Validation(format!("bad timestamp in '{column}': {e}")))
}

fn parse_decimal(row: &sqlx::any::AnyRow, column: &str) -> Result<Decimal, PersistenceError> {
    let raw: String = row.try_get(column)?;
    Decimal::from_str(&raw)
        .map_err(|e| PersistenceError::Validation(format!("bad decimal in '{column}': {e}")))
}

fn parse_decimal_opt(row: &sqlx::any::AnyRow, column: &str) -> Result<Option<Decimal>, PersistenceError> {
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|raw| {
        Decimal::from_str(&raw)
            .map_err(|e| PersistenceError::Validation(format!("bad decimal in '{column}': {e}")))
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GridConfig;
    use rust_decimal_macros::dec;

    async fn memory_store() -> Store {
        Store::connect(DbKind::Sqlite, "sqlite::memory:")
            .await
            .expect("in-memory sqlite store")
    }

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

    #[tokio::test]
    async fn create_then_get_by_id_round_trips() {
        let store = memory_store().await;
        let agent = store
            .create_agent("g1", grid_config(), None)
            .await
            .expect("create agent");
        let fetched = store
            .get_agent_by_id(agent.id)
            .await
            .expect("get agent")
            .expect("agent present");
        assert_eq!(agent.name, fetched.name);
        assert_eq!(agent.config, fetched.config);
        assert_eq!(fetched.status, AgentStatus::Created);
    }

    #[tokio::test]
    async fn duplicate_group_name_is_rejected() {
        let store = memory_store().await;
        store.create_group("alpha", None).await.expect("create");
        let err = store.create_group("alpha", None).await.unwrap_err();
        assert!(matches!(err, PersistenceError::DuplicateGroupName(_)));
    }

    #[tokio::test]
    async fn group_with_members_cannot_be_deleted() {
        let store = memory_store().await;
        let group = store.create_group("alpha", None).await.expect("create group");
        store
            .create_agent("g1", grid_config(), Some(group.id))
            .await
            .expect("create agent");

        let err = store.delete_group(group.id).await.unwrap_err();
        assert!(matches!(err, PersistenceError::GroupNotEmpty(_)));
    }

    #[tokio::test]
    async fn deleting_agent_cascades_its_trades() {
        let store = memory_store().await;
        let agent = store
            .create_agent("g1", grid_config(), None)
            .await
            .expect("create agent");
        store
            .create_trade(
                agent.id,
                NewTrade {
                    symbol: "BTCUSDT".into(),
                    order_id: "order-1".into(),
                    client_order_id: None,
                    side: TradeSide::Buy,
                    price: dec!(64000),
                    quantity: dec!(0.001),
                    quote_quantity: dec!(64),
                    commission: None,
                    commission_asset: None,
                    pnl_usd: None,
                },
            )
            .await
            .expect("create trade");

        store.delete_agent(agent.id).await.expect("delete agent");
        let trades = store
            .list_trades_for_agent(agent.id, 0, 10)
            .await
            .expect("list trades");
        assert!(trades.is_empty());
    }

    #[tokio::test]
    async fn trade_order_id_must_be_unique() {
        let store = memory_store().await;
        let agent = store
            .create_agent("g1", grid_config(), None)
            .await
            .expect("create agent");
        let new_trade = |order_id: &str| NewTrade {
            symbol: "BTCUSDT".into(),
            order_id: order_id.into(),
            client_order_id: None,
            side: TradeSide::Buy,
            price: dec!(64000),
            quantity: dec!(0.001),
            quote_quantity: dec!(64),
            commission: None,
            commission_asset: None,
            pnl_usd: None,
        };

        store.create_trade(agent.id, new_trade("dup")).await.expect("first");
        let err = store
            .create_trade(agent.id, new_trade("dup"))
            .await
            .unwrap_err();
        assert!(matches!(err, PersistenceError::DuplicateOrderId(_)));
    }
}
