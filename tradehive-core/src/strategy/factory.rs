use crate::strategy::{arbitrage::ArbitrageStrategy, grid::GridStrategy, Strategy};
use tradehive_persistence::{GridConfig, StrategyConfig};

/// Builds the boxed [`Strategy`] for a persisted [`StrategyConfig`], routing by its kind
/// (§4.4.1). Stateless: every call produces a fresh strategy instance seeded from `config`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StrategyFactory;

impl StrategyFactory {
    pub fn build(&self, config: &StrategyConfig) -> Box<dyn Strategy> {
        match config {
            StrategyConfig::Grid(grid) => Box::new(build_grid(grid)),
            StrategyConfig::Arbitrage(_) => Box::new(ArbitrageStrategy),
        }
    }
}

fn build_grid(config: &GridConfig) -> GridStrategy {
    GridStrategy::new(
        config.symbol.clone(),
        config.lower_price,
        config.upper_price,
        config.grid_levels,
        config.order_amount_usd,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tradehive_persistence::ArbitrageConfig;

    #[test]
    fn routes_grid_config_to_grid_strategy() {
        let factory = StrategyFactory;
        let config = StrategyConfig::Grid(GridConfig {
            symbol: "BTCUSDT".into(),
            lower_price: dec!(60000),
            upper_price: dec!(70000),
            grid_levels: 11,
            order_amount_usd: dec!(50),
            loop_interval_seconds: 10,
        });
        let strategy = factory.build(&config);
        // A boxed trait object gives us no downcast without `Any`; this just asserts
        // construction does not panic and produces a usable strategy.
        drop(strategy);
    }

    #[test]
    fn routes_arbitrage_config_to_arbitrage_strategy() {
        let factory = StrategyFactory;
        let config = StrategyConfig::Arbitrage(ArbitrageConfig {
            pair_1: "BTCUSDT".into(),
            pair_2: "ETHBTC".into(),
            pair_3: "ETHUSDT".into(),
            min_profit_pct: dec!(0.5),
            trade_amount_usd: dec!(100),
        });
        let strategy = factory.build(&config);
        drop(strategy);
    }
}
