use crate::{error::WorkerError, runtime::WorkerContext, strategy::Strategy};

/// Registered so `create`/`start` route correctly by persisted `strategy_kind` (§4.4.1), but
/// its tick is out of spec.md's worker budget: triangular arbitrage detection/execution is not
/// implemented here.
pub struct ArbitrageStrategy;

impl Strategy for ArbitrageStrategy {
    fn init(&mut self, _ctx: &WorkerContext) -> Result<(), WorkerError> {
        Ok(())
    }

    fn tick(&mut self, _ctx: &WorkerContext) -> Result<(), WorkerError> {
        Err(WorkerError::Unimplemented("arbitrage tick"))
    }

    fn cancel_all(&mut self, _ctx: &WorkerContext) {}

    fn adapt(&mut self, params: serde_json::Value, runtime: &mut crate::runtime::RuntimeParameters) {
        runtime.apply(params);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::memory_context;

    #[tokio::test]
    async fn init_and_adapt_succeed_but_tick_is_unimplemented() {
        let ctx = memory_context(1, None).await;
        let mut strategy = ArbitrageStrategy;

        assert!(strategy.init(&ctx).is_ok());
        let mut runtime = crate::runtime::RuntimeParameters::new(10);
        strategy.adapt(serde_json::json!({"min_profit_pct": 1.5}), &mut runtime);

        assert!(matches!(
            strategy.tick(&ctx),
            Err(WorkerError::Unimplemented("arbitrage tick"))
        ));
    }
}
