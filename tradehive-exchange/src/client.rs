use crate::{
    error::ExchangeError,
    http_parser::SpotHttpParser,
    requests::{
        CancelOrderRequest, CreateLimitOrderRequest, GetAssetBalanceRequest, GetOpenOrdersRequest,
        GetSymbolTickerRequest, OrderSide, PingRequest,
    },
    signer::{ApiKeySigner, SpotSigner},
};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use sha2::Sha256;
use tradehive_integration::protocol::http::{client::RestClient, private::PublicNoAuth};

/// API key + secret pair consumed at client construction (§6 "exchange credentials").
#[derive(Debug, Clone)]
pub struct ApiCredentials {
    pub key: String,
    pub secret: String,
}

/// A single placed or queried order, shaped to what the grid strategy needs (§4.2).
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedOrder {
    pub order_id: u64,
    pub client_order_id: String,
    pub status: OrderStatus,
    pub price: Decimal,
    pub orig_qty: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenOrderView {
    pub symbol: String,
    pub order_id: u64,
    pub client_order_id: String,
    pub status: OrderStatus,
    pub side: OrderSide,
    pub price: Decimal,
    pub orig_qty: Decimal,
    pub executed_qty: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Canceled,
    Rejected,
    Expired,
    Unknown,
}

impl OrderStatus {
    pub fn parse(value: &str) -> Self {
        match value {
            "NEW" => OrderStatus::New,
            "PARTIALLY_FILLED" => OrderStatus::PartiallyFilled,
            "FILLED" => OrderStatus::Filled,
            "CANCELED" => OrderStatus::Canceled,
            "REJECTED" => OrderStatus::Rejected,
            "EXPIRED" => OrderStatus::Expired,
            _ => OrderStatus::Unknown,
        }
    }

    pub fn is_terminal_without_replenishment(&self) -> bool {
        matches!(
            self,
            OrderStatus::Canceled | OrderStatus::Rejected | OrderStatus::Expired
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetBalance {
    pub asset: String,
    pub free: Decimal,
    pub locked: Decimal,
}

/// Typed facade over a remote spot-trading API (§4.2). Implementations are expected to be
/// cheap to clone/share: one instance lives for the whole process and is called concurrently
/// from every worker thread. Boxed via `#[async_trait]` so it can be held as `Arc<dyn
/// ExchangeClient>` by the manager and every worker.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Whether the client has valid credentials and can reach the venue.
    fn is_ready(&self) -> bool;

    async fn ping(&self) -> Result<(), ExchangeError>;
    async fn get_symbol_ticker(&self, symbol: &str) -> Result<Decimal, ExchangeError>;
    async fn get_current_price(&self, symbol: &str) -> Result<Decimal, ExchangeError> {
        self.get_symbol_ticker(symbol).await
    }
    async fn create_limit_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
        price: Decimal,
        client_order_id: Option<String>,
    ) -> Result<PlacedOrder, ExchangeError>;
    async fn get_open_orders(&self, symbol: Option<&str>) -> Result<Vec<OpenOrderView>, ExchangeError>;
    async fn cancel_order(&self, symbol: &str, order_id: u64) -> Result<(), ExchangeError>;
    async fn get_asset_balance(&self, asset: &str) -> Result<AssetBalance, ExchangeError>;
}

const HTTP_BASE_URL_SPOT: &str = "https://api.binance.com";

/// `reqwest`-backed [`ExchangeClient`] following the grounding codebase's
/// `RestClient<Strategy, Parser>` + `Signer` split (§4.2.1).
#[derive(Debug, Clone)]
pub struct SpotExchangeClient {
    public: RestClient<'static, PublicNoAuth, SpotHttpParser>,
    private: RestClient<'static, SpotSigner, SpotHttpParser>,
    ready: bool,
}

impl SpotExchangeClient {
    pub fn new(credentials: ApiCredentials) -> Self {
        Self::with_base_url(HTTP_BASE_URL_SPOT, credentials)
    }

    pub fn with_base_url(base_url: &'static str, credentials: ApiCredentials) -> Self {
        let ready = !credentials.key.is_empty() && !credentials.secret.is_empty();
        let hmac = Hmac::<Sha256>::new_from_slice(credentials.secret.as_bytes())
            .expect("hmac accepts key material of any length");

        Self {
            public: RestClient::new(base_url, PublicNoAuth, SpotHttpParser),
            private: RestClient::new(
                base_url,
                SpotSigner::new(ApiKeySigner::new(credentials.key), hmac),
                SpotHttpParser,
            ),
            ready,
        }
    }
}

#[async_trait]
impl ExchangeClient for SpotExchangeClient {
    fn is_ready(&self) -> bool {
        self.ready
    }

    async fn ping(&self) -> Result<(), ExchangeError> {
        self.public.execute(PingRequest).await?;
        Ok(())
    }

    async fn get_symbol_ticker(&self, symbol: &str) -> Result<Decimal, ExchangeError> {
        let response = self
            .public
            .execute(GetSymbolTickerRequest::new(symbol))
            .await?;
        Ok(response.price)
    }

    async fn create_limit_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
        price: Decimal,
        client_order_id: Option<String>,
    ) -> Result<PlacedOrder, ExchangeError> {
        if !self.ready {
            return Err(ExchangeError::ConfigAuth("client not ready".into()));
        }

        let response = self
            .private
            .execute(CreateLimitOrderRequest::new(
                symbol,
                side,
                quantity,
                price,
                client_order_id,
            ))
            .await?;

        Ok(PlacedOrder {
            order_id: response.order_id,
            client_order_id: response.client_order_id,
            status: OrderStatus::parse(&response.status),
            price: response.price,
            orig_qty: response.orig_qty,
        })
    }

    async fn get_open_orders(&self, symbol: Option<&str>) -> Result<Vec<OpenOrderView>, ExchangeError> {
        if !self.ready {
            return Err(ExchangeError::ConfigAuth("client not ready".into()));
        }

        let response = self
            .private
            .execute(GetOpenOrdersRequest::new(symbol.map(str::to_string)))
            .await?;

        Ok(response
            .into_iter()
            .map(|order| OpenOrderView {
                symbol: order.symbol,
                order_id: order.order_id,
                client_order_id: order.client_order_id,
                status: OrderStatus::parse(&order.status),
                side: if order.side == "BUY" {
                    OrderSide::Buy
                } else {
                    OrderSide::Sell
                },
                price: order.price,
                orig_qty: order.orig_qty,
                executed_qty: order.executed_qty,
            })
            .collect())
    }

    async fn cancel_order(&self, symbol: &str, order_id: u64) -> Result<(), ExchangeError> {
        if !self.ready {
            return Err(ExchangeError::ConfigAuth("client not ready".into()));
        }

        match self
            .private
            .execute(CancelOrderRequest::new(symbol, order_id))
            .await
        {
            Ok(_) => Ok(()),
            Err(ExchangeError::AlreadyGone(msg)) => {
                tracing::debug!(symbol, order_id, msg, "cancel target already gone");
                Ok(())
            }
            Err(other) => Err(other),
        }
    }

    async fn get_asset_balance(&self, asset: &str) -> Result<AssetBalance, ExchangeError> {
        if !self.ready {
            return Err(ExchangeError::ConfigAuth("client not ready".into()));
        }

        let response = self
            .private
            .execute(GetAssetBalanceRequest::new(asset, 5_000))
            .await?;

        Ok(AssetBalance {
            asset: response.asset,
            free: response.free,
            locked: response.locked,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_without_credentials_is_not_ready() {
        let client = SpotExchangeClient::new(ApiCredentials {
            key: String::new(),
            secret: "irrelevant".into(),
        });
        assert!(!client.is_ready());
    }

    #[test]
    fn client_with_credentials_is_ready() {
        let client = SpotExchangeClient::new(ApiCredentials {
            key: "key".into(),
            secret: "secret".into(),
        });
        assert!(client.is_ready());
    }

    #[test]
    fn order_status_recognizes_terminal_without_replenishment_states() {
        assert!(OrderStatus::Canceled.is_terminal_without_replenishment());
        assert!(OrderStatus::Rejected.is_terminal_without_replenishment());
        assert!(OrderStatus::Expired.is_terminal_without_replenishment());
        assert!(!OrderStatus::Filled.is_terminal_without_replenishment());
        assert!(!OrderStatus::New.is_terminal_without_replenishment());
    }
}
