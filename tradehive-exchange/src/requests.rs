use chrono::Utc;
use reqwest::Method;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tradehive_integration::protocol::http::rest::RestRequest;

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// `GET /api/v3/ping` — connectivity check, no params, public.
#[derive(Debug, Clone, Default)]
pub struct PingRequest;

impl RestRequest for PingRequest {
    type Response = serde_json::Value;
    type QueryParams = ();
    type Body = ();

    fn path(&self) -> String {
        "/api/v3/ping".to_string()
    }

    fn method() -> Method {
        Method::GET
    }
}

/// `GET /api/v3/ticker/price?symbol=...` — public.
#[derive(Debug, Clone, Serialize)]
pub struct SymbolTickerQuery {
    pub symbol: String,
}

#[derive(Debug, Clone)]
pub struct GetSymbolTickerRequest {
    query: SymbolTickerQuery,
}

impl GetSymbolTickerRequest {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            query: SymbolTickerQuery {
                symbol: symbol.into(),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SymbolTickerResponse {
    pub symbol: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
}

impl RestRequest for GetSymbolTickerRequest {
    type Response = SymbolTickerResponse;
    type QueryParams = SymbolTickerQuery;
    type Body = ();

    fn path(&self) -> String {
        "/api/v3/ticker/price".to_string()
    }

    fn method() -> Method {
        Method::GET
    }

    fn query_params(&self) -> Option<&Self::QueryParams> {
        Some(&self.query)
    }
}

/// `POST /api/v3/order` — signed; places a GTC limit order.
#[derive(Debug, Clone, Serialize)]
pub struct CreateLimitOrderQuery {
    pub symbol: String,
    pub side: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(rename = "timeInForce")]
    pub time_in_force: &'static str,
    pub quantity: String,
    pub price: String,
    #[serde(rename = "newClientOrderId", skip_serializing_if = "Option::is_none")]
    pub client_order_id: Option<String>,
    pub timestamp: i64,
    #[serde(rename = "recvWindow")]
    pub recv_window: u64,
}

#[derive(Debug, Clone)]
pub struct CreateLimitOrderRequest {
    query: CreateLimitOrderQuery,
}

impl CreateLimitOrderRequest {
    pub fn new(
        symbol: impl Into<String>,
        side: OrderSide,
        quantity: Decimal,
        price: Decimal,
        client_order_id: Option<String>,
    ) -> Self {
        Self {
            query: CreateLimitOrderQuery {
                symbol: symbol.into(),
                side: side.as_str().to_string(),
                kind: "LIMIT",
                time_in_force: "GTC",
                quantity: quantity.to_string(),
                price: price.to_string(),
                client_order_id,
                timestamp: now_millis(),
                recv_window: 5_000,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CreateLimitOrderResponse {
    #[serde(rename = "orderId")]
    pub order_id: u64,
    #[serde(rename = "clientOrderId")]
    pub client_order_id: String,
    pub status: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    #[serde(rename = "origQty", with = "rust_decimal::serde::str")]
    pub orig_qty: Decimal,
}

impl RestRequest for CreateLimitOrderRequest {
    type Response = CreateLimitOrderResponse;
    type QueryParams = CreateLimitOrderQuery;
    type Body = ();

    fn path(&self) -> String {
        "/api/v3/order".to_string()
    }

    fn method() -> Method {
        Method::POST
    }

    fn query_params(&self) -> Option<&Self::QueryParams> {
        Some(&self.query)
    }

    fn is_private() -> bool {
        true
    }
}

/// `GET /api/v3/openOrders` — signed; `symbol` optional (absent = all symbols).
#[derive(Debug, Clone, Serialize)]
pub struct GetOpenOrdersQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    pub timestamp: i64,
    #[serde(rename = "recvWindow")]
    pub recv_window: u64,
}

#[derive(Debug, Clone)]
pub struct GetOpenOrdersRequest {
    query: GetOpenOrdersQuery,
}

impl GetOpenOrdersRequest {
    pub fn new(symbol: Option<String>) -> Self {
        Self {
            query: GetOpenOrdersQuery {
                symbol,
                timestamp: now_millis(),
                recv_window: 5_000,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OpenOrder {
    pub symbol: String,
    #[serde(rename = "orderId")]
    pub order_id: u64,
    #[serde(rename = "clientOrderId")]
    pub client_order_id: String,
    pub status: String,
    pub side: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    #[serde(rename = "origQty", with = "rust_decimal::serde::str")]
    pub orig_qty: Decimal,
    #[serde(rename = "executedQty", with = "rust_decimal::serde::str")]
    pub executed_qty: Decimal,
}

impl RestRequest for GetOpenOrdersRequest {
    type Response = Vec<OpenOrder>;
    type QueryParams = GetOpenOrdersQuery;
    type Body = ();

    fn path(&self) -> String {
        "/api/v3/openOrders".to_string()
    }

    fn method() -> Method {
        Method::GET
    }

    fn query_params(&self) -> Option<&Self::QueryParams> {
        Some(&self.query)
    }

    fn is_private() -> bool {
        true
    }
}

/// `DELETE /api/v3/order` — signed; cancel by exchange order id.
#[derive(Debug, Clone, Serialize)]
pub struct CancelOrderQuery {
    pub symbol: String,
    #[serde(rename = "orderId")]
    pub order_id: u64,
    pub timestamp: i64,
    #[serde(rename = "recvWindow")]
    pub recv_window: u64,
}

#[derive(Debug, Clone)]
pub struct CancelOrderRequest {
    query: CancelOrderQuery,
}

impl CancelOrderRequest {
    pub fn new(symbol: impl Into<String>, order_id: u64) -> Self {
        Self {
            query: CancelOrderQuery {
                symbol: symbol.into(),
                order_id,
                timestamp: now_millis(),
                recv_window: 5_000,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CancelOrderResponse {
    #[serde(rename = "orderId")]
    pub order_id: u64,
    pub status: String,
}

impl RestRequest for CancelOrderRequest {
    type Response = CancelOrderResponse;
    type QueryParams = CancelOrderQuery;
    type Body = ();

    fn path(&self) -> String {
        "/api/v3/order".to_string()
    }

    fn method() -> Method {
        Method::DELETE
    }

    fn query_params(&self) -> Option<&Self::QueryParams> {
        Some(&self.query)
    }

    fn is_private() -> bool {
        true
    }
}

/// `GET /api/v3/account` filtered client-side to one asset — signed.
#[derive(Debug, Clone, Serialize)]
pub struct GetAssetBalanceQuery {
    pub asset: String,
    pub timestamp: i64,
    #[serde(rename = "recvWindow")]
    pub recv_window: u64,
}

#[derive(Debug, Clone)]
pub struct GetAssetBalanceRequest {
    query: GetAssetBalanceQuery,
}

impl GetAssetBalanceRequest {
    pub fn new(asset: impl Into<String>, recv_window: u64) -> Self {
        Self {
            query: GetAssetBalanceQuery {
                asset: asset.into(),
                timestamp: now_millis(),
                recv_window: if recv_window == 0 { 5_000 } else { recv_window },
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AssetBalanceResponse {
    pub asset: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub free: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub locked: Decimal,
}

impl RestRequest for GetAssetBalanceRequest {
    type Response = AssetBalanceResponse;
    type QueryParams = GetAssetBalanceQuery;
    type Body = ();

    fn path(&self) -> String {
        "/api/v3/account/balance".to_string()
    }

    fn method() -> Method {
        Method::GET
    }

    fn query_params(&self) -> Option<&Self::QueryParams> {
        Some(&self.query)
    }

    fn is_private() -> bool {
        true
    }
}
