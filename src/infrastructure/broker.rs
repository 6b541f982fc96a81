//! REST broker adapter. One struct serves both the futures-routed and the
//! equity-routed adapter spec 4.7 calls for -- they differ only in
//! `broker_type`/`asset_class`/base URL/credentials, not in wire handling,
//! so a single generic implementation stands in for both rather than two
//! near-duplicate structs.

use crate::domain::broker::{BrokerAdapter, BrokerType, NormalizedOrderStatus, OrderResult, UnifiedOrder};
use crate::domain::errors::BrokerError;
use crate::domain::signal::{AssetClass, Direction};
use crate::domain::trading::{AggregatedAccount, Position};
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::RwLock;
use tracing::{error, warn};

use super::http_client_factory::HttpClientFactory;

#[derive(Debug, Deserialize)]
struct WireAccount {
    equity: String,
    cash: String,
    buying_power: String,
    day_trades_remaining: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct WirePosition {
    symbol: String,
    quantity: String,
    average_price: String,
}

#[derive(Debug, Deserialize)]
struct WireOrderResult {
    broker_order_id: String,
    client_order_id: String,
    status: String,
    filled_quantity: String,
    avg_fill_price: Option<String>,
    submitted_at: i64,
}

fn parse_decimal(value: &str) -> Decimal {
    Decimal::from_str(value).unwrap_or_default()
}

fn normalize_status(raw: &str) -> NormalizedOrderStatus {
    match raw.to_ascii_uppercase().as_str() {
        "OPEN" => NormalizedOrderStatus::Open,
        "FILLED" => NormalizedOrderStatus::Filled,
        "PARTIALLY_FILLED" => NormalizedOrderStatus::PartiallyFilled,
        "CANCELLED" | "CANCELED" => NormalizedOrderStatus::Cancelled,
        "REJECTED" => NormalizedOrderStatus::Rejected,
        "EXPIRED" => NormalizedOrderStatus::Expired,
        _ => NormalizedOrderStatus::Pending,
    }
}

/// REST adapter wrapping one venue. Retries on network failure / 5xx are
/// handled by the shared middleware client; a 401 here triggers a single
/// token refresh and re-issue, and `OrderRejected`/422/4xx-other-than-401
/// propagate immediately without retry, per spec 4.7.
pub struct RestBrokerAdapter {
    client: ClientWithMiddleware,
    base_url: String,
    api_key: String,
    api_secret: String,
    broker_type: BrokerType,
    asset_class: AssetClass,
    supported_symbols: Vec<String>,
    token: RwLock<Option<String>>,
}

impl RestBrokerAdapter {
    pub fn new(
        base_url: String,
        api_key: String,
        api_secret: String,
        broker_type: BrokerType,
        asset_class: AssetClass,
        supported_symbols: Vec<String>,
    ) -> Self {
        Self {
            client: HttpClientFactory::create_client(),
            base_url,
            api_key,
            api_secret,
            broker_type,
            asset_class,
            supported_symbols,
            token: RwLock::new(None),
        }
    }

    fn auth_header(&self) -> String {
        let token = self.token.read().expect("token lock poisoned").clone();
        token.unwrap_or_else(|| format!("{}:{}", self.api_key, self.api_secret))
    }

    async fn refresh_token(&self) -> Result<(), BrokerError> {
        let response = self
            .client
            .post(format!("{}/auth/token", self.base_url))
            .json(&serde_json::json!({ "apiKey": self.api_key, "apiSecret": self.api_secret }))
            .send()
            .await
            .map_err(|e| BrokerError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BrokerError::AuthError(format!("token refresh failed with status {}", response.status())));
        }

        #[derive(Deserialize)]
        struct TokenResponse {
            token: String,
        }
        let parsed: TokenResponse = response.json().await.map_err(|e| BrokerError::InvalidResponse(e.to_string()))?;
        *self.token.write().expect("token lock poisoned") = Some(parsed.token);
        Ok(())
    }

    /// Issues one request, refreshing the token and retrying exactly once on
    /// a 401. Any other non-success status maps to the appropriate
    /// `BrokerError` without further retry -- transient/5xx retries already
    /// happened inside `self.client`.
    async fn request_json<T: for<'de> Deserialize<'de>>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, BrokerError> {
        for attempt in 0..2 {
            let mut request = self.client.request(method.clone(), format!("{}{}", self.base_url, path)).header("Authorization", self.auth_header());
            if let Some(body) = &body {
                request = request.json(body);
            }
            let response = request.send().await.map_err(|e| BrokerError::NetworkError(e.to_string()))?;
            let status = response.status();

            if status == reqwest::StatusCode::UNAUTHORIZED && attempt == 0 {
                warn!(path, "broker returned 401, refreshing token");
                self.refresh_token().await?;
                continue;
            }
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(BrokerError::RateLimited { retry_after_secs: 1 });
            }
            if status == reqwest::StatusCode::UNPROCESSABLE_ENTITY {
                let message = response.text().await.unwrap_or_default();
                return Err(BrokerError::OrderRejected(message));
            }
            if status.is_client_error() {
                let message = response.text().await.unwrap_or_default();
                return Err(BrokerError::AuthError(message));
            }
            if !status.is_success() {
                return Err(BrokerError::NetworkError(format!("unexpected status {status}")));
            }
            return response.json::<T>().await.map_err(|e| BrokerError::InvalidResponse(e.to_string()));
        }
        Err(BrokerError::AuthError("token refresh did not resolve a 401".into()))
    }
}

#[async_trait]
impl BrokerAdapter for RestBrokerAdapter {
    fn broker_type(&self) -> BrokerType {
        self.broker_type
    }

    fn asset_class(&self) -> AssetClass {
        self.asset_class
    }

    fn supported_symbols(&self) -> &[String] {
        &self.supported_symbols
    }

    async fn authenticate(&self) -> Result<(), BrokerError> {
        self.refresh_token().await
    }

    async fn get_account(&self) -> Result<AggregatedAccount, BrokerError> {
        let wire: WireAccount = self.request_json(reqwest::Method::GET, "/account", None).await?;
        Ok(AggregatedAccount {
            equity: parse_decimal(&wire.equity),
            cash: parse_decimal(&wire.cash),
            buying_power: parse_decimal(&wire.buying_power),
            day_trades_remaining: wire.day_trades_remaining,
            timestamp: chrono::Utc::now().timestamp_millis(),
        })
    }

    async fn get_positions(&self) -> Result<Vec<Position>, BrokerError> {
        let wire: Vec<WirePosition> = self.request_json(reqwest::Method::GET, "/positions", None).await?;
        Ok(wire
            .into_iter()
            .map(|p| Position { symbol: p.symbol, quantity: parse_decimal(&p.quantity), average_price: parse_decimal(&p.average_price) })
            .collect())
    }

    async fn place_order(&self, order: UnifiedOrder) -> Result<OrderResult, BrokerError> {
        let side = match order.direction {
            Direction::Long => "BUY",
            Direction::Short => "SELL",
            Direction::Neutral => {
                error!(symbol = %order.symbol, "refusing to place a NEUTRAL-direction order");
                return Err(BrokerError::OrderRejected("cannot place an order with NEUTRAL direction".into()));
            }
        };
        let body = serde_json::json!({
            "clientOrderId": order.client_order_id,
            "symbol": order.symbol,
            "side": side,
            "quantity": order.quantity.to_string(),
            "limitPrice": order.limit_price.map(|p| p.to_string()),
            "stopPrice": order.stop_price.map(|p| p.to_string()),
        });
        let wire: WireOrderResult = self.request_json(reqwest::Method::POST, "/orders", Some(body)).await?;
        Ok(OrderResult {
            broker_order_id: wire.broker_order_id,
            client_order_id: wire.client_order_id,
            status: normalize_status(&wire.status),
            filled_quantity: parse_decimal(&wire.filled_quantity),
            avg_fill_price: wire.avg_fill_price.as_deref().map(parse_decimal),
            submitted_at: wire.submitted_at,
        })
    }

    async fn cancel_order(&self, broker_order_id: &str) -> Result<(), BrokerError> {
        let _: serde_json::Value = self.request_json(reqwest::Method::DELETE, &format!("/orders/{broker_order_id}"), None).await?;
        Ok(())
    }

    async fn get_order_status(&self, broker_order_id: &str) -> Result<OrderResult, BrokerError> {
        let wire: WireOrderResult = self.request_json(reqwest::Method::GET, &format!("/orders/{broker_order_id}"), None).await?;
        Ok(OrderResult {
            broker_order_id: wire.broker_order_id,
            client_order_id: wire.client_order_id,
            status: normalize_status(&wire.status),
            filled_quantity: parse_decimal(&wire.filled_quantity),
            avg_fill_price: wire.avg_fill_price.as_deref().map(parse_decimal),
            submitted_at: wire.submitted_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_known_statuses() {
        assert_eq!(normalize_status("filled"), NormalizedOrderStatus::Filled);
        assert_eq!(normalize_status("CANCELED"), NormalizedOrderStatus::Cancelled);
        assert_eq!(normalize_status("something_else"), NormalizedOrderStatus::Pending);
    }

    #[test]
    fn auth_header_falls_back_to_key_secret_pair_before_first_token_refresh() {
        let adapter = RestBrokerAdapter::new(
            "https://broker.example".into(),
            "key".into(),
            "secret".into(),
            BrokerType::Futures,
            AssetClass::Futures,
            vec!["MNQ".into()],
        );
        assert_eq!(adapter.auth_header(), "key:secret");
    }
}
