//! Polymarket integration.
//!
//! Reads the market list from the data endpoint (no auth required) and
//! posts orders to the CLOB. Every request goes through the shared retry
//! policy; responses are passed through the normalizer or returned verbatim.
//!
//! Data API: https://clob.polymarket.com/markets
//! CLOB API: https://clob.polymarket.com

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::normalize::normalize_markets;
use super::retry::{GatewayError, RetryPolicy, Sleeper, TokioSleeper};
use super::MarketGateway;
use crate::config::AppConfig;
use crate::types::{
    Balances, Market, OrderResponse, OrderSide, TradingMode, COLLATERAL_ASSET,
};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const PLATFORM_NAME: &str = "polymarket";
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Order payload posted to the CLOB.
#[derive(Debug, Serialize)]
struct OrderPayload<'a> {
    market: &'a str,
    outcome: &'a str,
    side: &'a str,
    price: Decimal,
    size: Decimal,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct PolymarketClient {
    http: Client,
    data_api_url: String,
    clob_api_url: String,
    rpc_url: String,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl PolymarketClient {
    pub fn new(data_api_url: &str, clob_api_url: &str, rpc_url: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build Polymarket HTTP client")?;

        Ok(Self {
            http,
            data_api_url: data_api_url.trim_end_matches('/').to_string(),
            clob_api_url: clob_api_url.trim_end_matches('/').to_string(),
            rpc_url: rpc_url.to_string(),
            retry: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
        })
    }

    /// Build a client from the application config.
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        Self::new(&cfg.data_api_url, &cfg.clob_api_url, &cfg.rpc_url)
    }

    /// Replace the sleeper used between retries.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn clob_api_url(&self) -> &str {
        &self.clob_api_url
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Send one request and decode its JSON body, retrying any transport
    /// error, non-success status or undecodable body.
    async fn json_with_retry(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<Value> {
        let method = &method;
        let value = self
            .retry
            .run(self.sleeper.as_ref(), url, move || async move {
                let mut request = self.http.request(method.clone(), url);
                if let Some(json) = body {
                    request = request.json(json);
                }

                let response = request.send().await.map_err(|source| GatewayError::Transport {
                    url: url.to_string(),
                    source,
                })?;

                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(GatewayError::Status {
                        url: url.to_string(),
                        status: status.as_u16(),
                        body,
                    });
                }

                response
                    .json::<Value>()
                    .await
                    .map_err(|source| GatewayError::Decode {
                        url: url.to_string(),
                        source,
                    })
            })
            .await?;
        Ok(value)
    }
}

// ---------------------------------------------------------------------------
// MarketGateway trait implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl MarketGateway for PolymarketClient {
    async fn fetch_markets(&self) -> Result<Vec<Market>> {
        debug!(url = %self.data_api_url, "Fetching Polymarket markets");
        let payload = self
            .json_with_retry(Method::GET, &self.data_api_url, None)
            .await
            .context("Market list request failed")?;

        let markets = normalize_markets(&payload);
        info!(count = markets.len(), "Fetched markets");
        Ok(markets)
    }

    async fn place_order(
        &self,
        market_id: &str,
        outcome_id: &str,
        side: OrderSide,
        price: Decimal,
        size: Decimal,
        mode: TradingMode,
    ) -> Result<OrderResponse> {
        if mode == TradingMode::Paper {
            let order_id = format!("paper-{}", uuid::Uuid::new_v4());
            info!(
                side = side.as_wire(),
                market_id,
                outcome_id,
                %price,
                %size,
                order_id = %order_id,
                "[PAPER] Simulated order"
            );
            return Ok(OrderResponse::paper_fill(&order_id));
        }

        let payload = serde_json::to_value(OrderPayload {
            market: market_id,
            outcome: outcome_id,
            side: side.as_wire(),
            price,
            size,
        })
        .context("Failed to serialise order payload")?;

        let url = format!("{}/orders", self.clob_api_url);
        let response = self
            .json_with_retry(Method::POST, &url, Some(&payload))
            .await
            .with_context(|| format!("Order submission failed for market {market_id}"))?;

        info!(market_id, outcome_id, %price, %size, "Live order submitted");
        Ok(OrderResponse(response))
    }

    async fn get_order_status(&self, order_id: &str) -> Result<Value> {
        let url = format!("{}/orders/{}", self.clob_api_url, urlencoding::encode(order_id));
        self.json_with_retry(Method::GET, &url, None)
            .await
            .with_context(|| format!("Order status lookup failed for {order_id}"))
    }

    async fn get_balances(&self) -> Result<Balances> {
        // TODO: query the USDC contract over `rpc_url` once wallet signing lands.
        warn!(rpc_url = %self.rpc_url, "Balance source is a placeholder; reporting zero USDC");
        Ok(Balances::from([(COLLATERAL_ASSET.to_string(), Decimal::ZERO)]))
    }

    fn name(&self) -> &str {
        PLATFORM_NAME
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
