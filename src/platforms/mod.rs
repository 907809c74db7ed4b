//! Venue integrations.
//!
//! Defines the `MarketGateway` trait the execution loop talks to and
//! provides the Polymarket implementation:
//! - `normalize` - pure conversion of raw market payloads into `Market`s
//! - `retry` - bounded exponential backoff with an injectable sleeper
//! - `polymarket` - HTTP client for the market list and the CLOB

pub mod normalize;
pub mod polymarket;
pub mod retry;

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::types::{Balances, Market, OrderResponse, OrderSide, TradingMode};

/// Abstraction over the upstream trading venue.
///
/// Every network call made by an implementor goes through the same retry
/// policy; once attempts are exhausted the error is returned to the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketGateway: Send + Sync {
    /// Fetch and normalize the current market snapshot.
    async fn fetch_markets(&self) -> Result<Vec<Market>>;

    /// Place an order. Paper mode never touches the network.
    async fn place_order(
        &self,
        market_id: &str,
        outcome_id: &str,
        side: OrderSide,
        price: Decimal,
        size: Decimal,
        mode: TradingMode,
    ) -> Result<OrderResponse>;

    /// Look up an order by id.
    async fn get_order_status(&self, order_id: &str) -> Result<serde_json::Value>;

    /// Wallet balances by asset.
    async fn get_balances(&self) -> Result<Balances>;

    /// Venue name for logging.
    fn name(&self) -> &str;
}
