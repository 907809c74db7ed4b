//! Mock venue for integration testing.
//!
//! Provides a deterministic `MarketGateway` implementation that serves a
//! controllable market list, reports a fixed collateral balance and
//! records every order it accepts. All state is in-memory and shared
//! between clones, so a test can keep a handle after boxing one copy into
//! an `Executor`.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use clearwin::platforms::MarketGateway;
use clearwin::types::*;

/// An order as the mock venue received it.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedOrder {
    pub market_id: String,
    pub outcome_id: String,
    pub side: OrderSide,
    pub price: Decimal,
    pub size: Decimal,
    pub mode: TradingMode,
}

#[derive(Clone)]
pub struct MockGateway {
    markets: Arc<Mutex<Vec<Market>>>,
    balance: Arc<Mutex<Decimal>>,
    orders: Arc<Mutex<Vec<PlacedOrder>>>,
    /// If set, every call returns this error.
    force_error: Arc<Mutex<Option<String>>>,
}

impl MockGateway {
    pub fn new(markets: Vec<Market>, balance: Decimal) -> Self {
        Self {
            markets: Arc::new(Mutex::new(markets)),
            balance: Arc::new(Mutex::new(balance)),
            orders: Arc::new(Mutex::new(Vec::new())),
            force_error: Arc::new(Mutex::new(None)),
        }
    }

    pub fn set_markets(&self, markets: Vec<Market>) {
        *self.markets.lock().unwrap() = markets;
    }

    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    pub fn clear_error(&self) {
        *self.force_error.lock().unwrap() = None;
    }

    pub fn orders(&self) -> Vec<PlacedOrder> {
        self.orders.lock().unwrap().clone()
    }

    fn check_error(&self) -> Result<()> {
        match self.force_error.lock().unwrap().as_ref() {
            Some(msg) => Err(anyhow!("{msg}")),
            None => Ok(()),
        }
    }
}

/// A single-outcome market resolving `hours` after `now`.
pub fn market(
    id: &str,
    now: DateTime<Utc>,
    hours: i64,
    ask: Option<Decimal>,
    ask_size: Option<Decimal>,
) -> Market {
    Market {
        id: id.to_string(),
        question: format!("Will {id} resolve YES?"),
        resolution_time: Some((now + Duration::hours(hours)).to_rfc3339()),
        outcomes: vec![Outcome {
            id: format!("{id}-yes"),
            name: "Yes".to_string(),
            best_bid: None,
            best_ask: ask,
            best_ask_size: ask_size,
        }],
    }
}

#[async_trait]
impl MarketGateway for MockGateway {
    async fn fetch_markets(&self) -> Result<Vec<Market>> {
        self.check_error()?;
        Ok(self.markets.lock().unwrap().clone())
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
        self.check_error()?;
        self.orders.lock().unwrap().push(PlacedOrder {
            market_id: market_id.to_string(),
            outcome_id: outcome_id.to_string(),
            side,
            price,
            size,
            mode,
        });
        let id = format!("mock-{}", Uuid::new_v4());
        Ok(match mode {
            TradingMode::Paper => OrderResponse::paper_fill(&id),
            TradingMode::Live => OrderResponse(serde_json::json!({
                "orderID": id,
                "status": "live",
            })),
        })
    }

    async fn get_order_status(&self, order_id: &str) -> Result<serde_json::Value> {
        self.check_error()?;
        Ok(serde_json::json!({ "id": order_id, "status": "filled" }))
    }

    async fn get_balances(&self) -> Result<Balances> {
        self.check_error()?;
        let balance = *self.balance.lock().unwrap();
        Ok(Balances::from([(COLLATERAL_ASSET.to_string(), balance)]))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
