//! Shared types for the CLEARWIN bot.
//!
//! These types form the data model used across all modules.
//! Platform normalization produces `Market`/`Outcome`, the scanner turns
//! them into `Candidate`s, and the execution loop records `Position`s and
//! `TradeRecord`s.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// Asset key the balance source reports collateral under.
pub const COLLATERAL_ASSET: &str = "USDC";

/// Wallet balances keyed by asset symbol.
pub type Balances = HashMap<String, Decimal>;

// ---------------------------------------------------------------------------
// Market snapshot
// ---------------------------------------------------------------------------

/// One tradable outcome of a market with its top-of-book.
///
/// Prices are probabilities in `[0, 1]`. `None` means the venue did not
/// report a usable value, never zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub id: String,
    pub name: String,
    pub best_bid: Option<Decimal>,
    pub best_ask: Option<Decimal>,
    pub best_ask_size: Option<Decimal>,
}

/// A market snapshot, rebuilt on every scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub id: String,
    pub question: String,
    /// Raw resolution time as reported upstream (ISO-8601, may be malformed).
    pub resolution_time: Option<String>,
    pub outcomes: Vec<Outcome>,
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} (ends: {} | outcomes: {})",
            self.id,
            self.question,
            self.resolution_time.as_deref().unwrap_or("?"),
            self.outcomes.len(),
        )
    }
}

// ---------------------------------------------------------------------------
// Candidates and positions
// ---------------------------------------------------------------------------

/// An outcome that passed every scanner check during one scan.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub market_id: String,
    pub outcome_id: String,
    pub outcome_name: String,
    pub ask_price: Decimal,
    pub available_size: Decimal,
    pub resolve_time: DateTime<Utc>,
    pub hours_to_resolution: f64,
    pub question: String,
}

impl Candidate {
    /// Payout over cost if the outcome resolves in-the-money.
    pub fn expected_payout(&self, size: Decimal) -> Decimal {
        size * (Decimal::ONE - self.ask_price)
    }
}

/// An opened position. Lives only in process memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub market_id: String,
    pub outcome_id: String,
    pub outcome_name: String,
    pub entry_price: Decimal,
    pub size: Decimal,
    pub entry_time: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Order direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Lowercase form used in order payloads.
    pub fn as_wire(&self) -> &'static str {
        match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Whether orders are simulated or sent to the venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TradingMode {
    #[default]
    Paper,
    Live,
}

impl fmt::Display for TradingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradingMode::Paper => write!(f, "paper"),
            TradingMode::Live => write!(f, "live"),
        }
    }
}

/// Parse a trading mode (case-insensitive).
impl std::str::FromStr for TradingMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "paper" => Ok(TradingMode::Paper),
            "live" => Ok(TradingMode::Live),
            other => anyhow::bail!("Unknown trading mode: {other} (expected paper|live)"),
        }
    }
}

// ---------------------------------------------------------------------------
// Order results
// ---------------------------------------------------------------------------

/// Order placement result, kept exactly as the venue returned it.
///
/// Paper orders synthesise `{"status": "filled", "order_id": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderResponse(pub serde_json::Value);

impl OrderResponse {
    /// Synthetic fill used in paper mode.
    pub fn paper_fill(order_id: &str) -> Self {
        Self(serde_json::json!({
            "status": "filled",
            "order_id": order_id,
        }))
    }

    /// Reported status, or `"unknown"` when the venue omitted it.
    pub fn status(&self) -> &str {
        self.0
            .get("status")
            .and_then(|s| s.as_str())
            .unwrap_or("unknown")
    }

    pub fn order_id(&self) -> Option<&str> {
        self.0
            .get("order_id")
            .or_else(|| self.0.get("orderID"))
            .or_else(|| self.0.get("id"))
            .and_then(|s| s.as_str())
    }
}

// ---------------------------------------------------------------------------
// Trade ledger row
// ---------------------------------------------------------------------------

/// One row of the append-only trade ledger.
///
/// Field order is the ledger's column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeRecord {
    #[serde(serialize_with = "serialize_epoch_seconds")]
    pub timestamp: DateTime<Utc>,
    pub market_id: String,
    pub question: String,
    pub outcome: String,
    pub side: OrderSide,
    pub price: Decimal,
    pub size: Decimal,
    pub expected_payout: Decimal,
    pub status: String,
}

impl TradeRecord {
    pub const COLUMNS: [&'static str; 9] = [
        "timestamp",
        "market_id",
        "question",
        "outcome",
        "side",
        "price",
        "size",
        "expected_payout",
        "status",
    ];
}

fn serialize_epoch_seconds<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(ts.timestamp_micros() as f64 / 1_000_000.0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
