//! Execution loop.
//!
//! Runs one scan cycle at a time: fetch, filter, size, place, record. Owns
//! the position ledger for its whole lifetime, so separate `Executor`
//! instances never share capital state. Candidates are handled strictly in
//! scanner order, one order at a time.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::TradingConfig;
use crate::engine::ledger::PositionLedger;
use crate::engine::scanner::MarketScanner;
use crate::platforms::retry::{Sleeper, TokioSleeper};
use crate::platforms::MarketGateway;
use crate::storage::TradeJournal;
use crate::strategy::sizing::PositionSizer;
use crate::types::{
    Candidate, OrderSide, Position, TradeRecord, TradingMode, COLLATERAL_ASSET,
};

// ---------------------------------------------------------------------------
// Cycle report
// ---------------------------------------------------------------------------

/// Summary of a complete scan→size→execute cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    pub cycle_number: u64,
    pub markets_scanned: usize,
    pub candidates: usize,
    pub orders_placed: usize,
    pub orders_skipped: usize,
    pub total_committed: Decimal,
    pub expected_payout: Decimal,
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cycle #{}: scanned={} candidates={} placed={} skipped={} committed={} payout={}",
            self.cycle_number,
            self.markets_scanned,
            self.candidates,
            self.orders_placed,
            self.orders_skipped,
            self.total_committed,
            self.expected_payout,
        )
    }
}

impl CycleReport {
    pub fn log(&self) {
        info!(
            cycle = self.cycle_number,
            scanned = self.markets_scanned,
            candidates = self.candidates,
            placed = self.orders_placed,
            skipped = self.orders_skipped,
            committed = %self.total_committed,
            expected_payout = %self.expected_payout,
            "Cycle complete"
        );
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

pub struct Executor {
    gateway: Box<dyn MarketGateway>,
    journal: Box<dyn TradeJournal>,
    scanner: MarketScanner,
    sizer: PositionSizer,
    mode: TradingMode,
    trading: TradingConfig,
    ledger: PositionLedger,
    cycle_count: u64,
    sleeper: Arc<dyn Sleeper>,
}

impl Executor {
    pub fn new(
        gateway: Box<dyn MarketGateway>,
        journal: Box<dyn TradeJournal>,
        mode: TradingMode,
        trading: TradingConfig,
    ) -> Self {
        Self {
            gateway,
            journal,
            scanner: MarketScanner::new(trading.clone()),
            sizer: PositionSizer::new(trading.clone()),
            mode,
            trading,
            ledger: PositionLedger::new(),
            cycle_count: 0,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replace the sleeper used between continuous-mode cycles.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn ledger(&self) -> &PositionLedger {
        &self.ledger
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    /// Run cycles back to back, sleeping `scan_interval_seconds` between
    /// them. Only returns on error.
    pub async fn run_forever(&mut self) -> Result<()> {
        let interval = Duration::from_secs(self.trading.scan_interval_seconds);
        info!(interval_secs = self.trading.scan_interval_seconds, "Entering continuous mode");
        loop {
            self.run_cycle().await?.log();
            self.sleeper.sleep(interval).await;
        }
    }

    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        self.run_cycle_at(Utc::now()).await
    }

    /// Run a single cycle with an explicit clock reading.
    pub async fn run_cycle_at(&mut self, now: DateTime<Utc>) -> Result<CycleReport> {
        self.cycle_count += 1;
        info!(cycle = self.cycle_count, mode = %self.mode, "Starting cycle");

        let scan = self
            .scanner
            .scan_venue(self.gateway.as_ref(), now)
            .await
            .context("Market scan failed")?;

        let mut report = CycleReport {
            cycle_number: self.cycle_count,
            markets_scanned: scan.markets_scanned,
            candidates: scan.candidates.len(),
            ..CycleReport::default()
        };

        if scan.candidates.is_empty() {
            info!("No clear-win candidates found.");
            scan.diagnostics.log_summary();
            return Ok(report);
        }

        for candidate in &scan.candidates {
            match self.open_position(candidate).await? {
                Some(trade) => {
                    report.orders_placed += 1;
                    report.total_committed += trade.size;
                    report.expected_payout += trade.expected_payout;
                }
                None => report.orders_skipped += 1,
            }
        }

        Ok(report)
    }

    /// Size, place and record one candidate. `None` when skipped for size.
    async fn open_position(&mut self, candidate: &Candidate) -> Result<Option<TradeRecord>> {
        let balance = self.current_balance().await?;
        let size = self.sizer.size(balance, &self.ledger, candidate);

        if size < self.trading.min_trade_size {
            info!(
                market_id = %candidate.market_id,
                %size,
                min = %self.trading.min_trade_size,
                "Skipping due to small size"
            );
            return Ok(None);
        }

        let order = self
            .gateway
            .place_order(
                &candidate.market_id,
                &candidate.outcome_id,
                OrderSide::Buy,
                candidate.ask_price,
                size,
                self.mode,
            )
            .await?;

        let expected_payout = candidate.expected_payout(size);
        let now = Utc::now();

        info!(
            market_id = %candidate.market_id,
            outcome = %candidate.outcome_name,
            price = %candidate.ask_price,
            %size,
            %expected_payout,
            status = order.status(),
            "Opened position"
        );

        self.ledger.record(Position {
            market_id: candidate.market_id.clone(),
            outcome_id: candidate.outcome_id.clone(),
            outcome_name: candidate.outcome_name.clone(),
            entry_price: candidate.ask_price,
            size,
            entry_time: now,
        });

        let record = TradeRecord {
            timestamp: now,
            market_id: candidate.market_id.clone(),
            question: candidate.question.clone(),
            outcome: candidate.outcome_name.clone(),
            side: OrderSide::Buy,
            price: candidate.ask_price,
            size,
            expected_payout,
            status: order.status().to_string(),
        };
        self.journal.append(&record)?;

        Ok(Some(record))
    }

    /// Wallet balance the sizer should see.
    ///
    /// Paper mode may substitute a configured simulated balance. Otherwise
    /// the gateway's collateral reading is used; a zero there is treated as
    /// "unknown" and logged, since the balance source is still a stub.
    async fn current_balance(&self) -> Result<Decimal> {
        if self.mode == TradingMode::Paper {
            if let Some(simulated) = self.trading.paper_balance {
                return Ok(simulated);
            }
        }

        let balances = self.gateway.get_balances().await.context("Balance query failed")?;
        let balance = balances
            .get(COLLATERAL_ASSET)
            .copied()
            .unwrap_or(Decimal::ZERO);

        if balance.is_zero() {
            warn!(
                mode = %self.mode,
                "Live balance unknown (placeholder source reports zero); sizing sees no capital"
            );
        }
        Ok(balance)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
