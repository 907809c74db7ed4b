//! Capital-constrained order sizing.
//!
//! `capital_left = min(balance, max_balance_to_use) - open exposure`,
//! floored at zero. An order is the smallest of the per-market cap, the
//! capital left and the size resting at the best ask.

use rust_decimal::Decimal;
use tracing::debug;

use crate::config::TradingConfig;
use crate::engine::ledger::PositionLedger;
use crate::types::Candidate;

pub struct PositionSizer {
    config: TradingConfig,
}

impl PositionSizer {
    pub fn new(config: TradingConfig) -> Self {
        Self { config }
    }

    /// Capital still allocatable given the wallet balance and open ledger.
    pub fn available_capital(&self, balance: Decimal, ledger: &PositionLedger) -> Decimal {
        let usable = balance.min(self.config.max_balance_to_use);
        (usable - ledger.open_exposure()).max(Decimal::ZERO)
    }

    /// Order size for a candidate. Never negative.
    pub fn size(&self, balance: Decimal, ledger: &PositionLedger, candidate: &Candidate) -> Decimal {
        if !self.config.allow_scale_in && ledger.holds(&candidate.market_id, &candidate.outcome_id) {
            debug!(
                market_id = %candidate.market_id,
                outcome_id = %candidate.outcome_id,
                "Already holding outcome, scale-in disabled"
            );
            return Decimal::ZERO;
        }

        let capital_left = self.available_capital(balance, ledger);
        if capital_left <= Decimal::ZERO {
            debug!(market_id = %candidate.market_id, %balance, "No capital left");
            return Decimal::ZERO;
        }

        let mut size = self
            .config
            .max_position_per_market
            .min(capital_left)
            .min(candidate.available_size);

        if let Some(ceiling) = self.config.max_open_exposure {
            let headroom = (ceiling - ledger.open_exposure()).max(Decimal::ZERO);
            size = size.min(headroom);
        }

        let size = size.max(Decimal::ZERO);
        debug!(
            market_id = %candidate.market_id,
            %capital_left,
            %size,
            "Order sized"
        );
        size
    }
}
