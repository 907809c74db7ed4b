//! In-memory position ledger.
//!
//! Owned by one `Executor`. Append-only for the lifetime of the process:
//! nothing here closes or removes a position.

use rust_decimal::Decimal;

use crate::types::Position;

#[derive(Debug, Clone, Default)]
pub struct PositionLedger {
    positions: Vec<Position>,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, position: Position) {
        self.positions.push(position);
    }

    /// Sum of sizes over every recorded position.
    pub fn open_exposure(&self) -> Decimal {
        self.positions.iter().map(|p| p.size).sum()
    }

    pub fn holds(&self, market_id: &str, outcome_id: &str) -> bool {
        self.positions
            .iter()
            .any(|p| p.market_id == market_id && p.outcome_id == outcome_id)
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
