//! Strategy layer: order sizing against the wallet and the open ledger.

pub mod sizing;
