//! Trading engine: scan, size, execute.

pub mod executor;
pub mod ledger;
pub mod scanner;
