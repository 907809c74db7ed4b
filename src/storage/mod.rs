//! Trade ledger sinks.
//!
//! Every accepted order produces one `TradeRecord`. The CSV journal appends
//! it to `trades.csv`, writing the header only when the file is new. The
//! in-memory journal keeps records for inspection in tests and dry runs.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::types::TradeRecord;

/// Default trade ledger path.
pub const DEFAULT_TRADES_FILE: &str = "trades.csv";

/// Append-only destination for trade records.
pub trait TradeJournal: Send {
    fn append(&mut self, record: &TradeRecord) -> Result<()>;
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CsvTradeJournal {
    path: PathBuf,
}

impl CsvTradeJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for CsvTradeJournal {
    fn default() -> Self {
        Self::new(DEFAULT_TRADES_FILE)
    }
}

impl TradeJournal for CsvTradeJournal {
    fn append(&mut self, record: &TradeRecord) -> Result<()> {
        let new_file = !self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open trade ledger {}", self.path.display()))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(new_file)
            .from_writer(file);
        writer
            .serialize(record)
            .with_context(|| format!("Failed to write trade to {}", self.path.display()))?;
        writer.flush()?;

        debug!(path = %self.path.display(), market_id = %record.market_id, "Trade recorded");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// Journal that keeps records in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryJournal {
    records: Arc<Mutex<Vec<TradeRecord>>>,
}

impl MemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<TradeRecord> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl TradeJournal for MemoryJournal {
    fn append(&mut self, record: &TradeRecord) -> Result<()> {
        self.records
            .lock()
            .map_err(|_| anyhow::anyhow!("Trade journal lock poisoned"))?
            .push(record.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
