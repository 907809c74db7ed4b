//! Near-certain outcome scanner.
//!
//! Walks a market snapshot in venue order and applies a fixed sequence of
//! checks. Market-level checks (resolution time present, parseable, close
//! enough) run first and reject the whole market; outcome-level checks
//! (ask present, inside the price band, enough size) then run per outcome.
//! The first failing check decides the rejection reason, so the order of
//! checks below determines which diagnostics are counted.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info};

use crate::config::TradingConfig;
use crate::platforms::MarketGateway;
use crate::types::{Candidate, Market, Outcome};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// How far below `min_probability_price` an ask may sit and still be
/// reported as a near-miss.
const NEAR_MISS_BAND: Decimal = dec!(0.05);

/// Near-misses kept per scan.
const MAX_NEAR_MISSES: usize = 5;

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// Why a market or outcome was not turned into a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RejectionReason {
    MissingEnd,
    BadEnd,
    TooLate,
    NoBestAsk,
    PriceLow,
    PriceHigh,
    LowLiquidity,
}

impl RejectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionReason::MissingEnd => "missing_end",
            RejectionReason::BadEnd => "bad_end",
            RejectionReason::TooLate => "too_late",
            RejectionReason::NoBestAsk => "no_best_ask",
            RejectionReason::PriceLow => "price_low",
            RejectionReason::PriceHigh => "price_high",
            RejectionReason::LowLiquidity => "low_liquidity",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outcome priced just under the probability floor.
#[derive(Debug, Clone, PartialEq)]
pub struct NearMiss {
    pub market_id: String,
    pub outcome_name: String,
    pub ask_price: Decimal,
    pub question: String,
}

/// Per-reason rejection counts plus the best near-misses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanDiagnostics {
    rejections: BTreeMap<RejectionReason, usize>,
    near_misses: Vec<NearMiss>,
}

impl ScanDiagnostics {
    fn reject(&mut self, reason: RejectionReason) {
        *self.rejections.entry(reason).or_insert(0) += 1;
    }

    /// Keep near-misses sorted by descending ask, capped at five.
    fn record_near_miss(&mut self, miss: NearMiss) {
        let idx = self
            .near_misses
            .iter()
            .position(|m| m.ask_price < miss.ask_price)
            .unwrap_or(self.near_misses.len());
        self.near_misses.insert(idx, miss);
        self.near_misses.truncate(MAX_NEAR_MISSES);
    }

    pub fn count(&self, reason: RejectionReason) -> usize {
        self.rejections.get(&reason).copied().unwrap_or(0)
    }

    pub fn total_rejected(&self) -> usize {
        self.rejections.values().sum()
    }

    pub fn near_misses(&self) -> &[NearMiss] {
        &self.near_misses
    }

    /// Emit the operator-facing summary.
    pub fn log_summary(&self) {
        let counts: Vec<String> = self
            .rejections
            .iter()
            .map(|(reason, n)| format!("{reason}={n}"))
            .collect();
        info!(rejections = %counts.join(" "), "Filter rejections");

        for miss in &self.near_misses {
            info!(
                market_id = %miss.market_id,
                outcome = %miss.outcome_name,
                ask = %miss.ask_price,
                question = %miss.question,
                "Near miss (ask just below floor)"
            );
        }
    }
}

/// Result of one scan.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub markets_scanned: usize,
    pub candidates: Vec<Candidate>,
    pub diagnostics: ScanDiagnostics,
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

pub struct MarketScanner {
    config: TradingConfig,
}

impl MarketScanner {
    pub fn new(config: TradingConfig) -> Self {
        Self { config }
    }

    /// Fetch the venue's current snapshot and scan it.
    pub async fn scan_venue(
        &self,
        gateway: &dyn MarketGateway,
        now: DateTime<Utc>,
    ) -> Result<ScanReport> {
        let markets = gateway.fetch_markets().await?;
        Ok(self.scan(&markets, now))
    }

    /// Apply the filter pipeline to every market and outcome, in input order.
    pub fn scan(&self, markets: &[Market], now: DateTime<Utc>) -> ScanReport {
        let mut report = ScanReport {
            markets_scanned: markets.len(),
            ..ScanReport::default()
        };

        for market in markets {
            let raw_end = match market.resolution_time.as_deref() {
                Some(s) if !s.is_empty() => s,
                _ => {
                    debug!(market = %market, "Rejected: missing_end");
                    report.diagnostics.reject(RejectionReason::MissingEnd);
                    continue;
                }
            };

            let Some(resolve_time) = parse_resolution_time(raw_end) else {
                debug!(market = %market, raw_end, "Rejected: bad_end");
                report.diagnostics.reject(RejectionReason::BadEnd);
                continue;
            };

            let hours_left = hours_until(resolve_time, now);
            if hours_left > self.config.max_time_to_resolution_hours {
                debug!(market = %market, hours_left, "Rejected: too_late");
                report.diagnostics.reject(RejectionReason::TooLate);
                continue;
            }

            for outcome in &market.outcomes {
                match self.check_outcome(market, outcome, &mut report.diagnostics) {
                    Ok((ask_price, available_size)) => report.candidates.push(Candidate {
                        market_id: market.id.clone(),
                        outcome_id: outcome.id.clone(),
                        outcome_name: outcome.name.clone(),
                        ask_price,
                        available_size,
                        resolve_time,
                        hours_to_resolution: hours_left,
                        question: market.question.clone(),
                    }),
                    Err(reason) => {
                        debug!(
                            market_id = %market.id,
                            outcome_id = %outcome.id,
                            reason = reason.as_str(),
                            "Outcome rejected"
                        );
                        report.diagnostics.reject(reason);
                    }
                }
            }
        }

        info!(
            markets = report.markets_scanned,
            candidates = report.candidates.len(),
            rejected = report.diagnostics.total_rejected(),
            "Scan complete"
        );
        report
    }

    /// Outcome-level checks. Returns `(ask, size)` on acceptance.
    fn check_outcome(
        &self,
        market: &Market,
        outcome: &Outcome,
        diagnostics: &mut ScanDiagnostics,
    ) -> Result<(Decimal, Decimal), RejectionReason> {
        let (Some(ask), Some(size)) = (outcome.best_ask, outcome.best_ask_size) else {
            return Err(RejectionReason::NoBestAsk);
        };

        let floor = self.config.min_probability_price;
        if ask < floor {
            if ask >= floor - NEAR_MISS_BAND {
                diagnostics.record_near_miss(NearMiss {
                    market_id: market.id.clone(),
                    outcome_name: outcome.name.clone(),
                    ask_price: ask,
                    question: market.question.clone(),
                });
            }
            return Err(RejectionReason::PriceLow);
        }
        if ask > self.config.max_probability_price {
            return Err(RejectionReason::PriceHigh);
        }
        if size < self.config.min_liquidity {
            return Err(RejectionReason::LowLiquidity);
        }

        Ok((ask, size))
    }
}

// ---------------------------------------------------------------------------
// Time helpers
// ---------------------------------------------------------------------------

/// Parse an ISO-8601 resolution time.
///
/// Accepts RFC 3339 (`Z` or numeric offset, converted to UTC), naive
/// date-times (taken as UTC, optional trailing `Z`), and bare dates
/// (midnight UTC).
pub fn parse_resolution_time(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.with_timezone(&Utc));
    }

    let naive = s.strip_suffix(['Z', 'z']).unwrap_or(s);
    for fmt in NAIVE_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(naive, fmt) {
            return Some(ndt.and_utc());
        }
    }

    NaiveDate::parse_from_str(naive, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| ndt.and_utc())
}

/// Signed hours from `now` until `resolve_time`.
pub fn hours_until(resolve_time: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let delta = resolve_time - now;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 3_600_000_000.0,
        None => delta.num_milliseconds() as f64 / 3_600_000.0,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
