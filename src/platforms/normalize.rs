//! Normalization of raw market payloads.
//!
//! The market endpoint is loosely shaped: the body may be a bare list or an
//! object wrapping a `markets` list, the resolution time hides behind one of
//! several field names, and top-of-book may arrive as scalar fields, inside
//! an `orderBook` object, or only as a raw list of ask levels. Everything
//! here is pure: unparseable values become `None`, never an error.

use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

use crate::types::{Market, Outcome};

/// Resolution-time field names in precedence order. First non-empty wins.
pub const RESOLUTION_TIME_ALIASES: [&str; 9] = [
    "endDate",
    "resolveDate",
    "end_date",
    "resolve_time",
    "resolveTime",
    "closeDate",
    "expiry",
    "endTime",
    "resolutionTime",
];

/// Normalize a full market-list response.
pub fn normalize_markets(payload: &Value) -> Vec<Market> {
    let items = match payload {
        Value::Array(items) => items.as_slice(),
        Value::Object(obj) => obj
            .get("markets")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default(),
        _ => &[],
    };

    items.iter().filter(|i| i.is_object()).map(normalize_market).collect()
}

/// Normalize one market item.
pub fn normalize_market(item: &Value) -> Market {
    let outcomes = item
        .get("outcomes")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter(|o| o.is_object())
                .map(normalize_outcome)
                .collect()
        })
        .unwrap_or_default();

    Market {
        id: item.get("id").and_then(id_string).unwrap_or_default(),
        question: item
            .get("question")
            .or_else(|| item.get("title"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        resolution_time: pick_resolution_time(item),
        outcomes,
    }
}

/// Pick the resolution time using the alias precedence table.
pub fn pick_resolution_time(item: &Value) -> Option<String> {
    RESOLUTION_TIME_ALIASES.iter().find_map(|key| match item.get(*key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn normalize_outcome(raw: &Value) -> Outcome {
    let id = raw
        .get("id")
        .and_then(id_string)
        .or_else(|| raw.get("tokenId").and_then(id_string))
        .or_else(|| raw.get("token_id").and_then(id_string))
        .unwrap_or_default();

    let (best_bid, best_ask, best_ask_size) = extract_best_levels(raw);

    Outcome {
        id,
        name: raw
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        best_bid,
        best_ask,
        best_ask_size,
    }
}

/// Derive best bid, best ask and best-ask size.
///
/// Scalar fields win, `orderBook` before the outcome itself. When the ask
/// or its size is still missing, the lowest-priced ask level fills the gap.
pub fn extract_best_levels(raw: &Value) -> (Option<Decimal>, Option<Decimal>, Option<Decimal>) {
    let book = raw.get("orderBook").filter(|b| b.is_object());
    let scalar = |key: &str, coerce: fn(&Value) -> Option<Decimal>| {
        book.and_then(|b| b.get(key))
            .and_then(coerce)
            .or_else(|| raw.get(key).and_then(coerce))
    };

    let best_bid = scalar("bestBid", coerce_price);
    let mut best_ask = scalar("bestAsk", coerce_price);
    let mut best_ask_size = scalar("bestAskSize", coerce_size);

    if best_ask.is_none() || best_ask_size.is_none() {
        let asks = book
            .and_then(|b| b.get("asks"))
            .and_then(Value::as_array)
            .filter(|a| !a.is_empty())
            .or_else(|| raw.get("asks").and_then(Value::as_array));

        if let Some(top) = asks.and_then(|levels| lowest_ask(levels)) {
            best_ask = best_ask.or_else(|| top.get("price").and_then(coerce_price));
            best_ask_size = best_ask_size.or_else(|| {
                top.get("size")
                    .and_then(coerce_size)
                    .or_else(|| top.get("amount").and_then(coerce_size))
            });
        }
    }

    (best_bid, best_ask, best_ask_size)
}

/// Lowest-priced level; levels without a usable price sort last and ties
/// keep the earliest level.
fn lowest_ask(levels: &[Value]) -> Option<&Value> {
    let mut best: Option<(&Value, Option<Decimal>)> = None;
    for level in levels.iter().filter(|l| l.is_object()) {
        let price = level.get("price").and_then(coerce_decimal);
        let better = match (&best, price) {
            (None, _) => true,
            (Some((_, None)), Some(_)) => true,
            (Some((_, Some(current))), Some(p)) => p < *current,
            _ => false,
        };
        if better {
            best = Some((level, price));
        }
    }
    best.map(|(level, _)| level)
}

// ---------------------------------------------------------------------------
// Coercion
// ---------------------------------------------------------------------------

/// Lenient decimal parse: JSON numbers or numeric strings, else `None`.
pub fn coerce_decimal(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

/// A probability price; anything outside `[0, 1]` is unusable.
pub fn coerce_price(value: &Value) -> Option<Decimal> {
    coerce_decimal(value).filter(|p| *p >= Decimal::ZERO && *p <= Decimal::ONE)
}

/// A resting size; negative sizes are unusable.
pub fn coerce_size(value: &Value) -> Option<Decimal> {
    coerce_decimal(value).filter(|s| *s >= Decimal::ZERO)
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
