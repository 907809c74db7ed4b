//! End-to-end cycles through `Executor` with the mock venue.

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use clearwin::config::{AppConfig, TradingConfig};
use clearwin::engine::executor::Executor;
use clearwin::storage::{CsvTradeJournal, MemoryJournal};
use clearwin::types::{OrderSide, TradeRecord, TradingMode};

use crate::mock_gateway::{market, MockGateway};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 8, 0, 0).unwrap()
}

fn config() -> TradingConfig {
    TradingConfig {
        min_probability_price: dec!(0.97),
        max_probability_price: dec!(0.995),
        min_liquidity: dec!(1),
        max_time_to_resolution_hours: 24.0,
        max_balance_to_use: dec!(30),
        max_position_per_market: dec!(5),
        min_trade_size: dec!(1),
        ..TradingConfig::default()
    }
}

fn executor(gateway: &MockGateway, journal: &MemoryJournal, mode: TradingMode) -> Executor {
    Executor::new(
        Box::new(gateway.clone()),
        Box::new(journal.clone()),
        mode,
        config(),
    )
}

#[tokio::test]
async fn test_single_clear_win_market() {
    let gateway = MockGateway::new(
        vec![market("m1", now(), 10, Some(dec!(0.98)), Some(dec!(10)))],
        dec!(30),
    );
    let journal = MemoryJournal::new();
    let mut exec = executor(&gateway, &journal, TradingMode::Paper);

    let report = exec.run_cycle_at(now()).await.unwrap();

    assert_eq!(report.markets_scanned, 1);
    assert_eq!(report.candidates, 1);
    assert_eq!(report.orders_placed, 1);
    assert_eq!(report.expected_payout, dec!(0.1));

    let orders = gateway.orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].market_id, "m1");
    assert_eq!(orders[0].outcome_id, "m1-yes");
    assert_eq!(orders[0].side, OrderSide::Buy);
    assert_eq!(orders[0].price, dec!(0.98));
    assert_eq!(orders[0].size, dec!(5));
    assert_eq!(orders[0].mode, TradingMode::Paper);

    let positions = exec.ledger().positions();
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].entry_price, dec!(0.98));
    assert_eq!(positions[0].size, dec!(5));

    let records = journal.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].expected_payout, dec!(0.1));
    assert_eq!(records[0].status, "filled");
    assert_eq!(records[0].question, "Will m1 resolve YES?");
}

#[tokio::test]
async fn test_only_passing_markets_trade_in_input_order() {
    let gateway = MockGateway::new(
        vec![
            market("late", now(), 48, Some(dec!(0.98)), Some(dec!(10))),
            market("a", now(), 3, Some(dec!(0.975)), Some(dec!(10))),
            market("cheap", now(), 3, Some(dec!(0.60)), Some(dec!(10))),
            market("no-ask", now(), 3, None, Some(dec!(10))),
            market("thin", now(), 3, Some(dec!(0.98)), Some(dec!(0.2))),
            market("b", now(), 20, Some(dec!(0.995)), Some(dec!(10))),
        ],
        dec!(30),
    );
    let journal = MemoryJournal::new();
    let mut exec = executor(&gateway, &journal, TradingMode::Paper);

    let report = exec.run_cycle_at(now()).await.unwrap();

    assert_eq!(report.markets_scanned, 6);
    assert_eq!(report.candidates, 2);
    let traded: Vec<String> = gateway.orders().into_iter().map(|o| o.market_id).collect();
    assert_eq!(traded, vec!["a".to_string(), "b".to_string()]);
}

#[tokio::test]
async fn test_capital_runs_out_within_a_cycle() {
    let gateway = MockGateway::new(
        vec![
            market("m1", now(), 5, Some(dec!(0.98)), Some(dec!(10))),
            market("m2", now(), 5, Some(dec!(0.98)), Some(dec!(10))),
            market("m3", now(), 5, Some(dec!(0.98)), Some(dec!(10))),
        ],
        dec!(12),
    );
    let journal = MemoryJournal::new();
    let mut exec = executor(&gateway, &journal, TradingMode::Paper);

    let report = exec.run_cycle_at(now()).await.unwrap();

    let sizes: Vec<Decimal> = gateway.orders().into_iter().map(|o| o.size).collect();
    assert_eq!(sizes, vec![dec!(5), dec!(5), dec!(2)]);
    assert_eq!(report.total_committed, dec!(12));
    assert_eq!(exec.ledger().open_exposure(), dec!(12));
}

#[tokio::test]
async fn test_remainder_below_min_trade_size_is_skipped() {
    let gateway = MockGateway::new(
        vec![
            market("m1", now(), 5, Some(dec!(0.98)), Some(dec!(10))),
            market("m2", now(), 5, Some(dec!(0.98)), Some(dec!(10))),
            market("m3", now(), 5, Some(dec!(0.98)), Some(dec!(10))),
        ],
        dec!(10.5),
    );
    let journal = MemoryJournal::new();
    let mut exec = executor(&gateway, &journal, TradingMode::Paper);

    let report = exec.run_cycle_at(now()).await.unwrap();

    assert_eq!(report.orders_placed, 2);
    assert_eq!(report.orders_skipped, 1);
    assert_eq!(gateway.orders().len(), 2);
    assert_eq!(journal.records().len(), 2);
}

#[tokio::test]
async fn test_ledger_accumulates_across_cycles_until_ceiling() {
    let gateway = MockGateway::new(
        vec![market("m1", now(), 10, Some(dec!(0.98)), Some(dec!(10)))],
        dec!(100),
    );
    let journal = MemoryJournal::new();
    let mut exec = executor(&gateway, &journal, TradingMode::Paper);

    let mut placed = Vec::new();
    for _ in 0..7 {
        placed.push(exec.run_cycle_at(now()).await.unwrap().orders_placed);
    }

    assert_eq!(placed, vec![1, 1, 1, 1, 1, 1, 0]);
    assert_eq!(exec.ledger().len(), 6);
    assert_eq!(exec.ledger().open_exposure(), dec!(30));
    assert_eq!(exec.cycle_count(), 7);
}

#[tokio::test]
async fn test_gateway_failure_surfaces_and_next_cycle_recovers() {
    let gateway = MockGateway::new(Vec::new(), dec!(30));
    gateway.set_error("venue unavailable");
    let journal = MemoryJournal::new();
    let mut exec = executor(&gateway, &journal, TradingMode::Paper);

    let err = exec.run_cycle_at(now()).await.unwrap_err();
    assert!(format!("{err:#}").contains("venue unavailable"));
    assert!(exec.ledger().is_empty());

    gateway.clear_error();
    gateway.set_markets(vec![market("m1", now(), 10, Some(dec!(0.98)), Some(dec!(10)))]);

    let report = exec.run_cycle_at(now()).await.unwrap();
    assert_eq!(report.cycle_number, 2);
    assert_eq!(report.orders_placed, 1);
}

#[tokio::test]
async fn test_separate_loops_keep_separate_ledgers() {
    let gateway = MockGateway::new(
        vec![market("m1", now(), 10, Some(dec!(0.98)), Some(dec!(10)))],
        dec!(30),
    );
    let journal = MemoryJournal::new();
    let mut first = executor(&gateway, &journal, TradingMode::Paper);
    let mut second = executor(&gateway, &journal, TradingMode::Paper);

    for _ in 0..6 {
        first.run_cycle_at(now()).await.unwrap();
    }
    assert_eq!(first.ledger().open_exposure(), dec!(30));

    let report = second.run_cycle_at(now()).await.unwrap();
    assert_eq!(report.orders_placed, 1);
    assert_eq!(second.ledger().len(), 1);
}

#[tokio::test]
async fn test_live_mode_records_venue_status() {
    let gateway = MockGateway::new(
        vec![market("m1", now(), 10, Some(dec!(0.98)), Some(dec!(10)))],
        dec!(30),
    );
    let journal = MemoryJournal::new();
    let mut exec = executor(&gateway, &journal, TradingMode::Live);

    exec.run_cycle_at(now()).await.unwrap();

    assert_eq!(gateway.orders()[0].mode, TradingMode::Live);
    assert_eq!(journal.records()[0].status, "live");
}

#[tokio::test]
async fn test_trades_land_in_csv_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trades.csv");
    let gateway = MockGateway::new(
        vec![market("m1", now(), 10, Some(dec!(0.98)), Some(dec!(10)))],
        dec!(30),
    );
    let mut exec = Executor::new(
        Box::new(gateway.clone()),
        Box::new(CsvTradeJournal::new(&path)),
        TradingMode::Paper,
        config(),
    );

    exec.run_cycle_at(now()).await.unwrap();
    exec.run_cycle_at(now()).await.unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], TradeRecord::COLUMNS.join(","));
    for line in &lines[1..] {
        assert!(line.contains(",m1,Will m1 resolve YES?,Yes,BUY,"));
        assert!(line.ends_with(",0.98,5.0,0.1,filled"));
    }
}

#[tokio::test]
async fn test_config_file_drives_thresholds() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clearwin.toml");
    std::fs::write(
        &path,
        r#"
mode = "paper"

[trading]
min_probability_price = 0.90
max_position_per_market = 2
paper_balance = 50
"#,
    )
    .unwrap();
    let cfg = AppConfig::load(&path).unwrap();

    let gateway = MockGateway::new(
        vec![market("m1", now(), 10, Some(dec!(0.92)), Some(dec!(10)))],
        Decimal::ZERO,
    );
    let mut exec = Executor::new(
        Box::new(gateway.clone()),
        Box::new(MemoryJournal::new()),
        TradingMode::Paper,
        cfg.trading,
    );

    let report = exec.run_cycle_at(now()).await.unwrap();
    assert_eq!(report.orders_placed, 1);
    assert_eq!(gateway.orders()[0].size, dec!(2));
}
