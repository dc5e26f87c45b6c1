//! End-to-end runner scenarios driven through the public scripted doubles

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use spread_arb::application::{InitError, RunnerConfig, RunnerPhase, StrategyRunner};
use spread_arb::domain::{Position, PriceObservation, PriceSeries, Signal, TradeAction};
use spread_arb::ports::mocks::{RecordingObserver, ScriptedMarketData};
use spread_arb::strategy::StrategyConfig;

const BRENT: &str = "BZ=F";
const WTI: &str = "CL=F";

fn day(i: i64) -> DateTime<Utc> {
    let base = (Utc::now().date_naive() - chrono::Days::new(300))
        .and_hms_opt(0, 0, 0)
        .unwrap();
    Utc.from_utc_datetime(&base) + chrono::Duration::days(i)
}

/// Brent = 0.9 * WTI + 12 with a small deterministic wobble
fn cointegrated_history(days: i64) -> ScriptedMarketData {
    let wti: Vec<PriceObservation> = (0..days)
        .map(|i| PriceObservation::new(day(i), 75.0 + (i as f64 / 9.0).sin() * 6.0))
        .collect();
    let brent: Vec<PriceObservation> = wti
        .iter()
        .enumerate()
        .map(|(i, o)| {
            let wobble = if i % 2 == 0 { 0.15 } else { -0.15 };
            PriceObservation::new(o.timestamp, 0.9 * o.price + 12.0 + wobble)
        })
        .collect();

    ScriptedMarketData::new()
        .with_history(PriceSeries::new(BRENT, brent))
        .with_history(PriceSeries::new(WTI, wti))
}

fn runner(provider: ScriptedMarketData, window: usize) -> (StrategyRunner, RecordingObserver) {
    let observer = RecordingObserver::new();
    let config = RunnerConfig {
        strategy: StrategyConfig::default()
            .with_rolling_window(window)
            .with_volatility_factor(0.5)
            .with_update_interval(30),
        ..RunnerConfig::default()
    };
    let runner = StrategyRunner::new(config, Arc::new(provider), Arc::new(observer.clone())).unwrap();
    (runner, observer)
}

#[tokio::test]
async fn round_trip_long_then_close() {
    let provider = cointegrated_history(120);
    let wti = 75.0;
    let fair = 0.9 * wti + 12.0;

    // Dislocation below fair value, then back to fair value
    provider.push_latest(BRENT, Some(PriceObservation::new(day(120), fair - 5.0)));
    provider.push_latest(BRENT, Some(PriceObservation::new(day(121), fair)));
    provider.push_latest(WTI, Some(PriceObservation::new(day(120), wti)));
    provider.push_latest(WTI, Some(PriceObservation::new(day(121), wti)));

    let (runner, observer) = runner(provider, 60);
    let fit = runner.initialize().await.unwrap();
    assert!((fit.beta - 0.9).abs() < 0.01);

    let entry = runner.tick().await.unwrap();
    assert_eq!(entry.signal, Signal::Long);
    assert_eq!(entry.action, TradeAction::Buy);
    assert_eq!(entry.position, Position::Long);

    let exit = runner.tick().await.unwrap();
    assert_eq!(exit.position, Position::Flat);
    assert_eq!(exit.action, TradeAction::Close);
    assert_eq!(exit.action_details, "Close all positions");

    let snapshots = observer.snapshots();
    assert_eq!(snapshots.len(), 2);
    assert!(snapshots.iter().all(|s| s.is_trade()));

    // Both live observations were newer than the history and got appended
    let status = runner.status().await;
    assert_eq!(status.observation_count, 122);
    assert_eq!(status.position, Position::Flat);
}

#[tokio::test]
async fn short_history_blocks_start() {
    let (runner, _) = runner(cointegrated_history(30), 60);

    match runner.initialize().await {
        Err(InitError::InsufficientData { required, available }) => {
            assert_eq!(required, 60);
            assert_eq!(available, 30);
        }
        other => panic!("expected InsufficientData, got {:?}", other.map(|f| f.beta)),
    }
    assert!(runner.start().await.is_err());
    assert_eq!(runner.phase().await, RunnerPhase::Uninitialized);
}

#[tokio::test]
async fn historical_report_matches_stored_series() {
    let (runner, _) = runner(cointegrated_history(150), 40);
    runner.initialize().await.unwrap();

    let report = runner.historical(100).await.unwrap();
    assert_eq!(report.len(), 100);
    assert_eq!(report.position[0], Position::Flat);
    assert_eq!(report.cumulative_pnl[0], 0.0);
    assert!(report.dates.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(report.dates.last().copied(), Some(day(149)));
}

#[tokio::test(start_paused = true)]
async fn stop_then_restart_runs_a_single_loop() {
    let provider = cointegrated_history(80)
        .with_latest(BRENT, PriceObservation::new(day(80), 79.5))
        .with_latest(WTI, PriceObservation::new(day(80), 75.0));
    let (runner, observer) = runner(provider, 40);
    runner.initialize().await.unwrap();

    runner.start().await.unwrap();
    runner.stop().await;
    runner.start().await.unwrap();

    tokio::time::sleep(Duration::from_secs(31 * 4)).await;
    runner.stop().await;

    // One acting loop: the first iteration plus one per elapsed interval,
    // at most one extra from the superseded loop's first pass
    let count = observer.len();
    assert!(count >= 4, "too few iterations: {count}");
    assert!(count <= 7, "two loops appear to be acting: {count}");
    assert!(!runner.status().await.running);
}
