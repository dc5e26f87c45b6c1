//! Strategy Runner
//!
//! Coordinates hedge ratio estimation, the spread engine and the position
//! machine. Owns all mutable strategy state behind a single lock and drives
//! the periodic evaluation loop on a background task.
//!
//! Phases: UNINITIALIZED -> INITIALIZED <-> RUNNING

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::{Notify, RwLock};
use tracing::{debug, error, info, warn};

use crate::application::report::{HistoricalReport, RunnerPhase, StrategyStatus};
use crate::domain::position::PositionStateMachine;
use crate::domain::price_series::JoinedSeries;
use crate::domain::snapshot::StrategySnapshot;
use crate::ports::market_data::{MarketDataError, MarketDataProvider};
use crate::ports::observer::StrategyObserver;
use crate::strategy::hedge_ratio::{EstimationError, HedgeRatio, HedgeRatioEstimator};
use crate::strategy::params::{ConfigError, StrategyConfig};
use crate::strategy::signal_engine::SignalEngine;

#[derive(Debug, Error)]
pub enum InitError {
    #[error("Market data unavailable: {0}")]
    DataUnavailable(#[from] MarketDataError),
    #[error("Insufficient data: need {required} aligned rows, have {available}")]
    InsufficientData { required: usize, available: usize },
    #[error("Degenerate fit: independent series has zero variance")]
    DegenerateFit,
    #[error("Strategy is running; stop it before re-initializing")]
    AlreadyRunning,
}

impl From<EstimationError> for InitError {
    fn from(err: EstimationError) -> Self {
        match err {
            EstimationError::InsufficientData { required, available } => {
                InitError::InsufficientData { required, available }
            }
            EstimationError::DegenerateFit | EstimationError::LengthMismatch { .. } => {
                InitError::DegenerateFit
            }
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ControlError {
    #[error("Strategy already running")]
    AlreadyRunning,
    #[error("Strategy not initialized")]
    NotInitialized,
}

#[derive(Debug, Error)]
pub enum TickError {
    #[error("Market data unavailable: {0}")]
    DataUnavailable(#[from] MarketDataError),
    #[error("Strategy not initialized")]
    NotInitialized,
    #[error("Non-finite evaluation (spread {spread}, z-score {z_score})")]
    NonFinite { spread: f64, z_score: f64 },
    #[error("Loop generation {0} is no longer current")]
    Superseded(u64),
}

/// The traded pair and how far back to look for prices
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerConfig {
    pub strategy: StrategyConfig,
    /// Dependent leg (regressand), e.g. Brent
    pub dependent_symbol: String,
    /// Independent leg (regressor), e.g. WTI
    pub independent_symbol: String,
    /// Calendar days of daily history used at initialization
    pub history_days: i64,
    /// Window in which a live observation still counts as recent
    pub live_lookback: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyConfig::default(),
            dependent_symbol: "BZ=F".to_string(),
            independent_symbol: "CL=F".to_string(),
            history_days: 365 * 10,
            live_lookback: Duration::from_secs(24 * 60 * 60),
        }
    }
}

#[derive(Debug)]
struct RunnerState {
    phase: RunnerPhase,
    engine: Option<SignalEngine>,
    machine: PositionStateMachine,
    /// Bumped on every start; a loop only acts while its generation is current
    generation: u64,
    last_snapshot: Option<StrategySnapshot>,
}

impl Default for RunnerState {
    fn default() -> Self {
        Self {
            phase: RunnerPhase::Uninitialized,
            engine: None,
            machine: PositionStateMachine::new(),
            generation: 0,
            last_snapshot: None,
        }
    }
}

/// Cloneable handle to the strategy. Clones share the same state.
#[derive(Clone)]
pub struct StrategyRunner {
    config: Arc<RunnerConfig>,
    provider: Arc<dyn MarketDataProvider>,
    observer: Arc<dyn StrategyObserver>,
    state: Arc<RwLock<RunnerState>>,
    wakeup: Arc<Notify>,
}

impl StrategyRunner {
    pub fn new(
        config: RunnerConfig,
        provider: Arc<dyn MarketDataProvider>,
        observer: Arc<dyn StrategyObserver>,
    ) -> Result<Self, ConfigError> {
        config.strategy.validate()?;

        Ok(Self {
            config: Arc::new(config),
            provider,
            observer,
            state: Arc::new(RwLock::new(RunnerState::default())),
            wakeup: Arc::new(Notify::new()),
        })
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Fit the hedge ratio and compute the full spread history.
    ///
    /// On failure the previous state (including an earlier successful
    /// initialization) is left untouched.
    pub async fn initialize(&self) -> Result<HedgeRatio, InitError> {
        if self.state.read().await.phase == RunnerPhase::Running {
            return Err(InitError::AlreadyRunning);
        }

        let engine = match self.load_engine().await {
            Ok(engine) => engine,
            Err(e) => {
                error!(error = %e, "Initialization failed");
                return Err(e);
            }
        };
        let hedge_ratio = engine.hedge_ratio();

        let mut state = self.state.write().await;
        // start() may have won the race while history was downloading
        if state.phase == RunnerPhase::Running {
            return Err(InitError::AlreadyRunning);
        }
        state.engine = Some(engine);
        state.phase = RunnerPhase::Initialized;

        info!("Strategy initialized");
        Ok(hedge_ratio)
    }

    async fn load_engine(&self) -> Result<SignalEngine, InitError> {
        let cfg = &self.config;
        info!(
            dependent = %cfg.dependent_symbol,
            independent = %cfg.independent_symbol,
            history_days = cfg.history_days,
            "Initializing spread strategy..."
        );

        let end = Utc::now();
        let start = end - chrono::Duration::days(cfg.history_days);

        let (dependent, independent) = tokio::try_join!(
            self.provider.fetch_historical(&cfg.dependent_symbol, start, end),
            self.provider.fetch_historical(&cfg.independent_symbol, start, end),
        )?;

        let joined = JoinedSeries::inner_join(&dependent, &independent);
        info!(
            dependent_rows = dependent.len(),
            independent_rows = independent.len(),
            joined_rows = joined.len(),
            "Data after merging"
        );
        if let (Some(first), Some(last)) = (joined.first_timestamp(), joined.last_timestamp()) {
            info!("Date range: {} to {}", first, last);
        }

        let required = cfg.strategy.rolling_window;
        if joined.len() < required {
            return Err(InitError::InsufficientData {
                required,
                available: joined.len(),
            });
        }

        let fit = HedgeRatioEstimator::new(required)
            .fit(&joined.dependent_prices(), &joined.independent_prices())?;
        info!("Beta: {:.4}, Intercept: {:.4}", fit.beta, fit.intercept);
        info!("R-squared: {:.4}", fit.r_squared);

        let engine = SignalEngine::from_history(fit, &cfg.strategy, &joined);
        let counts = engine.signal_counts();
        info!(
            long = counts.long,
            short = counts.short,
            close = counts.close,
            "Signals calculated"
        );

        Ok(engine)
    }

    /// Launch the evaluation loop
    pub async fn start(&self) -> Result<(), ControlError> {
        let generation = {
            let mut state = self.state.write().await;
            match state.phase {
                RunnerPhase::Uninitialized => return Err(ControlError::NotInitialized),
                RunnerPhase::Running => return Err(ControlError::AlreadyRunning),
                RunnerPhase::Initialized => {}
            }
            state.phase = RunnerPhase::Running;
            state.generation += 1;
            state.generation
        };

        let runner = self.clone();
        tokio::spawn(async move {
            runner.run_loop(generation).await;
        });

        info!(
            generation,
            interval_secs = self.config.strategy.update_interval_seconds,
            "Strategy started"
        );
        Ok(())
    }

    /// Request the loop to stop. Idempotent.
    pub async fn stop(&self) {
        {
            let mut state = self.state.write().await;
            if state.phase == RunnerPhase::Running {
                state.phase = RunnerPhase::Initialized;
                info!(generation = state.generation, "Stop signal sent to strategy loop");
            }
        }
        self.wakeup.notify_waiters();
    }

    async fn run_loop(&self, generation: u64) {
        info!(generation, "Strategy loop running");
        let interval = self.config.strategy.update_interval();

        while self.is_current(generation).await {
            match self.evaluate(Some(generation)).await {
                Ok(snapshot) => debug!(z_score = snapshot.z_score, "Iteration complete"),
                Err(TickError::Superseded(_)) => break,
                Err(e) => warn!(error = %e, "Strategy iteration skipped"),
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = self.wakeup.notified() => {}
            }
        }

        info!(generation, "Strategy loop stopped");
    }

    async fn is_current(&self, generation: u64) -> bool {
        let state = self.state.read().await;
        state.phase == RunnerPhase::Running && state.generation == generation
    }

    /// Run one evaluation immediately, outside the loop
    pub async fn tick(&self) -> Result<StrategySnapshot, TickError> {
        self.evaluate(None).await
    }

    async fn evaluate(&self, generation: Option<u64>) -> Result<StrategySnapshot, TickError> {
        let cfg = &self.config;

        // Network I/O happens before the lock is taken
        let (latest_a, latest_b) = tokio::try_join!(
            self.provider.fetch_latest(&cfg.dependent_symbol, cfg.live_lookback),
            self.provider.fetch_latest(&cfg.independent_symbol, cfg.live_lookback),
        )?;

        let snapshot = {
            let mut guard = self.state.write().await;
            let state = &mut *guard;

            if let Some(generation) = generation {
                if state.phase != RunnerPhase::Running || state.generation != generation {
                    return Err(TickError::Superseded(generation));
                }
            }

            let engine = state.engine.as_mut().ok_or(TickError::NotInitialized)?;
            let live = engine.evaluate(latest_a.price, latest_b.price);
            if !live.is_finite() {
                return Err(TickError::NonFinite {
                    spread: live.spread,
                    z_score: live.z_score,
                });
            }

            let action = state.machine.apply(live.signal);
            let observed_at = latest_a.timestamp.min(latest_b.timestamp);
            engine.append_if_newer(observed_at, latest_a.price, latest_b.price);

            let snapshot = StrategySnapshot {
                timestamp: Utc::now(),
                price_a: latest_a.price,
                price_b: latest_b.price,
                spread: live.spread,
                spread_mean: live.rolling_mean,
                spread_std: live.rolling_std,
                z_score: live.z_score,
                signal: live.signal,
                position: state.machine.position(),
                action,
                action_details: action.details(&cfg.dependent_symbol, &cfg.independent_symbol),
            };
            state.last_snapshot = Some(snapshot.clone());
            snapshot
        };

        info!(
            "Signal: {}, Z: {:.3}, Action: {}",
            snapshot.signal, snapshot.z_score, snapshot.action
        );
        self.observer.on_strategy_update(&snapshot);

        Ok(snapshot)
    }

    pub async fn status(&self) -> StrategyStatus {
        let state = self.state.read().await;
        let engine = state.engine.as_ref();

        StrategyStatus {
            running: state.phase == RunnerPhase::Running,
            phase: state.phase,
            position: state.machine.position(),
            hedge_ratio: engine.map(|e| e.hedge_ratio()),
            data_loaded: engine.is_some(),
            observation_count: engine.map(|e| e.len()).unwrap_or(0),
            last_update: state.last_snapshot.as_ref().map(|s| s.timestamp),
            config: self.config.strategy.clone(),
        }
    }

    /// Spread, z-score, replayed position and cumulative PnL over the last
    /// `window_size` stored points
    pub async fn historical(&self, window_size: usize) -> Result<HistoricalReport, ControlError> {
        let state = self.state.read().await;
        let engine = state.engine.as_ref().ok_or(ControlError::NotInitialized)?;
        Ok(HistoricalReport::from_points(engine.tail(window_size)))
    }

    pub async fn last_snapshot(&self) -> Option<StrategySnapshot> {
        self.state.read().await.last_snapshot.clone()
    }

    pub async fn phase(&self) -> RunnerPhase {
        self.state.read().await.phase
    }
}
