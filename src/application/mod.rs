pub mod report;
pub mod runner;

pub use report::{HistoricalReport, RunnerPhase, StrategyStatus};
pub use runner::{ControlError, InitError, RunnerConfig, StrategyRunner, TickError};
