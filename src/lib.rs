//! SpiralBot Library
//!
//! Adaptive trade-signal engine for BTC candles: an online-learning scorer
//! with a persisted caution/exploration mood, a single-position lifecycle
//! state machine, and a backtest replay that drives the same state machine
//! over historical bars.

pub mod backtesting;
pub mod config;
pub mod features;
pub mod lifecycle;
pub mod ml_engine;
pub mod notify;
pub mod oracle;
pub mod persistence;
pub mod scanner;
pub mod strategy;
pub mod types;

#[cfg(feature = "dashboard")]
pub mod dashboard;
