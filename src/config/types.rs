//! Configuration enums shared by the config sections

use serde::{Deserialize, Serialize};

/// Which driver the binary runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BotMode {
    Live,
    Backtest,
}

/// Scorer implementation selected at construction time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorerKind {
    /// Per-regime online logistic model
    Adaptive,
    /// Constant 0.5, never learns
    Neutral,
}

/// How stop/target distances are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMode {
    /// Price units (dollars for BTCUSDT)
    Absolute,
    /// Percent of entry price
    Percent,
}

/// What happens when price reaches TP1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tp1Action {
    Breakeven,
    Close,
}

/// Indicator the trailing stop follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrailReference {
    Ema,
    Vwap,
}
