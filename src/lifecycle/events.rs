//! Structured engine events
//!
//! Emitted by the lifecycle manager on every transition and consumed by
//! notification sinks and the backtest report.

use serde::{Deserialize, Serialize};

use crate::features::RegimeLabel;
use crate::types::{ExitOutcome, Side};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EngineEvent {
    SignalOpened {
        ts: i64,
        side: Side,
        entry: f64,
        stop: f64,
        tp1: f64,
        tp2: f64,
        score: f64,
        regime: RegimeLabel,
        explored: bool,
    },
    BreakEvenMoved {
        ts: i64,
        price: f64,
    },
    StopTrailed {
        ts: i64,
        price: f64,
    },
    PositionClosed {
        ts: i64,
        outcome: ExitOutcome,
        exit_price: f64,
        pnl: f64,
        reward: f64,
    },
}

impl EngineEvent {
    pub fn ts(&self) -> i64 {
        match self {
            EngineEvent::SignalOpened { ts, .. }
            | EngineEvent::BreakEvenMoved { ts, .. }
            | EngineEvent::StopTrailed { ts, .. }
            | EngineEvent::PositionClosed { ts, .. } => *ts,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            EngineEvent::SignalOpened { .. } => "open",
            EngineEvent::BreakEvenMoved { .. } => "breakeven",
            EngineEvent::StopTrailed { .. } => "trail",
            EngineEvent::PositionClosed { .. } => "close",
        }
    }

    pub fn outcome(&self) -> Option<ExitOutcome> {
        match self {
            EngineEvent::PositionClosed { outcome, .. } => Some(*outcome),
            _ => None,
        }
    }
}
