//! Dashboard response types

use serde::{Deserialize, Serialize};

use crate::lifecycle::EngineStatus;
use crate::persistence::TradeRecord;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub has_position: bool,
    pub trades_logged: usize,
    pub server_time: i64,
}

/// Aggregates over the trade-log tail
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultsResponse {
    pub trades: usize,
    pub wins: usize,
    pub tp2s: usize,
    pub sls: usize,
    pub win_rate: f64,
    pub total_pnl: f64,
    pub total_reward: f64,
}

impl ResultsResponse {
    pub fn from_trades(trades: &[TradeRecord]) -> Self {
        use crate::types::ExitOutcome;

        let wins = trades.iter().filter(|t| t.outcome.is_win()).count();
        Self {
            trades: trades.len(),
            wins,
            tp2s: trades.iter().filter(|t| t.outcome == ExitOutcome::Tp2).count(),
            sls: trades.iter().filter(|t| t.outcome == ExitOutcome::Sl).count(),
            win_rate: if trades.is_empty() {
                0.0
            } else {
                wins as f64 / trades.len() as f64
            },
            total_pnl: trades.iter().map(|t| t.pnl).sum(),
            total_reward: trades.iter().map(|t| t.reward).sum(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub engine: EngineStatus,
    pub results: ResultsResponse,
}
