//! Core types used throughout SpiralBot
//!
//! Candles, trade sides, timeframes and exit outcomes shared by the live
//! scanner, the lifecycle state machine and the backtest replay.

use serde::{Deserialize, Serialize};
use std::fmt;

/// OHLCV candle, `open_time`/`close_time` in unix milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: i64,
    pub close_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// True when every price field is a finite number
    pub fn is_finite(&self) -> bool {
        self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite()
    }

    /// High-low range of the bar
    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}

/// Position side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1.0 for long, -1.0 for short
    pub fn sign(&self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Long => "LONG",
            Side::Short => "SHORT",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Supported candle timeframes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    Min1,
    Min5,
    Min15,
    Hour1,
}

impl Default for Timeframe {
    fn default() -> Self {
        Timeframe::Min5
    }
}

impl Timeframe {
    /// Get duration in seconds
    pub fn duration_secs(&self) -> u64 {
        match self {
            Timeframe::Min1 => 60,
            Timeframe::Min5 => 5 * 60,
            Timeframe::Min15 => 15 * 60,
            Timeframe::Hour1 => 60 * 60,
        }
    }

    pub fn duration_ms(&self) -> i64 {
        self.duration_secs() as i64 * 1000
    }

    /// Binance kline interval string
    pub fn interval(&self) -> &'static str {
        match self {
            Timeframe::Min1 => "1m",
            Timeframe::Min5 => "5m",
            Timeframe::Min15 => "15m",
            Timeframe::Hour1 => "1h",
        }
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "1m" | "1min" => Some(Timeframe::Min1),
            "5m" | "5min" => Some(Timeframe::Min5),
            "15m" | "15min" => Some(Timeframe::Min15),
            "1h" | "1hour" | "60m" => Some(Timeframe::Hour1),
            _ => None,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.interval())
    }
}

/// Terminal classification of a closed position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExitOutcome {
    #[serde(rename = "TP1")]
    Tp1,
    #[serde(rename = "TP2")]
    Tp2,
    #[serde(rename = "SL")]
    Sl,
    #[serde(rename = "EARLY_EXIT")]
    EarlyExit,
}

impl ExitOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitOutcome::Tp1 => "TP1",
            ExitOutcome::Tp2 => "TP2",
            ExitOutcome::Sl => "SL",
            ExitOutcome::EarlyExit => "EARLY_EXIT",
        }
    }

    /// Parse from the log representation
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "TP1" => Some(ExitOutcome::Tp1),
            "TP2" => Some(ExitOutcome::Tp2),
            "SL" => Some(ExitOutcome::Sl),
            "EARLY_EXIT" => Some(ExitOutcome::EarlyExit),
            _ => None,
        }
    }

    pub fn is_win(&self) -> bool {
        matches!(self, ExitOutcome::Tp1 | ExitOutcome::Tp2)
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeframe_parses_binance_intervals() {
        assert_eq!(Timeframe::from_str("5m"), Some(Timeframe::Min5));
        assert_eq!(Timeframe::from_str("1H"), Some(Timeframe::Hour1));
        assert_eq!(Timeframe::from_str("2d"), None);
        assert_eq!(Timeframe::Min15.duration_ms(), 900_000);
    }

    #[test]
    fn exit_outcome_serializes_as_log_label() {
        let json = serde_json::to_string(&ExitOutcome::EarlyExit).unwrap();
        assert_eq!(json, "\"EARLY_EXIT\"");
        assert_eq!(ExitOutcome::from_str("tp2"), Some(ExitOutcome::Tp2));
        assert!(ExitOutcome::Tp1.is_win());
        assert!(!ExitOutcome::Sl.is_win());
    }
}
