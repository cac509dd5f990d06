//! The single open position and its protective levels

use serde::{Deserialize, Serialize};

use crate::features::{FeatureVector, RegimeLabel};
use crate::persistence::TradeRecord;
use crate::types::{ExitOutcome, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionPhase {
    Open,
    BreakEven,
    Trailing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: String,
    pub side: Side,
    pub entry: f64,
    /// Current stop; only ever moves in the position's favor
    pub stop: f64,
    pub initial_stop: f64,
    pub tp1: f64,
    pub tp2: f64,
    pub breakeven_hit: bool,
    pub trailing_stop: Option<f64>,
    /// Unix ms
    pub opened_at: i64,
    /// Decision bars closed since entry
    pub bars_held: u32,
    /// Close time of the last decision bar counted into `bars_held`
    #[serde(default)]
    pub last_bar_ts: i64,
    pub score: f64,
    pub regime: RegimeLabel,
    pub explored: bool,
    pub stop_expanded: bool,
    pub duplicate_entry: bool,
    pub momentum_aligned_bars: u32,
    /// Features at entry, replayed into the scorer on close
    #[serde(skip)]
    pub entry_features: FeatureVector,
}

impl Position {
    pub fn phase(&self) -> PositionPhase {
        if self.trailing_stop.is_some() {
            PositionPhase::Trailing
        } else if self.breakeven_hit {
            PositionPhase::BreakEven
        } else {
            PositionPhase::Open
        }
    }

    /// Signed move from entry to `price`, per unit
    pub fn move_to(&self, price: f64) -> f64 {
        (price - self.entry) * self.side.sign()
    }

    /// Initial risk per unit
    pub fn initial_risk(&self) -> f64 {
        (self.entry - self.initial_stop).abs()
    }

    pub fn stop_hit(&self, low: f64, high: f64) -> bool {
        match self.side {
            Side::Long => low <= self.stop,
            Side::Short => high >= self.stop,
        }
    }

    /// Whether `high`/`low` reached `level` in the position's favor
    pub fn reached(&self, level: f64, low: f64, high: f64) -> bool {
        match self.side {
            Side::Long => high >= level,
            Side::Short => low <= level,
        }
    }

    /// Move the stop to `candidate` if that tightens it. Returns true on change.
    pub fn tighten_stop(&mut self, candidate: f64) -> bool {
        let better = match self.side {
            Side::Long => candidate > self.stop,
            Side::Short => candidate < self.stop,
        };
        if better && candidate.is_finite() {
            self.stop = candidate;
            true
        } else {
            false
        }
    }

    pub fn to_record(
        &self,
        outcome: ExitOutcome,
        exit_price: f64,
        exit_time: i64,
        pnl: f64,
        reward: f64,
    ) -> TradeRecord {
        TradeRecord {
            id: self.id.clone(),
            side: self.side,
            entry: self.entry,
            stop: self.stop,
            initial_stop: self.initial_stop,
            tp1: self.tp1,
            tp2: self.tp2,
            breakeven_hit: self.breakeven_hit,
            trailing_stop: self.trailing_stop,
            opened_at: self.opened_at,
            bars_held: self.bars_held,
            regime: self.regime,
            score: self.score,
            explored: self.explored,
            outcome,
            exit_price,
            exit_time,
            pnl,
            reward,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short() -> Position {
        Position {
            id: "p".into(),
            side: Side::Short,
            entry: 1000.0,
            stop: 1300.0,
            initial_stop: 1300.0,
            tp1: 400.0,
            tp2: -500.0,
            breakeven_hit: false,
            trailing_stop: None,
            opened_at: 0,
            bars_held: 0,
            last_bar_ts: 0,
            score: 0.5,
            regime: RegimeLabel::Range,
            explored: false,
            stop_expanded: false,
            duplicate_entry: false,
            momentum_aligned_bars: 0,
            entry_features: FeatureVector::new(),
        }
    }

    #[test]
    fn short_levels_mirror_long() {
        let p = short();
        assert!(p.stop_hit(900.0, 1300.0));
        assert!(!p.stop_hit(900.0, 1299.0));
        assert!(p.reached(p.tp1, 400.0, 500.0));
        assert_eq!(p.move_to(900.0), 100.0);
        assert_eq!(p.initial_risk(), 300.0);
    }

    #[test]
    fn stop_only_tightens() {
        let mut p = short();
        assert!(p.tighten_stop(1000.0));
        assert!(!p.tighten_stop(1100.0));
        assert_eq!(p.stop, 1000.0);
        assert!(!p.tighten_stop(f64::NAN));
        assert_eq!(p.phase(), PositionPhase::Open);
    }
}
