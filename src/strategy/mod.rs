//! Strategy Engine - signal pipeline shared by live and backtest paths
//!
//! `SignalPipeline` turns fast/slow candle windows into a `MarketView`
//! (features, regime, momentum reads). `entry_signal` applies the base entry
//! rule: trend/VWAP agreement on the decision timeframe plus an RSI band.

use serde::{Deserialize, Serialize};

use crate::config::{AppConfig, LifecycleConfig};
use crate::features::{
    FeatureExtractor, Features, Momentum, RegimeClassifier, RegimeLabel, RegimePolicy,
};
use crate::types::{Candle, Side};

/// Everything the lifecycle manager reads about the market at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketView {
    /// Decision time (unix ms)
    pub ts: i64,
    /// Decision (fast) timeframe features
    pub fast: Features,
    /// Confirmation (slow) timeframe features, when available
    pub slow: Option<Features>,
    pub regime: RegimeLabel,
}

impl MarketView {
    pub fn fast_momentum(&self) -> Momentum {
        self.fast.momentum()
    }

    pub fn slow_momentum(&self) -> Option<Momentum> {
        self.slow.as_ref().map(|f| f.momentum())
    }
}

/// Momentum read that favors `side`
pub fn favorable(side: Side) -> Momentum {
    match side {
        Side::Long => Momentum::Bullish,
        Side::Short => Momentum::Bearish,
    }
}

/// Momentum read that opposes `side`
pub fn adverse(side: Side) -> Momentum {
    match side {
        Side::Long => Momentum::Bearish,
        Side::Short => Momentum::Bullish,
    }
}

/// Result of the base entry rule
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntrySignal {
    Enter(Side),
    /// Long and short conditions both hold
    Ambiguous,
    /// Neither trend/VWAP condition holds
    NoTrend,
    RsiOutOfBand(f64),
}

/// Base entry rule on the decision timeframe.
///
/// Long: close ≥ fast EMA ≥ slow EMA and close ≥ VWAP; short mirrors it.
/// When both hold the signal is ambiguous and never guessed.
pub fn entry_signal(f: &Features, cfg: &LifecycleConfig) -> EntrySignal {
    let long_ok = f.close >= f.ema_fast && f.ema_fast >= f.ema_slow && f.close >= f.vwap;
    let short_ok = f.close <= f.ema_fast && f.ema_fast <= f.ema_slow && f.close <= f.vwap;

    let side = match (long_ok, short_ok) {
        (true, true) => return EntrySignal::Ambiguous,
        (false, false) => return EntrySignal::NoTrend,
        (true, false) => Side::Long,
        (false, true) => Side::Short,
    };

    if f.rsi < cfg.rsi_min || f.rsi > cfg.rsi_max {
        return EntrySignal::RsiOutOfBand(f.rsi);
    }
    EntrySignal::Enter(side)
}

pub struct SignalPipeline {
    extractor: FeatureExtractor,
    classifier: RegimeClassifier,
}

impl SignalPipeline {
    pub fn new(cfg: &AppConfig) -> Self {
        Self {
            extractor: FeatureExtractor::new(&cfg.features),
            classifier: RegimeClassifier::new(RegimePolicy::from(&cfg.regime)),
        }
    }

    /// Build a view from the two windows; `None` when the fast window is
    /// empty or its last bar is not finite
    pub fn view(&self, fast: &[Candle], slow: &[Candle], ts: i64) -> Option<MarketView> {
        let last = fast.last()?;
        if !last.is_finite() {
            return None;
        }
        let fast_features = self.extractor.compute(fast)?;
        let slow_features = match slow.last() {
            Some(c) if c.is_finite() => self.extractor.compute(slow),
            _ => None,
        };
        let regime = self.classifier.classify(&fast_features.vector);

        Some(MarketView {
            ts,
            fast: fast_features,
            slow: slow_features,
            regime,
        })
    }
}
