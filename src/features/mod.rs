//! Feature Engine - Technical indicators and normalized feature vectors
//!
//! Computes indicators from a candle window (most recent last):
//! - EMA fast/slow (seeded at the first close)
//! - RSI (Wilder's smoothing)
//! - Rolling VWAP on typical price
//! - ATR (mean true range)
//!
//! and turns them into a bounded `FeatureVector` for the scorer. Windows
//! shorter than an indicator's lookback get a neutral value instead of an
//! error, so thin history can still be scored.

pub mod regime;
pub mod session;

pub use regime::{RegimeClassifier, RegimeLabel, RegimePolicy};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::FeaturesConfig;
use crate::types::Candle;

/// Percent-style features are clamped to this magnitude
const PCT_CLAMP: f64 = 5.0;
/// Upper bound for `atr_pct`
const ATR_PCT_MAX: f64 = 10.0;

/// Named, bounded features for one bar.
///
/// Ordered map so serialization and dot products are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(BTreeMap<String, f64>);

impl FeatureVector {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.0.insert(name.into(), value);
    }

    /// Value of a feature, 0.0 when absent
    pub fn get(&self, name: &str) -> f64 {
        self.0.get(name).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &f64)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for FeatureVector {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Direction read from price vs fast EMA and EMA slope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Momentum {
    Bullish,
    Bearish,
    Neutral,
}

/// Computed indicators plus the normalized vector for the last bar
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Features {
    pub ts: i64,
    pub close: f64,
    pub rsi: f64,
    pub ema_fast: f64,
    pub ema_slow: f64,
    /// Fast EMA one bar earlier (equals `ema_fast` on a single bar)
    pub ema_fast_prev: f64,
    pub vwap: f64,
    pub atr: f64,
    pub vector: FeatureVector,
}

impl Features {
    pub fn momentum(&self) -> Momentum {
        let slope = self.ema_fast - self.ema_fast_prev;
        if self.close > self.ema_fast && slope > 0.0 {
            Momentum::Bullish
        } else if self.close < self.ema_fast && slope < 0.0 {
            Momentum::Bearish
        } else {
            Momentum::Neutral
        }
    }
}

/// Feature extractor for candle windows
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    ema_fast: usize,
    ema_slow: usize,
    rsi_period: usize,
    atr_period: usize,
    vwap_lookback: usize,
}

impl FeatureExtractor {
    pub fn new(cfg: &FeaturesConfig) -> Self {
        Self {
            ema_fast: cfg.ema_fast.max(1),
            ema_slow: cfg.ema_slow.max(1),
            rsi_period: cfg.rsi_period.max(1),
            atr_period: cfg.atr_period.max(1),
            vwap_lookback: cfg.vwap_lookback.max(1),
        }
    }

    /// Compute features for the last bar of `candles`.
    ///
    /// Returns `None` only for an empty window.
    pub fn compute(&self, candles: &[Candle]) -> Option<Features> {
        let last = candles.last()?;
        let close = last.close;

        let ema_fast = compute_ema(candles, self.ema_fast);
        let ema_slow = compute_ema(candles, self.ema_slow);
        let ema_fast_prev = if candles.len() >= 2 {
            compute_ema(&candles[..candles.len() - 1], self.ema_fast)
        } else {
            ema_fast
        };
        let rsi = compute_rsi_wilders(candles, self.rsi_period);
        let vwap = compute_vwap(candles, self.vwap_lookback);
        let atr = compute_atr(candles, self.atr_period);

        let mut vector = FeatureVector::new();
        vector.insert(
            "ema_spread",
            clamp_pct(pct_of(ema_fast - ema_slow, close)),
        );
        vector.insert(
            "ema_slope",
            clamp_pct(pct_of(ema_fast - ema_fast_prev, close)),
        );
        vector.insert("rsi_norm", ((rsi - 50.0) / 50.0).clamp(-1.0, 1.0));
        vector.insert("vwap_dist", clamp_pct(pct_of(close - vwap, vwap)));
        vector.insert("atr_pct", pct_of(atr, close).clamp(0.0, ATR_PCT_MAX));
        vector.insert("wick_ratio", wick_ratio(last));
        for (name, value) in session::time_features(last.open_time) {
            vector.insert(name, value);
        }

        Some(Features {
            ts: last.close_time,
            close,
            rsi,
            ema_fast,
            ema_slow,
            ema_fast_prev,
            vwap,
            atr,
            vector,
        })
    }
}

/// `value` as a percent of `base`, 0.0 when the base is unusable
fn pct_of(value: f64, base: f64) -> f64 {
    if base.abs() > f64::EPSILON && value.is_finite() && base.is_finite() {
        value / base * 100.0
    } else {
        0.0
    }
}

fn clamp_pct(v: f64) -> f64 {
    v.clamp(-PCT_CLAMP, PCT_CLAMP)
}

/// Share of the bar range that is wick rather than body
fn wick_ratio(c: &Candle) -> f64 {
    let range = c.range();
    if range <= 0.0 || !range.is_finite() {
        return 0.0;
    }
    ((range - (c.close - c.open).abs()) / range).clamp(0.0, 1.0)
}

/// EMA over the whole window, seeded at the first close
fn compute_ema(candles: &[Candle], period: usize) -> f64 {
    let Some(first) = candles.first() else {
        return 0.0;
    };
    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut ema = first.close;
    for c in candles.iter().skip(1) {
        ema = (c.close - ema) * multiplier + ema;
    }
    ema
}

/// Wilder RSI; 50.0 until `period + 1` closes exist
fn compute_rsi_wilders(candles: &[Candle], period: usize) -> f64 {
    if candles.len() < period + 1 {
        return 50.0;
    }

    // Seed with simple averages over the first `period` changes
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=period {
        let change = candles[i].close - candles[i - 1].close;
        if change > 0.0 {
            avg_gain += change;
        } else {
            avg_loss += change.abs();
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;

    let p = period as f64;
    for i in (period + 1)..candles.len() {
        let change = candles[i].close - candles[i - 1].close;
        let (gain, loss) = if change > 0.0 {
            (change, 0.0)
        } else {
            (0.0, change.abs())
        };
        avg_gain = (avg_gain * (p - 1.0) + gain) / p;
        avg_loss = (avg_loss * (p - 1.0) + loss) / p;
    }

    if avg_loss == 0.0 {
        return if avg_gain == 0.0 { 50.0 } else { 100.0 };
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

/// Mean true range over the last `period` bars (fewer on thin windows)
fn compute_atr(candles: &[Candle], period: usize) -> f64 {
    if candles.is_empty() {
        return 0.0;
    }
    let start = candles.len().saturating_sub(period);
    let mut sum = 0.0;
    let mut count = 0usize;
    for i in start..candles.len() {
        let curr = &candles[i];
        let tr = if i == 0 {
            curr.range()
        } else {
            let prev_close = candles[i - 1].close;
            curr.range()
                .max((curr.high - prev_close).abs())
                .max((curr.low - prev_close).abs())
        };
        sum += tr;
        count += 1;
    }
    sum / count as f64
}

/// Rolling VWAP on typical price; falls back to the last close without volume
fn compute_vwap(candles: &[Candle], lookback: usize) -> f64 {
    let mut sum_pv = 0.0;
    let mut sum_volume = 0.0;

    for c in candles.iter().rev().take(lookback) {
        let typical = (c.high + c.low + c.close) / 3.0;
        sum_pv += typical * c.volume;
        sum_volume += c.volume;
    }

    if sum_volume > 0.0 {
        sum_pv / sum_volume
    } else {
        candles.last().map(|c| c.close).unwrap_or(0.0)
    }
}
