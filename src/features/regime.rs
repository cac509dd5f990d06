//! Market regime classification
//!
//! Labels a bar as trend, range or spike from its feature vector. A single
//! `RegimePolicy` carries the thresholds for both live and backtest paths.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::FeatureVector;
use crate::config::RegimeConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegimeLabel {
    Trend,
    Range,
    Spike,
}

impl RegimeLabel {
    pub const ALL: [RegimeLabel; 3] = [RegimeLabel::Trend, RegimeLabel::Range, RegimeLabel::Spike];

    pub fn as_str(&self) -> &'static str {
        match self {
            RegimeLabel::Trend => "trend",
            RegimeLabel::Range => "range",
            RegimeLabel::Spike => "spike",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trend" => Some(RegimeLabel::Trend),
            "range" => Some(RegimeLabel::Range),
            "spike" => Some(RegimeLabel::Spike),
            _ => None,
        }
    }
}

impl Default for RegimeLabel {
    fn default() -> Self {
        RegimeLabel::Range
    }
}

impl fmt::Display for RegimeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Volatility and trend-strength thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimePolicy {
    pub spike_atr_pct: f64,
    pub trend_spread: f64,
    pub trend_slope: f64,
}

impl From<&RegimeConfig> for RegimePolicy {
    fn from(cfg: &RegimeConfig) -> Self {
        Self {
            spike_atr_pct: cfg.spike_atr_pct,
            trend_spread: cfg.trend_spread,
            trend_slope: cfg.trend_slope,
        }
    }
}

pub struct RegimeClassifier {
    policy: RegimePolicy,
}

impl RegimeClassifier {
    pub fn new(policy: RegimePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RegimePolicy {
        &self.policy
    }

    pub fn classify(&self, features: &FeatureVector) -> RegimeLabel {
        let atr_pct = features.get("atr_pct");
        let spread = features.get("ema_spread").abs();
        let slope = features.get("ema_slope").abs();

        if atr_pct > self.policy.spike_atr_pct {
            RegimeLabel::Spike
        } else if spread > self.policy.trend_spread && slope > self.policy.trend_slope {
            RegimeLabel::Trend
        } else {
            RegimeLabel::Range
        }
    }
}
