//! Per-regime linear scoring model
//!
//! One weight vector + bias per regime label. Persisted as a flat
//! `"<regime>.<feature>" -> weight` map with `"<regime>.bias"` for the bias.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::features::{FeatureVector, RegimeLabel};

/// Logits are clamped to this magnitude before the sigmoid
pub const LOGIT_CLAMP: f64 = 30.0;

const BIAS_KEY: &str = "bias";

pub fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// What an update pulls the score toward
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Target {
    /// Binary outcome, win = 1.0
    Label(bool),
    /// Shaped reward in [-0.8, 1.35]
    Reward(f64),
}

impl Target {
    /// Map to a probability target in [0, 1].
    ///
    /// Rewards map piecewise-linearly: -0.8 -> 0.0, 0.0 -> 0.5, 1.35 -> 1.0.
    pub fn as_probability(&self) -> f64 {
        match *self {
            Target::Label(true) => 1.0,
            Target::Label(false) => 0.0,
            Target::Reward(r) if !r.is_finite() => 0.5,
            Target::Reward(r) if r >= 0.0 => (0.5 + 0.5 * r / 1.35).min(1.0),
            Target::Reward(r) => (0.5 + 0.5 * r / 0.8).max(0.0),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegimeWeights {
    pub weights: BTreeMap<String, f64>,
    pub bias: f64,
}

impl RegimeWeights {
    pub fn logit(&self, features: &FeatureVector) -> f64 {
        let z: f64 = self
            .weights
            .iter()
            .map(|(name, w)| w * features.get(name))
            .sum::<f64>()
            + self.bias;
        if z.is_nan() {
            0.0
        } else {
            z.clamp(-LOGIT_CLAMP, LOGIT_CLAMP)
        }
    }

    pub fn probability(&self, features: &FeatureVector) -> f64 {
        sigmoid(self.logit(features))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoringModel {
    regimes: BTreeMap<RegimeLabel, RegimeWeights>,
}

impl ScoringModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Weights for a regime, if it has ever been updated
    pub fn regime(&self, regime: RegimeLabel) -> Option<&RegimeWeights> {
        self.regimes.get(&regime)
    }

    /// Score under a regime; unseen regimes act as a zero model (0.5)
    pub fn probability(&self, features: &FeatureVector, regime: RegimeLabel) -> f64 {
        self.regimes
            .get(&regime)
            .map(|w| w.probability(features))
            .unwrap_or(0.5)
    }

    /// One SGD step with L2 shrinkage.
    ///
    /// `w <- (1 - decay)·w + lr·err·x`; the bias gets the same rule with x = 1.
    /// Returns the probability before the step.
    pub fn step(
        &mut self,
        features: &FeatureVector,
        regime: RegimeLabel,
        target: Target,
        learning_rate: f64,
        decay: f64,
    ) -> f64 {
        let entry = self.regimes.entry(regime).or_default();
        let p = entry.probability(features);
        let err = target.as_probability() - p;
        let keep = 1.0 - decay;

        for (name, x) in features.iter() {
            if !x.is_finite() {
                continue;
            }
            let w = entry.weights.entry(name.clone()).or_insert(0.0);
            *w = keep * *w + learning_rate * err * x;
        }
        // Weights for features absent from this vector still shrink
        for (name, w) in entry.weights.iter_mut() {
            if !features.contains(name) {
                *w *= keep;
            }
        }
        entry.bias = keep * entry.bias + learning_rate * err;
        p
    }

    pub fn to_flat(&self) -> BTreeMap<String, f64> {
        let mut flat = BTreeMap::new();
        for (regime, w) in &self.regimes {
            for (name, value) in &w.weights {
                flat.insert(format!("{}.{}", regime.as_str(), name), *value);
            }
            flat.insert(format!("{}.{}", regime.as_str(), BIAS_KEY), w.bias);
        }
        flat
    }

    /// Rebuild from a flat map, skipping keys with unknown regimes
    pub fn from_flat(flat: &BTreeMap<String, f64>) -> Self {
        let mut model = Self::new();
        for (key, value) in flat {
            let Some((regime, name)) = key.split_once('.') else {
                continue;
            };
            let Some(regime) = RegimeLabel::from_str(regime) else {
                continue;
            };
            if !value.is_finite() {
                continue;
            }
            let entry = model.regimes.entry(regime).or_default();
            if name == BIAS_KEY {
                entry.bias = *value;
            } else {
                entry.weights.insert(name.to_string(), *value);
            }
        }
        model
    }
}

impl Serialize for ScoringModel {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_flat().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ScoringModel {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let flat = BTreeMap::<String, f64>::deserialize(deserializer)?;
        Ok(Self::from_flat(&flat))
    }
}
