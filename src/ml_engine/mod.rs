//! ML Engine - adaptive trade-signal learning
//!
//! - `model`: per-regime linear model with damped SGD updates
//! - `predictor`: scorer implementations behind the `SignalScorer` trait
//! - `meta`: caution/exploration mood driven by trade outcomes
//! - `reward`: reward shaping for closed trades
//! - `persistence`: atomic JSON state files

pub mod meta;
pub mod model;
pub mod persistence;
pub mod predictor;
pub mod reward;

pub use meta::{MetaAdaptationState, MetaState};
pub use model::{sigmoid, RegimeWeights, ScoringModel, Target};
pub use predictor::{build_scorer, AdaptiveScorer, NeutralScorer};
pub use reward::{RewardSample, RewardShaper, REWARD_MAX, REWARD_MIN};

use serde::{Deserialize, Serialize};

use crate::features::{FeatureVector, RegimeLabel};

/// Score plus the exploration rate in force when it was produced
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreOutput {
    pub p: f64,
    pub exploration: f64,
}

/// Scoring seam used by the lifecycle manager.
///
/// Selected explicitly at construction (`build_scorer`); the neutral
/// implementation stands in when no learning is wanted.
pub trait SignalScorer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Probability-like score in [0, 1]
    fn probability(&self, features: &FeatureVector, regime: RegimeLabel) -> f64;

    /// Online update toward `target`
    fn update(&mut self, features: &FeatureVector, regime: RegimeLabel, target: Target);

    fn score(&self, features: &FeatureVector, regime: RegimeLabel, meta: &MetaState) -> ScoreOutput {
        ScoreOutput {
            p: self.probability(features, regime),
            exploration: meta.exploration,
        }
    }
}
