//! Signal scorers
//!
//! `AdaptiveScorer` wraps the per-regime `ScoringModel`, applies online
//! updates and persists weights after every step. `NeutralScorer` is the
//! explicit fallback: constant 0.5, never learns.

use std::path::PathBuf;
use tracing::{debug, info, warn};

use super::model::{ScoringModel, Target};
use super::persistence::{load_json_or_default, write_json_atomic};
use super::SignalScorer;
use crate::config::{ScorerConfig, ScorerKind};
use crate::features::{FeatureVector, RegimeLabel};

pub struct AdaptiveScorer {
    model: ScoringModel,
    learning_rate: f64,
    decay: f64,
    state_file: Option<PathBuf>,
    updates: u64,
}

impl AdaptiveScorer {
    pub fn new(learning_rate: f64, decay: f64) -> Self {
        Self {
            model: ScoringModel::new(),
            learning_rate,
            decay,
            state_file: None,
            updates: 0,
        }
    }

    /// Persist weights to `path` after every update, loading what is there now
    pub fn with_state_file(mut self, path: PathBuf) -> Self {
        self.model = load_json_or_default(&path);
        self.state_file = Some(path);
        self
    }

    pub fn model(&self) -> &ScoringModel {
        &self.model
    }

    pub fn updates(&self) -> u64 {
        self.updates
    }

    fn save(&self) {
        if let Some(path) = &self.state_file {
            if let Err(e) = write_json_atomic(path, &self.model) {
                warn!(path = %path.display(), error = %e, "Failed to persist scorer weights");
            }
        }
    }
}

impl SignalScorer for AdaptiveScorer {
    fn name(&self) -> &'static str {
        "adaptive"
    }

    fn probability(&self, features: &FeatureVector, regime: RegimeLabel) -> f64 {
        self.model.probability(features, regime)
    }

    fn update(&mut self, features: &FeatureVector, regime: RegimeLabel, target: Target) {
        let p = self.model.step(
            features,
            regime,
            target,
            self.learning_rate,
            self.decay,
        );
        self.updates += 1;
        debug!(
            regime = %regime,
            p_before = p,
            target = target.as_probability(),
            p_after = self.model.probability(features, regime),
            "🧠 Scorer updated"
        );
        self.save();
    }
}

/// Scorer that always returns 0.5
#[derive(Debug, Default, Clone, Copy)]
pub struct NeutralScorer;

impl SignalScorer for NeutralScorer {
    fn name(&self) -> &'static str {
        "neutral"
    }

    fn probability(&self, _features: &FeatureVector, _regime: RegimeLabel) -> f64 {
        0.5
    }

    fn update(&mut self, _features: &FeatureVector, _regime: RegimeLabel, _target: Target) {}
}

/// Build the configured scorer, persisting to `state_file` when given
pub fn build_scorer(cfg: &ScorerConfig, state_file: Option<PathBuf>) -> Box<dyn SignalScorer> {
    match cfg.kind {
        ScorerKind::Adaptive => {
            let scorer = AdaptiveScorer::new(cfg.learning_rate, cfg.decay);
            let scorer = match state_file {
                Some(path) => scorer.with_state_file(path),
                None => scorer,
            };
            Box::new(scorer)
        }
        ScorerKind::Neutral => {
            info!("Using neutral scorer (constant 0.5)");
            Box::new(NeutralScorer)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml_engine::MetaState;
    use std::fs;

    fn features() -> FeatureVector {
        [("ema_spread", 0.8), ("rsi_norm", 0.2), ("atr_pct", 0.4)]
            .into_iter()
            .collect()
    }

    #[test]
    fn neutral_scorer_ignores_updates() {
        let mut s = NeutralScorer;
        s.update(&features(), RegimeLabel::Trend, Target::Label(true));
        let out = s.score(&features(), RegimeLabel::Trend, &MetaState::default());
        assert_eq!(out.p, 0.5);
        assert_eq!(out.exploration, MetaState::default().exploration);
    }

    #[test]
    fn wins_push_score_up_and_losses_down() {
        let mut s = AdaptiveScorer::new(0.1, 1e-5);
        let f = features();
        for _ in 0..20 {
            s.update(&f, RegimeLabel::Trend, Target::Reward(1.0));
            s.update(&f, RegimeLabel::Range, Target::Reward(-0.6));
        }
        assert!(s.probability(&f, RegimeLabel::Trend) > 0.6);
        assert!(s.probability(&f, RegimeLabel::Range) < 0.4);
        assert_eq!(s.probability(&f, RegimeLabel::Spike), 0.5);
        assert_eq!(s.updates(), 40);
    }

    #[test]
    fn weights_survive_restart_and_corruption_resets() {
        let dir = std::env::temp_dir().join(format!("spiralbot_scorer_{}", uuid::Uuid::new_v4()));
        let path = dir.join("scorer_weights.json");
        let f = features();

        let mut s = AdaptiveScorer::new(0.1, 1e-5).with_state_file(path.clone());
        s.update(&f, RegimeLabel::Trend, Target::Label(true));
        let p = s.probability(&f, RegimeLabel::Trend);

        let reloaded = AdaptiveScorer::new(0.1, 1e-5).with_state_file(path.clone());
        assert!((reloaded.probability(&f, RegimeLabel::Trend) - p).abs() < 1e-12);

        fs::write(&path, "not json").unwrap();
        let reset = AdaptiveScorer::new(0.1, 1e-5).with_state_file(path);
        assert_eq!(reset.probability(&f, RegimeLabel::Trend), 0.5);
        fs::remove_dir_all(&dir).ok();
    }
}
