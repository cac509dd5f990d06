//! Meta adaptation ("mood") state
//!
//! Loss streak, caution multiplier and exploration rate. Mutated once per
//! closed trade: stop-outs raise caution and exploration, wins relax them,
//! other closes drift back toward baseline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

use super::persistence::{load_json_or_default, write_json_atomic};
use crate::config::MetaConfig;
use crate::types::ExitOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaState {
    pub sl_streak: u32,
    pub caution_multiplier: f64,
    pub exploration: f64,
    /// Close time of the last outcome (unix ms), 0 before the first trade
    pub last_outcome_ts: i64,
}

impl Default for MetaState {
    fn default() -> Self {
        Self {
            sl_streak: 0,
            caution_multiplier: 1.0,
            exploration: 0.05,
            last_outcome_ts: 0,
        }
    }
}

pub struct MetaAdaptationState {
    state: MetaState,
    cfg: MetaConfig,
    state_file: Option<PathBuf>,
}

impl MetaAdaptationState {
    pub fn new(cfg: MetaConfig) -> Self {
        let state = MetaState {
            exploration: cfg.initial_exploration,
            ..MetaState::default()
        };
        Self {
            state,
            cfg,
            state_file: None,
        }
    }

    /// Load from `path` (defaults on missing/corrupt) and persist there on change
    pub fn with_state_file(mut self, path: PathBuf) -> Self {
        let loaded: MetaState = load_json_or_default(&path);
        self.state = self.sanitize(loaded);
        self.state_file = Some(path);
        self
    }

    pub fn state(&self) -> &MetaState {
        &self.state
    }

    /// Apply the transition for one closed trade
    pub fn on_outcome(&mut self, outcome: ExitOutcome, ts: i64) -> MetaState {
        let cfg = &self.cfg;
        let s = &mut self.state;
        s.last_outcome_ts = ts;

        match outcome {
            ExitOutcome::Sl => {
                s.sl_streak += 1;
                s.caution_multiplier = (1.0 + cfg.sl_caution_step * s.sl_streak as f64)
                    .min(cfg.caution_ceiling);
                s.exploration = (s.exploration + cfg.sl_exploration_step).min(cfg.exploration_ceiling);
            }
            ExitOutcome::Tp2 => {
                s.sl_streak = 0;
                s.caution_multiplier = (s.caution_multiplier - cfg.tp2_caution_relief).max(1.0);
                s.exploration =
                    (s.exploration - cfg.tp2_exploration_relief).max(cfg.exploration_floor);
            }
            ExitOutcome::Tp1 => {
                s.sl_streak = 0;
                s.caution_multiplier = (s.caution_multiplier - cfg.tp1_caution_relief).max(1.0);
                s.exploration =
                    (s.exploration - cfg.tp1_exploration_relief).max(cfg.tp1_exploration_floor);
            }
            ExitOutcome::EarlyExit => {
                s.caution_multiplier = (s.caution_multiplier - cfg.idle_caution_decay).max(1.0);
                s.exploration =
                    (s.exploration - cfg.idle_exploration_decay).max(cfg.exploration_floor);
            }
        }

        info!(
            outcome = %outcome,
            sl_streak = s.sl_streak,
            caution = s.caution_multiplier,
            exploration = s.exploration,
            "🎚️ Meta state adapted"
        );

        let snapshot = *s;
        self.save();
        snapshot
    }

    /// Clamp a loaded state into the configured bounds
    fn sanitize(&self, mut s: MetaState) -> MetaState {
        let defaults = MetaState {
            exploration: self.cfg.initial_exploration,
            ..MetaState::default()
        };
        if !s.caution_multiplier.is_finite() || !s.exploration.is_finite() {
            warn!("Non-finite meta state on disk, using defaults");
            return defaults;
        }
        s.caution_multiplier = s.caution_multiplier.clamp(1.0, self.cfg.caution_ceiling);
        s.exploration = s
            .exploration
            .clamp(self.cfg.exploration_floor, self.cfg.exploration_ceiling);
        s
    }

    fn save(&self) {
        if let Some(path) = &self.state_file {
            if let Err(e) = write_json_atomic(path, &self.state) {
                warn!(path = %path.display(), error = %e, "Failed to persist meta state");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn meta() -> MetaAdaptationState {
        MetaAdaptationState::new(AppConfig::defaults().unwrap().meta)
    }

    #[test]
    fn stop_outs_escalate_caution_and_exploration() {
        let mut m = meta();
        let s = m.on_outcome(ExitOutcome::Sl, 1);
        assert_eq!(s.sl_streak, 1);
        assert!((s.caution_multiplier - 1.25).abs() < 1e-12);
        assert!((s.exploration - 0.08).abs() < 1e-12);

        for _ in 0..10 {
            m.on_outcome(ExitOutcome::Sl, 2);
        }
        let s = m.state();
        assert_eq!(s.sl_streak, 11);
        assert!((s.caution_multiplier - 1.8).abs() < 1e-12);
        assert!((s.exploration - 0.25).abs() < 1e-12);
        assert_eq!(s.last_outcome_ts, 2);
    }

    #[test]
    fn tp2_relaxes_more_than_tp1() {
        let mut a = meta();
        let mut b = meta();
        for m in [&mut a, &mut b] {
            m.on_outcome(ExitOutcome::Sl, 0);
            m.on_outcome(ExitOutcome::Sl, 0);
        }
        let after_tp2 = a.on_outcome(ExitOutcome::Tp2, 0);
        let after_tp1 = b.on_outcome(ExitOutcome::Tp1, 0);

        assert_eq!(after_tp2.sl_streak, 0);
        assert_eq!(after_tp1.sl_streak, 0);
        assert!((after_tp2.caution_multiplier - 1.15).abs() < 1e-12);
        assert!((after_tp1.caution_multiplier - 1.30).abs() < 1e-12);
        assert!(after_tp2.exploration < after_tp1.exploration);
    }

    #[test]
    fn floors_hold_after_many_wins() {
        let mut m = meta();
        for _ in 0..20 {
            m.on_outcome(ExitOutcome::Tp1, 0);
        }
        assert!((m.state().exploration - 0.045).abs() < 1e-12);
        for _ in 0..20 {
            m.on_outcome(ExitOutcome::Tp2, 0);
        }
        assert!((m.state().exploration - 0.04).abs() < 1e-12);
        assert_eq!(m.state().caution_multiplier, 1.0);
    }

    #[test]
    fn early_exit_decays_without_resetting_streak() {
        let mut m = meta();
        m.on_outcome(ExitOutcome::Sl, 0);
        let s = m.on_outcome(ExitOutcome::EarlyExit, 0);
        assert_eq!(s.sl_streak, 1);
        assert!((s.caution_multiplier - 1.20).abs() < 1e-12);
        assert!((s.exploration - 0.075).abs() < 1e-12);
    }
}
