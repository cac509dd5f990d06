//! Reward shaping
//!
//! Turns a closed trade into a scalar training signal: realized profit
//! decayed by time-to-exit, plus discipline/momentum bonuses, minus churn,
//! stop-out and missed-target penalties. Always within [-0.8, 1.35].

use serde::{Deserialize, Serialize};

use crate::config::RewardConfig;
use crate::types::ExitOutcome;

pub const REWARD_MIN: f64 = -0.8;
pub const REWARD_MAX: f64 = 1.35;

/// Everything the shaper needs about a closed trade
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RewardSample {
    pub outcome: ExitOutcome,
    pub pnl: f64,
    pub bars_to_exit: u32,
    /// TP2 was reached, at exit or later in hindsight
    pub tp2_hit: bool,
    pub tp1_hit: bool,
    pub stop_expanded: bool,
    /// Realized loss on a stop-out, initial risk otherwise
    pub stop_dollars: f64,
    pub trailing_respected: bool,
    pub momentum_aligned_bars: u32,
    pub duplicate_entry: bool,
}

#[derive(Debug, Clone)]
pub struct RewardShaper {
    cfg: RewardConfig,
}

impl RewardShaper {
    pub fn new(cfg: RewardConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &RewardConfig {
        &self.cfg
    }

    /// Shaped reward; `sl_streak` is the streak before this close is counted
    pub fn compute(&self, sample: &RewardSample, sl_streak: u32) -> f64 {
        let cfg = &self.cfg;
        let outcome = sample.outcome;
        let pnl = finite_or_zero(sample.pnl);
        let stop_dollars = finite_or_zero(sample.stop_dollars).max(0.0);

        let mut base = (pnl / cfg.payout_scale.max(f64::EPSILON)).clamp(0.0, 1.0);
        match outcome {
            ExitOutcome::Tp2 => base *= cfg.tp2_multiplier,
            ExitOutcome::Sl => base = 0.0,
            ExitOutcome::Tp1 | ExitOutcome::EarlyExit => {}
        }

        let time_bonus = (-cfg.time_decay * sample.bars_to_exit as f64).exp();

        let mut risk_bonus = if outcome != ExitOutcome::Sl && stop_dollars <= cfg.stop_cap {
            cfg.risk_bonus
        } else {
            0.0
        };
        if sample.stop_expanded && outcome != ExitOutcome::Tp2 {
            risk_bonus -= cfg.expanded_stop_penalty;
        }

        let momentum_bonus =
            (cfg.momentum_rate * sample.momentum_aligned_bars as f64).min(cfg.momentum_cap);

        let churn_penalty = if sample.duplicate_entry {
            -cfg.churn_penalty
        } else {
            0.0
        };

        let mut loss_penalty = 0.0;
        if outcome == ExitOutcome::Sl {
            let size_factor = (stop_dollars / cfg.stop_cap.max(1.0)).min(cfg.loss_size_cap);
            loss_penalty = -cfg.loss_base * size_factor;
            if sample.stop_expanded {
                loss_penalty -= cfg.expanded_loss_penalty;
            }
            if sl_streak >= 1 {
                loss_penalty *= (1.0 + cfg.streak_step * sl_streak as f64).min(cfg.streak_cap);
            }
        }

        let missed_target_penalty = if !matches!(outcome, ExitOutcome::Tp2 | ExitOutcome::Sl)
            && sample.tp2_hit
            && sample.trailing_respected
        {
            -cfg.missed_target_penalty
        } else {
            0.0
        };

        let reward = base * time_bonus
            + risk_bonus
            + momentum_bonus
            + churn_penalty
            + loss_penalty
            + missed_target_penalty;

        if reward.is_nan() {
            return 0.0;
        }
        reward.clamp(REWARD_MIN, REWARD_MAX)
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}
