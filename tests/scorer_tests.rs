//! Scorer invariants: neutral zero model, monotonic score, damped updates

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    use spiralbot::features::{FeatureVector, RegimeLabel};
    use spiralbot::ml_engine::{
        AdaptiveScorer, MetaState, RegimeWeights, ScoringModel, SignalScorer, Target,
    };

    const NAMES: [&str; 6] = [
        "ema_spread",
        "ema_slope",
        "rsi_norm",
        "vwap_dist",
        "atr_pct",
        "wick_ratio",
    ];

    // ── Strategies (proptest) ────────────────────────────────────────────

    fn arb_vector() -> impl Strategy<Value = FeatureVector> {
        prop::collection::vec((0..NAMES.len(), -100.0..100.0_f64), 0..12).prop_map(|pairs| {
            pairs
                .into_iter()
                .map(|(i, v)| (NAMES[i], v))
                .collect::<FeatureVector>()
        })
    }

    fn arb_regime() -> impl Strategy<Value = RegimeLabel> {
        prop_oneof![
            Just(RegimeLabel::Trend),
            Just(RegimeLabel::Range),
            Just(RegimeLabel::Spike)
        ]
    }

    // ── Zero model ───────────────────────────────────────────────────────

    proptest! {
        #[test]
        fn zero_model_scores_one_half(v in arb_vector(), regime in arb_regime()) {
            let scorer = AdaptiveScorer::new(0.05, 1e-5);
            let out = scorer.score(&v, regime, &MetaState::default());
            prop_assert_eq!(out.p, 0.5);
            prop_assert_eq!(out.exploration, 0.05);
        }

        #[test]
        fn zero_weights_with_zero_bias_score_one_half(v in arb_vector()) {
            let weights = RegimeWeights {
                weights: NAMES.iter().map(|n| (n.to_string(), 0.0)).collect(),
                bias: 0.0,
            };
            prop_assert_eq!(weights.probability(&v), 0.5);
        }
    }

    #[test]
    fn updating_one_regime_leaves_others_neutral() {
        let mut scorer = AdaptiveScorer::new(0.1, 1e-5);
        let v: FeatureVector = [("ema_spread", 1.0)].into_iter().collect();
        scorer.update(&v, RegimeLabel::Trend, Target::Label(true));

        assert!(scorer.probability(&v, RegimeLabel::Trend) > 0.5);
        assert_eq!(scorer.probability(&v, RegimeLabel::Range), 0.5);
        assert!(scorer.model().regime(RegimeLabel::Range).is_none());
    }

    // ── Monotonicity ─────────────────────────────────────────────────────

    proptest! {
        /// Raising a positively weighted feature never lowers the score
        #[test]
        fn score_is_monotonic_in_positive_weight(
            w in 0.0..5.0_f64,
            bias in -3.0..3.0_f64,
            a in -50.0..50.0_f64,
            b in -50.0..50.0_f64,
            other in -10.0..10.0_f64,
        ) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let weights = RegimeWeights {
                weights: BTreeMap::from([
                    ("ema_spread".to_string(), w),
                    ("rsi_norm".to_string(), -1.0),
                ]),
                bias,
            };
            let at = |x: f64| {
                let v: FeatureVector = [("ema_spread", x), ("rsi_norm", other)].into_iter().collect();
                weights.probability(&v)
            };
            prop_assert!(at(lo) <= at(hi));
        }

        #[test]
        fn score_stays_in_unit_interval(v in arb_vector(), bias in -1e6..1e6_f64, w in -1e6..1e6_f64) {
            let weights = RegimeWeights {
                weights: NAMES.iter().map(|n| (n.to_string(), w)).collect(),
                bias,
            };
            let p = weights.probability(&v);
            prop_assert!((0.0..=1.0).contains(&p));
        }
    }

    // ── Convergence ──────────────────────────────────────────────────────

    #[test]
    fn repeated_identical_feedback_converges() {
        let mut model = ScoringModel::new();
        let v: FeatureVector = [("ema_spread", 1.0), ("rsi_norm", 0.5)].into_iter().collect();

        let weight = |m: &ScoringModel| {
            m.regime(RegimeLabel::Trend)
                .map(|r| r.weights.get("ema_spread").copied().unwrap_or(0.0))
                .unwrap_or(0.0)
        };

        let mut prev_w = weight(&model);
        let mut prev_delta = f64::INFINITY;
        for _ in 0..2000 {
            model.step(&v, RegimeLabel::Trend, Target::Label(true), 0.05, 1e-5);
            let w = weight(&model);
            let delta = (w - prev_w).abs();
            assert!(delta <= prev_delta + 1e-12, "update grew: {} > {}", delta, prev_delta);
            prev_delta = delta;
            prev_w = w;
        }
        assert!(prev_delta < 1e-3);
        assert!(prev_w.is_finite() && prev_w < 20.0);
    }

    #[test]
    fn decay_shrinks_weights_without_signal() {
        let mut model = ScoringModel::new();
        let v: FeatureVector = [("ema_spread", 1.0)].into_iter().collect();
        model.step(&v, RegimeLabel::Range, Target::Label(true), 0.1, 0.0);
        let before = model.regime(RegimeLabel::Range).map(|r| r.weights["ema_spread"]);

        // Absent feature: only the decay applies to its weight
        let other: FeatureVector = [("atr_pct", 0.0)].into_iter().collect();
        model.step(&other, RegimeLabel::Range, Target::Reward(0.0), 0.1, 0.01);
        let after = model.regime(RegimeLabel::Range).map(|r| r.weights["ema_spread"]);

        let (before, after) = (before.unwrap(), after.unwrap());
        assert!((after - before * 0.99).abs() < 1e-12);
    }

    #[test]
    fn reward_targets_pull_in_their_direction() {
        let v: FeatureVector = [("ema_spread", 1.0)].into_iter().collect();

        let mut good = AdaptiveScorer::new(0.1, 1e-5);
        good.update(&v, RegimeLabel::Trend, Target::Reward(0.8));
        assert!(good.probability(&v, RegimeLabel::Trend) > 0.5);

        let mut bad = AdaptiveScorer::new(0.1, 1e-5);
        bad.update(&v, RegimeLabel::Trend, Target::Reward(-0.5));
        assert!(bad.probability(&v, RegimeLabel::Trend) < 0.5);
        assert_eq!(bad.updates(), 1);
    }
}
