//! Reward shaping bounds and streak escalation

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use spiralbot::config::AppConfig;
    use spiralbot::ml_engine::{RewardSample, RewardShaper, REWARD_MAX, REWARD_MIN};
    use spiralbot::types::ExitOutcome;

    fn shaper() -> RewardShaper {
        RewardShaper::new(AppConfig::defaults().unwrap().reward)
    }

    fn stop_out(stop_dollars: f64) -> RewardSample {
        RewardSample {
            outcome: ExitOutcome::Sl,
            pnl: -stop_dollars,
            bars_to_exit: 4,
            tp2_hit: false,
            tp1_hit: false,
            stop_expanded: false,
            stop_dollars,
            trailing_respected: false,
            momentum_aligned_bars: 0,
            duplicate_entry: false,
        }
    }

    // ── Strategies (proptest) ────────────────────────────────────────────

    fn arb_outcome() -> impl Strategy<Value = ExitOutcome> {
        prop_oneof![
            Just(ExitOutcome::Tp1),
            Just(ExitOutcome::Tp2),
            Just(ExitOutcome::Sl),
            Just(ExitOutcome::EarlyExit)
        ]
    }

    prop_compose! {
        fn arb_sample()(
            outcome in arb_outcome(),
            pnl in -1e6..1e6_f64,
            bars_to_exit in 0..100_000u32,
            tp2_hit in any::<bool>(),
            tp1_hit in any::<bool>(),
            stop_expanded in any::<bool>(),
            stop_dollars in 0.0..1e6_f64,
            trailing_respected in any::<bool>(),
            momentum_aligned_bars in 0..100_000u32,
            duplicate_entry in any::<bool>(),
        ) -> RewardSample {
            RewardSample {
                outcome,
                pnl,
                bars_to_exit,
                tp2_hit,
                tp1_hit,
                stop_expanded,
                stop_dollars,
                trailing_respected,
                momentum_aligned_bars,
                duplicate_entry,
            }
        }
    }

    // ── Bounds ───────────────────────────────────────────────────────────

    proptest! {
        #[test]
        fn reward_is_bounded(sample in arb_sample(), streak in 0..50u32) {
            let r = shaper().compute(&sample, streak);
            prop_assert!(r.is_finite());
            prop_assert!((REWARD_MIN..=REWARD_MAX).contains(&r), "reward {} out of range", r);
        }

        #[test]
        fn stop_outs_never_reward(sample in arb_sample(), streak in 0..50u32) {
            let sample = RewardSample { outcome: ExitOutcome::Sl, duplicate_entry: false, ..sample };
            prop_assert!(shaper().compute(&sample, streak) <= 0.18 + 1e-12);
        }
    }

    #[test]
    fn non_finite_inputs_stay_bounded() {
        let s = shaper();
        for pnl in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let mut sample = stop_out(300.0);
            sample.pnl = pnl;
            sample.stop_dollars = pnl;
            let r = s.compute(&sample, 2);
            assert!((REWARD_MIN..=REWARD_MAX).contains(&r));
        }
    }

    // ── Streak escalation ────────────────────────────────────────────────

    #[test]
    fn losing_streak_deepens_stop_penalty() {
        let s = shaper();
        let fresh = s.compute(&stop_out(300.0), 0);
        let streak = s.compute(&stop_out(300.0), 3);

        assert!((fresh - -0.42).abs() < 1e-9);
        assert!((streak - -0.42 * 1.6).abs() < 1e-9);
        assert!(streak.abs() > fresh.abs());
    }

    #[test]
    fn streak_multiplier_is_capped() {
        let s = shaper();
        assert_eq!(s.compute(&stop_out(300.0), 3), s.compute(&stop_out(300.0), 40));
    }

    // ── Composition ──────────────────────────────────────────────────────

    #[test]
    fn faster_targets_score_higher() {
        let s = shaper();
        let tp2 = |bars| RewardSample {
            outcome: ExitOutcome::Tp2,
            pnl: 1500.0,
            bars_to_exit: bars,
            tp2_hit: true,
            tp1_hit: true,
            stop_expanded: false,
            stop_dollars: 300.0,
            trailing_respected: true,
            momentum_aligned_bars: 0,
            duplicate_entry: false,
        };
        assert!(s.compute(&tp2(5), 0) > s.compute(&tp2(50), 0));
    }

    #[test]
    fn early_exit_before_reachable_target_is_penalized() {
        let s = shaper();
        let early = RewardSample {
            outcome: ExitOutcome::EarlyExit,
            pnl: 200.0,
            bars_to_exit: 10,
            tp2_hit: false,
            tp1_hit: true,
            stop_expanded: false,
            stop_dollars: 300.0,
            trailing_respected: true,
            momentum_aligned_bars: 0,
            duplicate_entry: false,
        };
        let missed = RewardSample { tp2_hit: true, ..early };
        let diff = s.compute(&early, 0) - s.compute(&missed, 0);
        assert!((diff - 0.22).abs() < 1e-9);
    }

    #[test]
    fn churned_entry_is_penalized() {
        let s = shaper();
        let base = stop_out(150.0);
        let churn = RewardSample { duplicate_entry: true, ..base };
        let diff = s.compute(&base, 0) - s.compute(&churn, 0);
        assert!((diff - 0.08).abs() < 1e-9);
    }
}
