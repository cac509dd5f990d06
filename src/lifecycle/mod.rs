//! Position lifecycle state machine
//!
//! `Flat -> Open -> (BreakEven) -> (Trailing) -> Closed{TP1,TP2,SL,EARLY_EXIT} -> Flat`
//!
//! A single manager owns the scorer, the meta state, the trade log and the
//! one open position. Every close runs reward shaping, the scorer update,
//! the meta transition and the trade-log append before returning, so callers
//! holding the manager's lock publish the whole close at once.

pub mod events;
pub mod position;

pub use events::EngineEvent;
pub use position::{Position, PositionPhase};

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{AppConfig, DistanceMode, LifecycleConfig, ScorerConfig, Tp1Action, TrailReference};
use crate::ml_engine::{
    build_scorer, MetaAdaptationState, MetaState, RewardSample, RewardShaper, SignalScorer, Target,
};
use crate::persistence::{TradeLog, TradeRecord};
use crate::strategy::{adverse, entry_signal, favorable, EntrySignal, MarketView};
use crate::types::{ExitOutcome, Side};

/// Price extremes reached after a tick (backtest lookahead)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub high: f64,
    pub low: f64,
}

/// Price observation the open position is checked against
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketTick {
    /// Unix ms
    pub ts: i64,
    pub high: f64,
    pub low: f64,
    pub last: f64,
    /// Where price went afterwards; only the backtest knows this
    pub hindsight: Option<PriceRange>,
}

impl MarketTick {
    /// Single polled price
    pub fn at_price(ts: i64, price: f64) -> Self {
        Self {
            ts,
            high: price,
            low: price,
            last: price,
            hindsight: None,
        }
    }

    fn is_finite(&self) -> bool {
        self.high.is_finite() && self.low.is_finite() && self.last.is_finite()
    }
}

/// Outcome of an open attempt
#[derive(Debug, Clone, PartialEq)]
pub enum OpenDecision {
    Opened(EngineEvent),
    /// Single-trade lock: a position already exists
    AlreadyOpen,
    /// Long and short conditions both held
    Ambiguous,
    NoSignal(String),
    BelowThreshold { p: f64, threshold: f64 },
}

impl OpenDecision {
    pub fn is_opened(&self) -> bool {
        matches!(self, OpenDecision::Opened(_))
    }

    /// Short diagnostic for logs and status replies
    pub fn reason(&self) -> String {
        match self {
            OpenDecision::Opened(_) => "opened".to_string(),
            OpenDecision::AlreadyOpen => "position already open".to_string(),
            OpenDecision::Ambiguous => "ambiguous signal".to_string(),
            OpenDecision::NoSignal(reason) => reason.clone(),
            OpenDecision::BelowThreshold { p, threshold } => {
                format!("score {:.3} below threshold {:.3}", p, threshold)
            }
        }
    }
}

/// Consistent snapshot for status readers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    pub position: Option<Position>,
    pub phase: Option<PositionPhase>,
    pub meta: MetaState,
    pub scorer: String,
    pub base_threshold: f64,
    pub effective_threshold: f64,
    pub trades_logged: usize,
    pub last_trade: Option<TradeRecord>,
}

pub struct PositionLifecycleManager {
    cfg: LifecycleConfig,
    scorer_cfg: ScorerConfig,
    scorer: Box<dyn SignalScorer>,
    meta: MetaAdaptationState,
    shaper: RewardShaper,
    trade_log: TradeLog,
    rng: StdRng,
    position: Option<Position>,
    /// Side and time (unix ms) of the last close, for churn detection
    last_close: Option<(Side, i64)>,
}

impl PositionLifecycleManager {
    pub fn new(
        cfg: &AppConfig,
        scorer: Box<dyn SignalScorer>,
        meta: MetaAdaptationState,
        trade_log: TradeLog,
    ) -> Self {
        Self {
            cfg: cfg.lifecycle.clone(),
            scorer_cfg: cfg.scorer.clone(),
            scorer,
            meta,
            shaper: RewardShaper::new(cfg.reward.clone()),
            trade_log,
            rng: StdRng::seed_from_u64(cfg.scorer.seed),
            position: None,
            last_close: None,
        }
    }

    /// Manager backed by the configured state files
    pub fn open_persistent(cfg: &AppConfig) -> Result<Self> {
        let paths = &cfg.persistence;
        let scorer = build_scorer(&cfg.scorer, Some(paths.weights_path()));
        let meta = MetaAdaptationState::new(cfg.meta.clone()).with_state_file(paths.meta_path());
        let trade_log = TradeLog::open(paths.trade_log_path()).context("Failed to open trade log")?;
        Ok(Self::new(cfg, scorer, meta, trade_log))
    }

    /// Manager that never touches disk (backtests)
    pub fn ephemeral(cfg: &AppConfig) -> Self {
        Self::new(
            cfg,
            build_scorer(&cfg.scorer, None),
            MetaAdaptationState::new(cfg.meta.clone()),
            TradeLog::in_memory(),
        )
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn has_position(&self) -> bool {
        self.position.is_some()
    }

    pub fn meta(&self) -> &MetaState {
        self.meta.state()
    }

    pub fn trade_log(&self) -> &TradeLog {
        &self.trade_log
    }

    /// base_threshold + caution_weight · (caution − 1)
    pub fn effective_threshold(&self) -> f64 {
        let caution = self.meta.state().caution_multiplier;
        self.scorer_cfg.base_threshold + self.scorer_cfg.caution_weight * (caution - 1.0).max(0.0)
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            position: self.position.clone(),
            phase: self.position.as_ref().map(|p| p.phase()),
            meta: *self.meta.state(),
            scorer: self.scorer.name().to_string(),
            base_threshold: self.scorer_cfg.base_threshold,
            effective_threshold: self.effective_threshold(),
            trades_logged: self.trade_log.total(),
            last_trade: self.trade_log.tail(1).pop(),
        }
    }

    /// Try to open a position from the current view.
    ///
    /// A no-op returning `AlreadyOpen` while a position exists.
    pub fn try_open(&mut self, view: &MarketView) -> OpenDecision {
        if self.position.is_some() {
            return OpenDecision::AlreadyOpen;
        }

        let f = &view.fast;
        if !f.close.is_finite() || f.close <= 0.0 {
            return OpenDecision::NoSignal("invalid price".to_string());
        }

        let side = match entry_signal(f, &self.cfg) {
            EntrySignal::Enter(side) => side,
            EntrySignal::Ambiguous => {
                debug!(close = f.close, "Ambiguous long/short signal rejected");
                return OpenDecision::Ambiguous;
            }
            EntrySignal::NoTrend => {
                return OpenDecision::NoSignal("no trend/vwap agreement".to_string())
            }
            EntrySignal::RsiOutOfBand(rsi) => {
                return OpenDecision::NoSignal(format!("rsi {:.1} outside band", rsi))
            }
        };

        let score = self.scorer.score(&f.vector, view.regime, self.meta.state());
        let threshold = self.effective_threshold();
        let explored = if score.p >= threshold {
            false
        } else if self.scorer_cfg.exploration_enabled && self.rng.gen::<f64>() < score.exploration {
            true
        } else {
            debug!(p = score.p, threshold, "Score below threshold");
            return OpenDecision::BelowThreshold {
                p: score.p,
                threshold,
            };
        };

        let entry = f.close;
        let sign = side.sign();
        let base_stop = self.distance(self.cfg.stop_distance, entry);
        let atr_stop = self.cfg.adaptive_stop_atr_mult * f.atr;
        let stop_distance = if self.cfg.adaptive_stop_atr_mult > 0.0 && atr_stop > base_stop {
            atr_stop.min(base_stop * self.cfg.max_stop_expansion.max(1.0))
        } else {
            base_stop
        };
        let stop_expanded = stop_distance > base_stop;

        let duplicate_entry = matches!(
            self.last_close,
            Some((last_side, closed_at))
                if last_side == side
                    && view.ts.saturating_sub(closed_at) < self.cfg.churn_window_secs * 1000
        );

        let position = Position {
            id: uuid::Builder::from_random_bytes(self.rng.gen()).into_uuid().to_string(),
            side,
            entry,
            stop: entry - sign * stop_distance,
            initial_stop: entry - sign * stop_distance,
            tp1: entry + sign * self.distance(self.cfg.tp1_distance, entry),
            tp2: entry + sign * self.distance(self.cfg.tp2_distance, entry),
            breakeven_hit: false,
            trailing_stop: None,
            opened_at: view.ts,
            bars_held: 0,
            last_bar_ts: f.ts,
            score: score.p,
            regime: view.regime,
            explored,
            stop_expanded,
            duplicate_entry,
            momentum_aligned_bars: 0,
            entry_features: f.vector.clone(),
        };

        info!(
            side = %side,
            entry,
            stop = position.stop,
            tp1 = position.tp1,
            tp2 = position.tp2,
            p = score.p,
            threshold,
            regime = %view.regime,
            explored,
            stop_expanded,
            duplicate_entry,
            "📈 Position opened"
        );

        let event = EngineEvent::SignalOpened {
            ts: view.ts,
            side,
            entry,
            stop: position.stop,
            tp1: position.tp1,
            tp2: position.tp2,
            score: score.p,
            regime: view.regime,
            explored,
        };
        self.position = Some(position);
        OpenDecision::Opened(event)
    }

    /// Advance the open position by one tick.
    ///
    /// Order within a tick: stop, TP2, TP1/breakeven, trailing, early exit.
    pub fn evaluate(&mut self, tick: &MarketTick, view: &MarketView) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        if self.position.is_none() {
            return events;
        }
        if !tick.is_finite() {
            warn!(ts = tick.ts, "Non-finite tick ignored");
            return events;
        }

        let fast_momentum = view.fast_momentum();
        let slow_momentum = view.slow_momentum();
        let trail_reference = match self.cfg.trail_reference {
            TrailReference::Ema => view.fast.ema_fast,
            TrailReference::Vwap => view.fast.vwap,
        };

        let Some(pos) = self.position.as_mut() else {
            return events;
        };
        // Durations count decision bars, however often the position is polled
        if view.fast.ts > pos.last_bar_ts {
            pos.last_bar_ts = view.fast.ts;
            pos.bars_held += 1;
            if fast_momentum == favorable(pos.side) {
                pos.momentum_aligned_bars += 1;
            }
        }

        if pos.stop_hit(tick.low, tick.high) {
            let stop = pos.stop;
            events.push(self.close(ExitOutcome::Sl, stop, tick));
            return events;
        }
        if pos.reached(pos.tp2, tick.low, tick.high) {
            let tp2 = pos.tp2;
            events.push(self.close(ExitOutcome::Tp2, tp2, tick));
            return events;
        }

        if !pos.breakeven_hit && pos.reached(pos.tp1, tick.low, tick.high) {
            if self.cfg.tp1_action == Tp1Action::Close {
                let tp1 = pos.tp1;
                events.push(self.close(ExitOutcome::Tp1, tp1, tick));
                return events;
            }
            pos.breakeven_hit = true;
            pos.tighten_stop(pos.entry);
            info!(stop = pos.stop, "🛡️ Stop moved to breakeven");
            events.push(EngineEvent::BreakEvenMoved {
                ts: tick.ts,
                price: pos.stop,
            });
        }

        let side = pos.side;
        if pos.breakeven_hit
            && fast_momentum == favorable(side)
            && slow_momentum == Some(favorable(side))
        {
            let below_price = match side {
                Side::Long => trail_reference < tick.last,
                Side::Short => trail_reference > tick.last,
            };
            if below_price && pos.tighten_stop(trail_reference) {
                pos.trailing_stop = Some(pos.stop);
                debug!(stop = pos.stop, "Trailing stop ratcheted");
                events.push(EngineEvent::StopTrailed {
                    ts: tick.ts,
                    price: pos.stop,
                });
            }
        }

        let slow_agrees =
            !self.cfg.require_slow_confirmation || slow_momentum == Some(adverse(side));
        if pos.bars_held >= self.cfg.early_exit_min_bars
            && fast_momentum == adverse(side)
            && slow_agrees
        {
            events.push(self.close(ExitOutcome::EarlyExit, tick.last, tick));
        }

        events
    }

    /// Close the open position: reward, scorer update, meta update, log append
    fn close(&mut self, outcome: ExitOutcome, exit_price: f64, tick: &MarketTick) -> EngineEvent {
        let Some(pos) = self.position.take() else {
            return EngineEvent::PositionClosed {
                ts: tick.ts,
                outcome,
                exit_price,
                pnl: 0.0,
                reward: 0.0,
            };
        };

        let quantity = self.cfg.quantity;
        let pnl = pos.move_to(exit_price) * quantity;
        let tp2_in_hindsight = tick
            .hindsight
            .map(|h| pos.reached(pos.tp2, h.low, h.high))
            .unwrap_or(false);
        let stop_dollars = if outcome == ExitOutcome::Sl {
            (-pnl).max(0.0)
        } else {
            pos.initial_risk() * quantity
        };

        let sample = RewardSample {
            outcome,
            pnl,
            bars_to_exit: pos.bars_held,
            tp2_hit: outcome == ExitOutcome::Tp2 || tp2_in_hindsight,
            tp1_hit: pos.breakeven_hit || outcome.is_win(),
            stop_expanded: pos.stop_expanded,
            stop_dollars,
            trailing_respected: pos.breakeven_hit,
            momentum_aligned_bars: pos.momentum_aligned_bars,
            duplicate_entry: pos.duplicate_entry,
        };
        let reward = self.shaper.compute(&sample, self.meta.state().sl_streak);

        self.scorer
            .update(&pos.entry_features, pos.regime, Target::Reward(reward));
        self.meta.on_outcome(outcome, tick.ts);

        let record = pos.to_record(outcome, exit_price, tick.ts, pnl, reward);
        if let Err(e) = self.trade_log.append(record) {
            warn!(error = %e, "Failed to persist trade record");
        }
        self.last_close = Some((pos.side, tick.ts));

        info!(
            side = %pos.side,
            outcome = %outcome,
            entry = pos.entry,
            exit_price,
            pnl,
            reward,
            bars = pos.bars_held,
            "🏁 Position closed"
        );

        EngineEvent::PositionClosed {
            ts: tick.ts,
            outcome,
            exit_price,
            pnl,
            reward,
        }
    }

    fn distance(&self, value: f64, entry: f64) -> f64 {
        match self.cfg.distance_mode {
            DistanceMode::Absolute => value,
            DistanceMode::Percent => entry * value / 100.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{FeatureVector, Features, RegimeLabel};

    fn config() -> AppConfig {
        let mut cfg = AppConfig::defaults().unwrap();
        cfg.scorer.exploration_enabled = false;
        cfg
    }

    /// Fast/slow features with explicit EMA slope
    fn features(close: f64, ema_fast: f64, ema_fast_prev: f64, ema_slow: f64, vwap: f64) -> Features {
        Features {
            ts: 0,
            close,
            rsi: 55.0,
            ema_fast,
            ema_slow,
            ema_fast_prev,
            vwap,
            atr: 10.0,
            vector: [("ema_spread", 0.2)].into_iter().collect::<FeatureVector>(),
        }
    }

    fn bullish_view(ts: i64, close: f64) -> MarketView {
        let mut f = features(close, close - 40.0, close - 50.0, close - 80.0, close - 20.0);
        f.ts = ts;
        MarketView {
            ts,
            fast: f.clone(),
            slow: Some(f),
            regime: RegimeLabel::Trend,
        }
    }

    fn bearish_view(ts: i64, close: f64) -> MarketView {
        let mut f = features(close, close + 40.0, close + 50.0, close + 80.0, close + 20.0);
        f.ts = ts;
        MarketView {
            ts,
            fast: f.clone(),
            slow: Some(f),
            regime: RegimeLabel::Trend,
        }
    }

    fn opened(m: &mut PositionLifecycleManager, view: &MarketView) {
        assert!(m.try_open(view).is_opened());
    }

    #[test]
    fn second_open_is_rejected_while_position_exists() {
        let mut m = PositionLifecycleManager::ephemeral(&config());
        opened(&mut m, &bullish_view(0, 1000.0));
        assert_eq!(m.try_open(&bullish_view(1, 1010.0)), OpenDecision::AlreadyOpen);
        assert_eq!(m.position().unwrap().entry, 1000.0);
    }

    #[test]
    fn default_levels_are_absolute_dollars() {
        let mut m = PositionLifecycleManager::ephemeral(&config());
        opened(&mut m, &bearish_view(0, 1000.0));
        let p = m.position().unwrap();
        assert_eq!(p.side, Side::Short);
        assert_eq!(p.stop, 1300.0);
        assert_eq!(p.tp1, 400.0);
        assert_eq!(p.tp2, -500.0);
        assert!(!p.stop_expanded);
    }

    #[test]
    fn large_atr_widens_stop_up_to_cap() {
        let mut m = PositionLifecycleManager::ephemeral(&config());
        let mut view = bullish_view(0, 1000.0);
        view.fast.atr = 1000.0;
        opened(&mut m, &view);
        let p = m.position().unwrap();
        assert!(p.stop_expanded);
        assert_eq!(p.stop, 1000.0 - 450.0);
    }

    #[test]
    fn percent_mode_scales_with_entry() {
        let mut cfg = config();
        cfg.lifecycle.distance_mode = DistanceMode::Percent;
        cfg.lifecycle.stop_distance = 1.0;
        cfg.lifecycle.tp1_distance = 2.0;
        cfg.lifecycle.tp2_distance = 5.0;
        let mut m = PositionLifecycleManager::ephemeral(&cfg);
        opened(&mut m, &bullish_view(0, 2000.0));
        let p = m.position().unwrap();
        assert_eq!(p.stop, 1980.0);
        assert_eq!(p.tp1, 2040.0);
        assert_eq!(p.tp2, 2100.0);
    }

    #[test]
    fn caution_raises_the_gate() {
        let mut cfg = config();
        cfg.scorer.kind = crate::config::ScorerKind::Neutral;
        let mut m = PositionLifecycleManager::ephemeral(&cfg);
        m.meta.on_outcome(ExitOutcome::Sl, 0);
        match m.try_open(&bullish_view(0, 1000.0)) {
            OpenDecision::BelowThreshold { p, threshold } => {
                assert_eq!(p, 0.5);
                assert!((threshold - 0.525).abs() < 1e-12);
            }
            other => panic!("expected BelowThreshold, got {:?}", other),
        }
    }

    #[test]
    fn exploration_bypasses_only_the_score_gate() {
        let mut cfg = config();
        cfg.scorer.kind = crate::config::ScorerKind::Neutral;
        cfg.scorer.exploration_enabled = true;
        cfg.scorer.base_threshold = 0.9;
        // Every draw explores
        cfg.meta.initial_exploration = 1.0;
        let mut m = PositionLifecycleManager::ephemeral(&cfg);

        let flat = MarketView {
            ts: 0,
            fast: features(100.0, 100.0, 100.0, 100.0, 100.0),
            slow: None,
            regime: RegimeLabel::Range,
        };
        assert_eq!(m.try_open(&flat), OpenDecision::Ambiguous);

        match m.try_open(&bullish_view(0, 1000.0)) {
            OpenDecision::Opened(EngineEvent::SignalOpened { explored, .. }) => assert!(explored),
            other => panic!("expected explored open, got {:?}", other),
        }
    }

    #[test]
    fn breakeven_then_trailing_never_loosens() {
        let mut m = PositionLifecycleManager::ephemeral(&config());
        opened(&mut m, &bullish_view(0, 1000.0));

        let events = m.evaluate(&MarketTick::at_price(1, 1600.0), &bullish_view(1, 1600.0));
        assert!(matches!(events[0], EngineEvent::BreakEvenMoved { price, .. } if price == 1000.0));
        assert!(matches!(events[1], EngineEvent::StopTrailed { price, .. } if price == 1560.0));
        assert_eq!(m.position().unwrap().phase(), PositionPhase::Trailing);

        // Lower reference must not pull the stop back
        let events = m.evaluate(&MarketTick::at_price(2, 1580.0), &bullish_view(2, 1570.0));
        assert!(events.is_empty());
        assert_eq!(m.position().unwrap().stop, 1560.0);
    }

    #[test]
    fn stop_after_breakeven_closes_as_sl_without_size_penalty() {
        let mut m = PositionLifecycleManager::ephemeral(&config());
        opened(&mut m, &bullish_view(0, 1000.0));
        // TP1 touched with neutral momentum: breakeven only
        let mut neutral = bullish_view(1, 1600.0);
        neutral.fast.ema_fast_prev = neutral.fast.ema_fast;
        m.evaluate(&MarketTick::at_price(1, 1600.0), &neutral);

        let events = m.evaluate(&MarketTick::at_price(2, 990.0), &neutral);
        match &events[0] {
            EngineEvent::PositionClosed { outcome, exit_price, pnl, .. } => {
                assert_eq!(*outcome, ExitOutcome::Sl);
                assert_eq!(*exit_price, 1000.0);
                assert_eq!(*pnl, 0.0);
            }
            other => panic!("expected close, got {:?}", other),
        }
        assert!(!m.has_position());
        assert_eq!(m.meta().sl_streak, 1);
        assert_eq!(m.trade_log().total(), 1);
    }

    #[test]
    fn momentum_flip_exits_early() {
        let mut m = PositionLifecycleManager::ephemeral(&config());
        opened(&mut m, &bullish_view(0, 1000.0));

        // Fast flips but slow still bullish: slow confirmation required
        let mut mixed = bearish_view(1, 990.0);
        mixed.slow = Some(bullish_view(1, 990.0).fast);
        assert!(m.evaluate(&MarketTick::at_price(1, 990.0), &mixed).is_empty());

        let events = m.evaluate(&MarketTick::at_price(2, 985.0), &bearish_view(2, 985.0));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].outcome(), Some(ExitOutcome::EarlyExit));
        let trade = &m.trade_log().tail(1)[0];
        assert_eq!(trade.exit_price, 985.0);
        assert_eq!(trade.bars_held, 2);
    }

    #[test]
    fn polling_within_one_bar_counts_one_bar() {
        let mut m = PositionLifecycleManager::ephemeral(&config());
        opened(&mut m, &bullish_view(300_000, 1000.0));

        // Several polls while the entry bar is still the latest bar
        for poll in 1..=5 {
            let mut view = bullish_view(300_000, 1010.0);
            view.ts = 300_000 + poll * 60_000;
            assert!(m.evaluate(&MarketTick::at_price(view.ts, 1010.0), &view).is_empty());
        }
        let pos = m.position().unwrap();
        assert_eq!(pos.bars_held, 0);
        assert_eq!(pos.momentum_aligned_bars, 0);

        // Next bar, polled twice
        for poll in 0..2 {
            let mut view = bullish_view(600_000, 1020.0);
            view.ts = 660_000 + poll * 60_000;
            m.evaluate(&MarketTick::at_price(view.ts, 1020.0), &view);
        }
        let pos = m.position().unwrap();
        assert_eq!(pos.bars_held, 1);
        assert_eq!(pos.momentum_aligned_bars, 1);
        assert_eq!(pos.last_bar_ts, 600_000);
    }

    #[test]
    fn tp1_close_mode_books_the_first_target() {
        let mut cfg = config();
        cfg.lifecycle.tp1_action = Tp1Action::Close;
        let mut m = PositionLifecycleManager::ephemeral(&cfg);
        opened(&mut m, &bullish_view(0, 1000.0));
        let events = m.evaluate(&MarketTick::at_price(1, 1650.0), &bullish_view(1, 1650.0));
        assert_eq!(events[0].outcome(), Some(ExitOutcome::Tp1));
        assert!((m.meta().exploration - 0.045).abs() < 1e-12);
    }

    #[test]
    fn quick_same_side_reentry_is_flagged_as_churn() {
        let mut m = PositionLifecycleManager::ephemeral(&config());
        opened(&mut m, &bullish_view(0, 1000.0));
        m.evaluate(&MarketTick::at_price(60_000, 2600.0), &bullish_view(60_000, 2600.0));
        assert!(!m.has_position());

        opened(&mut m, &bullish_view(120_000, 2600.0));
        assert!(m.position().unwrap().duplicate_entry);
    }

    #[test]
    fn non_finite_tick_changes_nothing() {
        let mut m = PositionLifecycleManager::ephemeral(&config());
        opened(&mut m, &bullish_view(0, 1000.0));
        let before = m.position().cloned();
        let events = m.evaluate(&MarketTick::at_price(1, f64::NAN), &bullish_view(1, 1000.0));
        assert!(events.is_empty());
        assert_eq!(m.position().cloned(), before);
    }
}
