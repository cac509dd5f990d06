//! Backtesting Module
//!
//! Replays a historical fast-candle series through the same pipeline and
//! lifecycle manager the live scanner uses. Each bar is first evaluated
//! against the open position (its high/low as the tick), then, if flat and
//! nothing closed on that bar, an entry is attempted at its close. Slow bars
//! are aggregated on the fly from bars already seen.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::lifecycle::{EngineEvent, MarketTick, OpenDecision, PositionLifecycleManager, PriceRange};
use crate::oracle::CandleAggregator;
use crate::persistence::TradeRecord;
use crate::strategy::SignalPipeline;
use crate::types::{Candle, ExitOutcome, Timeframe};

/// Event tagged with the index of the bar that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayEvent {
    pub bar: usize,
    pub event: EngineEvent,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BacktestSummary {
    pub bars: usize,
    pub entries: usize,
    pub explored: usize,
    pub wins: usize,
    pub tp1s: usize,
    pub tp2s: usize,
    pub sls: usize,
    pub early_exits: usize,
    pub total_pnl: f64,
    pub total_reward: f64,
    /// Wins / closed trades (0.0 without trades)
    pub win_rate: f64,
    /// Replay stopped through the cancel handle
    pub interrupted: bool,
}

impl BacktestSummary {
    fn record(&mut self, event: &EngineEvent) {
        match event {
            EngineEvent::SignalOpened { explored, .. } => {
                self.entries += 1;
                if *explored {
                    self.explored += 1;
                }
            }
            EngineEvent::PositionClosed {
                outcome,
                pnl,
                reward,
                ..
            } => {
                match outcome {
                    ExitOutcome::Tp1 => self.tp1s += 1,
                    ExitOutcome::Tp2 => self.tp2s += 1,
                    ExitOutcome::Sl => self.sls += 1,
                    ExitOutcome::EarlyExit => self.early_exits += 1,
                }
                if outcome.is_win() {
                    self.wins += 1;
                }
                self.total_pnl += pnl;
                self.total_reward += reward;
            }
            EngineEvent::BreakEvenMoved { .. } | EngineEvent::StopTrailed { .. } => {}
        }
    }

    fn closed(&self) -> usize {
        self.tp1s + self.tp2s + self.sls + self.early_exits
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    pub events: Vec<ReplayEvent>,
    pub trades: Vec<TradeRecord>,
    pub summary: BacktestSummary,
}

pub struct BacktestReplayEngine {
    manager: PositionLifecycleManager,
    pipeline: SignalPipeline,
    slow_timeframe: Timeframe,
    window_limit: usize,
    lookahead: usize,
    cancel: Arc<AtomicBool>,
}

impl BacktestReplayEngine {
    /// Engine with an in-memory manager (no state files touched)
    pub fn new(cfg: &AppConfig) -> Self {
        Self::with_manager(cfg, PositionLifecycleManager::ephemeral(cfg))
    }

    pub fn with_manager(cfg: &AppConfig, manager: PositionLifecycleManager) -> Self {
        let slow_timeframe = Timeframe::from_str(&cfg.feed.slow_timeframe).unwrap_or_else(|| {
            warn!(tf = %cfg.feed.slow_timeframe, "Unknown slow timeframe, using 15m");
            Timeframe::Min15
        });
        Self {
            manager,
            pipeline: SignalPipeline::new(cfg),
            slow_timeframe,
            window_limit: cfg.feed.window_limit.max(1),
            lookahead: cfg.reward.missed_target_lookahead_bars,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that stops a running replay between bars
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    pub fn manager(&self) -> &PositionLifecycleManager {
        &self.manager
    }

    /// Replay `bars` (oldest first). State carries over between calls.
    pub fn replay(&mut self, bars: &[Candle]) -> BacktestReport {
        let mut events = Vec::new();
        let mut summary = BacktestSummary::default();
        let trades_before = self.manager.trade_log().total();
        let mut slow = CandleAggregator::new(self.slow_timeframe, self.window_limit);

        info!(bars = bars.len(), "⏪ Backtest replay starting");

        for (i, bar) in bars.iter().enumerate() {
            if self.cancel.load(Ordering::Relaxed) {
                warn!(bar = i, "Backtest replay interrupted");
                summary.interrupted = true;
                break;
            }
            summary.bars += 1;
            slow.push(bar);

            let start = (i + 1).saturating_sub(self.window_limit);
            let fast_window = &bars[start..=i];
            let slow_window = slow.window();
            let Some(view) = self.pipeline.view(fast_window, &slow_window, bar.close_time) else {
                debug!(bar = i, "No view for bar, skipping");
                continue;
            };

            let mut closed = false;
            if self.manager.has_position() {
                let tick = MarketTick {
                    ts: bar.close_time,
                    high: bar.high,
                    low: bar.low,
                    last: bar.close,
                    hindsight: self.hindsight(bars, i),
                };
                for event in self.manager.evaluate(&tick, &view) {
                    closed |= matches!(event, EngineEvent::PositionClosed { .. });
                    summary.record(&event);
                    events.push(ReplayEvent { bar: i, event });
                }
            }

            if !closed && !self.manager.has_position() {
                if let OpenDecision::Opened(event) = self.manager.try_open(&view) {
                    summary.record(&event);
                    events.push(ReplayEvent { bar: i, event });
                }
            }
        }

        let closed = summary.closed();
        summary.win_rate = if closed > 0 {
            summary.wins as f64 / closed as f64
        } else {
            0.0
        };

        let new_trades = self.manager.trade_log().total() - trades_before;
        let trades = self.manager.trade_log().tail(new_trades);

        info!(
            bars = summary.bars,
            entries = summary.entries,
            wins = summary.wins,
            tp2 = summary.tp2s,
            sl = summary.sls,
            reward = summary.total_reward,
            "📊 Backtest replay finished"
        );

        BacktestReport {
            events,
            trades,
            summary,
        }
    }

    /// Extremes of the bars after `i` within the lookahead horizon
    fn hindsight(&self, bars: &[Candle], i: usize) -> Option<PriceRange> {
        if self.lookahead == 0 {
            return None;
        }
        let end = (i + 1 + self.lookahead).min(bars.len());
        bars.get(i + 1..end)
            .filter(|ahead| !ahead.is_empty())
            .map(|ahead| PriceRange {
                high: ahead.iter().map(|c| c.high).fold(f64::MIN, f64::max),
                low: ahead.iter().map(|c| c.low).fold(f64::MAX, f64::min),
            })
    }
}
