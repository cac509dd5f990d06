//! Candle Aggregator - resamples fast candles into a slower timeframe
//!
//! Used by the backtest to derive confirmation-timeframe bars from the fast
//! series without lookahead: the bucket in progress is exposed as a partial
//! candle built only from bars already seen.

use std::collections::VecDeque;

use crate::types::{Candle, Timeframe};

pub struct CandleAggregator {
    bucket_ms: i64,
    /// Completed slow candles
    history: VecDeque<Candle>,
    /// Slow candle currently being built
    current: Option<Candle>,
    /// Maximum candles to keep in history
    max_history: usize,
}

impl CandleAggregator {
    pub fn new(timeframe: Timeframe, max_history: usize) -> Self {
        Self {
            bucket_ms: timeframe.duration_ms(),
            history: VecDeque::new(),
            current: None,
            max_history: max_history.max(1),
        }
    }

    fn bucket_start(&self, ts: i64) -> i64 {
        ts - ts.rem_euclid(self.bucket_ms)
    }

    /// Fold one fast candle into the current bucket
    pub fn push(&mut self, c: &Candle) {
        let start = self.bucket_start(c.open_time);

        match self.current.as_mut() {
            Some(cur) if cur.open_time == start => {
                cur.high = cur.high.max(c.high);
                cur.low = cur.low.min(c.low);
                cur.close = c.close;
                cur.volume += c.volume;
                cur.close_time = c.close_time;
            }
            _ => {
                if let Some(done) = self.current.take() {
                    self.history.push_back(done);
                    while self.history.len() > self.max_history {
                        self.history.pop_front();
                    }
                }
                self.current = Some(Candle {
                    open_time: start,
                    close_time: c.close_time,
                    open: c.open,
                    high: c.high,
                    low: c.low,
                    close: c.close,
                    volume: c.volume,
                });
            }
        }
    }

    /// Completed candles plus the partial one, most recent last
    pub fn window(&self) -> Vec<Candle> {
        let mut out: Vec<Candle> = self.history.iter().copied().collect();
        if let Some(cur) = self.current {
            out.push(cur);
        }
        let skip = out.len().saturating_sub(self.max_history);
        out.split_off(skip)
    }

    /// Resample a whole series at once
    pub fn resample(candles: &[Candle], timeframe: Timeframe) -> Vec<Candle> {
        let mut agg = Self::new(timeframe, candles.len().max(1));
        for c in candles {
            agg.push(c);
        }
        agg.window()
    }
}
