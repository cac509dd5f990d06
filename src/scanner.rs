//! Live scanner
//!
//! Two independently scheduled loops share one engine behind a lock:
//! the scan loop tries to open a position, the evaluation loop advances the
//! open one. Each fetch is bounded by a timeout and any feed failure skips
//! the tick without touching engine state. The lock is never held across a
//! fetch or a notification.

use anyhow::{anyhow, Result};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::lifecycle::{EngineEvent, EngineStatus, MarketTick, OpenDecision, PositionLifecycleManager};
use crate::notify::NotificationSink;
use crate::oracle::{FeedError, MarketDataFeed};
use crate::strategy::{MarketView, SignalPipeline};
use crate::types::{Candle, Timeframe};

/// Engine shared between the loops and status readers
pub type SharedEngine = Arc<RwLock<PositionLifecycleManager>>;

pub fn shared(manager: PositionLifecycleManager) -> SharedEngine {
    Arc::new(RwLock::new(manager))
}

pub struct LiveScanner {
    engine: SharedEngine,
    feed: Arc<dyn MarketDataFeed>,
    sink: Arc<dyn NotificationSink>,
    pipeline: SignalPipeline,
    fast_timeframe: Timeframe,
    slow_timeframe: Timeframe,
    window_limit: usize,
    fetch_timeout: Duration,
    scan_interval: Duration,
    evaluate_interval: Duration,
}

impl LiveScanner {
    pub fn new(
        cfg: &AppConfig,
        engine: SharedEngine,
        feed: Arc<dyn MarketDataFeed>,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<Self> {
        let fast_timeframe = Timeframe::from_str(&cfg.feed.fast_timeframe)
            .ok_or_else(|| anyhow!("unknown fast timeframe '{}'", cfg.feed.fast_timeframe))?;
        let slow_timeframe = Timeframe::from_str(&cfg.feed.slow_timeframe)
            .ok_or_else(|| anyhow!("unknown slow timeframe '{}'", cfg.feed.slow_timeframe))?;

        Ok(Self {
            engine,
            feed,
            sink,
            pipeline: SignalPipeline::new(cfg),
            fast_timeframe,
            slow_timeframe,
            window_limit: cfg.feed.window_limit.max(1),
            fetch_timeout: Duration::from_millis(cfg.feed.fetch_timeout_ms.max(1)),
            scan_interval: Duration::from_secs(cfg.scanner.scan_interval_secs.max(1)),
            evaluate_interval: Duration::from_secs(cfg.scanner.evaluate_interval_secs.max(1)),
        })
    }

    pub fn engine(&self) -> SharedEngine {
        self.engine.clone()
    }

    async fn fetch(&self, timeframe: Timeframe) -> Result<Vec<Candle>, FeedError> {
        match timeout(self.fetch_timeout, self.feed.fetch(timeframe, self.window_limit)).await {
            Ok(result) => result,
            Err(_) => Err(FeedError::Timeout(self.fetch_timeout.as_millis() as u64)),
        }
    }

    /// Fetch both timeframes and build the current view
    pub async fn fetch_view(&self) -> Result<MarketView, FeedError> {
        let fast = self.fetch(self.fast_timeframe).await?;
        let slow = self.fetch(self.slow_timeframe).await?;
        self.pipeline
            .view(&fast, &slow, Utc::now().timestamp_millis())
            .ok_or_else(|| FeedError::Unavailable("no usable bars".to_string()))
    }

    /// One scan tick: try to open a position
    pub async fn scan_once(&self) -> Result<OpenDecision, FeedError> {
        let view = self.fetch_view().await?;
        let decision = {
            let mut engine = self.engine.write().await;
            engine.try_open(&view)
        };
        if let OpenDecision::Opened(event) = &decision {
            self.sink.notify(event).await;
        }
        Ok(decision)
    }

    /// One evaluation tick: advance the open position at the latest close
    pub async fn evaluate_once(&self) -> Result<Vec<EngineEvent>, FeedError> {
        if !self.engine.read().await.has_position() {
            return Ok(Vec::new());
        }
        let view = self.fetch_view().await?;
        let tick = MarketTick::at_price(view.ts, view.fast.close);
        let events = {
            let mut engine = self.engine.write().await;
            engine.evaluate(&tick, &view)
        };
        for event in &events {
            self.sink.notify(event).await;
        }
        Ok(events)
    }

    pub async fn status(&self) -> EngineStatus {
        self.engine.read().await.status()
    }

    async fn scan_loop(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.scan_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => match self.scan_once().await {
                    Ok(decision) => debug!(reason = %decision.reason(), "Scan tick"),
                    Err(e) => warn!(error = %e, "⚠️ Scan tick skipped"),
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Scan loop stopped");
    }

    async fn evaluate_loop(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.evaluate_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => match self.evaluate_once().await {
                    Ok(events) if !events.is_empty() => {
                        debug!(count = events.len(), "Lifecycle events emitted");
                    }
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "⚠️ Evaluation tick skipped"),
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Evaluation loop stopped");
    }

    /// Run both loops until `shutdown` flips to true
    pub async fn run(self: Arc<Self>, shutdown: watch::Receiver<bool>) {
        info!(
            fast = %self.fast_timeframe,
            slow = %self.slow_timeframe,
            scan_secs = self.scan_interval.as_secs(),
            evaluate_secs = self.evaluate_interval.as_secs(),
            "🔭 Live scanner started"
        );

        let scanner = self.clone();
        let scan_shutdown = shutdown.clone();
        let scan = tokio::spawn(async move { scanner.scan_loop(scan_shutdown).await });

        let evaluator = self.clone();
        let evaluate = tokio::spawn(async move { evaluator.evaluate_loop(shutdown).await });

        let (scan_result, evaluate_result) = tokio::join!(scan, evaluate);
        if let Err(e) = scan_result {
            warn!(error = %e, "Scan task ended abnormally");
        }
        if let Err(e) = evaluate_result {
            warn!(error = %e, "Evaluation task ended abnormally");
        }
    }
}
