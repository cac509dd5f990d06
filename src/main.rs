//! SpiralBot - adaptive trade-signal engine
//!
//! `bot.mode = live` runs the scan and evaluation loops against Binance
//! klines until Ctrl+C; `bot.mode = backtest` replays recent history once.

use anyhow::{Context, Result};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use spiralbot::backtesting::BacktestReplayEngine;
use spiralbot::config::{AppConfig, BotMode};
use spiralbot::lifecycle::PositionLifecycleManager;
use spiralbot::notify::{build_sink, format_results, format_status, NotificationSink};
use spiralbot::oracle::{BinanceFeed, MarketDataFeed};
use spiralbot::scanner::{shared, LiveScanner, SharedEngine};
use spiralbot::types::Timeframe;

/// Binance klines request cap
const MAX_BACKTEST_BARS: u64 = 1000;

fn init_logging(cfg: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.logging.level.as_str()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    if cfg.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = AppConfig::load().context("Failed to load configuration")?;
    init_logging(&cfg);

    info!("🌀 SpiralBot starting");
    info!(config = %cfg.digest(), "Configuration loaded");

    let sink = build_sink(&cfg.notify);
    match cfg.bot.mode {
        BotMode::Live => run_live(cfg, sink).await,
        BotMode::Backtest => run_backtest(cfg, sink).await,
    }
}

#[cfg(feature = "dashboard")]
fn spawn_dashboard(cfg: &AppConfig, engine: SharedEngine) {
    if !cfg.dashboard.enabled {
        return;
    }
    let bind = cfg.dashboard.bind.clone();
    tokio::spawn(async move {
        if let Err(e) = spiralbot::dashboard::start_server(engine, &bind).await {
            warn!(error = %e, "Dashboard server stopped");
        }
    });
}

#[cfg(not(feature = "dashboard"))]
fn spawn_dashboard(cfg: &AppConfig, _engine: SharedEngine) {
    if cfg.dashboard.enabled {
        warn!("Dashboard enabled in config but the binary was built without the `dashboard` feature");
    }
}

async fn run_live(cfg: AppConfig, sink: Arc<dyn NotificationSink>) -> Result<()> {
    let manager = PositionLifecycleManager::open_persistent(&cfg)?;
    let engine = shared(manager);
    let feed: Arc<dyn MarketDataFeed> = Arc::new(BinanceFeed::new(&cfg.feed, &cfg.bot.symbol)?);
    let scanner = Arc::new(LiveScanner::new(&cfg, engine.clone(), feed, sink.clone())?);

    spawn_dashboard(&cfg, engine.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl+C received, shutting down...");
        }
        let _ = shutdown_tx.send(true);
    });

    sink.send_text(&format!("🌀 SpiralBot online ({})", cfg.bot.symbol))
        .await;
    scanner.run(shutdown_rx).await;

    let (status, trades) = {
        let engine = engine.read().await;
        (engine.status(), engine.trade_log().tail(cfg.notify.logs_tail))
    };
    sink.send_text(&format_status(&status)).await;
    sink.send_text(&format_results(&trades)).await;
    info!("👋 SpiralBot stopped");
    Ok(())
}

async fn run_backtest(cfg: AppConfig, sink: Arc<dyn NotificationSink>) -> Result<()> {
    let fast = Timeframe::from_str(&cfg.feed.fast_timeframe)
        .with_context(|| format!("unknown fast timeframe '{}'", cfg.feed.fast_timeframe))?;
    let bars_wanted = (u64::from(cfg.backtest.days) * 86_400 / fast.duration_secs())
        .clamp(1, MAX_BACKTEST_BARS) as usize;

    let feed = BinanceFeed::new(&cfg.feed, &cfg.bot.symbol)?;
    let bars = feed
        .fetch(fast, bars_wanted)
        .await
        .context("Failed to fetch backtest history")?;
    info!(bars = bars.len(), days = cfg.backtest.days, timeframe = %fast, "📥 Backtest history loaded");

    let mut engine = BacktestReplayEngine::new(&cfg);
    let cancel = engine.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl+C received, requesting cancel...");
            cancel.store(true, Ordering::Relaxed);
        }
    });

    let report = tokio::task::spawn_blocking(move || engine.replay(&bars))
        .await
        .context("Backtest task failed")?;

    let s = &report.summary;
    info!(
        entries = s.entries,
        wins = s.wins,
        tp2 = s.tp2s,
        sl = s.sls,
        early = s.early_exits,
        win_rate = s.win_rate,
        reward = s.total_reward,
        pnl = s.total_pnl,
        interrupted = s.interrupted,
        "📊 Backtest complete"
    );
    sink.send_text(&format!(
        "🧪 Backtest {}d ({})\n{}",
        cfg.backtest.days,
        fast,
        format_results(&report.trades)
    ))
    .await;
    Ok(())
}
