//! Configuration management for SpiralBot
//!
//! Loads built-in defaults, optional `config/default` + `config/local` files,
//! then `SPIRALBOT__SECTION__KEY` environment overrides (via .env).

mod types;

pub use types::*;

use anyhow::{Context, Result};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub bot: BotConfig,
    pub feed: FeedConfig,
    pub features: FeaturesConfig,
    pub regime: RegimeConfig,
    pub scorer: ScorerConfig,
    pub meta: MetaConfig,
    pub lifecycle: LifecycleConfig,
    pub reward: RewardConfig,
    pub persistence: PersistenceConfig,
    pub scanner: ScannerConfig,
    pub backtest: BacktestConfig,
    pub logging: LoggingConfig,
    pub notify: NotifyConfig,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Bot version tag for logging and CSV
    pub tag: String,
    /// Exchange symbol to scan
    pub symbol: String,
    /// live or backtest
    pub mode: BotMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Binance klines endpoint
    pub rest_url: String,
    /// Decision timeframe (entries, breakeven, early exit)
    pub fast_timeframe: String,
    /// Confirmation timeframe for trailing/early exit
    pub slow_timeframe: String,
    /// Bars requested per fetch
    pub window_limit: usize,
    /// Upper bound on a single fetch
    pub fetch_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesConfig {
    pub ema_fast: usize,
    pub ema_slow: usize,
    /// RSI period (Wilder)
    pub rsi_period: usize,
    pub atr_period: usize,
    /// Bars included in the rolling VWAP
    pub vwap_lookback: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegimeConfig {
    /// ATR as % of price above which the bar is a spike
    pub spike_atr_pct: f64,
    /// Minimum |ema_spread| for trend
    pub trend_spread: f64,
    /// Minimum |ema_slope| for trend
    pub trend_slope: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScorerConfig {
    pub kind: ScorerKind,
    pub learning_rate: f64,
    /// L2 shrinkage applied on every update
    pub decay: f64,
    /// Score needed to open with caution at baseline
    pub base_threshold: f64,
    /// Threshold added per unit of caution above 1.0
    pub caution_weight: f64,
    /// Allow sub-threshold entries drawn at the exploration rate
    pub exploration_enabled: bool,
    /// Seed for exploration draws
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub initial_exploration: f64,
    pub exploration_floor: f64,
    /// Floor used after a TP1 close
    pub tp1_exploration_floor: f64,
    pub exploration_ceiling: f64,
    pub caution_ceiling: f64,
    /// Caution added per consecutive stop-out
    pub sl_caution_step: f64,
    /// Exploration added per stop-out
    pub sl_exploration_step: f64,
    pub tp2_caution_relief: f64,
    pub tp1_caution_relief: f64,
    pub tp2_exploration_relief: f64,
    pub tp1_exploration_relief: f64,
    /// Decay toward baseline on other closes
    pub idle_caution_decay: f64,
    pub idle_exploration_decay: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// RSI band an entry must sit inside
    pub rsi_min: f64,
    pub rsi_max: f64,
    pub distance_mode: DistanceMode,
    pub stop_distance: f64,
    pub tp1_distance: f64,
    pub tp2_distance: f64,
    /// Widen the stop to this many ATRs when larger than the base distance (0 disables)
    pub adaptive_stop_atr_mult: f64,
    /// Cap on the widened stop, as a multiple of the base distance
    pub max_stop_expansion: f64,
    pub tp1_action: Tp1Action,
    pub trail_reference: TrailReference,
    /// Early exit needs the slow timeframe to agree
    pub require_slow_confirmation: bool,
    pub early_exit_min_bars: u32,
    /// Same-side re-entry inside this window counts as churn
    pub churn_window_secs: i64,
    /// Notional units; pnl = move × quantity
    pub quantity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardConfig {
    /// PnL mapped to a base reward of 1.0
    pub payout_scale: f64,
    pub tp2_multiplier: f64,
    /// k in exp(-k · bars)
    pub time_decay: f64,
    /// Risk budget in price units
    pub stop_cap: f64,
    pub risk_bonus: f64,
    pub expanded_stop_penalty: f64,
    pub momentum_rate: f64,
    pub momentum_cap: f64,
    pub churn_penalty: f64,
    pub loss_base: f64,
    pub loss_size_cap: f64,
    pub expanded_loss_penalty: f64,
    pub streak_step: f64,
    pub streak_cap: f64,
    pub missed_target_penalty: f64,
    /// Bars the backtest looks ahead to decide whether TP2 was still reachable
    pub missed_target_lookahead_bars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Data directory
    pub data_dir: String,
    pub weights_file: String,
    pub meta_file: String,
    pub trade_log_file: String,
}

impl PersistenceConfig {
    pub fn weights_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.weights_file)
    }

    pub fn meta_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.meta_file)
    }

    pub fn trade_log_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.trade_log_file)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    pub scan_interval_secs: u64,
    pub evaluate_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// Days of fast bars to replay
    pub days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    pub api_url: String,
    /// Telegram bot token (BOT_TOKEN); empty means log-only
    pub bot_token: String,
    /// Chat that receives events (OWNER_CHAT_ID)
    pub chat_id: String,
    /// Trade log rows shown by the logs report
    pub logs_tail: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub bind: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        // Load .env file first
        dotenvy::dotenv().ok();

        let config = Self::with_defaults()?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (SPIRALBOT__*)
            .add_source(Environment::with_prefix("SPIRALBOT").separator("__"))
            .set_override_option("notify.bot_token", std::env::var("BOT_TOKEN").ok())?
            .set_override_option("notify.chat_id", std::env::var("OWNER_CHAT_ID").ok())?
            .build()
            .context("Failed to build configuration")?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        Ok(app_config)
    }

    /// Built-in defaults only, ignoring files and environment
    pub fn defaults() -> Result<Self> {
        Self::with_defaults()?
            .build()
            .context("Failed to build default configuration")?
            .try_deserialize()
            .context("Failed to deserialize default configuration")
    }

    fn with_defaults() -> Result<ConfigBuilder<DefaultState>> {
        let builder = Config::builder()
            .set_default("bot.tag", env!("CARGO_PKG_VERSION"))?
            .set_default("bot.symbol", "BTCUSDT")?
            .set_default("bot.mode", "live")?
            // Feed defaults
            .set_default("feed.rest_url", "https://api.binance.com/api/v3/klines")?
            .set_default("feed.fast_timeframe", "5m")?
            .set_default("feed.slow_timeframe", "15m")?
            .set_default("feed.window_limit", 200)?
            .set_default("feed.fetch_timeout_ms", 10_000)?
            // Features defaults
            .set_default("features.ema_fast", 9)?
            .set_default("features.ema_slow", 21)?
            .set_default("features.rsi_period", 14)?
            .set_default("features.atr_period", 14)?
            .set_default("features.vwap_lookback", 50)?
            // Regime defaults
            .set_default("regime.spike_atr_pct", 1.5)?
            .set_default("regime.trend_spread", 0.15)?
            .set_default("regime.trend_slope", 0.02)?
            // Scorer defaults
            .set_default("scorer.kind", "adaptive")?
            .set_default("scorer.learning_rate", 0.05)?
            .set_default("scorer.decay", 1e-5)?
            .set_default("scorer.base_threshold", 0.50)?
            .set_default("scorer.caution_weight", 0.10)?
            .set_default("scorer.exploration_enabled", true)?
            .set_default("scorer.seed", 42)?
            // Meta defaults
            .set_default("meta.initial_exploration", 0.05)?
            .set_default("meta.exploration_floor", 0.04)?
            .set_default("meta.tp1_exploration_floor", 0.045)?
            .set_default("meta.exploration_ceiling", 0.25)?
            .set_default("meta.caution_ceiling", 1.8)?
            .set_default("meta.sl_caution_step", 0.25)?
            .set_default("meta.sl_exploration_step", 0.03)?
            .set_default("meta.tp2_caution_relief", 0.35)?
            .set_default("meta.tp1_caution_relief", 0.20)?
            .set_default("meta.tp2_exploration_relief", 0.02)?
            .set_default("meta.tp1_exploration_relief", 0.01)?
            .set_default("meta.idle_caution_decay", 0.05)?
            .set_default("meta.idle_exploration_decay", 0.005)?
            // Lifecycle defaults
            .set_default("lifecycle.rsi_min", 30.0)?
            .set_default("lifecycle.rsi_max", 70.0)?
            .set_default("lifecycle.distance_mode", "absolute")?
            .set_default("lifecycle.stop_distance", 300.0)?
            .set_default("lifecycle.tp1_distance", 600.0)?
            .set_default("lifecycle.tp2_distance", 1500.0)?
            .set_default("lifecycle.adaptive_stop_atr_mult", 1.5)?
            .set_default("lifecycle.max_stop_expansion", 1.5)?
            .set_default("lifecycle.tp1_action", "breakeven")?
            .set_default("lifecycle.trail_reference", "ema")?
            .set_default("lifecycle.require_slow_confirmation", true)?
            .set_default("lifecycle.early_exit_min_bars", 1)?
            .set_default("lifecycle.churn_window_secs", 900)?
            .set_default("lifecycle.quantity", 1.0)?
            // Reward defaults
            .set_default("reward.payout_scale", 1000.0)?
            .set_default("reward.tp2_multiplier", 1.35)?
            .set_default("reward.time_decay", 0.03)?
            .set_default("reward.stop_cap", 300.0)?
            .set_default("reward.risk_bonus", 0.10)?
            .set_default("reward.expanded_stop_penalty", 0.06)?
            .set_default("reward.momentum_rate", 0.012)?
            .set_default("reward.momentum_cap", 0.18)?
            .set_default("reward.churn_penalty", 0.08)?
            .set_default("reward.loss_base", 0.42)?
            .set_default("reward.loss_size_cap", 1.3)?
            .set_default("reward.expanded_loss_penalty", 0.12)?
            .set_default("reward.streak_step", 0.25)?
            .set_default("reward.streak_cap", 1.6)?
            .set_default("reward.missed_target_penalty", 0.22)?
            .set_default("reward.missed_target_lookahead_bars", 12)?
            // Persistence defaults
            .set_default("persistence.data_dir", "./data")?
            .set_default("persistence.weights_file", "scorer_weights.json")?
            .set_default("persistence.meta_file", "meta_state.json")?
            .set_default("persistence.trade_log_file", "trades/trade_log.csv")?
            // Scheduling defaults
            .set_default("scanner.scan_interval_secs", 60)?
            .set_default("scanner.evaluate_interval_secs", 60)?
            .set_default("backtest.days", 2)?
            // Ambient
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .set_default("notify.api_url", "https://api.telegram.org")?
            .set_default("notify.bot_token", "")?
            .set_default("notify.chat_id", "")?
            .set_default("notify.logs_tail", 10)?
            .set_default("dashboard.enabled", false)?
            .set_default("dashboard.bind", "127.0.0.1:8080")?;

        Ok(builder)
    }

    /// Generate a digest of the config (without secrets) for logging
    pub fn digest(&self) -> String {
        format!(
            "bot={} symbol={} mode={:?} tf={}/{} scorer={:?} threshold={:.2} rsi=[{:.0},{:.0}] stop/tp1/tp2={}/{}/{} ({:?}) telegram={}",
            self.bot.tag,
            self.bot.symbol,
            self.bot.mode,
            self.feed.fast_timeframe,
            self.feed.slow_timeframe,
            self.scorer.kind,
            self.scorer.base_threshold,
            self.lifecycle.rsi_min,
            self.lifecycle.rsi_max,
            self.lifecycle.stop_distance,
            self.lifecycle.tp1_distance,
            self.lifecycle.tp2_distance,
            self.lifecycle.distance_mode,
            !self.notify.bot_token.is_empty(),
        )
    }
}

impl std::fmt::Display for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.digest())
    }
}
