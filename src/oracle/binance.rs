//! Binance REST kline feed
//!
//! Polls `/api/v3/klines` for a single symbol. Rows are
//! `[open_time, open, high, low, close, volume, close_time, ...]` with
//! prices as strings; malformed rows are dropped.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use super::{FeedError, MarketDataFeed};
use crate::config::FeedConfig;
use crate::types::{Candle, Timeframe};

/// Binance caps a klines request at this many rows
const MAX_LIMIT: usize = 1000;

#[derive(Debug, Clone)]
pub struct BinanceFeed {
    client: reqwest::Client,
    rest_url: String,
    symbol: String,
    timeout_ms: u64,
}

impl BinanceFeed {
    pub fn new(cfg: &FeedConfig, symbol: &str) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.fetch_timeout_ms.max(1)))
            .build()?;
        Ok(Self {
            client,
            rest_url: cfg.rest_url.clone(),
            symbol: symbol.to_uppercase(),
            timeout_ms: cfg.fetch_timeout_ms,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}

/// Parse a klines payload, skipping rows that don't decode
pub fn parse_klines(rows: Vec<Vec<serde_json::Value>>) -> Vec<Candle> {
    rows.into_iter()
        .filter_map(|kline| {
            if kline.len() < 7 {
                return None;
            }

            let open_time = kline[0].as_i64()?;
            let open: f64 = kline[1].as_str()?.parse().ok()?;
            let high: f64 = kline[2].as_str()?.parse().ok()?;
            let low: f64 = kline[3].as_str()?.parse().ok()?;
            let close: f64 = kline[4].as_str()?.parse().ok()?;
            let volume: f64 = kline[5].as_str()?.parse().ok()?;
            let close_time = kline[6].as_i64()?;

            let candle = Candle {
                open_time,
                close_time,
                open,
                high,
                low,
                close,
                volume,
            };
            candle.is_finite().then_some(candle)
        })
        .collect()
}

#[async_trait]
impl MarketDataFeed for BinanceFeed {
    async fn fetch(&self, timeframe: Timeframe, limit: usize) -> Result<Vec<Candle>, FeedError> {
        let limit = limit.clamp(1, MAX_LIMIT).to_string();
        let response = self
            .client
            .get(&self.rest_url)
            .query(&[
                ("symbol", self.symbol.as_str()),
                ("interval", timeframe.interval()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FeedError::Timeout(self.timeout_ms)
                } else {
                    FeedError::Http(e)
                }
            })?;

        if !response.status().is_success() {
            return Err(FeedError::Unavailable(format!(
                "Binance API returned {}",
                response.status()
            )));
        }

        let rows: Vec<Vec<serde_json::Value>> = response
            .json()
            .await
            .map_err(|e| FeedError::Decode(e.to_string()))?;
        let candles = parse_klines(rows);

        debug!(
            symbol = %self.symbol,
            timeframe = %timeframe,
            count = candles.len(),
            "📥 Klines fetched"
        );

        if candles.is_empty() {
            return Err(FeedError::Unavailable("empty kline response".to_string()));
        }
        Ok(candles)
    }
}
