//! Oracle module - market data feeds
//!
//! `MarketDataFeed` is the seam the scanner polls for candle windows
//! (freshest bar last). Binance REST klines are the production source.

mod binance;
mod candles;

pub use binance::BinanceFeed;
pub use candles::CandleAggregator;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{Candle, Timeframe};

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("feed unavailable: {0}")]
    Unavailable(String),

    #[error("feed timed out after {0} ms")]
    Timeout(u64),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait MarketDataFeed: Send + Sync {
    /// Up to `limit` bars, oldest first
    async fn fetch(&self, timeframe: Timeframe, limit: usize) -> Result<Vec<Candle>, FeedError>;
}
