//! CSV Persistence Module
//!
//! Append-only trade log: one row per closed position. Each row is encoded
//! in memory and written with a single append + fsync, so a crash can cut
//! at most the row in flight. A torn final row is terminated before the next
//! append. Readers take the tail and skip malformed rows.

use anyhow::{Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::features::RegimeLabel;
use crate::types::{ExitOutcome, Side};

/// Rows kept in memory for status/report queries
const RECENT_CAPACITY: usize = 500;

/// Closed trade as written to the log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: String,
    pub side: Side,
    pub entry: f64,
    pub stop: f64,
    pub initial_stop: f64,
    pub tp1: f64,
    pub tp2: f64,
    pub breakeven_hit: bool,
    #[serde(default)]
    pub trailing_stop: Option<f64>,
    pub opened_at: i64,
    pub bars_held: u32,
    pub regime: RegimeLabel,
    pub score: f64,
    pub explored: bool,
    pub outcome: ExitOutcome,
    pub exit_price: f64,
    pub exit_time: i64,
    pub pnl: f64,
    pub reward: f64,
}

/// Append-only trade log with an in-memory tail
pub struct TradeLog {
    path: Option<PathBuf>,
    recent: VecDeque<TradeRecord>,
    capacity: usize,
    total: usize,
}

impl TradeLog {
    /// Log that never touches disk and keeps every record
    pub fn in_memory() -> Self {
        Self {
            path: None,
            recent: VecDeque::new(),
            capacity: usize::MAX,
            total: 0,
        }
    }

    /// Open (or create) a CSV log, preloading its tail
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }

        let (recent, total) = if path.exists() {
            Self::scan(&path, RECENT_CAPACITY)?
        } else {
            (VecDeque::new(), 0)
        };
        info!(
            path = %path.display(),
            loaded = recent.len(),
            total,
            "📒 Trade log opened"
        );

        Ok(Self {
            total,
            path: Some(path),
            recent,
            capacity: RECENT_CAPACITY,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Well-formed records in the log, including those not kept in memory
    pub fn total(&self) -> usize {
        self.total
    }

    /// Append a record.
    ///
    /// The in-memory tail is updated even when the disk write fails.
    pub fn append(&mut self, record: TradeRecord) -> Result<()> {
        let write_result = match &self.path {
            Some(path) => Self::append_row(path, &record),
            None => Ok(()),
        };

        self.recent.push_back(record);
        while self.recent.len() > self.capacity {
            self.recent.pop_front();
        }
        self.total += 1;

        write_result
    }

    /// Last `n` records, oldest first
    pub fn tail(&self, n: usize) -> Vec<TradeRecord> {
        let skip = self.recent.len().saturating_sub(n);
        self.recent.iter().skip(skip).cloned().collect()
    }

    /// Read the last `n` well-formed rows straight from a log file
    pub fn read_tail(path: &Path, n: usize) -> Result<Vec<TradeRecord>> {
        Ok(Self::scan(path, n)?.0.into())
    }

    /// Last `n` well-formed rows plus the count of all well-formed rows
    fn scan(path: &Path, n: usize) -> Result<(VecDeque<TradeRecord>, usize)> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;

        let mut out: VecDeque<TradeRecord> = VecDeque::new();
        let mut skipped = 0usize;
        let mut total = 0usize;
        for row in reader.deserialize::<TradeRecord>() {
            match row {
                Ok(record) => {
                    total += 1;
                    out.push_back(record);
                    if out.len() > n {
                        out.pop_front();
                    }
                }
                Err(_) => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!(path = %path.display(), skipped, "Skipped malformed trade log rows");
        }
        Ok((out, total))
    }

    fn append_row(path: &Path, record: &TradeRecord) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)
            .context("Failed to open trade log")?;
        let len = file.metadata().context("Failed to stat trade log")?.len();

        let mut row = Vec::new();
        if len > 0 && !Self::ends_with_newline(&mut file)? {
            warn!(path = %path.display(), "Terminating torn trade log row");
            row.push(b'\n');
        }

        let mut writer = WriterBuilder::new()
            .has_headers(len == 0)
            .from_writer(row);
        writer
            .serialize(record)
            .context("Failed to encode trade record")?;
        let row = writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush trade record: {}", e))?;

        file.write_all(&row).context("Failed to append trade record")?;
        file.sync_data().context("Failed to sync trade log")?;
        Ok(())
    }

    fn ends_with_newline(file: &mut fs::File) -> Result<bool> {
        let mut last = [0u8; 1];
        file.seek(SeekFrom::End(-1))
            .and_then(|_| file.read_exact(&mut last))
            .context("Failed to read trade log end")?;
        Ok(last[0] == b'\n')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_data_dir(test_name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "spiralbot_persistence_{}_{}",
            test_name,
            uuid::Uuid::new_v4()
        ))
    }

    fn record(i: i64, outcome: ExitOutcome) -> TradeRecord {
        TradeRecord {
            id: format!("t{}", i),
            side: Side::Long,
            entry: 100.0,
            stop: 100.0,
            initial_stop: 70.0,
            tp1: 160.0,
            tp2: 250.0,
            breakeven_hit: true,
            trailing_stop: if i % 2 == 0 { Some(120.0) } else { None },
            opened_at: i * 1000,
            bars_held: 4,
            regime: RegimeLabel::Trend,
            score: 0.61,
            explored: false,
            outcome,
            exit_price: 250.0,
            exit_time: i * 1000 + 500,
            pnl: 150.0,
            reward: 0.4,
        }
    }

    #[test]
    fn header_written_once_and_rows_reload() {
        let dir = temp_data_dir("reload");
        let path = dir.join("trades").join("trade_log.csv");

        let mut log = TradeLog::open(&path).unwrap();
        log.append(record(1, ExitOutcome::Tp2)).unwrap();
        log.append(record(2, ExitOutcome::Sl)).unwrap();
        drop(log);

        let mut log = TradeLog::open(&path).unwrap();
        log.append(record(3, ExitOutcome::EarlyExit)).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("outcome").count(), 1);

        let rows = TradeLog::read_tail(&path, 10).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], record(1, ExitOutcome::Tp2));
        assert_eq!(rows[2].outcome, ExitOutcome::EarlyExit);
        assert_eq!(log.total(), 3);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn tail_skips_malformed_rows() {
        let dir = temp_data_dir("malformed");
        let path = dir.join("trade_log.csv");

        let mut log = TradeLog::open(&path).unwrap();
        log.append(record(1, ExitOutcome::Tp1)).unwrap();
        {
            let mut f = OpenOptions::new().append(true).open(&path).unwrap();
            f.write_all(b"garbage,row\n").unwrap();
        }
        log.append(record(2, ExitOutcome::Sl)).unwrap();

        let rows = TradeLog::read_tail(&path, 10).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].id, "t2");
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn torn_last_row_does_not_swallow_the_next_append() {
        let dir = temp_data_dir("torn");
        let path = dir.join("trade_log.csv");

        let mut log = TradeLog::open(&path).unwrap();
        log.append(record(1, ExitOutcome::Tp1)).unwrap();
        drop(log);
        {
            // Crash mid-write: partial row, no terminator
            let mut f = OpenOptions::new().append(true).open(&path).unwrap();
            f.write_all(b"t2,LONG,1.0,1.0").unwrap();
        }

        let mut log = TradeLog::open(&path).unwrap();
        assert_eq!(log.total(), 1);
        log.append(record(3, ExitOutcome::Sl)).unwrap();

        let rows = TradeLog::read_tail(&path, 10).unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "t3"]);
        assert_eq!(rows[1], record(3, ExitOutcome::Sl));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn total_counts_rows_beyond_the_memory_tail() {
        let dir = temp_data_dir("total");
        let path = dir.join("trade_log.csv");

        let mut log = TradeLog::open(&path).unwrap();
        for i in 0..(RECENT_CAPACITY as i64 + 20) {
            log.append(record(i, ExitOutcome::Tp1)).unwrap();
        }
        drop(log);

        let log = TradeLog::open(&path).unwrap();
        assert_eq!(log.total(), RECENT_CAPACITY + 20);
        assert_eq!(log.tail(usize::MAX).len(), RECENT_CAPACITY);
        assert_eq!(log.tail(1)[0].id, format!("t{}", RECENT_CAPACITY + 19));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn in_memory_tail_returns_latest_oldest_first() {
        let mut log = TradeLog::in_memory();
        for i in 0..5 {
            log.append(record(i, ExitOutcome::Tp1)).unwrap();
        }
        let tail = log.tail(2);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].id, "t3");
        assert_eq!(tail[1].id, "t4");
        assert!(log.path().is_none());
    }
}
