//! Chat-message rendering for events and reports

use chrono::{TimeZone, Utc};

use crate::lifecycle::{EngineEvent, EngineStatus};
use crate::persistence::TradeRecord;
use crate::types::ExitOutcome;

fn fmt_ts(ts_ms: i64) -> String {
    Utc.timestamp_millis_opt(ts_ms)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| ts_ms.to_string())
}

pub fn format_event(event: &EngineEvent) -> String {
    match event {
        EngineEvent::SignalOpened {
            side,
            entry,
            stop,
            tp1,
            tp2,
            score,
            regime,
            explored,
            ..
        } => {
            let tag = if *explored { " (explore)" } else { "" };
            format!(
                "📈 {} @ {:.2}{}\nSL {:.2} | TP1 {:.2} | TP2 {:.2}\nscore {:.3} | regime {}",
                side, entry, tag, stop, tp1, tp2, score, regime
            )
        }
        EngineEvent::BreakEvenMoved { price, .. } => {
            format!("🛡️ Stop moved to breakeven @ {:.2}", price)
        }
        EngineEvent::StopTrailed { price, .. } => format!("🔁 Stop trailed to {:.2}", price),
        EngineEvent::PositionClosed {
            outcome,
            exit_price,
            pnl,
            reward,
            ..
        } => {
            let icon = if outcome.is_win() { "✅" } else { "❌" };
            format!(
                "{} {} @ {:.2} | pnl {:+.2} | reward {:+.3}",
                icon, outcome, exit_price, pnl, reward
            )
        }
    }
}

/// Win statistics over a set of closed trades
pub fn format_results(trades: &[TradeRecord]) -> String {
    if trades.is_empty() {
        return "📊 No closed trades yet".to_string();
    }
    let count = |o: ExitOutcome| trades.iter().filter(|t| t.outcome == o).count();
    let wins = trades.iter().filter(|t| t.outcome.is_win()).count();
    let pnl: f64 = trades.iter().map(|t| t.pnl).sum();
    let reward: f64 = trades.iter().map(|t| t.reward).sum();
    let win_rate = wins as f64 / trades.len() as f64 * 100.0;

    format!(
        "📊 Results ({} trades)\nWins {} ({:.1}%) | TP2 {} | TP1 {} | SL {} | Early {}\nPnL {:+.2} | reward {:+.3}",
        trades.len(),
        wins,
        win_rate,
        count(ExitOutcome::Tp2),
        count(ExitOutcome::Tp1),
        count(ExitOutcome::Sl),
        count(ExitOutcome::EarlyExit),
        pnl,
        reward
    )
}

/// One line per trade, oldest first
pub fn format_trade_logs(trades: &[TradeRecord]) -> String {
    if trades.is_empty() {
        return "🧾 Trade log is empty".to_string();
    }
    let mut out = String::from("🧾 Last trades");
    for t in trades {
        out.push_str(&format!(
            "\n{} {} {:.2} → {:.2} {} pnl {:+.2} r {:+.3}",
            fmt_ts(t.exit_time),
            t.side,
            t.entry,
            t.exit_price,
            t.outcome,
            t.pnl,
            t.reward
        ));
    }
    out
}

pub fn format_status(status: &EngineStatus) -> String {
    let position = match &status.position {
        Some(p) => format!(
            "{} @ {:.2} | SL {:.2} | TP1 {:.2} | TP2 {:.2} | {:?} | bars {}",
            p.side,
            p.entry,
            p.stop,
            p.tp1,
            p.tp2,
            p.phase(),
            p.bars_held
        ),
        None => "flat".to_string(),
    };
    format!(
        "🌀 Status\nPosition: {}\nScorer: {} | threshold {:.3} (base {:.3})\nMood: caution {:.2} | exploration {:.3} | SL streak {}\nTrades logged: {}",
        position,
        status.scorer,
        status.effective_threshold,
        status.base_threshold,
        status.meta.caution_multiplier,
        status.meta.exploration,
        status.meta.sl_streak,
        status.trades_logged
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::RegimeLabel;
    use crate::types::Side;

    fn trade(outcome: ExitOutcome, pnl: f64, reward: f64) -> TradeRecord {
        TradeRecord {
            id: "t".into(),
            side: Side::Long,
            entry: 100.0,
            stop: 90.0,
            initial_stop: 90.0,
            tp1: 110.0,
            tp2: 120.0,
            breakeven_hit: false,
            trailing_stop: None,
            opened_at: 0,
            bars_held: 3,
            regime: RegimeLabel::Trend,
            score: 0.6,
            explored: false,
            outcome,
            exit_price: 100.0 + pnl,
            exit_time: 1_700_000_000_000,
            pnl,
            reward,
        }
    }

    #[test]
    fn results_count_outcomes() {
        let trades = vec![
            trade(ExitOutcome::Tp2, 20.0, 0.8),
            trade(ExitOutcome::Sl, -10.0, -0.4),
            trade(ExitOutcome::Tp1, 10.0, 0.3),
            trade(ExitOutcome::EarlyExit, 1.0, 0.0),
        ];
        let text = format_results(&trades);
        assert!(text.contains("4 trades"));
        assert!(text.contains("Wins 2 (50.0%)"));
        assert!(text.contains("TP2 1"));
        assert!(text.contains("SL 1"));
        assert!(text.contains("PnL +21.00"));
    }

    #[test]
    fn empty_reports_say_so() {
        assert!(format_results(&[]).contains("No closed trades"));
        assert!(format_trade_logs(&[]).contains("empty"));
    }

    #[test]
    fn close_event_marks_losses() {
        let text = format_event(&EngineEvent::PositionClosed {
            ts: 0,
            outcome: ExitOutcome::Sl,
            exit_price: 700.0,
            pnl: -300.0,
            reward: -0.42,
        });
        assert!(text.starts_with("❌ SL"));
        assert!(text.contains("-0.420"));
    }
}
