//! Time-of-day encodings
//!
//! Trading session one-hot plus cyclical hour/day-of-week features, all
//! derived from the bar's open time in UTC.

use chrono::{Datelike, TimeZone, Timelike, Utc};
use std::f64::consts::PI;

/// Coarse UTC trading session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Session {
    Asia,
    London,
    NewYork,
    Late,
}

impl Session {
    pub const ALL: [Session; 4] = [
        Session::Asia,
        Session::London,
        Session::NewYork,
        Session::Late,
    ];

    pub fn from_hour(hour: u32) -> Self {
        match hour {
            0..=6 => Session::Asia,
            7..=12 => Session::London,
            13..=20 => Session::NewYork,
            _ => Session::Late,
        }
    }

    /// Feature name used in the vector
    pub fn feature_name(&self) -> &'static str {
        match self {
            Session::Asia => "session_asia",
            Session::London => "session_london",
            Session::NewYork => "session_ny",
            Session::Late => "session_late",
        }
    }
}

/// Time encodings for a timestamp in unix milliseconds.
///
/// Returns `(name, value)` pairs; an unrepresentable timestamp yields an
/// empty list so the scorer treats the time features as absent.
pub fn time_features(ts_ms: i64) -> Vec<(&'static str, f64)> {
    let Some(dt) = Utc.timestamp_millis_opt(ts_ms).single() else {
        return Vec::new();
    };

    let hour = dt.hour();
    let session = Session::from_hour(hour);
    let hour_frac = (hour as f64 + dt.minute() as f64 / 60.0) / 24.0;
    let dow_frac = dt.weekday().num_days_from_monday() as f64 / 7.0;

    let mut out: Vec<(&'static str, f64)> = Session::ALL
        .iter()
        .map(|s| (s.feature_name(), if *s == session { 1.0 } else { 0.0 }))
        .collect();

    out.push(("hour_sin", (2.0 * PI * hour_frac).sin()));
    out.push(("hour_cos", (2.0 * PI * hour_frac).cos()));
    out.push(("dow_sin", (2.0 * PI * dow_frac).sin()));
    out.push(("dow_cos", (2.0 * PI * dow_frac).cos()));
    out
}
