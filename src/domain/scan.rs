//! Per-instrument weekly signal evaluation.
//!
//! One [`SignalRecord`] per tracked instrument per run. Records are produced
//! fresh every run and are immutable once written to the scan snapshot. A data
//! fault for one instrument degrades to a non-ok status; it never aborts the
//! batch.

use crate::domain::indicator::{ema_recursive, macd};
use crate::domain::series::{resample_weekly, ClosePoint};

/// Outcome of evaluating one instrument.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanStatus {
    Ok,
    NoData,
    InsufficientHistory,
    Error(String),
}

impl std::fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanStatus::Ok => write!(f, "ok"),
            ScanStatus::NoData => write!(f, "no_data"),
            ScanStatus::InsufficientHistory => write!(f, "insufficient_history"),
            ScanStatus::Error(message) => write!(f, "error: {}", message),
        }
    }
}

/// EMA spans for the weekly trend scan.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalParams {
    pub fast_span: usize,
    pub slow_span: usize,
    pub signal_span: usize,
}

impl SignalParams {
    /// Weekly observations required before the signal is considered formed.
    pub fn min_history(&self) -> usize {
        self.slow_span + self.signal_span
    }
}

impl Default for SignalParams {
    fn default() -> Self {
        SignalParams {
            fast_span: 12,
            slow_span: 26,
            signal_span: 9,
        }
    }
}

/// One instrument's scan result for the current period.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalRecord {
    pub ticker: String,
    pub name: String,
    pub region: String,
    pub status: ScanStatus,
    pub weekly_close: Option<f64>,
    pub ema_fast: Option<f64>,
    pub ema_slow: Option<f64>,
    pub macd: Option<f64>,
    pub signal: Option<f64>,
    pub histogram: Option<f64>,
    pub momentum: bool,
    pub rank_score: Option<f64>,
}

impl SignalRecord {
    fn base(ticker: &str, name: &str, region: &str, status: ScanStatus) -> Self {
        SignalRecord {
            ticker: ticker.to_string(),
            name: name.to_string(),
            region: region.to_string(),
            status,
            weekly_close: None,
            ema_fast: None,
            ema_slow: None,
            macd: None,
            signal: None,
            histogram: None,
            momentum: false,
            rank_score: None,
        }
    }

    /// Record for an instrument whose fetch or evaluation failed.
    pub fn fault(ticker: &str, name: &str, region: &str, message: &str) -> Self {
        Self::base(ticker, name, region, ScanStatus::Error(message.to_string()))
    }

    /// Member of this period's qualifying set: evaluated ok, signal on, and a
    /// usable close to trade at.
    pub fn qualifies(&self) -> bool {
        self.status == ScanStatus::Ok
            && self.momentum
            && self.weekly_close.is_some_and(|c| c > 0.0)
    }
}

/// Round half away from zero to `decimals` places.
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Evaluate one instrument's daily close history into a [`SignalRecord`].
///
/// Resamples to weekly closes, requires `slow_span + signal_span` weekly
/// observations, and reports every numeric at 4 decimal places except the
/// rank score (6).
pub fn evaluate_signal(
    ticker: &str,
    name: &str,
    region: &str,
    daily: &[ClosePoint],
    params: &SignalParams,
) -> SignalRecord {
    let weekly = resample_weekly(daily);

    if weekly.is_empty() {
        return SignalRecord::base(ticker, name, region, ScanStatus::NoData);
    }

    let closes: Vec<f64> = weekly.iter().map(|p| p.close).collect();
    let latest_close = round_to(closes[closes.len() - 1], 4);

    if weekly.len() < params.min_history() {
        let mut record =
            SignalRecord::base(ticker, name, region, ScanStatus::InsufficientHistory);
        record.weekly_close = Some(latest_close);
        return record;
    }

    let series = macd(&closes, params.fast_span, params.slow_span, params.signal_span);
    let Some((line, signal, histogram)) = series.latest() else {
        return SignalRecord::base(ticker, name, region, ScanStatus::NoData);
    };

    let ema_fast = ema_recursive(&closes, params.fast_span)
        .last()
        .copied()
        .map(|v| round_to(v, 4));
    let ema_slow = ema_recursive(&closes, params.slow_span)
        .last()
        .copied()
        .map(|v| round_to(v, 4));

    let macd_v = round_to(line, 4);
    let signal_v = round_to(signal, 4);
    let hist_v = round_to(histogram, 4);

    // Signal: oscillator and histogram both positive on the latest value.
    let momentum = macd_v > 0.0 && hist_v > 0.0;

    // Rank: histogram normalised by price, comparable across price scales
    // and currencies.
    let rank_score = if latest_close != 0.0 {
        round_to(hist_v / latest_close, 6)
    } else {
        0.0
    };

    SignalRecord {
        ticker: ticker.to_string(),
        name: name.to_string(),
        region: region.to_string(),
        status: ScanStatus::Ok,
        weekly_close: Some(latest_close),
        ema_fast,
        ema_slow,
        macd: Some(macd_v),
        signal: Some(signal_v),
        histogram: Some(hist_v),
        momentum,
        rank_score: Some(rank_score),
    }
}
