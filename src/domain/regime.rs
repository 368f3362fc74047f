//! Benchmark-level risk gate.
//!
//! A single global switch computed from the benchmark's daily closes: risk-on
//! while the fast EMA holds at or above the slow EMA. Any data fault on the
//! benchmark forces risk-off; the gate is never silently skipped.

use crate::domain::indicator::ema_recursive;
use crate::domain::scan::{round_to, ScanStatus};
use crate::domain::series::ClosePoint;

/// EMA spans for the benchmark trend filter.
#[derive(Debug, Clone, PartialEq)]
pub struct RegimeParams {
    pub fast_span: usize,
    pub slow_span: usize,
}

impl Default for RegimeParams {
    fn default() -> Self {
        RegimeParams {
            fast_span: 10,
            slow_span: 20,
        }
    }
}

/// The market regime for one period.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketRegime {
    pub status: ScanStatus,
    pub ema_fast: Option<f64>,
    pub ema_slow: Option<f64>,
    pub risk_on: bool,
}

impl MarketRegime {
    fn off(status: ScanStatus) -> Self {
        MarketRegime {
            status,
            ema_fast: None,
            ema_slow: None,
            risk_on: false,
        }
    }

    /// Conservative default when the benchmark could not be fetched.
    pub fn fault(message: &str) -> Self {
        Self::off(ScanStatus::Error(message.to_string()))
    }
}

/// Evaluate the benchmark's daily closes into a [`MarketRegime`].
///
/// Requires at least `slow_span` observations; anything less is treated as
/// risk-off.
pub fn evaluate_regime(daily: &[ClosePoint], params: &RegimeParams) -> MarketRegime {
    let closes: Vec<f64> = daily
        .iter()
        .map(|p| p.close)
        .filter(|c| c.is_finite())
        .collect();

    if closes.is_empty() {
        return MarketRegime::off(ScanStatus::NoData);
    }
    if closes.len() < params.slow_span {
        return MarketRegime::off(ScanStatus::InsufficientHistory);
    }

    let fast = ema_recursive(&closes, params.fast_span);
    let slow = ema_recursive(&closes, params.slow_span);
    let (Some(&fast_v), Some(&slow_v)) = (fast.last(), slow.last()) else {
        return MarketRegime::off(ScanStatus::NoData);
    };

    MarketRegime {
        status: ScanStatus::Ok,
        ema_fast: Some(round_to(fast_v, 4)),
        ema_slow: Some(round_to(slow_v, 4)),
        risk_on: fast_v >= slow_v,
    }
}
