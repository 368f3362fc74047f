//! Exponential moving average family used by the weekly scan.

pub mod ema;
pub mod macd;

pub use ema::ema_recursive;
pub use macd::{macd, MacdSeries};
