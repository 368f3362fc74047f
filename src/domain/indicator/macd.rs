//! MACD (Moving Average Convergence Divergence).
//!
//! Line = EMA(fast) - EMA(slow)
//! Signal = EMA(signal_span) of the line
//! Histogram = Line - Signal
//!
//! All three EMAs use the recursive convention from [`super::ema`], so every
//! index is defined; callers enforce their own minimum-history rules.

use super::ema::ema_recursive;

#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub line: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

impl MacdSeries {
    /// The latest (line, signal, histogram) triple, if any.
    pub fn latest(&self) -> Option<(f64, f64, f64)> {
        let i = self.line.len().checked_sub(1)?;
        Some((self.line[i], self.signal[i], self.histogram[i]))
    }
}

pub fn macd(closes: &[f64], fast: usize, slow: usize, signal_span: usize) -> MacdSeries {
    if closes.is_empty() || fast == 0 || slow == 0 || signal_span == 0 {
        return MacdSeries {
            line: Vec::new(),
            signal: Vec::new(),
            histogram: Vec::new(),
        };
    }

    let ema_fast = ema_recursive(closes, fast);
    let ema_slow = ema_recursive(closes, slow);

    let line: Vec<f64> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| f - s)
        .collect();
    let signal = ema_recursive(&line, signal_span);
    let histogram: Vec<f64> = line.iter().zip(&signal).map(|(l, s)| l - s).collect();

    MacdSeries {
        line,
        signal,
        histogram,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn histogram_equals_line_minus_signal() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let series = macd(&closes, 12, 26, 9);

        for i in 0..closes.len() {
            let expected = series.line[i] - series.signal[i];
            assert!((series.histogram[i] - expected).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn line_is_fast_minus_slow() {
        let closes = vec![10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0];
        let series = macd(&closes, 3, 5, 2);

        let fast = ema_recursive(&closes, 3);
        let slow = ema_recursive(&closes, 5);
        for i in 0..closes.len() {
            assert!((series.line[i] - (fast[i] - slow[i])).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn signal_is_ema_of_line() {
        let closes = vec![10.0, 12.0, 9.0, 14.0, 16.0, 13.0, 17.0];
        let series = macd(&closes, 2, 4, 3);

        let expected = ema_recursive(&series.line, 3);
        for i in 0..closes.len() {
            assert!((series.signal[i] - expected[i]).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn latest_returns_last_triple() {
        let closes: Vec<f64> = (0..10).map(|i| 50.0 + i as f64).collect();
        let series = macd(&closes, 3, 5, 2);

        let (line, signal, histogram) = series.latest().unwrap();
        assert!((line - series.line[9]).abs() < f64::EPSILON);
        assert!((signal - series.signal[9]).abs() < f64::EPSILON);
        assert!((histogram - series.histogram[9]).abs() < f64::EPSILON);
    }

    #[test]
    fn rising_series_has_positive_line() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 * 1.01f64.powi(i)).collect();
        let series = macd(&closes, 12, 26, 9);
        let (line, _, _) = series.latest().unwrap();
        assert!(line > 0.0);
    }

    #[test]
    fn empty_input() {
        let series = macd(&[], 12, 26, 9);
        assert!(series.line.is_empty());
        assert!(series.latest().is_none());
    }

    #[test]
    fn zero_span_yields_empty() {
        assert!(macd(&[1.0, 2.0], 0, 26, 9).line.is_empty());
        assert!(macd(&[1.0, 2.0], 12, 0, 9).line.is_empty());
        assert!(macd(&[1.0, 2.0], 12, 26, 0).line.is_empty());
    }
}
