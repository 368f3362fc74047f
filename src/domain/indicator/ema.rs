//! Exponential Moving Average.
//!
//! Recursive (non-adjusted) weighting: ema[0] = x[0], then
//! ema[i] = x[i]*k + ema[i-1]*(1-k) with k = 2/(span+1). Every output is
//! defined from the first observation; minimum-history rules live with the
//! callers, not here.

pub fn ema_recursive(values: &[f64], span: usize) -> Vec<f64> {
    if span == 0 || values.is_empty() {
        return Vec::new();
    }

    let k = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut ema = values[0];
    out.push(ema);

    for &value in &values[1..] {
        ema = value * k + ema * (1.0 - k);
        out.push(ema);
    }

    out
}
