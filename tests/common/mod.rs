#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use std::collections::HashMap;
use trendfolio::domain::error::TrendfolioError;
use trendfolio::domain::regime::MarketRegime;
use trendfolio::domain::scan::{ScanStatus, SignalRecord};
use trendfolio::domain::series::ClosePoint;
use trendfolio::domain::state::{Holding, PortfolioState};
use trendfolio::ports::data_port::{DataPort, Instrument};

pub struct MockDataPort {
    pub universe: Vec<Instrument>,
    pub data: HashMap<String, Vec<ClosePoint>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            universe: Vec::new(),
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_instrument(mut self, ticker: &str, closes: Vec<ClosePoint>) -> Self {
        self.universe.push(Instrument {
            ticker: ticker.to_string(),
            name: format!("{} Inc", ticker),
            region: "US".to_string(),
        });
        self.data.insert(ticker.to_string(), closes);
        self
    }

    /// Closes for a ticker outside the universe (the benchmark).
    pub fn with_series(mut self, ticker: &str, closes: Vec<ClosePoint>) -> Self {
        self.data.insert(ticker.to_string(), closes);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.universe.push(Instrument {
            ticker: ticker.to_string(),
            name: format!("{} Inc", ticker),
            region: "US".to_string(),
        });
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn load_universe(&self) -> Result<Vec<Instrument>, TrendfolioError> {
        Ok(self.universe.clone())
    }

    fn fetch_closes(&self, ticker: &str) -> Result<Vec<ClosePoint>, TrendfolioError> {
        if let Some(reason) = self.errors.get(ticker) {
            return Err(TrendfolioError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self.data.get(ticker).cloned().unwrap_or_default())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// One close per week, starting on the Friday 2023-01-06.
pub fn weekly_closes(values: &[f64]) -> Vec<ClosePoint> {
    let first = date(2023, 1, 6);
    values
        .iter()
        .enumerate()
        .map(|(i, &close)| ClosePoint {
            date: first + Duration::weeks(i as i64),
            close,
        })
        .collect()
}

/// One close per day, starting 2024-01-01.
pub fn daily_closes(values: &[f64]) -> Vec<ClosePoint> {
    let first = date(2024, 1, 1);
    values
        .iter()
        .enumerate()
        .map(|(i, &close)| ClosePoint {
            date: first + Duration::days(i as i64),
            close,
        })
        .collect()
}

pub fn rising(weeks: usize) -> Vec<f64> {
    (0..weeks).map(|i| 100.0 * 1.01f64.powi(i as i32)).collect()
}

pub fn falling(weeks: usize) -> Vec<f64> {
    (0..weeks).map(|i| 300.0 * 0.99f64.powi(i as i32)).collect()
}

pub fn qualifying_record(ticker: &str, close: f64, rank: f64) -> SignalRecord {
    SignalRecord {
        ticker: ticker.to_string(),
        name: format!("{} Inc", ticker),
        region: "US".into(),
        status: ScanStatus::Ok,
        weekly_close: Some(close),
        ema_fast: Some(close),
        ema_slow: Some(close * 0.95),
        macd: Some(1.0),
        signal: Some(0.5),
        histogram: Some(rank * close),
        momentum: true,
        rank_score: Some(rank),
    }
}

pub fn signal_off_record(ticker: &str, close: f64) -> SignalRecord {
    let mut record = qualifying_record(ticker, close, 0.0);
    record.momentum = false;
    record.macd = Some(-1.0);
    record
}

pub fn qualifying_batch(count: usize) -> Vec<SignalRecord> {
    (0..count)
        .map(|i| qualifying_record(&format!("T{:02}", i), 100.0, 0.01 - i as f64 * 0.0001))
        .collect()
}

pub fn risk_on() -> MarketRegime {
    MarketRegime {
        status: ScanStatus::Ok,
        ema_fast: Some(5_100.0),
        ema_slow: Some(5_000.0),
        risk_on: true,
    }
}

pub fn risk_off() -> MarketRegime {
    MarketRegime {
        status: ScanStatus::Ok,
        ema_fast: Some(4_900.0),
        ema_slow: Some(5_000.0),
        risk_on: false,
    }
}

pub fn fresh_state() -> PortfolioState {
    PortfolioState::new(100_000.0, date(2024, 1, 5))
}

/// A state holding `tickers` entered at 100.0, splitting `invested` dollars
/// equally; the rest of the 100k starting capital stays cash.
pub fn state_with_holdings(tickers: &[&str], invested: f64) -> PortfolioState {
    let mut state = fresh_state();
    let basis = invested / tickers.len() as f64;
    for ticker in tickers {
        state.holdings.insert(
            ticker.to_string(),
            Holding {
                entry_price: 100.0,
                entry_date: date(2024, 2, 2),
                name: format!("{} Inc", ticker),
                region: "US".into(),
                cost_basis: basis,
                rank_score_at_entry: 0.005,
            },
        );
        state.cash -= basis;
    }
    state
}

/// Price map as the engine sees it: ok records with a usable close.
pub fn price_map(records: &[SignalRecord]) -> HashMap<String, f64> {
    records
        .iter()
        .filter_map(|r| {
            let close = r.weekly_close?;
            (close > 0.0).then(|| (r.ticker.clone(), close))
        })
        .collect()
}
