//! CSV price-history data adapter.
//!
//! Stands in for the market-data fetch layer: a directory holding one
//! `<TICKER>.csv` (date,close) per instrument plus a `tickers.csv` universe
//! file (ticker,name,region).

use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

use crate::domain::error::TrendfolioError;
use crate::domain::series::ClosePoint;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::{DataPort, Instrument};

const UNIVERSE_FILE: &str = "tickers.csv";

pub struct CsvDataAdapter {
    base_path: PathBuf,
}

impl CsvDataAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, TrendfolioError> {
        let dir = config.get_string("paths", "data_dir").ok_or_else(|| {
            TrendfolioError::ConfigMissing {
                section: "paths".into(),
                key: "data_dir".into(),
            }
        })?;
        Ok(Self::new(PathBuf::from(dir)))
    }

    fn closes_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", ticker))
    }
}

fn data_error(reason: String) -> TrendfolioError {
    TrendfolioError::Data { reason }
}

impl DataPort for CsvDataAdapter {
    fn load_universe(&self) -> Result<Vec<Instrument>, TrendfolioError> {
        let path = self.base_path.join(UNIVERSE_FILE);
        let content = fs::read_to_string(&path)
            .map_err(|e| data_error(format!("failed to read {}: {}", path.display(), e)))?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut instruments = Vec::new();

        for result in rdr.records() {
            let record =
                result.map_err(|e| data_error(format!("universe parse error: {}", e)))?;

            let ticker = record
                .get(0)
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .ok_or_else(|| data_error("universe row without a ticker".into()))?;
            let name = record.get(1).map(str::trim).unwrap_or("");
            let region = record.get(2).map(str::trim).unwrap_or("");

            instruments.push(Instrument {
                ticker: ticker.to_string(),
                name: if name.is_empty() {
                    ticker.to_string()
                } else {
                    name.to_string()
                },
                region: region.to_string(),
            });
        }

        Ok(instruments)
    }

    fn fetch_closes(&self, ticker: &str) -> Result<Vec<ClosePoint>, TrendfolioError> {
        let path = self.closes_path(ticker);
        let content = fs::read_to_string(&path)
            .map_err(|e| data_error(format!("failed to read {}: {}", path.display(), e)))?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut points = Vec::new();

        for result in rdr.records() {
            let record = result
                .map_err(|e| data_error(format!("{}: CSV parse error: {}", ticker, e)))?;

            let date_str = record
                .get(0)
                .ok_or_else(|| data_error(format!("{}: missing date column", ticker)))?;
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
                .map_err(|e| data_error(format!("{}: invalid date format: {}", ticker, e)))?;

            let close: f64 = record
                .get(1)
                .ok_or_else(|| data_error(format!("{}: missing close column", ticker)))?
                .parse()
                .map_err(|e| data_error(format!("{}: invalid close value: {}", ticker, e)))?;

            points.push(ClosePoint { date, close });
        }

        points.sort_by_key(|p| p.date);
        Ok(points)
    }
}
