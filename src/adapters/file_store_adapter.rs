//! File-backed store adapter.
//!
//! One directory holds the whole portfolio record: `portfolio_state.json`
//! (the aggregate, rewritten once per period), `nav_history.csv` and
//! `trade_log.csv` (append-only ledgers), and `scans/<date>.csv` (the weekly
//! snapshot). Values keep full precision in memory; rounding happens here, at
//! the write boundary.

use chrono::NaiveDate;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use crate::domain::error::TrendfolioError;
use crate::domain::ledger::{NavEntry, TradeRecord};
use crate::domain::scan::SignalRecord;
use crate::domain::state::PortfolioState;
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::StorePort;

const STATE_FILE: &str = "portfolio_state.json";
const NAV_FILE: &str = "nav_history.csv";
const TRADE_FILE: &str = "trade_log.csv";
const SCANS_DIR: &str = "scans";

const NAV_HEADER: [&str; 6] = [
    "date",
    "nav",
    "weekly_return_pct",
    "num_holdings",
    "in_cash",
    "qualifying_count",
];

const TRADE_HEADER: [&str; 11] = [
    "date",
    "ticker",
    "name",
    "region",
    "action",
    "price",
    "cost_basis",
    "entry_price",
    "rank_score",
    "realized_pnl_pct",
    "reason",
];

const SCAN_HEADER: [&str; 12] = [
    "ticker",
    "name",
    "region",
    "weekly_close",
    "ema_fast",
    "ema_slow",
    "macd",
    "signal",
    "histogram",
    "rank_score",
    "momentum",
    "status",
];

pub struct FileStoreAdapter {
    base_path: PathBuf,
}

impl FileStoreAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, TrendfolioError> {
        let dir = config.get_string("paths", "store_dir").ok_or_else(|| {
            TrendfolioError::ConfigMissing {
                section: "paths".into(),
                key: "store_dir".into(),
            }
        })?;
        Ok(Self::new(PathBuf::from(dir)))
    }

    pub fn state_path(&self) -> PathBuf {
        self.base_path.join(STATE_FILE)
    }

    fn nav_path(&self) -> PathBuf {
        self.base_path.join(NAV_FILE)
    }

    fn trade_path(&self) -> PathBuf {
        self.base_path.join(TRADE_FILE)
    }

    fn scan_path(&self, run_date: NaiveDate) -> PathBuf {
        self.base_path.join(SCANS_DIR).join(format!("{}.csv", run_date))
    }

    fn append_rows(
        &self,
        path: &Path,
        header: &[&str],
        rows: &[Vec<String>],
    ) -> Result<(), TrendfolioError> {
        fs::create_dir_all(&self.base_path)?;
        let write_header = !path.exists();
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if write_header {
            wtr.write_record(header)
                .map_err(|e| store_error(path, &e.to_string()))?;
        }
        for row in rows {
            wtr.write_record(row)
                .map_err(|e| store_error(path, &e.to_string()))?;
        }
        wtr.flush()?;
        Ok(())
    }
}

fn store_error(path: &Path, reason: &str) -> TrendfolioError {
    TrendfolioError::Store {
        reason: format!("{}: {}", path.display(), reason),
    }
}

fn fmt_f64(value: f64, decimals: usize) -> String {
    format!("{:.*}", decimals, value)
}

fn fmt_opt(value: Option<f64>, decimals: usize) -> String {
    value.map(|v| fmt_f64(v, decimals)).unwrap_or_default()
}

fn field<'a>(
    record: &'a csv::StringRecord,
    index: usize,
    path: &Path,
) -> Result<&'a str, TrendfolioError> {
    record
        .get(index)
        .ok_or_else(|| store_error(path, &format!("missing column {}", index)))
}

fn parse_f64(value: &str, path: &Path) -> Result<f64, TrendfolioError> {
    value
        .parse()
        .map_err(|e| store_error(path, &format!("invalid number {:?}: {}", value, e)))
}

fn parse_opt_f64(value: &str, path: &Path) -> Result<Option<f64>, TrendfolioError> {
    if value.is_empty() {
        return Ok(None);
    }
    parse_f64(value, path).map(Some)
}

fn parse_date(value: &str, path: &Path) -> Result<NaiveDate, TrendfolioError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| store_error(path, &format!("invalid date {:?}: {}", value, e)))
}

fn parse_bool(value: &str, path: &Path) -> Result<bool, TrendfolioError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(store_error(path, &format!("invalid bool {:?}", other))),
    }
}

impl StorePort for FileStoreAdapter {
    fn load_state(&self) -> Result<Option<PortfolioState>, TrendfolioError> {
        let path = self.state_path();
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        let state = serde_json::from_str(&content).map_err(|e| {
            TrendfolioError::StateCorrupt {
                reason: format!("{}: {}", path.display(), e),
            }
        })?;
        Ok(Some(state))
    }

    fn save_state(&self, state: &PortfolioState) -> Result<(), TrendfolioError> {
        fs::create_dir_all(&self.base_path)?;
        let path = self.state_path();
        let json = serde_json::to_string_pretty(state)
            .map_err(|e| store_error(&path, &e.to_string()))?;
        fs::write(&path, json)?;
        Ok(())
    }

    fn load_nav_history(&self) -> Result<Vec<NavEntry>, TrendfolioError> {
        let path = self.nav_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path)?;
        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut entries = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| store_error(&path, &e.to_string()))?;
            entries.push(NavEntry {
                date: parse_date(field(&record, 0, &path)?, &path)?,
                nav: parse_f64(field(&record, 1, &path)?, &path)?,
                weekly_return_pct: parse_f64(field(&record, 2, &path)?, &path)?,
                num_holdings: field(&record, 3, &path)?
                    .parse()
                    .map_err(|e| store_error(&path, &format!("invalid count: {}", e)))?,
                in_cash: parse_bool(field(&record, 4, &path)?, &path)?,
                qualifying_count: field(&record, 5, &path)?
                    .parse()
                    .map_err(|e| store_error(&path, &format!("invalid count: {}", e)))?,
            });
        }
        Ok(entries)
    }

    fn append_nav(&self, entry: &NavEntry) -> Result<(), TrendfolioError> {
        let row = vec![
            entry.date.to_string(),
            fmt_f64(entry.nav, 2),
            fmt_f64(entry.weekly_return_pct, 4),
            entry.num_holdings.to_string(),
            entry.in_cash.to_string(),
            entry.qualifying_count.to_string(),
        ];
        self.append_rows(&self.nav_path(), &NAV_HEADER, &[row])
    }

    fn load_trade_log(&self) -> Result<Vec<TradeRecord>, TrendfolioError> {
        let path = self.trade_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path)?;
        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut trades = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| store_error(&path, &e.to_string()))?;
            trades.push(TradeRecord {
                date: parse_date(field(&record, 0, &path)?, &path)?,
                ticker: field(&record, 1, &path)?.to_string(),
                name: field(&record, 2, &path)?.to_string(),
                region: field(&record, 3, &path)?.to_string(),
                action: field(&record, 4, &path)?
                    .parse()
                    .map_err(|e: String| store_error(&path, &e))?,
                price: parse_f64(field(&record, 5, &path)?, &path)?,
                cost_basis: parse_opt_f64(field(&record, 6, &path)?, &path)?,
                entry_price: parse_opt_f64(field(&record, 7, &path)?, &path)?,
                rank_score: parse_opt_f64(field(&record, 8, &path)?, &path)?,
                realized_pnl_pct: parse_opt_f64(field(&record, 9, &path)?, &path)?,
                reason: field(&record, 10, &path)?.to_string(),
            });
        }
        Ok(trades)
    }

    fn append_trades(&self, trades: &[TradeRecord]) -> Result<(), TrendfolioError> {
        if trades.is_empty() {
            return Ok(());
        }
        let rows: Vec<Vec<String>> = trades
            .iter()
            .map(|t| {
                vec![
                    t.date.to_string(),
                    t.ticker.clone(),
                    t.name.clone(),
                    t.region.clone(),
                    t.action.to_string(),
                    fmt_f64(t.price, 4),
                    fmt_opt(t.cost_basis, 4),
                    fmt_opt(t.entry_price, 4),
                    fmt_opt(t.rank_score, 6),
                    fmt_opt(t.realized_pnl_pct, 2),
                    t.reason.clone(),
                ]
            })
            .collect();
        self.append_rows(&self.trade_path(), &TRADE_HEADER, &rows)
    }

    fn write_scan_snapshot(
        &self,
        records: &[SignalRecord],
        run_date: NaiveDate,
    ) -> Result<(), TrendfolioError> {
        let path = self.scan_path(run_date);
        fs::create_dir_all(self.base_path.join(SCANS_DIR))?;

        let mut wtr = csv::Writer::from_path(&path)
            .map_err(|e| store_error(&path, &e.to_string()))?;
        wtr.write_record(SCAN_HEADER)
            .map_err(|e| store_error(&path, &e.to_string()))?;

        for r in records {
            let row = vec![
                r.ticker.clone(),
                r.name.clone(),
                r.region.clone(),
                fmt_opt(r.weekly_close, 4),
                fmt_opt(r.ema_fast, 4),
                fmt_opt(r.ema_slow, 4),
                fmt_opt(r.macd, 4),
                fmt_opt(r.signal, 4),
                fmt_opt(r.histogram, 4),
                fmt_opt(r.rank_score, 6),
                (if r.momentum { "Yes" } else { "No" }).to_string(),
                r.status.to_string(),
            ];
            wtr.write_record(&row)
                .map_err(|e| store_error(&path, &e.to_string()))?;
        }
        wtr.flush()?;
        Ok(())
    }
}
