//! Persistence port for the portfolio state, ledgers and scan snapshots.
//!
//! The engine never touches storage: the caller reads state before a run and
//! writes everything back only after the full pass has succeeded.

use chrono::NaiveDate;

use crate::domain::error::TrendfolioError;
use crate::domain::ledger::{NavEntry, TradeRecord};
use crate::domain::scan::SignalRecord;
use crate::domain::state::PortfolioState;

pub trait StorePort {
    /// The persisted state, or `None` when no portfolio has been initialized.
    fn load_state(&self) -> Result<Option<PortfolioState>, TrendfolioError>;

    fn save_state(&self, state: &PortfolioState) -> Result<(), TrendfolioError>;

    fn load_nav_history(&self) -> Result<Vec<NavEntry>, TrendfolioError>;

    /// Append one NAV row; existing rows are never rewritten.
    fn append_nav(&self, entry: &NavEntry) -> Result<(), TrendfolioError>;

    fn load_trade_log(&self) -> Result<Vec<TradeRecord>, TrendfolioError>;

    /// Append trade rows in the order the engine emitted them.
    fn append_trades(&self, trades: &[TradeRecord]) -> Result<(), TrendfolioError>;

    /// Write this period's immutable scan snapshot.
    fn write_scan_snapshot(
        &self,
        records: &[SignalRecord],
        run_date: NaiveDate,
    ) -> Result<(), TrendfolioError>;
}
