//! Portfolio state: holdings, cash, NAV.
//!
//! The single persisted aggregate. Loaded and rewritten once per period by
//! exactly one writer; the engine treats it as a value (state in, state out)
//! and persistence belongs to the store adapter.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::HashMap;

use crate::domain::error::TrendfolioError;

/// Tolerance for cash going slightly negative through float rounding.
pub const CASH_EPSILON: f64 = 1e-6;

/// One open position. Created on BUY, removed whole on SELL; never resized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub entry_price: f64,
    pub entry_date: NaiveDate,
    pub name: String,
    pub region: String,
    pub cost_basis: f64,
    pub rank_score_at_entry: f64,
}

impl Holding {
    /// Dollar value of the position at `price`: the cost basis scaled by the
    /// price move since entry.
    pub fn market_value(&self, price: f64) -> f64 {
        (price / self.entry_price) * self.cost_basis
    }

    pub fn pnl_pct(&self, price: f64) -> f64 {
        (price / self.entry_price - 1.0) * 100.0
    }
}

/// The persisted portfolio aggregate.
///
/// Holdings are keyed by ticker in a `BTreeMap` so that iteration, and with
/// it the order of exit trades in the ledger, is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioState {
    pub holdings: BTreeMap<String, Holding>,
    pub cash: f64,
    pub nav: f64,
    pub inception_date: NaiveDate,
    pub last_run: Option<NaiveDate>,
    pub in_cash: bool,
}

impl PortfolioState {
    pub fn new(starting_nav: f64, inception_date: NaiveDate) -> Self {
        PortfolioState {
            holdings: BTreeMap::new(),
            cash: starting_nav,
            nav: starting_nav,
            inception_date,
            last_run: None,
            in_cash: false,
        }
    }

    pub fn holdings_count(&self) -> usize {
        self.holdings.len()
    }

    /// `cash + Σ (current/entry) × cost_basis` over all holdings.
    ///
    /// A holding with no usable price this period is valued at its entry
    /// price; missing data is never treated as a loss.
    pub fn mark_to_market(&self, prices: &HashMap<String, f64>) -> f64 {
        let position_value: f64 = self
            .holdings
            .iter()
            .map(|(ticker, holding)| {
                let price = prices
                    .get(ticker)
                    .copied()
                    .unwrap_or(holding.entry_price);
                holding.market_value(price)
            })
            .sum();
        self.cash + position_value
    }

    /// Reject a numerically inconsistent state before any mutation.
    pub fn validate(&self, max_positions: usize) -> Result<(), TrendfolioError> {
        if !self.cash.is_finite() || !self.nav.is_finite() {
            return Err(corrupt("cash or nav is not finite"));
        }
        if self.cash < -CASH_EPSILON {
            return Err(corrupt(&format!("negative cash balance: {}", self.cash)));
        }
        if self.holdings.len() > max_positions {
            return Err(corrupt(&format!(
                "{} holdings exceeds capacity {}",
                self.holdings.len(),
                max_positions
            )));
        }
        for (ticker, holding) in &self.holdings {
            if !(holding.entry_price.is_finite() && holding.entry_price > 0.0) {
                return Err(corrupt(&format!(
                    "{}: entry price {} is not positive",
                    ticker, holding.entry_price
                )));
            }
            if !(holding.cost_basis.is_finite() && holding.cost_basis > 0.0) {
                return Err(corrupt(&format!(
                    "{}: cost basis {} is not positive",
                    ticker, holding.cost_basis
                )));
            }
        }
        Ok(())
    }
}

fn corrupt(reason: &str) -> TrendfolioError {
    TrendfolioError::StateCorrupt {
        reason: reason.to_string(),
    }
}
