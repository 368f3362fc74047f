//! Append-only NAV history and trade log entries.
//!
//! Both ledgers are pure appends driven by engine output: no rewriting, no
//! deletion. Trade rows within a period preserve causal order (exits before
//! entries).

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::domain::error::TrendfolioError;
use crate::domain::state::Holding;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeAction {
    Buy,
    Sell,
}

impl std::fmt::Display for TradeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeAction::Buy => write!(f, "BUY"),
            TradeAction::Sell => write!(f, "SELL"),
        }
    }
}

impl std::str::FromStr for TradeAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(TradeAction::Buy),
            "SELL" => Ok(TradeAction::Sell),
            other => Err(format!("unknown trade action {:?}", other)),
        }
    }
}

/// One BUY or SELL event, immutable once written.
///
/// BUY rows carry the cost basis and the rank score at entry; SELL rows carry
/// the originating entry price and the realized P&L. A BUY row therefore holds
/// everything needed to reconstruct its [`Holding`], which is what makes
/// [`replay_trades`] possible.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    pub date: NaiveDate,
    pub ticker: String,
    pub name: String,
    pub region: String,
    pub action: TradeAction,
    pub price: f64,
    pub cost_basis: Option<f64>,
    pub entry_price: Option<f64>,
    pub rank_score: Option<f64>,
    pub realized_pnl_pct: Option<f64>,
    pub reason: String,
}

/// One row of the NAV history, appended once per period.
#[derive(Debug, Clone, PartialEq)]
pub struct NavEntry {
    pub date: NaiveDate,
    pub nav: f64,
    pub weekly_return_pct: f64,
    pub num_holdings: usize,
    pub in_cash: bool,
    pub qualifying_count: usize,
}

/// Week-over-week return in percent against the previous NAV.
pub fn weekly_return_pct(nav: f64, prev_nav: f64) -> f64 {
    if prev_nav == 0.0 {
        return 0.0;
    }
    (nav / prev_nav - 1.0) * 100.0
}

/// The holdings map and cash balance implied by a trade log.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayedBook {
    pub holdings: BTreeMap<String, Holding>,
    pub cash: f64,
}

/// Fold the full trade log over the starting cash.
///
/// Produces exactly the holdings and cash the engine would have after the
/// same trades; NAV follows by marking the result against the final period's
/// prices. An inconsistent log (a BUY for a held ticker, a SELL without a
/// position, a SELL whose recorded entry price disagrees with the book) is a
/// ledger-consistency fault and aborts the replay.
pub fn replay_trades(
    trades: &[TradeRecord],
    starting_cash: f64,
) -> Result<ReplayedBook, TrendfolioError> {
    let mut holdings: BTreeMap<String, Holding> = BTreeMap::new();
    let mut cash = starting_cash;

    for trade in trades {
        match trade.action {
            TradeAction::Buy => {
                let cost_basis = trade.cost_basis.ok_or_else(|| {
                    corrupt(&trade.ticker, trade.date, "BUY row without cost basis")
                })?;
                let rank_score = trade.rank_score.ok_or_else(|| {
                    corrupt(&trade.ticker, trade.date, "BUY row without rank score")
                })?;
                if holdings.contains_key(&trade.ticker) {
                    return Err(corrupt(
                        &trade.ticker,
                        trade.date,
                        "BUY for a ticker already held",
                    ));
                }
                holdings.insert(
                    trade.ticker.clone(),
                    Holding {
                        entry_price: trade.price,
                        entry_date: trade.date,
                        name: trade.name.clone(),
                        region: trade.region.clone(),
                        cost_basis,
                        rank_score_at_entry: rank_score,
                    },
                );
                cash -= cost_basis;
            }
            TradeAction::Sell => {
                let holding = holdings.remove(&trade.ticker).ok_or_else(|| {
                    corrupt(&trade.ticker, trade.date, "SELL without an open position")
                })?;
                if let Some(recorded_entry) = trade.entry_price {
                    if (recorded_entry - holding.entry_price).abs() > 1e-9 {
                        return Err(corrupt(
                            &trade.ticker,
                            trade.date,
                            "SELL entry price disagrees with the book",
                        ));
                    }
                }
                cash += holding.market_value(trade.price);
            }
        }
    }

    Ok(ReplayedBook { holdings, cash })
}

fn corrupt(ticker: &str, date: NaiveDate, reason: &str) -> TrendfolioError {
    TrendfolioError::StateCorrupt {
        reason: format!("trade log replay at {} {}: {}", date, ticker, reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn buy(ticker: &str, day: &str, price: f64, cost_basis: f64) -> TradeRecord {
        TradeRecord {
            date: date(day),
            ticker: ticker.to_string(),
            name: ticker.to_string(),
            region: "US".into(),
            action: TradeAction::Buy,
            price,
            cost_basis: Some(cost_basis),
            entry_price: None,
            rank_score: Some(0.001),
            realized_pnl_pct: None,
            reason: "rank_1_of_1".into(),
        }
    }

    fn sell(ticker: &str, day: &str, price: f64, entry_price: f64) -> TradeRecord {
        TradeRecord {
            date: date(day),
            ticker: ticker.to_string(),
            name: ticker.to_string(),
            region: "US".into(),
            action: TradeAction::Sell,
            price,
            cost_basis: None,
            entry_price: Some(entry_price),
            rank_score: None,
            realized_pnl_pct: Some((price / entry_price - 1.0) * 100.0),
            reason: "signal_off".into(),
        }
    }

    #[test]
    fn weekly_return_basic() {
        assert!((weekly_return_pct(110_000.0, 100_000.0) - 10.0).abs() < 1e-9);
        assert!((weekly_return_pct(95_000.0, 100_000.0) - (-5.0)).abs() < 1e-9);
    }

    #[test]
    fn weekly_return_zero_prev_is_zero() {
        assert_eq!(weekly_return_pct(100.0, 0.0), 0.0);
    }

    #[test]
    fn replay_empty_log() {
        let book = replay_trades(&[], 100_000.0).unwrap();
        assert!(book.holdings.is_empty());
        assert!((book.cash - 100_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn replay_buy_then_hold() {
        let trades = vec![buy("ACME", "2024-01-05", 100.0, 10_000.0)];
        let book = replay_trades(&trades, 100_000.0).unwrap();

        assert_eq!(book.holdings.len(), 1);
        let holding = &book.holdings["ACME"];
        assert!((holding.entry_price - 100.0).abs() < f64::EPSILON);
        assert!((holding.cost_basis - 10_000.0).abs() < f64::EPSILON);
        assert!((book.cash - 90_000.0).abs() < 1e-9);
    }

    #[test]
    fn replay_round_trip_recovers_scaled_basis() {
        let trades = vec![
            buy("ACME", "2024-01-05", 100.0, 10_000.0),
            sell("ACME", "2024-02-02", 110.0, 100.0),
        ];
        let book = replay_trades(&trades, 100_000.0).unwrap();

        assert!(book.holdings.is_empty());
        // 10,000 basis scaled by 110/100
        assert!((book.cash - 101_000.0).abs() < 1e-9);
    }

    #[test]
    fn replay_rejects_sell_without_position() {
        let trades = vec![sell("ACME", "2024-01-05", 100.0, 100.0)];
        assert!(matches!(
            replay_trades(&trades, 100_000.0),
            Err(TrendfolioError::StateCorrupt { .. })
        ));
    }

    #[test]
    fn replay_rejects_double_buy() {
        let trades = vec![
            buy("ACME", "2024-01-05", 100.0, 10_000.0),
            buy("ACME", "2024-01-12", 105.0, 10_000.0),
        ];
        assert!(replay_trades(&trades, 100_000.0).is_err());
    }

    #[test]
    fn replay_rejects_mismatched_entry_price() {
        let trades = vec![
            buy("ACME", "2024-01-05", 100.0, 10_000.0),
            sell("ACME", "2024-02-02", 110.0, 90.0),
        ];
        assert!(replay_trades(&trades, 100_000.0).is_err());
    }

    #[test]
    fn trade_action_round_trips_as_text() {
        assert_eq!(TradeAction::Buy.to_string(), "BUY");
        assert_eq!(TradeAction::Sell.to_string(), "SELL");
        assert_eq!("BUY".parse::<TradeAction>().unwrap(), TradeAction::Buy);
        assert_eq!("SELL".parse::<TradeAction>().unwrap(), TradeAction::Sell);
        assert!("HOLD".parse::<TradeAction>().is_err());
    }
}
