//! The weekly portfolio state machine.
//!
//! One invocation per period, strictly ordered and fully deterministic given
//! (previous state, this period's records, the regime flag, the run date):
//!
//! 1. mark NAV to market
//! 2. sell holdings whose signal turned off
//! 3. re-mark
//! 4. portfolio-wide risk gates (too few qualifying, or benchmark risk-off)
//!    (either one liquidates everything and ends the period)
//! 5. fill spare capacity from rank-ordered candidates, equal dollar sizing
//! 6. final re-mark
//!
//! A position only ever leaves via step 2 or step 4. Holding with a
//! still-qualifying signal is never trimmed or rebalanced no matter how far
//! its weight has drifted.

use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::domain::error::TrendfolioError;
use crate::domain::ledger::{weekly_return_pct, NavEntry, TradeAction, TradeRecord};
use crate::domain::regime::MarketRegime;
use crate::domain::scan::SignalRecord;
use crate::domain::state::{Holding, PortfolioState, CASH_EPSILON};
use crate::domain::strategy::StrategyConfig;

/// Everything one engine pass produces: the next state plus the ledger rows
/// to append. Persistence is the caller's responsibility, after the whole
/// pass has succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodReport {
    pub state: PortfolioState,
    pub trades: Vec<TradeRecord>,
    pub nav_entry: NavEntry,
    pub qualifying_count: usize,
    pub gate_reasons: Vec<String>,
}

/// Run one period of the portfolio state machine.
///
/// `prev_nav` is the NAV of the immediately preceding history row, if any;
/// the first period measures its return against the starting capital.
pub fn run_period(
    prev: &PortfolioState,
    records: &[SignalRecord],
    regime: &MarketRegime,
    run_date: NaiveDate,
    prev_nav: Option<f64>,
    config: &StrategyConfig,
) -> Result<PeriodReport, TrendfolioError> {
    prev.validate(config.max_positions)?;
    if let Some(last_run) = prev.last_run {
        if run_date <= last_run {
            return Err(TrendfolioError::DuplicatePeriod {
                date: run_date.to_string(),
                last_run: last_run.to_string(),
            });
        }
    }

    let mut state = prev.clone();
    let mut trades: Vec<TradeRecord> = Vec::new();

    // Usable closes for marking and exits. A missing or zero close falls back
    // to the entry price downstream: missing data is never a loss.
    let prices: HashMap<String, f64> = records
        .iter()
        .filter_map(|r| {
            let close = r.weekly_close?;
            (close > 0.0).then(|| (r.ticker.clone(), close))
        })
        .collect();

    let qualifying: HashSet<&str> = records
        .iter()
        .filter(|r| r.qualifies())
        .map(|r| r.ticker.as_str())
        .collect();
    let qualifying_count = qualifying.len();

    state.nav = state.mark_to_market(&prices);

    // Signal-off exits. Holdings iterate in ticker order, so the ledger is
    // deterministic across runs.
    let signal_off: Vec<String> = state
        .holdings
        .keys()
        .filter(|ticker| !qualifying.contains(ticker.as_str()))
        .cloned()
        .collect();
    for ticker in signal_off {
        sell_position(&mut state, &mut trades, &ticker, &prices, run_date, "signal_off");
    }

    state.nav = state.mark_to_market(&prices);

    // Risk gates, evaluated every period and ahead of any entry.
    let mut gate_reasons: Vec<String> = Vec::new();
    if qualifying_count < config.min_qualifying {
        gate_reasons.push(format!("qualifying_lt_{}", config.min_qualifying));
    }
    if !regime.risk_on {
        gate_reasons.push(format!(
            "benchmark_ema{}_below_ema{}",
            config.regime.fast_span, config.regime.slow_span
        ));
    }

    if !gate_reasons.is_empty() {
        let reason = format!("cash_rule_{}", gate_reasons.join("+"));
        let held: Vec<String> = state.holdings.keys().cloned().collect();
        for ticker in held {
            sell_position(&mut state, &mut trades, &ticker, &prices, run_date, &reason);
        }
        state.in_cash = true;
        // 100% cash: no residual mark needed
        state.nav = state.cash;
    } else {
        state.in_cash = false;
        fill_capacity(&mut state, &mut trades, records, &qualifying, run_date, config);
        state.nav = state.mark_to_market(&prices);
    }

    state.last_run = Some(run_date);

    let base_nav = prev_nav.unwrap_or(config.starting_nav);
    let nav_entry = NavEntry {
        date: run_date,
        nav: state.nav,
        weekly_return_pct: weekly_return_pct(state.nav, base_nav),
        num_holdings: state.holdings_count(),
        in_cash: state.in_cash,
        qualifying_count,
    };

    Ok(PeriodReport {
        state,
        trades,
        nav_entry,
        qualifying_count,
        gate_reasons,
    })
}

/// Sell one holding at this period's close (entry price when no usable close
/// exists, a no-op P&L). Cash receives the mark-to-market value.
fn sell_position(
    state: &mut PortfolioState,
    trades: &mut Vec<TradeRecord>,
    ticker: &str,
    prices: &HashMap<String, f64>,
    run_date: NaiveDate,
    reason: &str,
) {
    let Some(holding) = state.holdings.remove(ticker) else {
        return;
    };

    let exit_price = prices.get(ticker).copied().unwrap_or(holding.entry_price);
    let recovered = holding.market_value(exit_price);
    state.cash += recovered;

    trades.push(TradeRecord {
        date: run_date,
        ticker: ticker.to_string(),
        name: holding.name.clone(),
        region: holding.region.clone(),
        action: TradeAction::Sell,
        price: exit_price,
        cost_basis: None,
        entry_price: Some(holding.entry_price),
        rank_score: None,
        realized_pnl_pct: Some(holding.pnl_pct(exit_price)),
        reason: reason.to_string(),
    });
}

/// Fill spare capacity from rank-ordered candidates.
///
/// Every position created this period gets the same dollar allocation,
/// `nav / (holdings + slots)`; existing holdings keep their fixed cost bases.
/// Slots shrink until the combined spend fits the cash balance: entries are
/// funded, never borrowed.
fn fill_capacity(
    state: &mut PortfolioState,
    trades: &mut Vec<TradeRecord>,
    records: &[SignalRecord],
    qualifying: &HashSet<&str>,
    run_date: NaiveDate,
    config: &StrategyConfig,
) {
    let capacity = config.max_positions.saturating_sub(state.holdings_count());
    if capacity == 0 {
        return;
    }

    let mut candidates: Vec<&SignalRecord> = records
        .iter()
        .filter(|r| {
            qualifying.contains(r.ticker.as_str()) && !state.holdings.contains_key(&r.ticker)
        })
        .collect();
    // Stable sort: ties keep first-seen order in the scan batch.
    candidates.sort_by(|a, b| {
        b.rank_score
            .partial_cmp(&a.rank_score)
            .unwrap_or(Ordering::Equal)
    });

    let held = state.holdings_count();
    let mut slots = capacity.min(candidates.len());
    while slots > 0 {
        let spend = state.nav / (held + slots) as f64 * slots as f64;
        if spend <= state.cash + CASH_EPSILON {
            break;
        }
        slots -= 1;
    }
    if slots == 0 {
        return;
    }

    let entry_size = state.nav / (held + slots) as f64;

    for (idx, record) in candidates.iter().take(slots).enumerate() {
        let Some(entry_price) = record.weekly_close else {
            continue;
        };
        let rank_score = record.rank_score.unwrap_or(0.0);

        state.holdings.insert(
            record.ticker.clone(),
            Holding {
                entry_price,
                entry_date: run_date,
                name: record.name.clone(),
                region: record.region.clone(),
                cost_basis: entry_size,
                rank_score_at_entry: rank_score,
            },
        );
        state.cash -= entry_size;

        trades.push(TradeRecord {
            date: run_date,
            ticker: record.ticker.clone(),
            name: record.name.clone(),
            region: record.region.clone(),
            action: TradeAction::Buy,
            price: entry_price,
            cost_basis: Some(entry_size),
            entry_price: None,
            rank_score: Some(rank_score),
            realized_pnl_pct: None,
            reason: format!("rank_{}_of_{}", idx + 1, candidates.len()),
        });
    }
}
