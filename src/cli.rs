//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_data_adapter::CsvDataAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::file_store_adapter::FileStoreAdapter;
use crate::domain::engine::{run_period, PeriodReport};
use crate::domain::error::TrendfolioError;
use crate::domain::ledger::TradeAction;
use crate::domain::regime::{evaluate_regime, MarketRegime};
use crate::domain::scan::{evaluate_signal, ScanStatus, SignalRecord};
use crate::domain::state::PortfolioState;
use crate::domain::strategy::StrategyConfig;
use crate::ports::data_port::DataPort;
use crate::ports::store_port::StorePort;

#[derive(Parser, Debug)]
#[command(name = "trendfolio", about = "Weekly momentum portfolio tracker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the weekly evaluation
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Evaluation date (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Show the persisted portfolio state
    Status {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Initialize a fresh portfolio state
    Init {
        #[arg(short, long)]
        config: PathBuf,
        /// Overwrite an existing state file
        #[arg(long)]
        force: bool,
    },
    /// Validate the configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run {
            config,
            date,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config)
            } else {
                run_weekly_command(&config, date)
            }
        }
        Command::Status { config } => run_status(&config),
        Command::Init { config, force } => run_init(&config, force),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = TrendfolioError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

/// One weekly run, start to finish: everything [`run_weekly`] produced plus
/// the data warnings collected along the way.
#[derive(Debug)]
pub struct WeeklyOutcome {
    pub report: PeriodReport,
    pub regime: MarketRegime,
    pub warnings: Vec<String>,
}

/// Scan the universe, evaluate the regime, run the engine, and persist.
///
/// State and ledgers are written only after the full engine pass has
/// succeeded, so a failed run never leaves a partially-applied period behind.
pub fn run_weekly(
    data: &dyn DataPort,
    store: &dyn StorePort,
    strategy: &StrategyConfig,
    run_date: NaiveDate,
) -> Result<WeeklyOutcome, TrendfolioError> {
    // Stage 1: scan the universe
    let universe = data.load_universe()?;
    eprintln!("Scanning {} instruments...", universe.len());

    let mut records: Vec<SignalRecord> = Vec::with_capacity(universe.len());
    let mut warnings: Vec<String> = Vec::new();

    for instrument in &universe {
        let record = match data.fetch_closes(&instrument.ticker) {
            Ok(closes) => evaluate_signal(
                &instrument.ticker,
                &instrument.name,
                &instrument.region,
                &closes,
                &strategy.signal,
            ),
            Err(e) => SignalRecord::fault(
                &instrument.ticker,
                &instrument.name,
                &instrument.region,
                &e.to_string(),
            ),
        };
        if record.status != ScanStatus::Ok {
            warnings.push(format!("{}: {}", record.ticker, record.status));
        }
        records.push(record);
    }

    // Stage 2: market regime from the benchmark
    let regime = match data.fetch_closes(&strategy.benchmark) {
        Ok(closes) => evaluate_regime(&closes, &strategy.regime),
        Err(e) => MarketRegime::fault(&e.to_string()),
    };
    if regime.status != ScanStatus::Ok {
        warnings.push(format!("{}: {}", strategy.benchmark, regime.status));
    }
    eprintln!(
        "Market filter ({}): EMA{}={} EMA{}={} -> {}",
        strategy.benchmark,
        strategy.regime.fast_span,
        regime
            .ema_fast
            .map(|v| format!("{:.4}", v))
            .unwrap_or_else(|| "n/a".into()),
        strategy.regime.slow_span,
        regime
            .ema_slow
            .map(|v| format!("{:.4}", v))
            .unwrap_or_else(|| "n/a".into()),
        if regime.risk_on { "RISK-ON" } else { "RISK-OFF" },
    );

    // Stage 3: previous state and NAV history
    let state = match store.load_state()? {
        Some(s) => s,
        None => {
            eprintln!("No portfolio state found; starting fresh");
            PortfolioState::new(strategy.starting_nav, run_date)
        }
    };
    let nav_history = store.load_nav_history()?;
    let prev_nav = nav_history.last().map(|entry| entry.nav);

    // Stage 4: the engine pass
    let report = run_period(&state, &records, &regime, run_date, prev_nav, strategy)?;

    // Stage 5: persist, only now that the whole pass succeeded
    store.write_scan_snapshot(&records, run_date)?;
    store.save_state(&report.state)?;
    store.append_nav(&report.nav_entry)?;
    store.append_trades(&report.trades)?;

    Ok(WeeklyOutcome {
        report,
        regime,
        warnings,
    })
}

fn run_weekly_command(config_path: &PathBuf, date: Option<NaiveDate>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let strategy = match StrategyConfig::from_config(&adapter) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let data = match CsvDataAdapter::from_config(&adapter) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let store = match FileStoreAdapter::from_config(&adapter) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let run_date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
    eprintln!("Weekly evaluation for {}", run_date);

    let outcome = match run_weekly(&data, &store, &strategy, run_date) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    print_outcome(&outcome, &strategy);
    ExitCode::SUCCESS
}

fn print_outcome(outcome: &WeeklyOutcome, strategy: &StrategyConfig) {
    let report = &outcome.report;

    for trade in &report.trades {
        match trade.action {
            TradeAction::Sell => eprintln!(
                "SELL  {:<12}  @ {:.4}  P&L {:+.2}%  ({})",
                trade.ticker,
                trade.price,
                trade.realized_pnl_pct.unwrap_or(0.0),
                trade.reason,
            ),
            TradeAction::Buy => eprintln!(
                "BUY   {:<12}  @ {:.4}  cost ${:.2}  ({})",
                trade.ticker,
                trade.price,
                trade.cost_basis.unwrap_or(0.0),
                trade.reason,
            ),
        }
    }

    if !report.gate_reasons.is_empty() {
        eprintln!(
            "Risk gate triggered ({}); portfolio is 100% cash",
            report.gate_reasons.join(", ")
        );
    }

    eprintln!(
        "Qualifying: {}  |  NAV: ${:.2}  |  Holdings: {}/{}  |  Cash: ${:.2}",
        report.qualifying_count,
        report.state.nav,
        report.state.holdings_count(),
        strategy.max_positions,
        report.state.cash,
    );

    if !outcome.warnings.is_empty() {
        eprintln!("Data warnings ({}):", outcome.warnings.len());
        for warning in &outcome.warnings {
            eprintln!("  {}", warning);
        }
    }
}

fn run_dry_run(config_path: &PathBuf) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let strategy = match StrategyConfig::from_config(&adapter) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let data = match CsvDataAdapter::from_config(&adapter) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let universe = match data.load_universe() {
        Ok(u) => u,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    eprintln!("\nStrategy:");
    eprintln!(
        "  signal: EMA {}/{}/{} weekly",
        strategy.signal.fast_span, strategy.signal.slow_span, strategy.signal.signal_span
    );
    eprintln!(
        "  market filter: {} EMA{}/EMA{}",
        strategy.benchmark, strategy.regime.fast_span, strategy.regime.slow_span
    );
    eprintln!(
        "  max positions: {}, min qualifying: {}, starting NAV: ${:.0}",
        strategy.max_positions, strategy.min_qualifying, strategy.starting_nav
    );
    eprintln!("\nUniverse: {} instruments", universe.len());
    for instrument in &universe {
        eprintln!("  {:<12} {} ({})", instrument.ticker, instrument.name, instrument.region);
    }

    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

fn run_status(config_path: &PathBuf) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let store = match FileStoreAdapter::from_config(&adapter) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let state = match store.load_state() {
        Ok(Some(s)) => s,
        Ok(None) => {
            eprintln!("No portfolio state found (run `trendfolio init` first)");
            return ExitCode::from(3);
        }
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    println!("NAV: ${:.2}", state.nav);
    println!("Cash: ${:.2}", state.cash);
    println!("Inception: {}", state.inception_date);
    match state.last_run {
        Some(date) => println!("Last run: {}", date),
        None => println!("Last run: never"),
    }

    if state.in_cash {
        println!("Portfolio is 100% cash (risk gate)");
    }

    if state.holdings.is_empty() {
        println!("No holdings");
    } else {
        println!("Holdings ({}):", state.holdings_count());
        for (ticker, holding) in &state.holdings {
            println!(
                "  {:<12} {:<24} entered {} @ {:.4}, basis ${:.2}",
                ticker,
                holding.name,
                holding.entry_date,
                holding.entry_price,
                holding.cost_basis,
            );
        }
    }

    ExitCode::SUCCESS
}

fn run_init(config_path: &PathBuf, force: bool) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let strategy = match StrategyConfig::from_config(&adapter) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let store = match FileStoreAdapter::from_config(&adapter) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    match store.load_state() {
        Ok(Some(_)) if !force => {
            eprintln!("error: a portfolio state already exists (use --force to overwrite)");
            return ExitCode::from(3);
        }
        Ok(_) => {}
        // A corrupt state file may be replaced when forcing
        Err(_) if force => {}
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    }

    let today = chrono::Local::now().date_naive();
    let state = PortfolioState::new(strategy.starting_nav, today);
    if let Err(e) = store.save_state(&state) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    eprintln!(
        "Initialized portfolio: ${:.2} cash, inception {}",
        state.cash, state.inception_date
    );
    ExitCode::SUCCESS
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = StrategyConfig::from_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    if let Err(e) = CsvDataAdapter::from_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    if let Err(e) = FileStoreAdapter::from_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    eprintln!("Config validated successfully");
    ExitCode::SUCCESS
}
