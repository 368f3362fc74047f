//! Strategy parameters and config validation.

use crate::domain::error::TrendfolioError;
use crate::domain::regime::RegimeParams;
use crate::domain::scan::SignalParams;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_STARTING_NAV: f64 = 100_000.0;
pub const DEFAULT_MAX_POSITIONS: usize = 20;
pub const DEFAULT_MIN_QUALIFYING: usize = 10;
pub const DEFAULT_BENCHMARK: &str = "^GSPC";

/// Everything the weekly evaluation needs to know about the strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    pub signal: SignalParams,
    pub regime: RegimeParams,
    pub benchmark: String,
    pub max_positions: usize,
    pub min_qualifying: usize,
    pub starting_nav: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig {
            signal: SignalParams::default(),
            regime: RegimeParams::default(),
            benchmark: DEFAULT_BENCHMARK.to_string(),
            max_positions: DEFAULT_MAX_POSITIONS,
            min_qualifying: DEFAULT_MIN_QUALIFYING,
            starting_nav: DEFAULT_STARTING_NAV,
        }
    }
}

impl StrategyConfig {
    /// Build from an INI-style config, falling back to the defaults above.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, TrendfolioError> {
        let built = StrategyConfig {
            signal: SignalParams {
                fast_span: read_span(config, "strategy", "fast_span", 12)?,
                slow_span: read_span(config, "strategy", "slow_span", 26)?,
                signal_span: read_span(config, "strategy", "signal_span", 9)?,
            },
            regime: RegimeParams {
                fast_span: read_span(config, "market", "fast_span", 10)?,
                slow_span: read_span(config, "market", "slow_span", 20)?,
            },
            benchmark: config
                .get_string("market", "benchmark")
                .unwrap_or_else(|| DEFAULT_BENCHMARK.to_string()),
            max_positions: read_span(
                config,
                "strategy",
                "max_positions",
                DEFAULT_MAX_POSITIONS as i64,
            )?,
            min_qualifying: read_span(
                config,
                "strategy",
                "min_qualifying",
                DEFAULT_MIN_QUALIFYING as i64,
            )?,
            starting_nav: config.get_double("strategy", "starting_nav", DEFAULT_STARTING_NAV),
        };
        built.validate()?;
        Ok(built)
    }

    fn validate(&self) -> Result<(), TrendfolioError> {
        if self.signal.fast_span >= self.signal.slow_span {
            return Err(invalid(
                "strategy",
                "fast_span",
                "fast_span must be smaller than slow_span",
            ));
        }
        if self.regime.fast_span >= self.regime.slow_span {
            return Err(invalid(
                "market",
                "fast_span",
                "fast_span must be smaller than slow_span",
            ));
        }
        if self.benchmark.trim().is_empty() {
            return Err(invalid("market", "benchmark", "benchmark must not be empty"));
        }
        if !(self.starting_nav.is_finite() && self.starting_nav > 0.0) {
            return Err(invalid(
                "strategy",
                "starting_nav",
                "starting_nav must be positive",
            ));
        }
        Ok(())
    }
}

fn invalid(section: &str, key: &str, reason: &str) -> TrendfolioError {
    TrendfolioError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn read_span(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<usize, TrendfolioError> {
    let value = config.get_int(section, key, default);
    if value < 1 {
        return Err(invalid(section, key, "must be at least 1"));
    }
    Ok(value as usize)
}
