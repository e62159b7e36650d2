//! Configuration validation.
//!
//! Checks the `[simulator]` and `[ledger]` sections and builds the typed
//! configs from them. Absent keys take their defaults.

use chrono::NaiveDate;

use crate::domain::error::TradesimError;
use crate::domain::market::SimulatorConfig;
use crate::domain::price_series::DateRange;
use crate::domain::trade::ContractTerms;
use crate::ports::config_port::ConfigPort;

const SIMULATOR: &str = "simulator";
const LEDGER: &str = "ledger";

pub fn validate_simulator_config(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    validate_fee_rate(config, SIMULATOR)?;
    validate_positive(config, SIMULATOR, "lot_multiplier")?;
    validate_positive(config, SIMULATOR, "init_cash")?;
    validate_bool(config, SIMULATOR, "expose_direction")?;
    build_date_range(config)?;
    Ok(())
}

pub fn validate_ledger_config(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    validate_fee_rate(config, LEDGER)?;
    validate_positive(config, LEDGER, "multiple")?;
    validate_positive(config, LEDGER, "margin_ratio")?;
    Ok(())
}

/// Validate `[simulator]` and build a [`SimulatorConfig`].
pub fn build_simulator_config(config: &dyn ConfigPort) -> Result<SimulatorConfig, TradesimError> {
    validate_simulator_config(config)?;
    let defaults = SimulatorConfig::default();
    Ok(SimulatorConfig {
        fee_rate: config.get_double(SIMULATOR, "fee_rate", defaults.fee_rate),
        lot_multiplier: config.get_double(SIMULATOR, "lot_multiplier", defaults.lot_multiplier),
        init_cash: config.get_double(SIMULATOR, "init_cash", defaults.init_cash),
        expose_direction: config.get_bool(SIMULATOR, "expose_direction", defaults.expose_direction),
    })
}

/// Validate `[ledger]` and build the [`ContractTerms`] used to price fills.
pub fn build_contract_terms(config: &dyn ConfigPort) -> Result<ContractTerms, TradesimError> {
    validate_ledger_config(config)?;
    let defaults = ContractTerms::default();
    Ok(ContractTerms {
        fee_rate: config.get_double(LEDGER, "fee_rate", defaults.fee_rate),
        multiple: config.get_double(LEDGER, "multiple", defaults.multiple),
        margin_ratio: config.get_double(LEDGER, "margin_ratio", defaults.margin_ratio),
    })
}

/// Optional `range_from`/`range_to` window applied to the price series.
pub fn build_date_range(config: &dyn ConfigPort) -> Result<DateRange, TradesimError> {
    let range = DateRange {
        from: read_date(config, SIMULATOR, "range_from")?,
        to: read_date(config, SIMULATOR, "range_to")?,
    };
    if let (Some(from), Some(to)) = (range.from, range.to) {
        if from > to {
            return Err(TradesimError::ConfigInvalid {
                section: SIMULATOR.to_string(),
                key: "range_from".to_string(),
                reason: "range_from must not be after range_to".to_string(),
            });
        }
    }
    Ok(range)
}

fn read_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<NaiveDate>, TradesimError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| TradesimError::ConfigInvalid {
                section: section.to_string(),
                key: key.to_string(),
                reason: format!("invalid {key} format, expected YYYY-MM-DD"),
            }),
    }
}

/// A present boolean must parse; the port falls back to the default otherwise.
fn validate_bool(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), TradesimError> {
    if !config.has_key(section, key) {
        return Ok(());
    }
    if config.get_bool(section, key, true) != config.get_bool(section, key, false) {
        return Err(TradesimError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: "expected true/false".to_string(),
        });
    }
    Ok(())
}

/// Read a float that must parse if present.
fn read_double(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<f64>, TradesimError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| TradesimError::ConfigInvalid {
                section: section.to_string(),
                key: key.to_string(),
                reason: format!("'{raw}' is not a number"),
            }),
    }
}

fn validate_fee_rate(config: &dyn ConfigPort, section: &str) -> Result<(), TradesimError> {
    match read_double(config, section, "fee_rate")? {
        Some(value) if !(0.0..1.0).contains(&value) => Err(TradesimError::ConfigInvalid {
            section: section.to_string(),
            key: "fee_rate".to_string(),
            reason: "fee_rate must be in [0, 1)".to_string(),
        }),
        _ => Ok(()),
    }
}

fn validate_positive(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<(), TradesimError> {
    match read_double(config, section, key)? {
        Some(value) if !value.is_finite() || value <= 0.0 => Err(TradesimError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: format!("{key} must be positive"),
        }),
        _ => Ok(()),
    }
}
