//! Configuration validation.
//!
//! Checks every recognised key before a store is opened.

use crate::domain::error::StockCardError;
use crate::ports::config_port::ConfigPort;

pub const MAX_POOL_SIZE: i64 = 64;

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), StockCardError> {
    validate_sqlite_path(config)?;
    validate_pool_size(config)?;
    validate_output_dir(config)?;
    validate_allow_negative(config)?;
    Ok(())
}

fn validate_sqlite_path(config: &dyn ConfigPort) -> Result<(), StockCardError> {
    match config.get_string("sqlite", "path") {
        None => Err(StockCardError::ConfigMissing {
            section: "sqlite".to_string(),
            key: "path".to_string(),
        }),
        Some(p) if p.trim().is_empty() => Err(StockCardError::ConfigInvalid {
            section: "sqlite".to_string(),
            key: "path".to_string(),
            reason: "path must not be empty".to_string(),
        }),
        Some(_) => Ok(()),
    }
}

fn validate_pool_size(config: &dyn ConfigPort) -> Result<(), StockCardError> {
    if let Some(raw) = config.get_string("sqlite", "pool_size") {
        let valid = raw
            .trim()
            .parse::<i64>()
            .is_ok_and(|n| (1..=MAX_POOL_SIZE).contains(&n));
        if !valid {
            return Err(StockCardError::ConfigInvalid {
                section: "sqlite".to_string(),
                key: "pool_size".to_string(),
                reason: format!("pool_size must be between 1 and {MAX_POOL_SIZE}"),
            });
        }
    }
    Ok(())
}

fn validate_output_dir(config: &dyn ConfigPort) -> Result<(), StockCardError> {
    if let Some(dir) = config.get_string("export", "output_dir") {
        if dir.trim().is_empty() {
            return Err(StockCardError::ConfigInvalid {
                section: "export".to_string(),
                key: "output_dir".to_string(),
                reason: "output_dir must not be empty".to_string(),
            });
        }
    }
    Ok(())
}

fn validate_allow_negative(config: &dyn ConfigPort) -> Result<(), StockCardError> {
    if let Some(raw) = config.get_string("ledger", "allow_negative_balance") {
        let known = matches!(
            raw.trim().to_lowercase().as_str(),
            "true" | "yes" | "1" | "false" | "no" | "0"
        );
        if !known {
            return Err(StockCardError::ConfigInvalid {
                section: "ledger".to_string(),
                key: "allow_negative_balance".to_string(),
                reason: format!("expected a boolean, got {raw:?}"),
            });
        }
    }
    Ok(())
}
