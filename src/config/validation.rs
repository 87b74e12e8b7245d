//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Validation errors for configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("site.name is required")]
    MissingSiteName,
    #[error("editing.flush_interval_ms must be greater than zero")]
    ZeroFlushInterval,
    #[error("logging.filter is not a valid filter directive: {0}")]
    InvalidLogFilter(String),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.site.name.trim().is_empty() {
        errors.push(ValidationError::MissingSiteName);
    }

    if config.editing.flush_interval_ms == 0 {
        errors.push(ValidationError::ZeroFlushInterval);
    }

    if let Err(e) = EnvFilter::try_new(&config.logging.filter) {
        errors.push(ValidationError::InvalidLogFilter(e.to_string()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
