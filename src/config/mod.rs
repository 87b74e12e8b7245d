//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Config struct definitions and loading (Config, SiteConfig, EditingConfig, LoggingConfig)
//! - [`defaults`]: serde default functions
//! - [`validation`]: startup validation

mod defaults;
mod types;
pub mod validation;

pub use types::{Config, ConfigError, EditingConfig, LogFormat, LoggingConfig, SiteConfig};
pub use validation::ValidationError;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.site.name, "DealPort.co");
        assert_eq!(config.editing.flush_interval_ms, 500);
        assert!(config.editing.flush_immediate);
        assert_eq!(config.logging.filter, "info");
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn parses_every_section() {
        let config = Config::from_toml_str(
            r#"
            [site]
            name = "Example"

            [editing]
            flush_interval_ms = 250
            flush_immediate = false

            [logging]
            filter = "dealport=debug"
            format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.site.name, "Example");
        assert_eq!(config.editing.flush_interval().as_millis(), 250);
        assert!(!config.editing.flush_immediate);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn validation_collects_all_errors() {
        let err = Config::from_toml_str(
            r#"
            [site]
            name = "  "
            [editing]
            flush_interval_ms = 0
            "#,
        )
        .unwrap_err();
        match err {
            ConfigError::Invalid(errors) => {
                assert_eq!(
                    errors,
                    vec![ValidationError::MissingSiteName, ValidationError::ZeroFlushInterval]
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = Config::from_toml_str("[site\nname=").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[site]\nname = \"From File\"").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.site.name, "From File");

        let missing = Config::load(file.path().with_extension("missing"));
        assert!(matches!(missing, Err(ConfigError::Io(_))));
    }
}
