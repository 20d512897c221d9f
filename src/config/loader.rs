//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<GatewayConfig, ConfigError> {
    let config: GatewayConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogFormat;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config, GatewayConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = parse_config(
            r#"
            [upstream]
            address = "127.0.0.1:3000"

            [normalizer]
            max_cache_size = 512

            [observability]
            log_format = "json"
            metrics_enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(config.upstream.address.as_deref(), Some("127.0.0.1:3000"));
        assert_eq!(config.normalizer.max_cache_size, 512);
        assert_eq!(config.normalizer.promotion_threshold, 2);
        assert_eq!(config.normalizer.max_trie_nodes, Some(100_000));
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert!(!config.observability.metrics_enabled);
    }

    #[test]
    fn test_parse_error() {
        let err = parse_config("[normalizer]\nmax_cache_size = \"lots\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validation_error_message() {
        let err = parse_config("[normalizer]\nmax_cache_size = 0\npromotion_threshold = 0")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation failed: normalizer.max_cache_size must be greater than zero, \
             normalizer.promotion_threshold must be greater than zero"
        );
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!(
            "route_shaper_config_{}.toml",
            std::process::id()
        ));
        fs::write(&path, "[listener]\nbind_address = \"127.0.0.1:18080\"\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:18080");

        std::fs::remove_file(&path).unwrap_or_default();
        assert!(matches!(load_config(&path), Err(ConfigError::Io(_))));
    }
}
