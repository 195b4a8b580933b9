//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::{KilnConfig, OUTPUT_PLACEHOLDER};
use std::path::Path;

/// Name of the configuration file inside a project directory.
pub const CONFIG_FILE: &str = "kiln.toml";

/// Loads and validates a `kiln.toml` configuration from a project directory.
///
/// Reads `<project_dir>/kiln.toml`, parses it, and validates required fields.
pub fn load_config(project_dir: &Path) -> Result<KilnConfig, ConfigError> {
    let config_path = project_dir.join(CONFIG_FILE);
    let content = std::fs::read_to_string(&config_path).map_err(|source| ConfigError::IoError {
        path: config_path.clone(),
        source,
    })?;
    load_config_from_str(&content)
}

/// Parses and validates a `kiln.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<KilnConfig, ConfigError> {
    let config: KilnConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that required fields are present and configuration values are consistent.
fn validate_config(config: &KilnConfig) -> Result<(), ConfigError> {
    if config.device.name.is_empty() {
        return Err(ConfigError::MissingField("device.name".to_string()));
    }
    if config.cache.dir.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "cache.dir must not be empty".to_string(),
        ));
    }
    if let Some(compiler) = &config.compiler {
        if compiler.command.is_empty() {
            return Err(ConfigError::ValidationError(
                "compiler.command must not be empty".to_string(),
            ));
        }
        if !compiler.command.iter().any(|arg| arg.contains(OUTPUT_PLACEHOLDER)) {
            return Err(ConfigError::ValidationError(format!(
                "compiler.command must contain {OUTPUT_PLACEHOLDER}"
            )));
        }
    }
    Ok(())
}
