//! Errors reported while loading `kiln.toml`.

use std::path::PathBuf;

/// Errors that can occur when loading or validating a `kiln.toml` configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    IoError {
        /// Path of the `kiln.toml` that was read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("malformed kiln.toml: {0}")]
    ParseError(String),

    /// A required field is missing from the configuration.
    #[error("kiln.toml is missing required field `{0}`")]
    MissingField(String),

    /// A configuration value failed validation.
    #[error("invalid kiln.toml: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_missing_field() {
        let err = ConfigError::MissingField("device.name".to_string());
        assert_eq!(
            format!("{err}"),
            "kiln.toml is missing required field `device.name`"
        );
    }

    #[test]
    fn display_validation_error() {
        let err = ConfigError::ValidationError("compiler.command must not be empty".to_string());
        assert_eq!(
            format!("{err}"),
            "invalid kiln.toml: compiler.command must not be empty"
        );
    }

    #[test]
    fn display_io_error_names_the_file() {
        let err = ConfigError::IoError {
            path: PathBuf::from("/work/kernels/kiln.toml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        let display = format!("{err}");
        assert!(display.starts_with("failed to read /work/kernels/kiln.toml:"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
