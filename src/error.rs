//! Error types for roomrelay.

use thiserror::Error;

/// Common error type for roomrelay.
#[derive(Error, Debug)]
pub enum RelayError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Validation error for configuration values or user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// The hub task has stopped and no longer accepts commands.
    #[error("hub is no longer running")]
    HubClosed,
}

/// Result type alias for roomrelay operations.
pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = RelayError::Config("missing [server] table".to_string());
        assert_eq!(err.to_string(), "configuration error: missing [server] table");
    }

    #[test]
    fn test_validation_error_display() {
        let err = RelayError::Validation("queue_capacity must be positive".to_string());
        assert_eq!(
            err.to_string(),
            "validation error: queue_capacity must be positive"
        );
    }

    #[test]
    fn test_hub_closed_display() {
        assert_eq!(RelayError::HubClosed.to_string(), "hub is no longer running");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::AddrInUse, "port taken");
        let err: RelayError = io_err.into();
        assert!(matches!(err, RelayError::Io(_)));
        assert!(err.to_string().contains("port taken"));
    }

    #[test]
    fn test_result_alias() {
        fn sample_ok() -> Result<u16> {
            Ok(8080)
        }

        fn sample_err() -> Result<u16> {
            Err(RelayError::HubClosed)
        }

        assert_eq!(sample_ok().unwrap(), 8080);
        assert!(sample_err().is_err());
    }
}
