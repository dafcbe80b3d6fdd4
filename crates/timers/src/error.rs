//! Error types for the timers crate.

use thiserror::Error;

/// Errors that can occur when importing timers or loading configuration.
#[derive(Debug, Error)]
pub enum TimersError {
    /// The wire tree is not valid JSON or does not match the record layout
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A wire record is well-formed but holds an impossible value
    #[error("Invalid timer '{name}': {reason}")]
    InvalidTimer { name: String, reason: String },

    /// Configuration failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for timers operations.
pub type TimersResult<T> = Result<T, TimersError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TimersError::InvalidTimer {
            name: "db".to_string(),
            reason: "duration -1 is negative".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid timer 'db': duration -1 is negative");

        let err = TimersError::InvalidConfig("header name is empty".to_string());
        assert_eq!(err.to_string(), "Invalid configuration: header name is empty");
    }

    #[test]
    fn test_serialization_error_conversion() {
        let json_err: Result<(), serde_json::Error> = serde_json::from_str::<()>("invalid json");
        let err: TimersError = json_err.unwrap_err().into();
        assert!(matches!(err, TimersError::Serialization(_)));
    }
}
