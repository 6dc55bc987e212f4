//! Unified error handling for the backtrack core.
//!
//! Sensor and permission failures are surfaced as *state* by the tracker and
//! heading provider; they only become a [`BacktrackError`] when a caller asks
//! for a `Result`. Corrupt persisted data is never returned as an error: the
//! stores log it and start empty.

use thiserror::Error;

/// Unified error type for backtrack operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BacktrackError {
    /// The device or platform has no such sensor
    #[error("Sensor not supported by this device: {sensor}")]
    SensorUnsupported { sensor: String },
    /// The user (or platform policy) refused access to a sensor
    #[error("Permission denied for {sensor}")]
    PermissionDenied { sensor: String },
    /// The location feed could not produce a fix
    #[error("Position unavailable")]
    PositionUnavailable,
    /// The location feed did not produce a fix within its timeout
    #[error("Timed out waiting for a position fix")]
    Timeout,
    /// Stored data for a key could not be decoded
    #[error("Persisted data for '{key}' is corrupt: {message}")]
    PersistenceCorrupt { key: String, message: String },
    /// The blob store failed to read, write or delete
    #[error("Storage error: {message}")]
    Storage { message: String },
    /// A value could not be encoded or decoded
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl BacktrackError {
    /// True for errors the session keeps running through.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, BacktrackError::Storage { .. })
    }
}

impl From<std::io::Error> for BacktrackError {
    fn from(err: std::io::Error) -> Self {
        BacktrackError::Storage {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for BacktrackError {
    fn from(err: serde_json::Error) -> Self {
        BacktrackError::Serialization {
            message: err.to_string(),
        }
    }
}

/// Result type alias for backtrack operations.
pub type Result<T> = std::result::Result<T, BacktrackError>;

/// Extension trait for converting Option to BacktrackError.
pub trait OptionExt<T> {
    /// Convert Option to Result with a position-unavailable error.
    fn ok_or_position_unavailable(self) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_position_unavailable(self) -> Result<T> {
        self.ok_or(BacktrackError::PositionUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BacktrackError::PersistenceCorrupt {
            key: "backtrack_path".to_string(),
            message: "expected value".to_string(),
        };
        assert!(err.to_string().contains("backtrack_path"));
        assert!(err.to_string().contains("expected value"));

        let err = BacktrackError::PermissionDenied {
            sensor: "compass".to_string(),
        };
        assert_eq!(err.to_string(), "Permission denied for compass");
    }

    #[test]
    fn test_option_ext() {
        let none: Option<i32> = None;
        assert_eq!(
            none.ok_or_position_unavailable(),
            Err(BacktrackError::PositionUnavailable)
        );
        assert_eq!(Some(3).ok_or_position_unavailable(), Ok(3));
    }

    #[test]
    fn test_io_error_is_storage() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err: BacktrackError = io.into();
        assert!(matches!(err, BacktrackError::Storage { .. }));
        assert!(!err.is_recoverable());
        assert!(BacktrackError::Timeout.is_recoverable());
    }
}
