//! Error types reported by positioning services

use thiserror::Error;

/// Failure reported by a [`PositionService`](crate::PositionService)
///
/// Variants carry the standard geolocation error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PositionError {
    /// The user or the platform refused access to the device position.
    #[error("permission to read the device position was denied")]
    PermissionDenied,

    /// No position source could produce a fix.
    #[error("device position is unavailable")]
    PositionUnavailable,

    /// No fix arrived within the service's own timeout.
    #[error("timed out waiting for a position fix")]
    Timeout,
}

impl PositionError {
    /// Numeric geolocation error code
    pub fn code(&self) -> u16 {
        match self {
            PositionError::PermissionDenied => 1,
            PositionError::PositionUnavailable => 2,
            PositionError::Timeout => 3,
        }
    }

    /// Map a numeric geolocation error code back to an error
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            1 => Some(PositionError::PermissionDenied),
            2 => Some(PositionError::PositionUnavailable),
            3 => Some(PositionError::Timeout),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_error_codes() {
        for error in [
            PositionError::PermissionDenied,
            PositionError::PositionUnavailable,
            PositionError::Timeout,
        ] {
            assert_eq!(PositionError::from_code(error.code()), Some(error));
        }
        assert_eq!(PositionError::from_code(0), None);
        assert_eq!(PositionError::from_code(4), None);
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            PositionError::Timeout.to_string(),
            "timed out waiting for a position fix"
        );
    }
}
