//! Driver-side error taxonomy.
//!
//! Every failure a driver operation can report, each with a stable numeric
//! code for callers that record or forward errors out-of-process. Some
//! classic driver failure modes have no variant here: operating on an
//! uncreated session cannot happen (a [`crate::Driver`] is always
//! created), allocation failure aborts, and a broken driver invariant is
//! a panic rather than an error value.

use thiserror::Error;

/// Result type alias used across the driver crate.
pub type Result<T> = std::result::Result<T, DriverError>;

/// Unified error type for driver operations.
#[derive(Debug, Clone, Error)]
pub enum DriverError {
    /// A caller-supplied argument is out of domain, or names a register
    /// access the device would never accept.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The operation requires a connected session.
    #[error("driver is not connected")]
    NotConnected,

    /// `connect` was called on a session that is already connected.
    #[error("driver is already connected")]
    AlreadyConnected,

    /// TCP connect or the ACK handshake failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// A send or receive failed with an OS error other than a timeout.
    #[error("communication failed: {0}")]
    CommunicationFailed(String),

    /// A send or receive exceeded the configured timeout.
    #[error("timed out waiting for the device")]
    Timeout,

    /// The response could not be parsed, or was structurally valid but did
    /// not correspond to the request.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The device answered with a fault frame, or write verification found
    /// a mismatch.
    #[error("device error: {0}")]
    Device(String),
}

impl DriverError {
    /// Stable numeric code for this error kind.
    pub fn code(&self) -> u8 {
        match self {
            DriverError::InvalidParameter(_) => 1,
            DriverError::NotConnected => 2,
            DriverError::AlreadyConnected => 3,
            DriverError::ConnectionFailed(_) => 4,
            DriverError::CommunicationFailed(_) => 5,
            DriverError::Timeout => 6,
            DriverError::Protocol(_) => 7,
            DriverError::Device(_) => 8,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let errors = [
            DriverError::InvalidParameter(String::new()),
            DriverError::NotConnected,
            DriverError::AlreadyConnected,
            DriverError::ConnectionFailed(String::new()),
            DriverError::CommunicationFailed(String::new()),
            DriverError::Timeout,
            DriverError::Protocol(String::new()),
            DriverError::Device(String::new()),
        ];
        let mut codes: Vec<u8> = errors.iter().map(DriverError::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn messages_name_the_failure() {
        let error = DriverError::Device("write verification failed".into());
        assert!(error.to_string().contains("device error"));
        assert!(error.to_string().contains("verification"));
    }
}
