//! Error types for framing and transactions.

use std::io;
use thiserror::Error;

/// Result type alias for link operations.
pub type Result<T> = std::result::Result<T, LinkError>;

/// Errors that can occur while framing or exchanging messages.
#[derive(Debug, Error)]
pub enum LinkError {
    /// Not enough bytes arrived within the receive budget.
    #[error("Communication timeout")]
    Timeout,

    /// The transaction was cancelled by the caller.
    #[error("Transaction cancelled")]
    Cancelled,

    /// The connection lock could not be acquired in time.
    #[error("Connection busy: transaction lock not acquired in time")]
    LockTimeout,

    /// The peer closed the stream.
    ///
    /// `received` counts the bytes of the current frame read before the close;
    /// zero means the peer closed cleanly between frames.
    #[error("Connection closed by peer after {received} bytes of frame")]
    ConnectionClosed {
        /// Frame bytes read before the close.
        received: usize,
    },

    /// The header failed signature or token validation.
    #[error("Invalid header: {reason}")]
    InvalidHeader {
        /// Description of the mismatch.
        reason: String,
    },

    /// The declared body length is negative, oversized or otherwise inconsistent.
    #[error("Invalid body length: {reason}")]
    BodyLength {
        /// Description of the length problem.
        reason: String,
    },

    /// The header carries a value the protocol rules do not cover.
    #[error("Unrecognized header: {reason}")]
    UnrecognizedHeader {
        /// Description of the unexpected value.
        reason: String,
    },

    /// More header bytes are required before the length can be computed.
    #[error("Incomplete header: {needed} more bytes required")]
    Incomplete {
        /// Number of additional bytes required.
        needed: usize,
    },

    /// The response does not belong to the outstanding request.
    #[error("Correlation mismatch: expected {expected}, received {received}")]
    Correlation {
        /// Identity embedded in the request.
        expected: u32,
        /// Identity found in the response header.
        received: u32,
    },

    /// The access policy refused the transaction.
    #[error("Access denied: {reason}")]
    AccessDenied {
        /// Reason reported by the policy.
        reason: String,
    },

    /// I/O error propagated from the transport.
    #[error("Transport error: {0}")]
    Transport(#[from] io::Error),

    /// The background worker running a blocking transaction failed.
    #[error("Worker failed: {reason}")]
    Worker {
        /// Description of the failure.
        reason: String,
    },
}

impl LinkError {
    /// Creates a new `InvalidHeader` error.
    ///
    /// # Example
    ///
    /// ```
    /// use plc_link::LinkError;
    ///
    /// let err = LinkError::invalid_header("missing FINS signature");
    /// ```
    pub fn invalid_header(reason: impl Into<String>) -> Self {
        Self::InvalidHeader {
            reason: reason.into(),
        }
    }

    /// Creates a new `BodyLength` error.
    pub fn body_length(reason: impl Into<String>) -> Self {
        Self::BodyLength {
            reason: reason.into(),
        }
    }

    /// Creates a new `UnrecognizedHeader` error.
    pub fn unrecognized(reason: impl Into<String>) -> Self {
        Self::UnrecognizedHeader {
            reason: reason.into(),
        }
    }

    /// Creates a new `Correlation` error.
    ///
    /// # Example
    ///
    /// ```
    /// use plc_link::LinkError;
    ///
    /// let err = LinkError::correlation(7, 8);
    /// assert_eq!(err.to_string(), "Correlation mismatch: expected 7, received 8");
    /// ```
    pub fn correlation(expected: u32, received: u32) -> Self {
        Self::Correlation { expected, received }
    }

    /// Creates a new `AccessDenied` error.
    pub fn access_denied(reason: impl Into<String>) -> Self {
        Self::AccessDenied {
            reason: reason.into(),
        }
    }

    /// Translates a transport I/O error into the link taxonomy.
    ///
    /// Timeouts become [`LinkError::Timeout`], unexpected EOF becomes
    /// [`LinkError::ConnectionClosed`] with `received` frame bytes, and
    /// everything else is kept verbatim.
    pub fn from_io(err: io::Error, received: usize) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Self::Timeout,
            io::ErrorKind::UnexpectedEof => Self::ConnectionClosed { received },
            _ => Self::Transport(err),
        }
    }

    /// Returns whether the connection may be out of sync with the device.
    ///
    /// The lifecycle layer should reset the transport before reusing it when
    /// this returns `true`.
    pub fn is_connection_suspect(&self) -> bool {
        matches!(
            self,
            Self::Timeout
                | Self::Cancelled
                | Self::ConnectionClosed { .. }
                | Self::InvalidHeader { .. }
                | Self::BodyLength { .. }
                | Self::UnrecognizedHeader { .. }
                | Self::Correlation { .. }
                | Self::Transport(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display() {
        assert_eq!(LinkError::Timeout.to_string(), "Communication timeout");
    }

    #[test]
    fn test_connection_closed_display() {
        let err = LinkError::ConnectionClosed { received: 3 };
        assert_eq!(
            err.to_string(),
            "Connection closed by peer after 3 bytes of frame"
        );
    }

    #[test]
    fn test_from_io_translation() {
        let err = LinkError::from_io(io::Error::from(io::ErrorKind::TimedOut), 0);
        assert!(matches!(err, LinkError::Timeout));

        let err = LinkError::from_io(io::Error::from(io::ErrorKind::WouldBlock), 0);
        assert!(matches!(err, LinkError::Timeout));

        let err = LinkError::from_io(io::Error::from(io::ErrorKind::UnexpectedEof), 5);
        assert!(matches!(err, LinkError::ConnectionClosed { received: 5 }));

        let err = LinkError::from_io(io::Error::from(io::ErrorKind::ConnectionReset), 0);
        assert!(matches!(err, LinkError::Transport(_)));
    }

    #[test]
    fn test_connection_suspect() {
        assert!(LinkError::Timeout.is_connection_suspect());
        assert!(LinkError::correlation(1, 2).is_connection_suspect());
        assert!(!LinkError::LockTimeout.is_connection_suspect());
        assert!(!LinkError::access_denied("read-only").is_connection_suspect());
    }
}
