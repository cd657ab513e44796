//! Server error types.

use thiserror::Error;

/// Errors that end a server's lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The configured address cannot be bound to.
    #[error("invalid address '{address}': {reason}")]
    InvalidAddress {
        /// The offending `address:port` string.
        address: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Binding the listening socket failed.
    #[error("failed to bind to {address}: {source}")]
    Bind {
        /// The `address:port` string.
        address: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The accept loop hit an unrecoverable error.
    #[error("listener failed: {0}")]
    Listen(#[source] std::io::Error),

    /// The drain deadline passed with connections still open.
    #[error("shutdown deadline exceeded with {active} connection(s) still active")]
    ShutdownTimeout {
        /// Connections that were forcibly closed.
        active: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::io;

    #[test]
    fn test_display() {
        let err = ServerError::ShutdownTimeout { active: 2 };
        assert_eq!(
            err.to_string(),
            "shutdown deadline exceeded with 2 connection(s) still active"
        );

        let err = ServerError::InvalidAddress {
            address: ":8080".to_string(),
            reason: "empty host".to_string(),
        };
        assert_eq!(err.to_string(), "invalid address ':8080': empty host");
    }

    #[test]
    fn test_bind_keeps_source() {
        let err = ServerError::Bind {
            address: "127.0.0.1:80".to_string(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
        };
        assert!(err.to_string().starts_with("failed to bind to 127.0.0.1:80"));
        assert!(err.source().is_some());
    }
}
