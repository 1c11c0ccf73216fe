//! Platform-specific errors

use std::io;
use thiserror::Error;

/// Platform-specific errors
#[derive(Error, Debug)]
pub enum PlatformError {
    /// Netlink socket for the queue could not be opened
    #[error("Failed to open netfilter queue socket: {0}")]
    QueueOpen(#[source] io::Error),

    /// Binding or configuring a queue number failed
    #[error("Failed to bind queue {number}: {source}")]
    QueueBind {
        /// Queue number
        number: u16,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Receiving from the queue failed
    #[error("Receive error on queue {number}: {source}")]
    Recv {
        /// Queue number
        number: u16,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Sending a verdict failed
    #[error("Verdict error on queue {number}: {source}")]
    Verdict {
        /// Queue number
        number: u16,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Packet queues are not available on this platform
    #[error("Unsupported platform: {0}")]
    Unsupported(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl PlatformError {
    /// Whether the failure came from missing privileges
    pub fn is_permission_denied(&self) -> bool {
        let source = match self {
            Self::QueueOpen(e) | Self::Io(e) => e,
            Self::QueueBind { source, .. }
            | Self::Recv { source, .. }
            | Self::Verdict { source, .. } => source,
            Self::Unsupported(_) => return false,
        };
        source.kind() == io::ErrorKind::PermissionDenied
    }
}

/// Platform result type
pub type Result<T> = std::result::Result<T, PlatformError>;
