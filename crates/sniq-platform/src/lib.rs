//! sniqueue platform layer
//!
//! Moves packets between the kernel and the classifier.
//!
//! ## Supported Platforms
//!
//! - **Linux**: NFQUEUE via the `nfq` crate
//! - Anything else: callers report [`PlatformError::Unsupported`]

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
pub use error::{PlatformError, Result};

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(target_os = "linux")]
pub use linux::NfQueue;

// Platform-agnostic traits
mod traits;
pub use traits::{PacketQueue, QueueOptions, QueuedPacket};
