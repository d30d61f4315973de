//! # kernelgate-core
//!
//! Core types, configuration, and the kernel manager contract for kernelgate.
//!
//! - **Configuration**: loading, validation and persistence of the config file
//! - **Types**: kernel identifiers, records, creation payloads and channel frames
//! - **Manager**: the [`KernelManager`] trait the gateway drives, plus an
//!   in-process [`LocalKernelManager`]

pub mod config;
pub mod env;
pub mod error;
pub mod local;
pub mod manager;
pub mod paths;
pub mod secret;
pub mod types;

// Re-exports for convenience
pub use config::Config;
pub use error::{ConfigError, Error, KernelError, Result};
pub use local::LocalKernelManager;
pub use manager::{KernelChannels, KernelManager, KernelResult};
pub use secret::SecretString;
pub use types::*;
