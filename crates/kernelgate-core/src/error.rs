//! Error types for kernelgate core.

use std::path::PathBuf;
use thiserror::Error;

/// Core result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for kernelgate core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Kernel error: {0}")]
    Kernel(#[from] KernelError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON5 parse error: {0}")]
    Json5(String),
}

/// Kernel operation errors reported by a kernel manager.
///
/// Every variant carries a human-readable detail string. The HTTP status a
/// variant maps to is given by [`KernelError::status_code`]; handlers decide
/// which variants they translate for a given operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KernelError {
    /// The referenced kernel does not exist.
    #[error("{0}")]
    NotFound(String),

    /// A kernel with the same identity already exists.
    #[error("{0}")]
    AlreadyExists(String),

    /// A resource or kernel-count limit was reached.
    #[error("{0}")]
    QuotaExceeded(String),

    /// The kernel process failed to start.
    #[error("{0}")]
    CreationFailed(String),

    /// Listing or fetching kernel state failed.
    #[error("{0}")]
    RetrieveFailed(String),

    /// The request was malformed or failed schema validation.
    #[error("{0}")]
    ValidationFailed(String),

    /// Opening or relaying the kernel's channels failed.
    #[error("{0}")]
    ChannelFailed(String),
}

impl KernelError {
    /// Canonical HTTP status code for this kind.
    ///
    /// `ValidationFailed` maps to 422 here; ad-hoc body parsing callers
    /// answer 400 instead.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::AlreadyExists(_) => 409,
            Self::QuotaExceeded(_) => 403,
            Self::ValidationFailed(_) => 422,
            Self::CreationFailed(_) | Self::RetrieveFailed(_) | Self::ChannelFailed(_) => 500,
        }
    }

    /// Short name of the kind, used when an error is surfaced over a socket.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "KernelNotFound",
            Self::AlreadyExists(_) => "KernelExists",
            Self::QuotaExceeded(_) => "KernelResourceQuotaExceeded",
            Self::CreationFailed(_) => "KernelCreation",
            Self::RetrieveFailed(_) => "KernelRetrieve",
            Self::ValidationFailed(_) => "Validation",
            Self::ChannelFailed(_) => "KernelChannel",
        }
    }

    /// The detail string carried by the error.
    pub fn detail(&self) -> &str {
        match self {
            Self::NotFound(s)
            | Self::AlreadyExists(s)
            | Self::QuotaExceeded(s)
            | Self::CreationFailed(s)
            | Self::RetrieveFailed(s)
            | Self::ValidationFailed(s)
            | Self::ChannelFailed(s) => s,
        }
    }
}
