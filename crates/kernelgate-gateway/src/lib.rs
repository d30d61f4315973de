//! HTTP and WebSocket gateway for remote compute kernels.
//!
//! This crate provides:
//! - REST endpoints to create, list, inspect and remove kernels
//! - A WebSocket bridge to each kernel's message channels
//! - Token authentication, CORS and request tracing layers

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{ApiError, GatewayError, WsErrorPayload};
pub use server::{Gateway, GatewayState};
pub use session::{ChannelSession, SessionState};

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
