//! Core types for kernelgate.

mod channel;
mod identifiers;
mod kernel;

pub use channel::*;
pub use identifiers::*;
pub use kernel::*;
