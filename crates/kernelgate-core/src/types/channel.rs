//! Kernel channel types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of a kernel's logical message streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    /// Requests and replies.
    Shell,
    /// Broadcast outputs and status.
    #[serde(rename = "iopub")]
    IoPub,
    /// Input requests from the kernel.
    Stdin,
    /// Interrupt and shutdown requests.
    Control,
    /// Liveness pings.
    #[serde(rename = "hb")]
    Heartbeat,
}

impl ChannelKind {
    /// Every channel a standard kernel exposes.
    pub fn all() -> &'static [ChannelKind] {
        &[
            Self::Shell,
            Self::IoPub,
            Self::Stdin,
            Self::Control,
            Self::Heartbeat,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Shell => "shell",
            Self::IoPub => "iopub",
            Self::Stdin => "stdin",
            Self::Control => "control",
            Self::Heartbeat => "hb",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An opaque frame relayed between a client socket and a kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelFrame {
    Text(String),
    Binary(Vec<u8>),
}

impl ChannelFrame {
    pub fn len(&self) -> usize {
        match self {
            Self::Text(s) => s.len(),
            Self::Binary(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
