//! Strongly-typed identifiers.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Five hyphen-separated groups of word characters (UUID-shaped).
static KERNEL_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\w+-\w+-\w+-\w+-\w+$").expect("invalid kernel id regex"));

/// Opaque kernel identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KernelId(String);

impl KernelId {
    /// Wrap an identifier as-is.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh UUID v4 identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Parse an identifier taken from a URL path segment.
    ///
    /// Returns `None` unless the segment is UUID-shaped; routes treat that as
    /// "no such resource".
    pub fn from_path(segment: &str) -> Option<Self> {
        Self::is_routable(segment).then(|| Self(segment.to_string()))
    }

    /// Whether `candidate` matches the kernel id route pattern.
    pub fn is_routable(candidate: &str) -> bool {
        KERNEL_ID_PATTERN.is_match(candidate)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KernelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for KernelId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for KernelId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Session identifier scoping messages on a channel connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a random session id, as a manager default.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
