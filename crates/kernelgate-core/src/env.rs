//! Environment variable handling.

use std::env;

/// Get an environment variable, returning None if not set or empty.
pub fn get_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable as a u16 (e.g., for ports).
pub fn get_u16(name: &str) -> Option<u16> {
    get_var(name).and_then(|v| v.parse().ok())
}

/// Environment variable names read by kernelgate.
pub mod vars {
    /// Base directory override.
    pub const KERNELGATE_HOME: &str = "KERNELGATE_HOME";

    /// Config file override.
    pub const KERNELGATE_CONFIG: &str = "KERNELGATE_CONFIG";

    /// Listen port override.
    pub const KERNELGATE_PORT: &str = "KERNELGATE_PORT";

    /// API token override.
    pub const KERNELGATE_AUTH_TOKEN: &str = "KERNELGATE_AUTH_TOKEN";
}
