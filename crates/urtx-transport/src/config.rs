//! Connection settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for the TCP links.
///
/// The defaults match a single console talking to a single robot: one
/// pending connection at most, a short connect timeout, and Nagle off so
/// small control packages go out immediately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Listen backlog for the server side.
    pub backlog: u32,

    /// Upper bound on an active connect.
    pub connect_timeout: Duration,

    /// Sets `TCP_NODELAY` on established streams.
    pub nodelay: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            backlog: 1,
            connect_timeout: Duration::from_secs(5),
            nodelay: true,
        }
    }
}
