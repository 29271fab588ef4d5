//! Connectivity probe for parkmark.
//!
//! A single synchronous check used as a gate before talking to the remote
//! document store. No retries, no change listening.

use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::debug;

use crate::config::ConnectivityConfig;

/// Boolean network-availability probe.
#[derive(Debug, Clone)]
pub struct ConnectivityProbe {
    addr: String,
    timeout: Duration,
}

impl ConnectivityProbe {
    /// Create a probe from its configuration section.
    #[must_use]
    pub fn new(config: &ConnectivityConfig) -> Self {
        Self {
            addr: config.probe_addr.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    /// Create a probe for an explicit address and timeout.
    #[must_use]
    pub fn with_addr(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }

    /// Check whether the network looks reachable.
    ///
    /// Attempts one TCP connection to the probe address within the timeout.
    /// Resolution or connection failure both mean offline.
    #[must_use]
    pub fn is_online(&self) -> bool {
        let Ok(addrs) = self.addr.to_socket_addrs() else {
            debug!("Probe address {} did not resolve", self.addr);
            return false;
        };

        for addr in addrs {
            if TcpStream::connect_timeout(&addr, self.timeout).is_ok() {
                return true;
            }
        }
        debug!("Probe to {} failed", self.addr);
        false
    }
}
