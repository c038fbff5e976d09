//! Local link detection.
//!
//! The link is considered up when the OS can route towards a public address.
//! Connecting an unbound UDP socket only performs the route lookup; no
//! packet leaves the host.

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::net::SocketAddr;

use super::ProbeError;

/// Source of the local link up/down signal.
pub trait LinkSignal: Send + Sync {
    fn link_up(&self) -> bool;
}

/// Link signal backed by an OS route lookup.
#[derive(Debug, Clone)]
pub struct RouteLinkSignal {
    target: SocketAddr,
}

impl RouteLinkSignal {
    pub fn new(target: &str) -> Result<Self, ProbeError> {
        let target = target
            .parse()
            .map_err(|e| ProbeError::Config(format!("invalid link check address {}: {}", target, e)))?;
        Ok(Self { target })
    }
}

impl LinkSignal for RouteLinkSignal {
    fn link_up(&self) -> bool {
        let domain = if self.target.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };

        let socket = match Socket::new(domain, Type::DGRAM, Some(Protocol::UDP)) {
            Ok(s) => s,
            Err(e) => {
                // Can't tell; let the probe decide
                tracing::warn!("Link check: failed to create socket: {}", e);
                return true;
            }
        };

        match socket.connect(&SockAddr::from(self.target)) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!("Link check: no route to {}: {}", self.target, e);
                false
            }
        }
    }
}

/// Link signal with a fixed, switchable value.
#[cfg(test)]
pub struct StaticLink(pub std::sync::atomic::AtomicBool);

#[cfg(test)]
impl StaticLink {
    pub fn new(up: bool) -> Self {
        Self(std::sync::atomic::AtomicBool::new(up))
    }

    pub fn set(&self, up: bool) {
        self.0.store(up, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
impl LinkSignal for StaticLink {
    fn link_up(&self) -> bool {
        self.0.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_address() {
        assert!(RouteLinkSignal::new("not an address").is_err());
        assert!(RouteLinkSignal::new("1.1.1.1:53").is_ok());
    }

    #[test]
    fn test_loopback_route_exists() {
        let link = RouteLinkSignal::new("127.0.0.1:9").unwrap();
        assert!(link.link_up());
    }
}
