//! Node domain model
//!
//! A node is a peer of the execution network, identified by its peer id and
//! reachable at a multiaddr such as `/ip4/127.0.0.1/tcp/4310/ws/p2p/<peer id>`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while interpreting a node address
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("multiaddr '{0}' has no host component (ip4, ip6, dns, dns4 or dns6)")]
    MissingHost(String),

    #[error("multiaddr '{0}' has no tcp port")]
    MissingPort(String),

    #[error("multiaddr '{addr}' has an invalid tcp port '{port}'")]
    InvalidPort { addr: String, port: String },

    #[error("multiaddr '{addr}' has a dangling '{protocol}' component")]
    Truncated { addr: String, protocol: String },
}

/// An addressable peer in the execution network
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Node {
    pub peer_id: String,
    pub multiaddr: String,
}

impl Node {
    pub fn new(peer_id: impl Into<String>, multiaddr: impl Into<String>) -> Self {
        Self {
            peer_id: peer_id.into(),
            multiaddr: multiaddr.into(),
        }
    }

    /// HTTP(S) endpoint derived from the node's multiaddr
    pub fn endpoint(&self) -> Result<String, AddressError> {
        Multiaddr::parse(&self.multiaddr)?.endpoint()
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.peer_id)
    }
}

/// The parts of a multiaddr Ferry cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Multiaddr {
    raw: String,
    host: Option<Host>,
    port: Option<String>,
    secure: bool,
    peer_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Host {
    Ip6(String),
    Name(String),
}

impl Multiaddr {
    /// Splits a multiaddr into protocol/value pairs
    ///
    /// Unknown protocols without a value (`ws`, `quic`, ...) are skipped.
    pub fn parse(addr: &str) -> Result<Self, AddressError> {
        let mut parsed = Self {
            raw: addr.to_string(),
            host: None,
            port: None,
            secure: false,
            peer_id: None,
        };

        let mut parts = addr.split('/').filter(|p| !p.is_empty());
        while let Some(protocol) = parts.next() {
            let mut value = || {
                parts
                    .next()
                    .map(str::to_string)
                    .ok_or_else(|| AddressError::Truncated {
                        addr: addr.to_string(),
                        protocol: protocol.to_string(),
                    })
            };

            match protocol {
                "ip4" | "dns" | "dns4" | "dns6" => parsed.host = Some(Host::Name(value()?)),
                "ip6" => parsed.host = Some(Host::Ip6(value()?)),
                "tcp" => parsed.port = Some(value()?),
                "p2p" | "ipfs" => parsed.peer_id = Some(value()?),
                "wss" | "tls" | "https" => parsed.secure = true,
                _ => {}
            }
        }

        Ok(parsed)
    }

    /// The peer id carried by a `/p2p/<peer id>` component, if any
    pub fn peer_id(&self) -> Option<&str> {
        self.peer_id.as_deref()
    }

    /// Builds the `http(s)://host:port` endpoint for this address
    pub fn endpoint(&self) -> Result<String, AddressError> {
        let host = match &self.host {
            Some(Host::Name(name)) => name.clone(),
            Some(Host::Ip6(ip)) => format!("[{}]", ip),
            None => return Err(AddressError::MissingHost(self.raw.clone())),
        };

        let port = self
            .port
            .as_ref()
            .ok_or_else(|| AddressError::MissingPort(self.raw.clone()))?;
        port.parse::<u16>().map_err(|_| AddressError::InvalidPort {
            addr: self.raw.clone(),
            port: port.clone(),
        })?;

        let scheme = if self.secure { "https" } else { "http" };
        Ok(format!("{}://{}:{}", scheme, host, port))
    }
}
