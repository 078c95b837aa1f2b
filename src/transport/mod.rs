//! # Endpoint Addresses
//!
//! Parsing and resolution of `protocol://address` endpoints into the structured
//! form each transport opens sockets with.
//!
//! ## Components
//! - **Address**: the caller's protocol tag and text plus at most one resolved form
//! - **ResolvedAddress**: one variant per transport compiled into this build
//! - **Probe**: local/peer address lookup on an open descriptor (Unix)
//!
//! ## Transports
//! ```text
//! tcp   [source;]host:port
//! udp   [iface|ip|*;]host:port
//! ipc   /path/to/socket | @abstract-name
//! tipc  {type,lower,upper} | {type,instance}[@z.c.n] | <z.c.n:ref> | <*>
//! vmci  cid:port
//! ws    host:port[/path]
//! wss   host:port[/path]
//! ```

mod ip;
pub mod tcp;
pub mod udp;

#[cfg(feature = "ipc")]
pub mod ipc;
#[cfg(unix)]
pub mod probe;
#[cfg(feature = "tipc")]
pub mod tipc;
#[cfg(feature = "vmci")]
pub mod vmci;
#[cfg(feature = "ws")]
pub mod ws;

pub use tcp::TcpAddress;
pub use udp::{UdpAddress, UdpSource};

#[cfg(feature = "ipc")]
pub use ipc::IpcAddress;
#[cfg(unix)]
pub use probe::{probe, probe_name, SockAddrStorage, SocketEnd};
#[cfg(feature = "tipc")]
pub use tipc::{TipcAddress, TipcNode};
#[cfg(feature = "vmci")]
pub use vmci::VmciAddress;
#[cfg(feature = "ws")]
pub use ws::WsAddress;

use crate::config::TransportConfig;
use crate::error::{ProtocolError, Result};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, instrument};

/// Transports compiled into this build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Tcp,
    Udp,
    #[cfg(feature = "ipc")]
    Ipc,
    #[cfg(feature = "tipc")]
    Tipc,
    #[cfg(feature = "vmci")]
    Vmci,
    #[cfg(feature = "ws")]
    Ws,
    #[cfg(feature = "wss")]
    Wss,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
            #[cfg(feature = "ipc")]
            Self::Ipc => "ipc",
            #[cfg(feature = "tipc")]
            Self::Tipc => "tipc",
            #[cfg(feature = "vmci")]
            Self::Vmci => "vmci",
            #[cfg(feature = "ws")]
            Self::Ws => "ws",
            #[cfg(feature = "wss")]
            Self::Wss => "wss",
        }
    }
}

impl FromStr for Protocol {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tcp" => Ok(Self::Tcp),
            "udp" => Ok(Self::Udp),
            #[cfg(feature = "ipc")]
            "ipc" => Ok(Self::Ipc),
            #[cfg(feature = "tipc")]
            "tipc" => Ok(Self::Tipc),
            #[cfg(feature = "vmci")]
            "vmci" => Ok(Self::Vmci),
            #[cfg(feature = "ws")]
            "ws" => Ok(Self::Ws),
            #[cfg(feature = "wss")]
            "wss" => Ok(Self::Wss),
            other => Err(ProtocolError::UnsupportedProtocol(other.to_string())),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The structured form of an endpoint, one variant per transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedAddress {
    Tcp(TcpAddress),
    Udp(UdpAddress),
    #[cfg(feature = "ipc")]
    Ipc(IpcAddress),
    #[cfg(feature = "tipc")]
    Tipc(TipcAddress),
    #[cfg(feature = "vmci")]
    Vmci(VmciAddress),
    #[cfg(feature = "ws")]
    Ws(WsAddress),
    #[cfg(feature = "wss")]
    Wss(WsAddress),
}

impl ResolvedAddress {
    /// Parse and resolve `text` for `protocol`. `local` selects bind semantics.
    pub fn resolve(
        protocol: Protocol,
        text: &str,
        parent: &TransportConfig,
        local: bool,
    ) -> Result<Self> {
        Ok(match protocol {
            Protocol::Tcp => Self::Tcp(TcpAddress::resolve(text, parent, local)?),
            Protocol::Udp => Self::Udp(UdpAddress::resolve(text, parent, local)?),
            #[cfg(feature = "ipc")]
            Protocol::Ipc => Self::Ipc(IpcAddress::resolve(text)?),
            #[cfg(feature = "tipc")]
            Protocol::Tipc => Self::Tipc(TipcAddress::resolve(text, local)?),
            #[cfg(feature = "vmci")]
            Protocol::Vmci => Self::Vmci(VmciAddress::resolve(text, parent)?),
            #[cfg(feature = "ws")]
            Protocol::Ws => Self::Ws(WsAddress::resolve(text, parent, local)?),
            #[cfg(feature = "wss")]
            Protocol::Wss => Self::Wss(WsAddress::resolve(text, parent, local)?),
        })
    }

    pub fn protocol(&self) -> Protocol {
        match self {
            Self::Tcp(_) => Protocol::Tcp,
            Self::Udp(_) => Protocol::Udp,
            #[cfg(feature = "ipc")]
            Self::Ipc(_) => Protocol::Ipc,
            #[cfg(feature = "tipc")]
            Self::Tipc(_) => Protocol::Tipc,
            #[cfg(feature = "vmci")]
            Self::Vmci(_) => Protocol::Vmci,
            #[cfg(feature = "ws")]
            Self::Ws(_) => Protocol::Ws,
            #[cfg(feature = "wss")]
            Self::Wss(_) => Protocol::Wss,
        }
    }

    /// Host text the endpoint was written with, for name-based transports
    pub fn host(&self) -> Option<&str> {
        match self {
            Self::Tcp(addr) => Some(addr.host()),
            #[cfg(feature = "ws")]
            Self::Ws(addr) => Some(addr.host()),
            #[cfg(feature = "wss")]
            Self::Wss(addr) => Some(addr.host()),
            _ => None,
        }
    }
}

impl fmt::Display for ResolvedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp(addr) => fmt::Display::fmt(addr, f),
            Self::Udp(addr) => fmt::Display::fmt(addr, f),
            #[cfg(feature = "ipc")]
            Self::Ipc(addr) => fmt::Display::fmt(addr, f),
            #[cfg(feature = "tipc")]
            Self::Tipc(addr) => fmt::Display::fmt(addr, f),
            #[cfg(feature = "vmci")]
            Self::Vmci(addr) => fmt::Display::fmt(addr, f),
            #[cfg(feature = "ws")]
            Self::Ws(addr) => fmt::Display::fmt(addr, f),
            #[cfg(feature = "wss")]
            Self::Wss(addr) => fmt::Display::fmt(addr, f),
        }
    }
}

/// An endpoint as given by the caller, plus its resolved form once resolved.
///
/// `parent` is the context's transport policy; it must outlive the address.
#[derive(Debug, Clone)]
pub struct Address<'a> {
    protocol: String,
    address: String,
    parent: &'a TransportConfig,
    resolved: Option<ResolvedAddress>,
}

impl<'a> Address<'a> {
    pub fn new(
        protocol: impl Into<String>,
        address: impl Into<String>,
        parent: &'a TransportConfig,
    ) -> Self {
        Self {
            protocol: protocol.into(),
            address: address.into(),
            parent,
            resolved: None,
        }
    }

    /// Resolve the endpoint text. Fails with [`ProtocolError::AlreadyResolved`]
    /// unless the previous result was [`clear`](Self::clear)ed.
    #[instrument(level = "debug", skip(self), fields(protocol = %self.protocol, address = %self.address))]
    pub fn resolve(&mut self, local: bool) -> Result<&ResolvedAddress> {
        if self.resolved.is_some() {
            return Err(ProtocolError::AlreadyResolved);
        }

        let protocol: Protocol = self.protocol.parse()?;
        let resolved = ResolvedAddress::resolve(protocol, &self.address, self.parent, local)?;
        debug!(resolved = %resolved, "Endpoint resolved");
        Ok(self.resolved.insert(resolved))
    }

    /// Drop the resolved form, returning it
    pub fn clear(&mut self) -> Option<ResolvedAddress> {
        self.resolved.take()
    }

    pub fn resolved(&self) -> Option<&ResolvedAddress> {
        self.resolved.as_ref()
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }

    /// Canonical text of the resolved form, or `protocol://address` before
    /// resolution.
    pub fn to_string(&self) -> Result<String> {
        if let Some(resolved) = &self.resolved {
            return Ok(resolved.to_string());
        }
        if !self.protocol.is_empty() && !self.address.is_empty() {
            return Ok(format!("{}://{}", self.protocol, self.address));
        }
        Err(ProtocolError::AddressUnresolved)
    }

    /// Host part of a resolved TCP or WebSocket endpoint
    pub fn host(&self) -> Option<&str> {
        self.resolved.as_ref().and_then(ResolvedAddress::host)
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn parent(&self) -> &'a TransportConfig {
        self.parent
    }
}
