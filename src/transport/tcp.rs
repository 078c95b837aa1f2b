use super::ip::{resolve_ip_endpoint, IpOptions};
use crate::config::TransportConfig;
use crate::error::{ProtocolError, Result};
use std::fmt;
use std::net::SocketAddr;

/// Resolved `tcp://` endpoint: `[source;]host:port`
///
/// Equality compares the resolved endpoints only; the host text is not part of it.
#[derive(Debug, Clone)]
pub struct TcpAddress {
    address: SocketAddr,
    source: Option<SocketAddr>,
    host: String,
}

impl TcpAddress {
    /// Resolve `text`. `local` selects bind semantics: wildcards allowed, no name lookup.
    pub fn resolve(text: &str, parent: &TransportConfig, local: bool) -> Result<Self> {
        let (source, dest) = match text.split_once(';') {
            Some((source, dest)) => (Some(source), dest),
            None => (None, text),
        };

        let dest = resolve_ip_endpoint(
            dest,
            IpOptions {
                bindable: local,
                allow_dns: !local,
                ipv6: parent.ipv6,
            },
        )?;

        let source = source
            .map(|source| {
                resolve_ip_endpoint(
                    source,
                    IpOptions {
                        bindable: true,
                        allow_dns: false,
                        ipv6: parent.ipv6,
                    },
                )
            })
            .transpose()?
            .map(|ep| ep.addr);

        if let Some(source) = source {
            if source.is_ipv4() != dest.addr.is_ipv4() {
                return Err(ProtocolError::AddressSyntax(format!(
                    "source and destination address families differ: '{text}'"
                )));
            }
        }

        Ok(Self {
            address: dest.addr,
            source,
            host: dest.host,
        })
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// Local address to bind before connecting, if one was given
    pub fn source_address(&self) -> Option<SocketAddr> {
        self.source
    }

    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    /// Host as written, before resolution
    pub fn host(&self) -> &str {
        &self.host
    }
}

impl PartialEq for TcpAddress {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address && self.source == other.source
    }
}

impl Eq for TcpAddress {}

impl fmt::Display for TcpAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(source) = self.source {
            write!(f, "{source};")?;
        }
        write!(f, "{}", self.address)
    }
}
