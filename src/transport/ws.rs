use super::ip::{resolve_ip_endpoint, IpOptions};
use crate::config::TransportConfig;
use crate::error::Result;
use std::fmt;
use std::net::SocketAddr;

/// Resolved `ws://` or `wss://` endpoint: `host:port[/path]`
///
/// The host text is kept for the `Host` header and ignored by equality.
#[derive(Debug, Clone)]
pub struct WsAddress {
    address: SocketAddr,
    host: String,
    path: String,
}

impl WsAddress {
    pub fn resolve(text: &str, parent: &TransportConfig, local: bool) -> Result<Self> {
        let (endpoint, path) = match text.find('/') {
            Some(slash) => text.split_at(slash),
            None => (text, "/"),
        };

        let endpoint = resolve_ip_endpoint(
            endpoint,
            IpOptions {
                bindable: local,
                allow_dns: !local,
                ipv6: parent.ipv6,
            },
        )?;

        Ok(Self {
            address: endpoint.addr,
            host: endpoint.host,
            path: path.to_string(),
        })
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// Host as written, used for the `Host` header
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Request path, always starting with `/`
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl PartialEq for WsAddress {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address && self.path == other.path
    }
}

impl Eq for WsAddress {}

impl fmt::Display for WsAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.address, self.path)
    }
}
