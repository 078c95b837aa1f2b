use super::ip::{parse_ip, resolve_ip_endpoint, IpOptions};
use crate::config::TransportConfig;
use crate::error::{ProtocolError, Result};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use tracing::debug;

/// Where outgoing UDP traffic (and multicast membership) is bound
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UdpSource {
    /// No source given
    Unspecified,
    /// `*`: the default interface
    Any,
    /// A named network interface and its OS index
    Interface { name: String, index: u32 },
    /// A local IP address
    Ip(IpAddr),
}

/// Resolved `udp://` endpoint: `[iface|ip|*;]host:port`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdpAddress {
    source: UdpSource,
    target: SocketAddr,
    bind_address: SocketAddr,
    multicast: bool,
}

impl UdpAddress {
    pub fn resolve(text: &str, parent: &TransportConfig, local: bool) -> Result<Self> {
        let (source, dest) = match text.split_once(';') {
            Some((source, dest)) => (resolve_source(source)?, dest),
            None => (UdpSource::Unspecified, text),
        };

        let target = resolve_ip_endpoint(
            dest,
            IpOptions {
                bindable: local,
                allow_dns: !local,
                ipv6: parent.ipv6,
            },
        )?
        .addr;
        let multicast = target.ip().is_multicast();

        if multicast
            && target.is_ipv6()
            && !matches!(source, UdpSource::Any | UdpSource::Interface { .. })
        {
            return Err(ProtocolError::AddressSyntax(format!(
                "IPv6 multicast requires an interface: '{text}'"
            )));
        }

        let bind_address = match source {
            UdpSource::Ip(ip) => {
                if ip.is_ipv4() != target.is_ipv4() {
                    return Err(ProtocolError::AddressSyntax(format!(
                        "source and target address families differ: '{text}'"
                    )));
                }
                SocketAddr::new(ip, target.port())
            }
            _ if multicast || !local => SocketAddr::new(unspecified(&target), target.port()),
            // binding a unicast address: the target is the bind address
            _ => target,
        };

        debug!(%target, %bind_address, multicast, "Resolved UDP endpoint");
        Ok(Self {
            source,
            target,
            bind_address,
            multicast,
        })
    }

    pub fn source(&self) -> &UdpSource {
        &self.source
    }

    /// Peer or group the socket sends to
    pub fn target_address(&self) -> SocketAddr {
        self.target
    }

    /// Local address the socket binds
    pub fn bind_address(&self) -> SocketAddr {
        self.bind_address
    }

    /// Interface index for multicast membership, `0` for the default
    pub fn bind_interface(&self) -> u32 {
        match self.source {
            UdpSource::Interface { index, .. } => index,
            _ => 0,
        }
    }

    pub fn is_multicast(&self) -> bool {
        self.multicast
    }
}

impl fmt::Display for UdpAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            UdpSource::Unspecified => {}
            UdpSource::Any => f.write_str("*;")?,
            UdpSource::Interface { name, .. } => write!(f, "{name};")?,
            UdpSource::Ip(IpAddr::V4(ip)) => write!(f, "{ip};")?,
            UdpSource::Ip(IpAddr::V6(ip)) => write!(f, "[{ip}];")?,
        }
        write!(f, "{}", self.target)
    }
}

fn unspecified(target: &SocketAddr) -> IpAddr {
    match target {
        SocketAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        SocketAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
    }
}

fn resolve_source(source: &str) -> Result<UdpSource> {
    if source == "*" {
        return Ok(UdpSource::Any);
    }
    if let Some(ip) = parse_ip(source) {
        return Ok(UdpSource::Ip(ip));
    }
    if source.is_empty() {
        return Err(ProtocolError::AddressSyntax(
            "empty UDP source".to_string(),
        ));
    }
    if source.parse::<SocketAddr>().is_ok() {
        return Err(ProtocolError::AddressSyntax(format!(
            "UDP source takes no port: '{source}'"
        )));
    }

    let index = interface_index(source)?;
    Ok(UdpSource::Interface {
        name: source.to_string(),
        index,
    })
}

#[cfg(unix)]
fn interface_index(name: &str) -> Result<u32> {
    let c_name = std::ffi::CString::new(name).map_err(|_| {
        ProtocolError::AddressSyntax(format!("interface name contains NUL: '{name}'"))
    })?;
    // SAFETY: `c_name` is a valid NUL-terminated string that outlives the call.
    let index = unsafe { libc::if_nametoindex(c_name.as_ptr()) };
    if index == 0 {
        return Err(ProtocolError::ResolutionFailed(format!(
            "unknown interface '{name}'"
        )));
    }
    Ok(index)
}

#[cfg(not(unix))]
fn interface_index(name: &str) -> Result<u32> {
    Err(ProtocolError::ResolutionFailed(format!(
        "interface names are not supported on this platform: '{name}'"
    )))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parent() -> TransportConfig {
        TransportConfig {
            ipv6: true,
            ..TransportConfig::default()
        }
    }

    #[test]
    fn unicast_connect_binds_wildcard_on_target_port() {
        let addr = UdpAddress::resolve("10.0.0.7:5555", &parent(), false).unwrap();
        assert!(!addr.is_multicast());
        assert_eq!(addr.bind_address().to_string(), "0.0.0.0:5555");
        assert_eq!(addr.to_string(), "10.0.0.7:5555");
    }

    #[test]
    fn unicast_bind_uses_target() {
        let addr = UdpAddress::resolve("127.0.0.1:5555", &parent(), true).unwrap();
        assert_eq!(addr.bind_address(), addr.target_address());
    }

    #[test]
    fn multicast_with_source_ip() {
        let addr = UdpAddress::resolve("192.168.1.5;239.1.1.1:5555", &parent(), false).unwrap();
        assert!(addr.is_multicast());
        assert_eq!(addr.bind_address().to_string(), "192.168.1.5:5555");
        assert_eq!(addr.to_string(), "192.168.1.5;239.1.1.1:5555");
    }

    #[test]
    fn ipv6_multicast_needs_interface() {
        assert!(matches!(
            UdpAddress::resolve("[ff02::1]:5555", &parent(), false),
            Err(ProtocolError::AddressSyntax(_))
        ));
        let addr = UdpAddress::resolve("*;[ff02::1]:5555", &parent(), false).unwrap();
        assert_eq!(addr.bind_interface(), 0);
        assert_eq!(addr.to_string(), "*;[ff02::1]:5555");
    }

    #[cfg(unix)]
    #[test]
    fn unknown_interface_fails_resolution() {
        assert!(matches!(
            UdpAddress::resolve("no-such-if0;239.1.1.1:5555", &parent(), false),
            Err(ProtocolError::ResolutionFailed(_))
        ));
    }

    #[test]
    fn source_with_port_is_a_syntax_error() {
        for text in ["192.168.1.5:0;239.1.1.1:5555", "[::1]:0;[ff02::1]:5555"] {
            assert!(
                matches!(
                    UdpAddress::resolve(text, &parent(), false),
                    Err(ProtocolError::AddressSyntax(_))
                ),
                "{text} should be rejected"
            );
        }
    }

    #[test]
    fn ipv6_source_round_trips() {
        let addr = UdpAddress::resolve("[::1];[::2]:7000", &parent(), false).unwrap();
        let again = UdpAddress::resolve(&addr.to_string(), &parent(), false).unwrap();
        assert_eq!(again, addr);
    }
}
