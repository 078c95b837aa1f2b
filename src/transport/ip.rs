//! `host:port` parsing shared by the TCP, UDP and WebSocket resolvers.

use crate::error::{constants, ProtocolError, Result};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV6, ToSocketAddrs};
use tracing::trace;

/// What a resolver accepts for one endpoint
#[derive(Debug, Clone, Copy)]
pub(crate) struct IpOptions {
    /// Binding: `*` host and `*`/`0` port are allowed
    pub bindable: bool,
    /// Fall back to a name lookup for non-numeric hosts
    pub allow_dns: bool,
    /// Accept IPv6 results; `*` means the IPv6 wildcard
    pub ipv6: bool,
}

/// A resolved endpoint and the host text it came from
#[derive(Debug, Clone)]
pub(crate) struct IpEndpoint {
    pub addr: SocketAddr,
    pub host: String,
}

pub(crate) fn resolve_ip_endpoint(text: &str, opts: IpOptions) -> Result<IpEndpoint> {
    let (host, port) = text
        .rsplit_once(':')
        .ok_or_else(|| syntax(constants::ERR_MISSING_PORT, text))?;
    let port = parse_port(port, opts.bindable, text)?;
    let host = strip_brackets(host);
    if host.is_empty() {
        return Err(syntax(constants::ERR_EMPTY_HOST, text));
    }

    let addr = if host == "*" {
        if !opts.bindable {
            return Err(syntax("wildcard host is only valid when binding", text));
        }
        let any = if opts.ipv6 {
            IpAddr::V6(Ipv6Addr::UNSPECIFIED)
        } else {
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        };
        SocketAddr::new(any, port)
    } else if let Some(addr) = parse_numeric(host, port, text)? {
        if addr.is_ipv6() && !opts.ipv6 {
            return Err(ProtocolError::ResolutionFailed(format!(
                "{}: {text}",
                constants::ERR_IPV6_DISABLED
            )));
        }
        addr
    } else if opts.allow_dns {
        lookup(host, port, opts.ipv6)?
    } else {
        return Err(ProtocolError::ResolutionFailed(format!(
            "'{host}' is not a numeric address"
        )));
    };

    Ok(IpEndpoint {
        addr,
        host: host.to_string(),
    })
}

/// Parse a bare IP literal, optionally bracketed. Used for port-less sources.
pub(crate) fn parse_ip(text: &str) -> Option<IpAddr> {
    strip_brackets(text).parse().ok()
}

fn parse_port(port: &str, bindable: bool, text: &str) -> Result<u16> {
    let port = if port == "*" {
        0
    } else {
        port.parse::<u16>()
            .map_err(|_| syntax(constants::ERR_INVALID_PORT, text))?
    };
    if port == 0 && !bindable {
        return Err(syntax(constants::ERR_WILDCARD_PORT, text));
    }
    Ok(port)
}

fn strip_brackets(host: &str) -> &str {
    host.strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host)
}

/// IPv4 or IPv6 literal; IPv6 may carry a numeric `%scope`
fn parse_numeric(host: &str, port: u16, text: &str) -> Result<Option<SocketAddr>> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(Some(SocketAddr::new(ip, port)));
    }
    if let Some((ip, scope)) = host.split_once('%') {
        let ip: Ipv6Addr = ip
            .parse()
            .map_err(|_| syntax("invalid IPv6 address", text))?;
        let scope: u32 = scope
            .parse()
            .map_err(|_| syntax("IPv6 scope must be numeric", text))?;
        return Ok(Some(SocketAddr::V6(SocketAddrV6::new(ip, port, 0, scope))));
    }
    if host.contains(':') {
        return Err(syntax("invalid IPv6 address", text));
    }
    Ok(None)
}

fn lookup(host: &str, port: u16, ipv6: bool) -> Result<SocketAddr> {
    trace!(host, port, "Looking up host name");
    let candidates = (host, port)
        .to_socket_addrs()
        .map_err(|e| ProtocolError::ResolutionFailed(format!("{host}: {e}")))?;

    let mut fallback = None;
    for addr in candidates {
        if addr.is_ipv4() {
            return Ok(addr);
        }
        if ipv6 && fallback.is_none() {
            fallback = Some(addr);
        }
    }
    fallback.ok_or_else(|| {
        ProtocolError::ResolutionFailed(format!("{host}: no usable address"))
    })
}

fn syntax(reason: &str, text: &str) -> ProtocolError {
    ProtocolError::AddressSyntax(format!("{reason}: '{text}'"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const CONNECT: IpOptions = IpOptions {
        bindable: false,
        allow_dns: true,
        ipv6: true,
    };
    const BIND: IpOptions = IpOptions {
        bindable: true,
        allow_dns: false,
        ipv6: false,
    };

    #[test]
    fn numeric_endpoints() {
        let ep = resolve_ip_endpoint("10.1.2.3:80", CONNECT).unwrap();
        assert_eq!(ep.addr.to_string(), "10.1.2.3:80");
        assert_eq!(ep.host, "10.1.2.3");

        let ep = resolve_ip_endpoint("[fe80::1%3]:80", CONNECT).unwrap();
        assert_eq!(ep.addr.to_string(), "[fe80::1%3]:80");
        assert_eq!(ep.host, "fe80::1%3");
    }

    #[test]
    fn wildcards_only_when_binding() {
        assert_eq!(
            resolve_ip_endpoint("*:*", BIND).unwrap().addr.to_string(),
            "0.0.0.0:0"
        );
        assert!(matches!(
            resolve_ip_endpoint("*:80", CONNECT),
            Err(ProtocolError::AddressSyntax(_))
        ));
        assert!(matches!(
            resolve_ip_endpoint("10.0.0.1:0", CONNECT),
            Err(ProtocolError::AddressSyntax(_))
        ));
    }

    #[test]
    fn ipv6_needs_the_option() {
        assert!(matches!(
            resolve_ip_endpoint("[::1]:80", BIND),
            Err(ProtocolError::ResolutionFailed(_))
        ));
    }

    #[test]
    fn malformed_text() {
        for text in ["localhost", ":80", "10.0.0.1:http", "10.0.0.1:70000", "[fe80::1%eth0]:1"] {
            assert!(
                matches!(
                    resolve_ip_endpoint(text, CONNECT),
                    Err(ProtocolError::AddressSyntax(_))
                ),
                "{text} should be a syntax error"
            );
        }
    }

    #[test]
    fn names_are_not_looked_up_when_binding() {
        assert!(matches!(
            resolve_ip_endpoint("localhost:80", BIND),
            Err(ProtocolError::ResolutionFailed(_))
        ));
    }
}
