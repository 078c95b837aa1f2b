use crate::error::{ProtocolError, Result};
use std::fmt;

/// Service types below this are reserved by TIPC itself
pub const TIPC_RESERVED_TYPES: u32 = 64;

/// A TIPC network address, `zone.cluster.node`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TipcNode {
    pub zone: u8,
    pub cluster: u16,
    pub node: u16,
}

impl TipcNode {
    const MAX_CLUSTER: u16 = 0x0fff;
    const MAX_NODE: u16 = 0x0fff;

    fn parse(text: &str) -> Option<Self> {
        let mut parts = text.split('.');
        let zone = parts.next()?.parse().ok()?;
        let cluster = parts.next()?.parse().ok()?;
        let node = parts.next()?.parse().ok()?;
        if parts.next().is_some() || cluster > Self::MAX_CLUSTER || node > Self::MAX_NODE {
            return None;
        }
        Some(Self {
            zone,
            cluster,
            node,
        })
    }

    /// Packed 32-bit form, `zone:8 | cluster:12 | node:12`
    pub fn to_u32(self) -> u32 {
        (u32::from(self.zone) << 24) | (u32::from(self.cluster) << 12) | u32::from(self.node)
    }
}

impl fmt::Display for TipcNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.zone, self.cluster, self.node)
    }
}

/// Resolved `tipc://` endpoint.
///
/// ```text
/// {type,lower,upper}      name sequence
/// {type,instance}[@z.c.n] service name, optional lookup domain
/// <z.c.n:ref>             port id
/// <*>                     random port id (bind only)
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TipcAddress {
    NameSeq {
        service_type: u32,
        lower: u32,
        upper: u32,
    },
    Name {
        service_type: u32,
        instance: u32,
        domain: Option<TipcNode>,
    },
    PortId {
        node: TipcNode,
        reference: u32,
    },
    Random,
}

impl TipcAddress {
    pub fn resolve(text: &str, local: bool) -> Result<Self> {
        if text == "<*>" {
            if !local {
                return Err(syntax("random port id is only valid when binding", text));
            }
            return Ok(Self::Random);
        }

        if let Some(body) = text.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
            let (node, reference) = body
                .split_once(':')
                .ok_or_else(|| syntax("port id needs ':ref'", text))?;
            let node = TipcNode::parse(node).ok_or_else(|| syntax("invalid node", text))?;
            let reference = reference
                .parse()
                .map_err(|_| syntax("invalid port reference", text))?;
            return Ok(Self::PortId { node, reference });
        }

        let (braced, domain) = match text.split_once('@') {
            Some((braced, domain)) => (
                braced,
                Some(TipcNode::parse(domain).ok_or_else(|| syntax("invalid domain", text))?),
            ),
            None => (text, None),
        };
        let body = braced
            .strip_prefix('{')
            .and_then(|t| t.strip_suffix('}'))
            .ok_or_else(|| syntax("unrecognised TIPC address", text))?;
        let fields = body
            .split(',')
            .map(|f| f.trim().parse::<u32>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| syntax("fields must be numeric", text))?;

        let address = match (fields.as_slice(), domain) {
            (&[service_type, lower, upper], None) => {
                if lower > upper {
                    return Err(syntax("lower bound exceeds upper bound", text));
                }
                Self::NameSeq {
                    service_type,
                    lower,
                    upper,
                }
            }
            (&[service_type, instance], domain) => Self::Name {
                service_type,
                instance,
                domain,
            },
            _ => return Err(syntax("expected {type,lower,upper} or {type,instance}", text)),
        };

        if address.service_type().unwrap_or(TIPC_RESERVED_TYPES) < TIPC_RESERVED_TYPES {
            return Err(syntax("service type is reserved", text));
        }
        Ok(address)
    }

    /// Service type of name and name-sequence addresses
    pub fn service_type(&self) -> Option<u32> {
        match self {
            Self::NameSeq { service_type, .. } | Self::Name { service_type, .. } => {
                Some(*service_type)
            }
            Self::PortId { .. } | Self::Random => None,
        }
    }

    pub fn is_service(&self) -> bool {
        self.service_type().is_some()
    }

    pub fn is_random(&self) -> bool {
        matches!(self, Self::Random)
    }
}

impl fmt::Display for TipcAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NameSeq {
                service_type,
                lower,
                upper,
            } => write!(f, "{{{service_type},{lower},{upper}}}"),
            Self::Name {
                service_type,
                instance,
                domain,
            } => {
                write!(f, "{{{service_type},{instance}}}")?;
                if let Some(domain) = domain {
                    write!(f, "@{domain}")?;
                }
                Ok(())
            }
            Self::PortId { node, reference } => write!(f, "<{node}:{reference}>"),
            Self::Random => f.write_str("<*>"),
        }
    }
}

fn syntax(reason: &str, text: &str) -> ProtocolError {
    ProtocolError::AddressSyntax(format!("{reason}: '{text}'"))
}
