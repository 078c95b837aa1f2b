use crate::config::TransportConfig;
use crate::error::{constants, ProtocolError, Result};
use std::fmt;

/// `VMADDR_CID_ANY`
pub const VMADDR_CID_ANY: u32 = u32::MAX;
/// `VMADDR_PORT_ANY`
pub const VMADDR_PORT_ANY: u32 = u32::MAX;

/// Resolved `vmci://` endpoint: `cid:port`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmciAddress {
    cid: u32,
    port: u32,
}

impl VmciAddress {
    /// `@` as the CID stands for the local context ID from `parent`.
    pub fn resolve(text: &str, parent: &TransportConfig) -> Result<Self> {
        let (cid, port) = text.rsplit_once(':').ok_or_else(|| {
            ProtocolError::AddressSyntax(format!("{}: '{text}'", constants::ERR_MISSING_PORT))
        })?;

        let cid = match cid {
            "" => {
                return Err(ProtocolError::AddressSyntax(format!(
                    "{}: '{text}'",
                    constants::ERR_EMPTY_HOST
                )))
            }
            "@" => parent.vmci_local_cid.ok_or_else(|| {
                ProtocolError::ResolutionFailed("local VMCI context ID is unknown".to_string())
            })?,
            "*" | "-1" => VMADDR_CID_ANY,
            cid => cid.parse().map_err(|_| {
                ProtocolError::AddressSyntax(format!("invalid VMCI context ID: '{text}'"))
            })?,
        };

        let port = match port {
            "*" | "-1" => VMADDR_PORT_ANY,
            port => port.parse().map_err(|_| {
                ProtocolError::AddressSyntax(format!("{}: '{text}'", constants::ERR_INVALID_PORT))
            })?,
        };

        Ok(Self { cid, port })
    }

    pub fn cid(&self) -> u32 {
        self.cid
    }

    pub fn port(&self) -> u32 {
        self.port
    }
}

impl fmt::Display for VmciAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cid {
            VMADDR_CID_ANY => f.write_str("*")?,
            cid => write!(f, "{cid}")?,
        }
        match self.port {
            VMADDR_PORT_ANY => f.write_str(":*"),
            port => write!(f, ":{port}"),
        }
    }
}
