use crate::error::{ProtocolError, Result};
use std::fmt;
use std::path::Path;

/// Longest path that fits `sockaddr_un.sun_path` with its terminator
pub const MAX_IPC_PATH_LEN: usize = 107;

/// Resolved `ipc://` endpoint: a filesystem path, or `@name` in the Linux
/// abstract namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpcAddress {
    Filesystem(String),
    Abstract(String),
}

impl IpcAddress {
    pub fn resolve(text: &str) -> Result<Self> {
        if text.is_empty() {
            return Err(ProtocolError::AddressSyntax("empty IPC path".to_string()));
        }
        if text.len() > MAX_IPC_PATH_LEN {
            return Err(ProtocolError::AddressSyntax(format!(
                "IPC path too long: {} bytes (maximum: {MAX_IPC_PATH_LEN})",
                text.len()
            )));
        }
        if text.contains('\0') {
            return Err(ProtocolError::AddressSyntax(
                "IPC path contains NUL".to_string(),
            ));
        }

        match text.strip_prefix('@') {
            Some("") => Err(ProtocolError::AddressSyntax(
                "abstract IPC name is empty".to_string(),
            )),
            Some(name) => Ok(Self::Abstract(name.to_string())),
            None => Ok(Self::Filesystem(text.to_string())),
        }
    }

    pub fn is_abstract(&self) -> bool {
        matches!(self, Self::Abstract(_))
    }

    /// Filesystem path, `None` for abstract names
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Filesystem(path) => Some(Path::new(path)),
            Self::Abstract(_) => None,
        }
    }
}

impl fmt::Display for IpcAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filesystem(path) => f.write_str(path),
            Self::Abstract(name) => write!(f, "@{name}"),
        }
    }
}
