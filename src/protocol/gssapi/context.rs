//! The interface to the external GSSAPI library.
//!
//! The mechanism owns no cryptography: it hands opaque tokens to a
//! [`SecurityContext`] and moves whatever comes back onto the wire. Bindings to a
//! real GSSAPI/Kerberos library implement this trait; tests use an in-memory one.

use crate::config::{NameType, KRB5_MECHANISM_OID};
use crate::error::{ProtocolError, Result};
use std::borrow::Cow;
use std::fmt;
use thiserror::Error;

/// Mechanism object identifier in dotted form
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Oid(Cow<'static, str>);

impl Oid {
    /// Kerberos V5
    pub const KRB5: Oid = Oid(Cow::Borrowed(KRB5_MECHANISM_OID));

    /// Parse a dotted OID such as `1.2.840.113554.1.2.2`
    pub fn parse(dotted: &str) -> Result<Self> {
        let valid = !dotted.is_empty()
            && dotted
                .split('.')
                .all(|arc| !arc.is_empty() && arc.bytes().all(|b| b.is_ascii_digit()));
        if !valid {
            return Err(ProtocolError::ConfigError(format!(
                "Invalid mechanism OID: '{dotted}'"
            )));
        }
        Ok(Self(Cow::Owned(dotted.to_string())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A principal name together with how the library should interpret it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceName {
    name: String,
    name_type: NameType,
}

impl ServiceName {
    pub fn new(name: impl Into<String>, name_type: NameType) -> Self {
        Self {
            name: name.into(),
            name_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn name_type(&self) -> NameType {
        self.name_type
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Services requested from the security context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextFlags {
    pub mutual: bool,
    pub replay: bool,
    pub sequence: bool,
    pub confidentiality: bool,
    pub integrity: bool,
}

/// One call to the context-initialization primitive
#[derive(Debug, Clone, Copy)]
pub struct InitRequest<'a> {
    /// Service we authenticate to
    pub target: &'a ServiceName,
    /// Our credential name; default credentials when `None`
    pub principal: Option<&'a ServiceName>,
    /// Acceptable mechanisms, first supported one wins
    pub mechanisms: &'a [Oid],
    pub flags: ContextFlags,
    /// Token just received from the peer; `None` on the first call
    pub input_token: Option<&'a [u8]>,
}

/// Result of a successful context-initialization call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    /// The peer must answer the contained token
    ContinueNeeded(Vec<u8>),
    /// Mutual authentication is done; a non-empty token must still reach the peer
    Complete(Vec<u8>),
}

/// Plaintext recovered by [`SecurityContext::unwrap`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unwrapped {
    pub data: Vec<u8>,
    /// Whether the token was encrypted, not merely integrity protected
    pub confidential: bool,
}

/// Failure reported by the security library
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message} (major {major:#x}, minor {minor})")]
pub struct GssError {
    pub major: u32,
    pub minor: u32,
    pub message: String,
}

impl GssError {
    pub fn new(major: u32, minor: u32, message: impl Into<String>) -> Self {
        Self {
            major,
            minor,
            message: message.into(),
        }
    }
}

impl From<GssError> for ProtocolError {
    fn from(err: GssError) -> Self {
        ProtocolError::SecurityContext(err.to_string())
    }
}

/// Context-initialization, wrap and unwrap primitives of a GSSAPI library.
pub trait SecurityContext: Send {
    fn init_sec_context(
        &mut self,
        request: InitRequest<'_>,
    ) -> std::result::Result<InitOutcome, GssError>;

    fn wrap(&mut self, plaintext: &[u8], confidential: bool)
        -> std::result::Result<Vec<u8>, GssError>;

    fn unwrap(&mut self, token: &[u8]) -> std::result::Result<Unwrapped, GssError>;
}
