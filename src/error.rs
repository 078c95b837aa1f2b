//! # Error Types
//!
//! Error handling for endpoint resolution and security mechanism handshakes.
//!
//! Every failure this crate reports is connection-fatal from the caller's point
//! of view. Nothing is retried internally: the session/engine layer decides
//! whether to tear the connection down and reconnect.
//!
//! ## Error Categories
//! - **Address Errors**: malformed endpoint text, unknown transports, failed lookups
//! - **Handshake Errors**: out-of-order or malformed commands, peer rejection
//! - **Security Errors**: security context failures, integrity check failures
//! - **Configuration Errors**: invalid or unreadable configuration
//!
//! Probing a socket for its local or peer address is the one operation that does
//! not use this type: it signals failure with a `0` length.
//!
//! ## Example Usage
//! ```rust
//! use zmtp_connect::config::TransportConfig;
//! use zmtp_connect::error::{ProtocolError, Result};
//! use zmtp_connect::transport::Address;
//!
//! fn endpoint(text: &str, parent: &TransportConfig) -> Result<String> {
//!     let mut address = Address::new("tcp", text, parent);
//!     address.resolve(false)?;
//!     address.to_string()
//! }
//!
//! let parent = TransportConfig::default();
//! assert_eq!(endpoint("127.0.0.1:5555", &parent).unwrap(), "127.0.0.1:5555");
//! assert!(matches!(
//!     endpoint("127.0.0.1", &parent),
//!     Err(ProtocolError::AddressSyntax(_))
//! ));
//! ```

use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Address errors
    pub const ERR_MISSING_PORT: &str = "missing ':' port delimiter";
    pub const ERR_INVALID_PORT: &str = "invalid port";
    pub const ERR_WILDCARD_PORT: &str = "wildcard port is only valid when binding";
    pub const ERR_EMPTY_HOST: &str = "empty host";
    pub const ERR_IPV6_DISABLED: &str = "IPv6 address requires the ipv6 option";

    /// Handshake errors
    pub const ERR_UNEXPECTED_COMMAND: &str = "unexpected command for current handshake state";
    pub const ERR_MECHANISM_FAILED: &str = "mechanism has already failed";
    pub const ERR_MALFORMED_COMMAND: &str = "malformed command";
    pub const ERR_MALFORMED_METADATA: &str = "malformed metadata";
    pub const ERR_DUPLICATE_PROPERTY: &str = "duplicate metadata property";
    pub const ERR_INVALID_SOCKET_TYPE: &str = "peer socket type is not compatible";

    /// Security errors
    pub const ERR_EMPTY_CONTINUE_TOKEN: &str =
        "security context needs another round but produced no token";
    pub const ERR_NOT_ENCRYPTED: &str = "message was not encrypted";
    pub const ERR_WRAP_FAILED: &str = "failed to wrap message";
}

// ProtocolError is the primary error type for all operations in this crate
#[derive(Error, Debug, Serialize, Deserialize)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    #[serde(skip_serializing, skip_deserializing)]
    Io(#[from] io::Error),

    #[error("Invalid address: {0}")]
    AddressSyntax(String),

    #[error("Unsupported transport protocol: {0}")]
    UnsupportedProtocol(String),

    #[error("Address resolution failed: {0}")]
    ResolutionFailed(String),

    #[error("Address is already resolved")]
    AlreadyResolved,

    #[error("Address is unresolved and has no textual fallback")]
    AddressUnresolved,

    #[error("Handshake sequence error: {0}")]
    HandshakeSequence(String),

    #[error("Malformed command: {0}")]
    MalformedCommand(String),

    #[error("Security context error: {0}")]
    SecurityContext(String),

    #[error("Message integrity check failed: {0}")]
    Integrity(String),

    #[error("Mechanism is not ready for application traffic")]
    NotReady,

    #[error("Peer rejected the handshake: {0}")]
    PeerRejected(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
