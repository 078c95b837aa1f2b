//! GSSAPI security mechanism (RFC 38), client side.
//!
//! The handshake is a token exchange carried in INITIATE commands, driven by an
//! external [`SecurityContext`], followed by READY in each direction:
//!
//! ```text
//! CallNextInit --INITIATE--> RecvNextToken --INITIATE--> CallNextInit ...
//!      |                                          |
//!      +------- context complete -----------------+
//!                        |
//!                  SendReady --READY--> RecvReady --READY--> Connected
//! ```
//!
//! Once connected, every message is wrapped with confidentiality into a MESSAGE
//! command unless the configuration selects plaintext mode.

#[cfg(feature = "gssapi")]
mod client;
mod context;
pub mod wire;

#[cfg(feature = "gssapi")]
pub use self::client::{ClientState, GssapiClient};
pub use self::context::{
    ContextFlags, GssError, InitOutcome, InitRequest, Oid, SecurityContext, ServiceName,
    Unwrapped,
};
pub use crate::config::NameType;
