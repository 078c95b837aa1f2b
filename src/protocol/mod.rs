//! # Security Mechanisms
//!
//! The ZMTP 3 mechanism layer: a connection's handshake commands flow through a
//! [`Mechanism`] until it reports [`Status::Ready`], after which every
//! application message is passed through `encode`/`decode`.
//!
//! ## Components
//! - **Message**: command or application frame with its `more`/`command` flags
//! - **Metadata**: property codec used by READY and INITIATE
//! - **Mechanism**: the shared contract, socket-type checks and ERROR handling
//! - **NULL / PLAIN**: the two unauthenticated-or-cleartext mechanisms
//! - **GSSAPI**: Kerberos-style mutual authentication with wrapped traffic
//!
//! ## Command Format
//! ```text
//! [name-len(1)] [name] [body...]
//! ```

pub mod gssapi;
pub mod mechanism;
pub mod message;
pub mod metadata;
pub mod null;
pub mod plain;

pub use mechanism::{Mechanism, MechanismName, SocketType, Status};
pub use message::Message;
pub use null::NullMechanism;
pub use plain::PlainClient;

#[cfg(feature = "gssapi")]
pub use gssapi::GssapiClient;

use crate::config::SecurityConfig;
use crate::error::{ProtocolError, Result};
use gssapi::SecurityContext;
use tracing::debug;

/// Build the client mechanism selected by `config.mechanism`.
///
/// GSSAPI needs a `context` from the security library; the other mechanisms
/// ignore it.
pub fn client_mechanism(
    config: &SecurityConfig,
    context: Option<Box<dyn SecurityContext>>,
) -> Result<Box<dyn Mechanism>> {
    debug!(mechanism = %config.mechanism, "Creating client mechanism");

    match config.mechanism {
        MechanismName::Null => Ok(Box::new(NullMechanism::new(config))),
        MechanismName::Plain => Ok(Box::new(PlainClient::new(config)?)),
        #[cfg(feature = "gssapi")]
        MechanismName::Gssapi => {
            let context = context.ok_or_else(|| {
                ProtocolError::ConfigError("GSSAPI requires a security context".to_string())
            })?;
            Ok(Box::new(GssapiClient::new(config, context)?))
        }
        #[cfg(not(feature = "gssapi"))]
        MechanismName::Gssapi => {
            drop(context);
            Err(ProtocolError::ConfigError(
                "GSSAPI support is not compiled in".to_string(),
            ))
        }
    }
}
