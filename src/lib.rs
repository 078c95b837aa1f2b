//! # zmtp-connect
//!
//! The connection-establishment path of a ZMTP messaging transport: endpoint
//! addressing and the security-mechanism handshake.
//!
//! A connecting session resolves an [`Address`](transport::Address), opens a
//! socket, then drives a [`Mechanism`](protocol::Mechanism) with handshake
//! commands until it reports [`Status::Ready`](protocol::Status). From then on
//! every application message passes through `encode`/`decode`.
//!
//! ## Modules
//! - [`transport`]: endpoint parsing/resolution for tcp, udp, ipc, tipc, vmci, ws and wss,
//!   plus the socket address probe
//! - [`protocol`]: the mechanism contract and the NULL, PLAIN and GSSAPI clients
//! - [`config`]: TOML/env configuration for resolution policy, security and logging
//! - [`error`]: the crate-wide [`ProtocolError`](error::ProtocolError)
//! - [`utils`]: logging setup
//!
//! ## Features
//! Every transport beyond tcp/udp is behind a feature of the same name
//! (`ipc`, `tipc`, `vmci`, `ws`, `wss`), as is the `gssapi` mechanism. All are
//! on by default.
//!
//! ## Example
//! ```rust
//! use zmtp_connect::config::ConnectConfig;
//! use zmtp_connect::protocol::{client_mechanism, Status};
//! use zmtp_connect::transport::Address;
//!
//! let config = ConnectConfig::default();
//! let mut endpoint = Address::new("tcp", "127.0.0.1:5555", &config.transport);
//! endpoint.resolve(false).unwrap();
//!
//! let mut mechanism = client_mechanism(&config.security, None).unwrap();
//! let ready = mechanism.next_handshake_command().unwrap();
//! assert!(ready.is_some());
//! assert_eq!(mechanism.status(), Status::Handshaking);
//! ```

#![warn(missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod protocol;
pub mod transport;
pub mod utils;

pub use config::ConnectConfig;
pub use error::{ProtocolError, Result};
pub use protocol::{client_mechanism, Mechanism, Message, Status};
pub use transport::{Address, ResolvedAddress};
