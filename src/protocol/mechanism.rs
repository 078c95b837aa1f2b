//! The contract every security mechanism implements, plus the pieces all of
//! them share: socket type compatibility, basic properties and ERROR handling.

use crate::config::SecurityConfig;
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::message::Message;
use crate::protocol::metadata::{self, Properties};
use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

pub const READY_COMMAND: &[u8] = b"\x05READY";
pub const ERROR_COMMAND: &[u8] = b"\x05ERROR";
pub const INITIATE_COMMAND: &[u8] = b"\x08INITIATE";

/// Handshake progress as seen by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Handshaking,
    Ready,
    Error,
}

/// A security mechanism driving one connection's handshake and, once ready,
/// transforming its application traffic.
///
/// The engine calls these methods one at a time from its event loop. None of
/// them block.
pub trait Mechanism: Send {
    /// Mechanism announced in the greeting
    fn name(&self) -> MechanismName;

    /// Next outbound handshake command, or `None` while waiting on the peer.
    fn next_handshake_command(&mut self) -> Result<Option<Message>>;

    /// Consume an inbound handshake command. Commands arriving out of order fail
    /// with [`ProtocolError::HandshakeSequence`].
    fn process_handshake_command(&mut self, msg: Message) -> Result<()>;

    /// Transform an outbound application message. Only valid once ready.
    fn encode(&mut self, msg: Message) -> Result<Message> {
        if self.status() != Status::Ready {
            return Err(ProtocolError::NotReady);
        }
        Ok(msg)
    }

    /// Inverse of [`encode`](Self::encode). Only valid once ready.
    fn decode(&mut self, msg: Message) -> Result<Message> {
        if self.status() != Status::Ready {
            return Err(ProtocolError::NotReady);
        }
        Ok(msg)
    }

    fn status(&self) -> Status;

    /// Properties the peer sent in its READY/INITIATE metadata
    fn peer_properties(&self) -> &Properties;
}

/// Mechanisms that can be announced in a ZMTP 3 greeting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MechanismName {
    Null,
    Plain,
    Gssapi,
}

impl MechanismName {
    /// Width of the mechanism field in a greeting
    pub const GREETING_FIELD_LEN: usize = 20;

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Plain => "PLAIN",
            Self::Gssapi => "GSSAPI",
        }
    }

    /// Null-padded mechanism field for a greeting
    pub fn to_greeting_field(&self) -> [u8; Self::GREETING_FIELD_LEN] {
        let mut field = [0u8; Self::GREETING_FIELD_LEN];
        let name = self.as_str().as_bytes();
        field[..name.len()].copy_from_slice(name);
        field
    }

    /// Parse the mechanism field of a peer's greeting
    pub fn from_greeting_field(field: &[u8]) -> Result<Self> {
        let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
        let name = std::str::from_utf8(&field[..end]).map_err(|_| {
            ProtocolError::MalformedCommand("mechanism name is not ASCII".to_string())
        })?;
        name.parse()
    }
}

impl FromStr for MechanismName {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "NULL" => Ok(Self::Null),
            "PLAIN" => Ok(Self::Plain),
            "GSSAPI" => Ok(Self::Gssapi),
            _ => Err(ProtocolError::ConfigError(format!(
                "Unsupported security mechanism: {s}"
            ))),
        }
    }
}

impl fmt::Display for MechanismName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ZMTP socket types, used for the `Socket-Type` property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SocketType {
    Pair,
    Pub,
    Sub,
    Req,
    Rep,
    Dealer,
    Router,
    Pull,
    Push,
    XPub,
    XSub,
    Stream,
    Server,
    Client,
    Radio,
    Dish,
    Gather,
    Scatter,
    Dgram,
    Peer,
    Channel,
}

impl SocketType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pair => "PAIR",
            Self::Pub => "PUB",
            Self::Sub => "SUB",
            Self::Req => "REQ",
            Self::Rep => "REP",
            Self::Dealer => "DEALER",
            Self::Router => "ROUTER",
            Self::Pull => "PULL",
            Self::Push => "PUSH",
            Self::XPub => "XPUB",
            Self::XSub => "XSUB",
            Self::Stream => "STREAM",
            Self::Server => "SERVER",
            Self::Client => "CLIENT",
            Self::Radio => "RADIO",
            Self::Dish => "DISH",
            Self::Gather => "GATHER",
            Self::Scatter => "SCATTER",
            Self::Dgram => "DGRAM",
            Self::Peer => "PEER",
            Self::Channel => "CHANNEL",
        }
    }

    /// Whether a peer announcing `peer` may talk to a socket of this type
    pub fn is_compatible(&self, peer: &str) -> bool {
        use SocketType::*;

        let allowed: &[SocketType] = match self {
            Req => &[Rep, Router],
            Rep => &[Req, Dealer],
            Dealer => &[Rep, Dealer, Router],
            Router => &[Req, Dealer, Router],
            Push => &[Pull],
            Pull => &[Push],
            Pub | XPub => &[Sub, XSub],
            Sub | XSub => &[Pub, XPub],
            Pair => &[Pair],
            Server => &[Client],
            Client => &[Server],
            Radio => &[Dish],
            Dish => &[Radio],
            Gather => &[Scatter],
            Scatter => &[Gather],
            Dgram => &[Dgram],
            Peer => &[Peer],
            Channel => &[Channel],
            Stream => &[],
        };

        allowed.iter().any(|t| t.as_str() == peer)
    }

    /// Sockets that announce their routing id as the `Identity` property
    fn sends_identity(&self) -> bool {
        matches!(self, Self::Req | Self::Dealer | Self::Router)
    }
}

/// State shared by every mechanism: our options and what the peer told us.
#[derive(Debug, Clone)]
pub struct MechanismBase {
    socket_type: SocketType,
    routing_id: Vec<u8>,
    metadata: BTreeMap<String, String>,
    peer_properties: Properties,
}

impl MechanismBase {
    pub fn new(config: &SecurityConfig) -> Self {
        Self {
            socket_type: config.socket_type,
            routing_id: config
                .routing_id
                .as_deref()
                .map(|id| id.as_bytes().to_vec())
                .unwrap_or_default(),
            metadata: config.metadata.clone(),
            peer_properties: Properties::new(),
        }
    }

    pub fn socket_type(&self) -> SocketType {
        self.socket_type
    }

    pub fn peer_properties(&self) -> &Properties {
        &self.peer_properties
    }

    /// Routing id the peer announced, if any
    pub fn peer_routing_id(&self) -> Option<&[u8]> {
        self.peer_properties.get(metadata::IDENTITY_PROPERTY)
    }

    /// Encoded size of [`add_basic_properties`](Self::add_basic_properties)
    pub fn basic_properties_len(&self) -> usize {
        let mut len = metadata::property_len(
            metadata::SOCKET_TYPE_PROPERTY,
            self.socket_type.as_str().len(),
        );
        if self.socket_type.sends_identity() {
            len += metadata::property_len(metadata::IDENTITY_PROPERTY, self.routing_id.len());
        }
        for (name, value) in &self.metadata {
            len += metadata::property_len(name, value.len());
        }
        len
    }

    /// Socket type, identity and application metadata
    pub fn add_basic_properties(&self, buf: &mut BytesMut) -> Result<()> {
        metadata::add_property(
            buf,
            metadata::SOCKET_TYPE_PROPERTY,
            self.socket_type.as_str().as_bytes(),
        )?;
        if self.socket_type.sends_identity() {
            metadata::add_property(buf, metadata::IDENTITY_PROPERTY, &self.routing_id)?;
        }
        for (name, value) in &self.metadata {
            metadata::add_property(buf, name, value.as_bytes())?;
        }
        Ok(())
    }

    /// `name` followed by the basic properties
    pub fn make_command_with_basic_properties(&self, name: &[u8]) -> Result<Message> {
        let mut buf = BytesMut::with_capacity(name.len() + self.basic_properties_len());
        buf.put_slice(name);
        self.add_basic_properties(&mut buf)?;
        Ok(Message::command(buf.freeze()))
    }

    /// Parse and retain the peer's metadata, checking its socket type.
    pub fn parse_metadata(&mut self, data: &[u8]) -> Result<()> {
        let properties = Properties::from_block(data)?;
        let peer_type = properties
            .get(metadata::SOCKET_TYPE_PROPERTY)
            .map(String::from_utf8_lossy)
            .ok_or_else(|| {
                ProtocolError::MalformedCommand("peer metadata has no Socket-Type".to_string())
            })?;
        if !self.socket_type.is_compatible(&peer_type) {
            warn!(
                local = self.socket_type.as_str(),
                peer = %peer_type,
                "Rejecting incompatible peer socket type"
            );
            return Err(ProtocolError::HandshakeSequence(format!(
                "{}: {} cannot talk to {peer_type}",
                constants::ERR_INVALID_SOCKET_TYPE,
                self.socket_type.as_str()
            )));
        }

        debug!(count = properties.len(), "Parsed peer metadata");
        self.peer_properties = properties;
        Ok(())
    }
}

/// Reject empty commands and commands whose name overruns the frame
pub fn check_basic_command_structure(msg: &Message) -> Result<()> {
    let data = msg.data();
    if data.is_empty() || data.len() <= data[0] as usize {
        return Err(ProtocolError::MalformedCommand(
            constants::ERR_MALFORMED_COMMAND.into(),
        ));
    }
    Ok(())
}

/// Turn a peer's ERROR command into the error reported to the engine
pub fn process_error_command(data: &[u8]) -> ProtocolError {
    let fixed = ERROR_COMMAND.len() + 1;
    if data.len() < fixed {
        return ProtocolError::MalformedCommand("ERROR command too short".to_string());
    }
    let reason_len = data[ERROR_COMMAND.len()] as usize;
    if data.len() != fixed + reason_len {
        return ProtocolError::MalformedCommand("ERROR reason length mismatch".to_string());
    }
    handle_error_reason(&data[fixed..])
}

/// ZAP status codes `300`, `400` and `500` are reported as such; anything else verbatim
pub fn handle_error_reason(reason: &[u8]) -> ProtocolError {
    if let [class @ b'3'..=b'5', b'0', b'0'] = reason {
        let status_code = u32::from(class - b'0') * 100;
        warn!(status_code, "Peer reported authentication failure");
        return ProtocolError::PeerRejected(format!("status {status_code}"));
    }
    ProtocolError::PeerRejected(String::from_utf8_lossy(reason).into_owned())
}
