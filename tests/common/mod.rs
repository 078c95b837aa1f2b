//! Shared helpers for integration tests.
//!
//! [`MockContext`] stands in for a GSSAPI library: it authenticates through a
//! scripted token exchange and wraps messages with ChaCha20-Poly1305, so a
//! tampered MESSAGE genuinely fails to unwrap.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use std::sync::{Arc, Mutex};
use zmtp_connect::config::SecurityConfig;
use zmtp_connect::protocol::gssapi::{
    GssError, InitOutcome, InitRequest, SecurityContext, Unwrapped,
};
use zmtp_connect::protocol::mechanism::{MechanismName, SocketType, READY_COMMAND};
use zmtp_connect::protocol::metadata;
use zmtp_connect::protocol::Message;

/// First token a client sends
pub const CLIENT_HELLO: &[u8] = b"krb-ap-req";
/// Server reply that completes the context with nothing left to send
pub const COMPLETE: &[u8] = b"complete";
/// Server reply that completes the context with a final client token
pub const COMPLETE_WITH_FINAL: &[u8] = b"complete+final";
/// Final client token produced for [`COMPLETE_WITH_FINAL`]
pub const FINAL_TOKEN: &[u8] = b"final";
/// Server reply that asks for another round
pub const MORE: &[u8] = b"more";
/// Client token produced for [`MORE`]
pub const AGAIN: &[u8] = b"again";
/// Server reply the library refuses
pub const REJECT: &[u8] = b"reject";

const NONCE_LEN: usize = 12;
const CONFIDENTIAL: u8 = 1;

/// In-memory security context; see the module docs.
pub struct MockContext {
    cipher: ChaCha20Poly1305,
    direction: u8,
    counter: u64,
    confidentiality: bool,
    targets: Arc<Mutex<Vec<String>>>,
}

impl MockContext {
    /// Client and server contexts sharing one key
    pub fn pair() -> (Self, Self) {
        let key = [0x42u8; 32];
        (Self::new(&key, 0), Self::new(&key, 1))
    }

    fn new(key: &[u8; 32], direction: u8) -> Self {
        Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(key)),
            direction,
            counter: 0,
            confidentiality: true,
            targets: Arc::default(),
        }
    }

    /// Wrap with integrity protection only
    pub fn without_confidentiality(mut self) -> Self {
        self.confidentiality = false;
        self
    }

    /// Service names seen by `init_sec_context`, shared with the test
    pub fn targets(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.targets)
    }
}

impl SecurityContext for MockContext {
    fn init_sec_context(&mut self, request: InitRequest<'_>) -> Result<InitOutcome, GssError> {
        self.targets
            .lock()
            .unwrap()
            .push(request.target.name().to_string());

        match request.input_token {
            None => Ok(InitOutcome::ContinueNeeded(CLIENT_HELLO.to_vec())),
            Some(COMPLETE) => Ok(InitOutcome::Complete(Vec::new())),
            Some(COMPLETE_WITH_FINAL) => Ok(InitOutcome::Complete(FINAL_TOKEN.to_vec())),
            Some(MORE) => Ok(InitOutcome::ContinueNeeded(AGAIN.to_vec())),
            Some(_) => Err(GssError::new(0x0009_0000, 0, "defective token")),
        }
    }

    fn wrap(&mut self, plaintext: &[u8], confidential: bool) -> Result<Vec<u8>, GssError> {
        let flag = u8::from(confidential && self.confidentiality);
        let mut nonce = [0u8; NONCE_LEN];
        nonce[0] = self.direction;
        nonce[4..].copy_from_slice(&self.counter.to_be_bytes());
        self.counter += 1;

        let sealed = self
            .cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: plaintext,
                    aad: &[flag],
                },
            )
            .map_err(|_| GssError::new(1, 0, "seal failed"))?;

        let mut token = Vec::with_capacity(1 + NONCE_LEN + sealed.len());
        token.push(flag);
        token.extend_from_slice(&nonce);
        token.extend_from_slice(&sealed);
        Ok(token)
    }

    fn unwrap(&mut self, token: &[u8]) -> Result<Unwrapped, GssError> {
        if token.len() < 1 + NONCE_LEN {
            return Err(GssError::new(1, 0, "token too short"));
        }
        let (flag, rest) = token.split_at(1);
        let (nonce, sealed) = rest.split_at(NONCE_LEN);
        let data = self
            .cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: sealed,
                    aad: flag,
                },
            )
            .map_err(|_| GssError::new(0x0006_0000, 0, "bad integrity check"))?;
        Ok(Unwrapped {
            data,
            confidential: flag[0] == CONFIDENTIAL,
        })
    }
}

/// GSSAPI client options for `service`
pub fn gssapi_config(service: &str, plaintext: bool) -> SecurityConfig {
    let mut config = SecurityConfig::default();
    config.mechanism = MechanismName::Gssapi;
    config.gssapi.service_principal = service.to_string();
    config.gssapi.plaintext = plaintext;
    config
}

/// A server's READY for a ROUTER socket, unwrapped
pub fn server_ready() -> Message {
    command_with_socket_type(READY_COMMAND, SocketType::Router)
}

/// `name` followed by a metadata block announcing `socket_type`
pub fn command_with_socket_type(name: &[u8], socket_type: SocketType) -> Message {
    let mut buf = bytes::BytesMut::from(name);
    metadata::add_property(
        &mut buf,
        metadata::SOCKET_TYPE_PROPERTY,
        socket_type.as_str().as_bytes(),
    )
    .expect("socket type fits");
    Message::command(buf.freeze())
}

/// An ERROR command carrying `reason`
pub fn error_command(reason: &str) -> Message {
    let mut data = b"\x05ERROR".to_vec();
    data.push(reason.len() as u8);
    data.extend_from_slice(reason.as_bytes());
    Message::command(data)
}
