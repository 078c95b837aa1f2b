//! GSSAPI command framing.
//!
//! ```text
//! INITIATE: "\x08INITIATE" [token-len(4, big-endian)] [token]
//! MESSAGE:  "\x07MESSAGE"  [token-len(4, big-endian)] [wrapped token]
//! ```
//!
//! The plaintext inside a MESSAGE wrap is one flags byte (`0x01` more,
//! `0x02` command) followed by the frame payload.

use super::context::SecurityContext;
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::mechanism::INITIATE_COMMAND;
use crate::protocol::message::Message;
use bytes::{BufMut, Bytes, BytesMut};
use zeroize::Zeroizing;

pub const MESSAGE_COMMAND: &[u8] = b"\x07MESSAGE";

const LENGTH_SIZE: usize = 4;

/// Frame a context token as an INITIATE command
pub fn produce_initiate(token: &[u8]) -> Result<Message> {
    let token_len = u32::try_from(token.len()).map_err(|_| {
        ProtocolError::SecurityContext(format!("token too large: {} bytes", token.len()))
    })?;

    let mut buf = BytesMut::with_capacity(INITIATE_COMMAND.len() + LENGTH_SIZE + token.len());
    buf.put_slice(INITIATE_COMMAND);
    buf.put_u32(token_len);
    buf.put_slice(token);
    Ok(Message::command(buf.freeze()))
}

/// Extract the token carried by an INITIATE command
pub fn process_initiate(msg: &Message) -> Result<Zeroizing<Vec<u8>>> {
    let body = split_token(msg, INITIATE_COMMAND).ok_or_else(|| {
        ProtocolError::MalformedCommand(format!(
            "{}: bad INITIATE framing",
            constants::ERR_MALFORMED_COMMAND
        ))
    })?;
    Ok(Zeroizing::new(body.to_vec()))
}

/// Wrap `msg` with confidentiality into a MESSAGE command.
///
/// The outer frame keeps the flags of `msg` so the engine still sees the
/// multipart boundary.
pub fn encode_message(context: &mut dyn SecurityContext, msg: &Message) -> Result<Message> {
    let mut plaintext = Zeroizing::new(Vec::with_capacity(1 + msg.len()));
    plaintext.push(msg.flags());
    plaintext.extend_from_slice(msg.data());

    let wrapped = context
        .wrap(&plaintext, true)
        .map_err(|e| ProtocolError::SecurityContext(format!("{}: {e}", constants::ERR_WRAP_FAILED)))?;
    let token_len = u32::try_from(wrapped.len()).map_err(|_| {
        ProtocolError::SecurityContext(format!("wrapped token too large: {} bytes", wrapped.len()))
    })?;

    let mut buf = BytesMut::with_capacity(MESSAGE_COMMAND.len() + LENGTH_SIZE + wrapped.len());
    buf.put_slice(MESSAGE_COMMAND);
    buf.put_u32(token_len);
    buf.put_slice(&wrapped);
    Ok(Message::from_parts(buf.freeze(), msg.flags()))
}

/// Inverse of [`encode_message`]. Any framing, unwrap or confidentiality
/// failure is reported as [`ProtocolError::Integrity`].
pub fn decode_message(context: &mut dyn SecurityContext, msg: &Message) -> Result<Message> {
    let token = split_token(msg, MESSAGE_COMMAND)
        .ok_or_else(|| ProtocolError::Integrity("bad MESSAGE framing".to_string()))?;

    let unwrapped = context
        .unwrap(token)
        .map_err(|e| ProtocolError::Integrity(e.to_string()))?;
    let plaintext = Zeroizing::new(unwrapped.data);
    if !unwrapped.confidential {
        return Err(ProtocolError::Integrity(constants::ERR_NOT_ENCRYPTED.into()));
    }

    let (&flags, payload) = plaintext
        .split_first()
        .ok_or_else(|| ProtocolError::Integrity("wrapped payload has no flags".to_string()))?;
    Ok(Message::from_parts(Bytes::copy_from_slice(payload), flags))
}

/// The length-prefixed token after `name`, if the framing is exact
fn split_token<'m>(msg: &'m Message, name: &[u8]) -> Option<&'m [u8]> {
    let data = msg.data();
    if !msg.is_named(name) || data.len() < name.len() + LENGTH_SIZE {
        return None;
    }
    let (len_bytes, token) = data[name.len()..].split_at(LENGTH_SIZE);
    let token_len = u32::from_be_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]);
    (token.len() == token_len as usize).then_some(token)
}
