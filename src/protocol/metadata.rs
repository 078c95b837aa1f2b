//! ZMTP metadata codec.
//!
//! A metadata block is a sequence of properties, each encoded as
//!
//! ```text
//! [name-len(1)] [name] [value-len(4, big-endian)] [value]
//! ```
//!
//! READY and INITIATE commands of every mechanism carry one of these blocks
//! after their command name.

use crate::error::{constants, ProtocolError, Result};
use bytes::{Buf, BufMut, BytesMut};

pub const SOCKET_TYPE_PROPERTY: &str = "Socket-Type";
pub const IDENTITY_PROPERTY: &str = "Identity";
pub const USER_ID_PROPERTY: &str = "User-Id";

/// Properties received from a peer, in wire order.
///
/// Names are unique and compared ASCII case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: Vec<(String, Vec<u8>)>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a metadata block, rejecting repeated names.
    pub fn from_block(data: &[u8]) -> Result<Self> {
        let mut properties = Self::new();
        for (name, value) in parse(data)? {
            if properties.contains(&name) {
                return Err(ProtocolError::MalformedCommand(format!(
                    "{}: '{name}'",
                    constants::ERR_DUPLICATE_PROPERTY
                )));
            }
            properties.entries.push((name, value));
        }
        Ok(properties)
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Properties in the order the peer sent them
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Encoded size of a single property
pub fn property_len(name: &str, value_len: usize) -> usize {
    1 + name.len() + 4 + value_len
}

/// Append one property to `buf`. Names longer than 255 bytes are rejected.
pub fn add_property(buf: &mut BytesMut, name: &str, value: &[u8]) -> Result<()> {
    let name_len = u8::try_from(name.len()).map_err(|_| {
        ProtocolError::MalformedCommand(format!("property name too long: {}", name.len()))
    })?;
    let value_len = u32::try_from(value.len()).map_err(|_| {
        ProtocolError::MalformedCommand(format!("property value too long: {}", value.len()))
    })?;

    buf.reserve(property_len(name, value.len()));
    buf.put_u8(name_len);
    buf.put_slice(name.as_bytes());
    buf.put_u32(value_len);
    buf.put_slice(value);
    Ok(())
}

/// Parse a metadata block into its properties, in wire order.
pub fn parse(mut data: &[u8]) -> Result<Vec<(String, Vec<u8>)>> {
    let mut properties = Vec::new();

    while data.has_remaining() {
        let name_len = data.get_u8() as usize;
        if data.remaining() < name_len {
            return Err(malformed());
        }
        let name = std::str::from_utf8(&data[..name_len])
            .map_err(|_| malformed())?
            .to_string();
        data.advance(name_len);

        if data.remaining() < 4 {
            return Err(malformed());
        }
        let value_len = data.get_u32() as usize;
        if data.remaining() < value_len {
            return Err(malformed());
        }
        let value = data[..value_len].to_vec();
        data.advance(value_len);

        properties.push((name, value));
    }

    Ok(properties)
}

fn malformed() -> ProtocolError {
    ProtocolError::MalformedCommand(constants::ERR_MALFORMED_METADATA.into())
}
