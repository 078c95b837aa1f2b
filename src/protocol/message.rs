use bytes::Bytes;

/// Flag bit carried in the first byte of a wrapped GSSAPI plaintext: more frames follow
pub const FLAG_MORE: u8 = 0x01;
/// Flag bit carried in the first byte of a wrapped GSSAPI plaintext: frame is a command
pub const FLAG_COMMAND: u8 = 0x02;

/// A single frame exchanged with the engine, either application payload or a
/// handshake command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    data: Bytes,
    more: bool,
    command: bool,
}

impl Message {
    /// Create an application frame
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            more: false,
            command: false,
        }
    }

    /// Create a command frame
    pub fn command(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            more: false,
            command: true,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Bytes {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_more(&self) -> bool {
        self.more
    }

    pub fn is_command(&self) -> bool {
        self.command
    }

    pub fn set_more(&mut self, more: bool) {
        self.more = more;
    }

    pub fn set_command(&mut self, command: bool) {
        self.command = command;
    }

    /// Builder form of [`set_more`](Self::set_more)
    pub fn with_more(mut self, more: bool) -> Self {
        self.more = more;
        self
    }

    /// Flags as encoded inside a wrapped payload
    pub fn flags(&self) -> u8 {
        let mut flags = 0;
        if self.more {
            flags |= FLAG_MORE;
        }
        if self.command {
            flags |= FLAG_COMMAND;
        }
        flags
    }

    /// Rebuild a frame from a payload and its encoded flags
    pub fn from_parts(data: impl Into<Bytes>, flags: u8) -> Self {
        Self {
            data: data.into(),
            more: flags & FLAG_MORE != 0,
            command: flags & FLAG_COMMAND != 0,
        }
    }

    /// Whether this frame is the ZMTP command named by `name` (length-prefixed)
    pub fn is_named(&self, name: &[u8]) -> bool {
        self.data.starts_with(name)
    }
}
