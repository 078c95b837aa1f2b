use crate::config::SecurityConfig;
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::mechanism::{
    check_basic_command_structure, process_error_command, Mechanism, MechanismBase,
    MechanismName, Status, ERROR_COMMAND, INITIATE_COMMAND, READY_COMMAND,
};
use crate::protocol::message::Message;
use crate::protocol::metadata::Properties;
use bytes::{BufMut, BytesMut};
use tracing::{debug, instrument};
use zeroize::Zeroizing;

pub const HELLO_COMMAND: &[u8] = b"\x05HELLO";
pub const WELCOME_COMMAND: &[u8] = b"\x07WELCOME";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    SendingHello,
    WaitingForWelcome,
    SendingInitiate,
    WaitingForReady,
    ErrorCommandReceived,
    Ready,
}

/// Client side of the PLAIN mechanism: username and password in clear text.
pub struct PlainClient {
    base: MechanismBase,
    username: Zeroizing<String>,
    password: Zeroizing<String>,
    state: State,
}

impl std::fmt::Debug for PlainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlainClient")
            .field("username", &*self.username)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl PlainClient {
    pub fn new(config: &SecurityConfig) -> Result<Self> {
        let errors = config.plain.validate();
        if !errors.is_empty() {
            return Err(ProtocolError::ConfigError(errors.join("; ")));
        }

        Ok(Self {
            base: MechanismBase::new(config),
            username: Zeroizing::new(config.plain.username.clone()),
            password: Zeroizing::new(config.plain.password.clone()),
            state: State::SendingHello,
        })
    }

    fn produce_hello(&self) -> Message {
        let mut buf = BytesMut::with_capacity(
            HELLO_COMMAND.len() + 2 + self.username.len() + self.password.len(),
        );
        buf.put_slice(HELLO_COMMAND);
        // lengths were checked against one byte in `new`
        buf.put_u8(self.username.len() as u8);
        buf.put_slice(self.username.as_bytes());
        buf.put_u8(self.password.len() as u8);
        buf.put_slice(self.password.as_bytes());
        Message::command(buf.freeze())
    }

    fn process_welcome(&mut self, msg: &Message) -> Result<()> {
        if self.state != State::WaitingForWelcome {
            return Err(unexpected());
        }
        if msg.len() != WELCOME_COMMAND.len() {
            return Err(ProtocolError::MalformedCommand(
                "WELCOME carries no body".to_string(),
            ));
        }
        self.state = State::SendingInitiate;
        Ok(())
    }

    fn process_ready(&mut self, msg: &Message) -> Result<()> {
        if self.state != State::WaitingForReady {
            return Err(unexpected());
        }
        self.base.parse_metadata(&msg.data()[READY_COMMAND.len()..])?;
        self.state = State::Ready;
        Ok(())
    }

    fn process_error(&mut self, msg: &Message) -> Result<()> {
        if !matches!(
            self.state,
            State::WaitingForWelcome | State::WaitingForReady
        ) {
            return Err(unexpected());
        }
        self.state = State::ErrorCommandReceived;
        Err(process_error_command(msg.data()))
    }
}

fn unexpected() -> ProtocolError {
    ProtocolError::HandshakeSequence(constants::ERR_UNEXPECTED_COMMAND.into())
}

impl Mechanism for PlainClient {
    fn name(&self) -> MechanismName {
        MechanismName::Plain
    }

    #[instrument(level = "debug", skip(self), fields(state = ?self.state))]
    fn next_handshake_command(&mut self) -> Result<Option<Message>> {
        match self.state {
            State::SendingHello => {
                let msg = self.produce_hello();
                self.state = State::WaitingForWelcome;
                debug!("PLAIN client sent HELLO");
                Ok(Some(msg))
            }
            State::SendingInitiate => {
                let msg = self
                    .base
                    .make_command_with_basic_properties(INITIATE_COMMAND)?;
                self.state = State::WaitingForReady;
                debug!("PLAIN client sent INITIATE");
                Ok(Some(msg))
            }
            _ => Ok(None),
        }
    }

    #[instrument(level = "debug", skip(self, msg), fields(state = ?self.state))]
    fn process_handshake_command(&mut self, msg: Message) -> Result<()> {
        check_basic_command_structure(&msg)?;

        if msg.is_named(WELCOME_COMMAND) {
            self.process_welcome(&msg)
        } else if msg.is_named(READY_COMMAND) {
            self.process_ready(&msg)
        } else if msg.is_named(ERROR_COMMAND) {
            self.process_error(&msg)
        } else {
            Err(unexpected())
        }
    }

    fn status(&self) -> Status {
        match self.state {
            State::Ready => Status::Ready,
            State::ErrorCommandReceived => Status::Error,
            _ => Status::Handshaking,
        }
    }

    fn peer_properties(&self) -> &Properties {
        self.base.peer_properties()
    }
}
