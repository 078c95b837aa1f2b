use crate::config::SecurityConfig;
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::mechanism::{
    check_basic_command_structure, process_error_command, Mechanism, MechanismBase,
    MechanismName, Status, ERROR_COMMAND, READY_COMMAND,
};
use crate::protocol::message::Message;
use crate::protocol::metadata::Properties;
use tracing::{debug, instrument};

/// NULL mechanism: no authentication, one READY command each way.
#[derive(Debug)]
pub struct NullMechanism {
    base: MechanismBase,
    ready_command_sent: bool,
    ready_command_received: bool,
    error_command_received: bool,
}

impl NullMechanism {
    pub fn new(config: &SecurityConfig) -> Self {
        Self {
            base: MechanismBase::new(config),
            ready_command_sent: false,
            ready_command_received: false,
            error_command_received: false,
        }
    }
}

impl Mechanism for NullMechanism {
    fn name(&self) -> MechanismName {
        MechanismName::Null
    }

    #[instrument(level = "debug", skip(self))]
    fn next_handshake_command(&mut self) -> Result<Option<Message>> {
        if self.ready_command_sent || self.error_command_received {
            return Ok(None);
        }

        let msg = self.base.make_command_with_basic_properties(READY_COMMAND)?;
        self.ready_command_sent = true;
        debug!("NULL mechanism sent READY");
        Ok(Some(msg))
    }

    #[instrument(level = "debug", skip(self, msg))]
    fn process_handshake_command(&mut self, msg: Message) -> Result<()> {
        if self.ready_command_received || self.error_command_received {
            return Err(ProtocolError::HandshakeSequence(
                constants::ERR_UNEXPECTED_COMMAND.into(),
            ));
        }
        check_basic_command_structure(&msg)?;

        if msg.is_named(READY_COMMAND) {
            self.base.parse_metadata(&msg.data()[READY_COMMAND.len()..])?;
            self.ready_command_received = true;
            debug!("NULL mechanism received READY");
            Ok(())
        } else if msg.is_named(ERROR_COMMAND) {
            self.error_command_received = true;
            Err(process_error_command(msg.data()))
        } else {
            Err(ProtocolError::HandshakeSequence(
                constants::ERR_UNEXPECTED_COMMAND.into(),
            ))
        }
    }

    fn status(&self) -> Status {
        if self.error_command_received {
            Status::Error
        } else if self.ready_command_sent && self.ready_command_received {
            Status::Ready
        } else {
            Status::Handshaking
        }
    }

    fn peer_properties(&self) -> &Properties {
        self.base.peer_properties()
    }
}
