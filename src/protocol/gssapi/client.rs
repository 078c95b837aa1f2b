use super::context::{
    ContextFlags, InitOutcome, InitRequest, Oid, SecurityContext, ServiceName,
};
use super::wire::{self, MESSAGE_COMMAND};
use crate::config::{NameType, SecurityConfig};
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::mechanism::{
    check_basic_command_structure, process_error_command, Mechanism, MechanismBase,
    MechanismName, Status, ERROR_COMMAND, INITIATE_COMMAND, READY_COMMAND,
};
use crate::protocol::message::Message;
use crate::protocol::metadata::Properties;
use crate::transport::Address;
use std::fmt;
use tracing::{debug, info, instrument, warn};
use zeroize::Zeroizing;

/// Handshake position of a [`GssapiClient`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Call the context and send whatever token it produces
    CallNextInit,
    /// Waiting for the server's next INITIATE token
    RecvNextToken,
    /// Context established; READY goes out next
    SendReady,
    /// Waiting for the server's READY
    RecvReady,
    Connected,
}

/// The single pending token. At most one exists at any time.
enum Token {
    /// Produced by the context, not yet sent
    Outbound(Zeroizing<Vec<u8>>),
    /// Received from the server, not yet fed to the context
    Inbound(Zeroizing<Vec<u8>>),
}

/// Client side of the GSSAPI mechanism.
///
/// Token exchange runs through [`SecurityContext`] until it reports the context
/// complete, then both sides exchange READY. Unless plaintext mode is configured,
/// READY and all application traffic travel wrapped in MESSAGE commands.
pub struct GssapiClient {
    base: MechanismBase,
    context: Box<dyn SecurityContext>,
    service_name: ServiceName,
    principal: Option<ServiceName>,
    mechanisms: Vec<Oid>,
    do_encryption: bool,
    state: ClientState,
    token: Option<Token>,
    security_context_established: bool,
    failed: bool,
}

impl fmt::Debug for GssapiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GssapiClient")
            .field("service_name", &self.service_name)
            .field("principal", &self.principal)
            .field("do_encryption", &self.do_encryption)
            .field("state", &self.state)
            .field("token_pending", &self.token.is_some())
            .field("established", &self.security_context_established)
            .field("failed", &self.failed)
            .finish_non_exhaustive()
    }
}

impl GssapiClient {
    /// Client authenticating to the configured service principal as given.
    pub fn new(config: &SecurityConfig, context: Box<dyn SecurityContext>) -> Result<Self> {
        let gss = &config.gssapi;
        let service_name = ServiceName::new(
            gss.service_principal.clone(),
            gss.service_principal_name_type,
        );
        Self::with_service_name(config, service_name, context)
    }

    /// Client for a connection to `peer`.
    ///
    /// A host-based service principal without a host part (`"zmq"` rather than
    /// `"zmq@broker.example"`) is completed with the peer's host.
    pub fn for_peer(
        config: &SecurityConfig,
        peer: &Address<'_>,
        context: Box<dyn SecurityContext>,
    ) -> Result<Self> {
        let gss = &config.gssapi;
        let mut name = gss.service_principal.clone();
        if gss.service_principal_name_type == NameType::HostBased && !name.contains('@') {
            let host = peer.host().ok_or_else(|| {
                ProtocolError::ConfigError(format!(
                    "cannot derive service principal from unresolved address {}://{}",
                    peer.protocol(),
                    peer.address()
                ))
            })?;
            name = format!("{name}@{host}");
        }
        let service_name = ServiceName::new(name, gss.service_principal_name_type);
        Self::with_service_name(config, service_name, context)
    }

    fn with_service_name(
        config: &SecurityConfig,
        service_name: ServiceName,
        context: Box<dyn SecurityContext>,
    ) -> Result<Self> {
        let gss = &config.gssapi;
        if service_name.name().is_empty() {
            return Err(ProtocolError::ConfigError(
                "GSSAPI service principal must not be empty".to_string(),
            ));
        }
        let mechanisms = gss
            .mechanisms
            .iter()
            .map(|oid| Oid::parse(oid))
            .collect::<Result<Vec<_>>>()?;
        if gss.plaintext {
            warn!("GSSAPI plaintext mode: application traffic will not be encrypted");
        }

        debug!(service = %service_name, "Created GSSAPI client");
        Ok(Self {
            base: MechanismBase::new(config),
            context,
            principal: gss
                .principal
                .as_ref()
                .map(|p| ServiceName::new(p.clone(), gss.principal_name_type)),
            service_name,
            mechanisms,
            do_encryption: !gss.plaintext,
            state: ClientState::CallNextInit,
            token: None,
            security_context_established: false,
            failed: false,
        })
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    pub fn service_name(&self) -> &ServiceName {
        &self.service_name
    }

    pub fn security_context_established(&self) -> bool {
        self.security_context_established
    }

    pub fn is_encrypting(&self) -> bool {
        self.do_encryption
    }

    fn context_flags(&self) -> ContextFlags {
        ContextFlags {
            mutual: true,
            replay: true,
            sequence: true,
            confidentiality: self.do_encryption,
            integrity: true,
        }
    }

    /// Record a fatal failure; status reports `Error` from here on.
    fn fail(&mut self, err: ProtocolError) -> ProtocolError {
        warn!(state = ?self.state, error = %err, "GSSAPI handshake failed");
        self.failed = true;
        err
    }

    fn unexpected(&mut self) -> ProtocolError {
        let err = ProtocolError::HandshakeSequence(format!(
            "{} in state {:?}",
            constants::ERR_UNEXPECTED_COMMAND,
            self.state
        ));
        self.fail(err)
    }

    /// Advance the security context with the pending inbound token, if any.
    fn initialize_context(&mut self) -> Result<()> {
        let input = match self.token.take() {
            Some(Token::Inbound(token)) => Some(token),
            Some(Token::Outbound(token)) => {
                self.token = Some(Token::Outbound(token));
                return Err(self.fail(ProtocolError::HandshakeSequence(
                    "outbound token not yet sent".to_string(),
                )));
            }
            None => None,
        };

        let flags = self.context_flags();
        let request = InitRequest {
            target: &self.service_name,
            principal: self.principal.as_ref(),
            mechanisms: &self.mechanisms,
            flags,
            input_token: input.as_deref().map(Vec::as_slice),
        };

        match self.context.init_sec_context(request) {
            Ok(InitOutcome::ContinueNeeded(output)) => {
                if output.is_empty() {
                    return Err(self.fail(ProtocolError::SecurityContext(
                        constants::ERR_EMPTY_CONTINUE_TOKEN.into(),
                    )));
                }
                debug!(token_len = output.len(), "Security context needs another round");
                self.token = Some(Token::Outbound(Zeroizing::new(output)));
            }
            Ok(InitOutcome::Complete(output)) => {
                self.security_context_established = true;
                info!(service = %self.service_name, "GSSAPI security context established");
                if !output.is_empty() {
                    self.token = Some(Token::Outbound(Zeroizing::new(output)));
                }
            }
            Err(err) => {
                return Err(self.fail(ProtocolError::SecurityContext(format!(
                    "security context initialization failed: {err}"
                ))));
            }
        }
        Ok(())
    }

    fn produce_ready(&mut self) -> Result<Message> {
        let ready = self
            .base
            .make_command_with_basic_properties(READY_COMMAND)
            .map_err(|e| self.fail(e))?;
        let msg = if self.do_encryption {
            wire::encode_message(self.context.as_mut(), &ready).map_err(|e| self.fail(e))?
        } else {
            ready
        };
        self.state = ClientState::RecvReady;
        debug!(encrypted = self.do_encryption, "GSSAPI client sent READY");
        Ok(msg)
    }

    fn process_next_token(&mut self, msg: &Message) -> Result<()> {
        if !msg.is_named(INITIATE_COMMAND) {
            return Err(self.unexpected());
        }
        let token = wire::process_initiate(msg).map_err(|e| self.fail(e))?;
        debug!(token_len = token.len(), "Received security context token");
        self.token = Some(Token::Inbound(token));
        self.initialize_context()?;

        self.state = if self.token.is_some() {
            ClientState::CallNextInit
        } else {
            ClientState::SendReady
        };
        Ok(())
    }

    fn process_ready(&mut self, msg: Message) -> Result<()> {
        let ready = if self.do_encryption {
            if !msg.is_named(MESSAGE_COMMAND) {
                return Err(self.unexpected());
            }
            wire::decode_message(self.context.as_mut(), &msg).map_err(|e| self.fail(e))?
        } else {
            msg
        };

        if !ready.is_named(READY_COMMAND) {
            return Err(self.unexpected());
        }
        check_basic_command_structure(&ready).map_err(|e| self.fail(e))?;
        self.base
            .parse_metadata(&ready.data()[READY_COMMAND.len()..])
            .map_err(|e| self.fail(e))?;

        self.state = ClientState::Connected;
        info!(
            encrypted = self.do_encryption,
            "GSSAPI handshake complete"
        );
        Ok(())
    }
}

impl Mechanism for GssapiClient {
    fn name(&self) -> MechanismName {
        MechanismName::Gssapi
    }

    #[instrument(level = "debug", skip(self), fields(state = ?self.state))]
    fn next_handshake_command(&mut self) -> Result<Option<Message>> {
        if self.failed {
            return Ok(None);
        }

        match self.state {
            ClientState::CallNextInit => {
                if self.token.is_none() {
                    self.initialize_context()?;
                }
                match self.token.take() {
                    Some(Token::Outbound(token)) => {
                        let msg = wire::produce_initiate(&token).map_err(|e| self.fail(e))?;
                        self.state = if self.security_context_established {
                            ClientState::SendReady
                        } else {
                            ClientState::RecvNextToken
                        };
                        debug!(token_len = token.len(), next = ?self.state, "Sent security context token");
                        Ok(Some(msg))
                    }
                    Some(Token::Inbound(token)) => {
                        self.token = Some(Token::Inbound(token));
                        Err(self.fail(ProtocolError::HandshakeSequence(
                            "received token not yet processed".to_string(),
                        )))
                    }
                    // complete with nothing left to flush
                    None => {
                        self.state = ClientState::SendReady;
                        self.produce_ready().map(Some)
                    }
                }
            }
            ClientState::SendReady => self.produce_ready().map(Some),
            ClientState::RecvNextToken | ClientState::RecvReady | ClientState::Connected => {
                Ok(None)
            }
        }
    }

    #[instrument(level = "debug", skip(self, msg), fields(state = ?self.state, len = msg.len()))]
    fn process_handshake_command(&mut self, msg: Message) -> Result<()> {
        if self.failed {
            return Err(ProtocolError::HandshakeSequence(
                constants::ERR_MECHANISM_FAILED.into(),
            ));
        }

        let receiving = matches!(
            self.state,
            ClientState::RecvNextToken | ClientState::RecvReady
        );
        if receiving && msg.is_named(ERROR_COMMAND) {
            let err = process_error_command(msg.data());
            return Err(self.fail(err));
        }

        match self.state {
            ClientState::RecvNextToken => self.process_next_token(&msg),
            ClientState::RecvReady => self.process_ready(msg),
            _ => Err(self.unexpected()),
        }
    }

    fn encode(&mut self, msg: Message) -> Result<Message> {
        if self.status() != Status::Ready {
            return Err(ProtocolError::NotReady);
        }
        if !self.do_encryption {
            return Ok(msg);
        }
        wire::encode_message(self.context.as_mut(), &msg).map_err(|e| self.fail(e))
    }

    fn decode(&mut self, msg: Message) -> Result<Message> {
        if self.status() != Status::Ready {
            return Err(ProtocolError::NotReady);
        }
        if !self.do_encryption {
            return Ok(msg);
        }
        wire::decode_message(self.context.as_mut(), &msg).map_err(|e| self.fail(e))
    }

    fn status(&self) -> Status {
        if self.failed {
            Status::Error
        } else if self.state == ClientState::Connected {
            Status::Ready
        } else {
            Status::Handshaking
        }
    }

    fn peer_properties(&self) -> &Properties {
        self.base.peer_properties()
    }
}
