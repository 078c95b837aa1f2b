//! End-to-end GSSAPI client handshakes against the in-memory security context

#![cfg(feature = "gssapi")]
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use common::*;
use zmtp_connect::config::TransportConfig;
use zmtp_connect::protocol::gssapi::wire::{self, MESSAGE_COMMAND};
use zmtp_connect::protocol::gssapi::{ClientState, GssapiClient};
use zmtp_connect::protocol::mechanism::{Mechanism, SocketType, Status, READY_COMMAND};
use zmtp_connect::protocol::{client_mechanism, Message, MechanismName};
use zmtp_connect::transport::Address;
use zmtp_connect::ProtocolError;

/// Client driven to `Connected` with an encrypting server context
fn connected_client() -> (GssapiClient, MockContext) {
    let (client_ctx, mut server_ctx) = MockContext::pair();
    let mut client =
        GssapiClient::new(&gssapi_config("service@host", false), Box::new(client_ctx)).unwrap();

    client.next_handshake_command().unwrap().unwrap();
    client
        .process_handshake_command(wire::produce_initiate(COMPLETE).unwrap())
        .unwrap();
    client.next_handshake_command().unwrap().unwrap();
    let ready = wire::encode_message(&mut server_ctx, &server_ready()).unwrap();
    client.process_handshake_command(ready).unwrap();
    assert_eq!(client.status(), Status::Ready);
    (client, server_ctx)
}

#[test]
fn test_full_handshake_then_round_trip() {
    let (client_ctx, mut server_ctx) = MockContext::pair();
    let targets = client_ctx.targets();
    let mut client =
        GssapiClient::new(&gssapi_config("service@host", false), Box::new(client_ctx)).unwrap();
    assert_eq!(client.state(), ClientState::CallNextInit);

    let first = client.next_handshake_command().unwrap().expect("token due");
    let token = wire::process_initiate(&first).unwrap();
    assert!(!token.is_empty());
    assert_eq!(&token[..], CLIENT_HELLO);
    assert_eq!(client.state(), ClientState::RecvNextToken);
    assert!(client.next_handshake_command().unwrap().is_none());

    client
        .process_handshake_command(wire::produce_initiate(COMPLETE).unwrap())
        .unwrap();
    assert_eq!(client.state(), ClientState::SendReady);
    assert!(client.security_context_established());
    assert_eq!(client.status(), Status::Handshaking);

    let ready = client.next_handshake_command().unwrap().expect("READY due");
    assert!(ready.is_named(MESSAGE_COMMAND));
    let inner = wire::decode_message(&mut server_ctx, &ready).unwrap();
    assert!(inner.is_command());
    assert!(inner.is_named(READY_COMMAND));
    assert_eq!(client.state(), ClientState::RecvReady);

    let reply = wire::encode_message(&mut server_ctx, &server_ready()).unwrap();
    client.process_handshake_command(reply).unwrap();
    assert_eq!(client.state(), ClientState::Connected);
    assert_eq!(client.status(), Status::Ready);
    assert!(client.security_context_established());
    assert!(client.next_handshake_command().unwrap().is_none());

    let original = Message::new(&b"market data"[..]).with_more(true);
    let encoded = client.encode(original.clone()).unwrap();
    assert!(encoded.is_named(MESSAGE_COMMAND));
    assert_ne!(encoded.data(), original.data());
    let decoded = client.decode(encoded).unwrap();
    assert_eq!(decoded, original);

    assert_eq!(*targets.lock().unwrap(), ["service@host", "service@host"]);
}

#[test]
fn test_server_reads_client_traffic() {
    let (mut client, mut server_ctx) = connected_client();
    let encoded = client.encode(Message::new(&b"order 17"[..])).unwrap();
    let seen = wire::decode_message(&mut server_ctx, &encoded).unwrap();
    assert_eq!(seen.data(), b"order 17");
    assert!(!seen.is_more());

    let reply = wire::encode_message(&mut server_ctx, &Message::new(&b"ack"[..])).unwrap();
    assert_eq!(client.decode(reply).unwrap().data(), b"ack");
}

#[test]
fn test_multiple_token_rounds() {
    let (client_ctx, _server_ctx) = MockContext::pair();
    let mut client =
        GssapiClient::new(&gssapi_config("service@host", true), Box::new(client_ctx)).unwrap();

    client.next_handshake_command().unwrap().unwrap();
    client
        .process_handshake_command(wire::produce_initiate(MORE).unwrap())
        .unwrap();
    assert_eq!(client.state(), ClientState::CallNextInit);
    assert!(!client.security_context_established());

    let second = client.next_handshake_command().unwrap().unwrap();
    assert_eq!(&wire::process_initiate(&second).unwrap()[..], AGAIN);
    assert_eq!(client.state(), ClientState::RecvNextToken);

    client
        .process_handshake_command(wire::produce_initiate(COMPLETE).unwrap())
        .unwrap();
    assert_eq!(client.state(), ClientState::SendReady);

    let ready = client.next_handshake_command().unwrap().unwrap();
    assert!(ready.is_named(READY_COMMAND));
    client.process_handshake_command(server_ready()).unwrap();
    assert_eq!(client.status(), Status::Ready);
}

#[test]
fn test_final_token_flushed_before_ready() {
    let (client_ctx, _server_ctx) = MockContext::pair();
    let mut client =
        GssapiClient::new(&gssapi_config("service@host", true), Box::new(client_ctx)).unwrap();

    client.next_handshake_command().unwrap();
    client
        .process_handshake_command(wire::produce_initiate(COMPLETE_WITH_FINAL).unwrap())
        .unwrap();
    assert!(client.security_context_established());
    assert_eq!(client.state(), ClientState::CallNextInit);

    let last = client.next_handshake_command().unwrap().unwrap();
    assert_eq!(&wire::process_initiate(&last).unwrap()[..], FINAL_TOKEN);
    assert_eq!(client.state(), ClientState::SendReady);
    assert!(client
        .next_handshake_command()
        .unwrap()
        .unwrap()
        .is_named(READY_COMMAND));
}

#[test]
fn test_wrong_kind_is_a_sequence_error() {
    let (client_ctx, mut server_ctx) = MockContext::pair();
    let mut client =
        GssapiClient::new(&gssapi_config("service@host", false), Box::new(client_ctx)).unwrap();
    client.next_handshake_command().unwrap();

    let wrapped_ready = wire::encode_message(&mut server_ctx, &server_ready()).unwrap();
    let err = client.process_handshake_command(wrapped_ready).unwrap_err();
    assert!(matches!(err, ProtocolError::HandshakeSequence(_)));
    assert_eq!(client.state(), ClientState::RecvNextToken);
    assert_eq!(client.status(), Status::Error);

    // nothing further is produced or accepted
    assert!(client.next_handshake_command().unwrap().is_none());
    assert!(client
        .process_handshake_command(wire::produce_initiate(COMPLETE).unwrap())
        .is_err());
}

#[test]
fn test_traffic_before_connected_is_refused() {
    let (client_ctx, _server_ctx) = MockContext::pair();
    let mut client =
        GssapiClient::new(&gssapi_config("service@host", false), Box::new(client_ctx)).unwrap();

    for step in 0..3 {
        assert!(
            matches!(
                client.encode(Message::new(&b"early"[..])),
                Err(ProtocolError::NotReady)
            ),
            "encode must fail at step {step}"
        );
        assert!(matches!(
            client.decode(Message::new(&b"early"[..])),
            Err(ProtocolError::NotReady)
        ));
        match step {
            0 => {
                client.next_handshake_command().unwrap();
            }
            1 => client
                .process_handshake_command(wire::produce_initiate(COMPLETE).unwrap())
                .unwrap(),
            _ => {
                client.next_handshake_command().unwrap();
            }
        }
    }
    assert_eq!(client.state(), ClientState::RecvReady);
    assert_eq!(client.status(), Status::Handshaking);
}

#[test]
fn test_corrupted_message_is_an_integrity_error() {
    let (mut client, mut server_ctx) = connected_client();
    let encoded = wire::encode_message(&mut server_ctx, &Message::new(&b"balance=100"[..])).unwrap();

    let mut bytes = encoded.data().to_vec();
    let middle = bytes.len() / 2;
    bytes[middle] ^= 0x80;
    let err = client
        .decode(Message::from_parts(bytes, encoded.flags()))
        .unwrap_err();
    assert!(matches!(err, ProtocolError::Integrity(_)));
    assert_eq!(client.status(), Status::Error);
}

#[test]
fn test_every_byte_is_protected() {
    let (mut client_ctx, mut server_ctx) = MockContext::pair();
    let encoded = wire::encode_message(&mut server_ctx, &Message::new(&b"payload"[..])).unwrap();

    for i in 0..encoded.len() {
        let mut bytes = encoded.data().to_vec();
        bytes[i] ^= 0x01;
        let result = wire::decode_message(&mut client_ctx, &Message::from_parts(bytes, 0));
        assert!(
            matches!(result, Err(ProtocolError::Integrity(_))),
            "corrupting byte {i} must not decode"
        );
    }
}

#[test]
fn test_integrity_only_peer_is_rejected() {
    let (client_ctx, server_ctx) = MockContext::pair();
    let mut server_ctx = server_ctx.without_confidentiality();
    let mut client =
        GssapiClient::new(&gssapi_config("service@host", false), Box::new(client_ctx)).unwrap();
    client.next_handshake_command().unwrap();
    client
        .process_handshake_command(wire::produce_initiate(COMPLETE).unwrap())
        .unwrap();
    client.next_handshake_command().unwrap();

    let ready = wire::encode_message(&mut server_ctx, &server_ready()).unwrap();
    assert!(matches!(
        client.process_handshake_command(ready),
        Err(ProtocolError::Integrity(_))
    ));
    assert_eq!(client.status(), Status::Error);
}

#[test]
fn test_plaintext_mode_passes_traffic_through() {
    let (client_ctx, _server_ctx) = MockContext::pair();
    let mut client =
        GssapiClient::new(&gssapi_config("service@host", true), Box::new(client_ctx)).unwrap();
    assert!(!client.is_encrypting());

    client.next_handshake_command().unwrap();
    client
        .process_handshake_command(wire::produce_initiate(COMPLETE).unwrap())
        .unwrap();
    let ready = client.next_handshake_command().unwrap().unwrap();
    assert!(ready.is_named(READY_COMMAND));
    client.process_handshake_command(server_ready()).unwrap();

    let msg = Message::new(&b"clear"[..]);
    assert_eq!(client.encode(msg.clone()).unwrap(), msg);
    assert_eq!(client.decode(msg.clone()).unwrap(), msg);
}

#[test]
fn test_library_rejection_is_fatal() {
    let (client_ctx, _server_ctx) = MockContext::pair();
    let mut client =
        GssapiClient::new(&gssapi_config("service@host", true), Box::new(client_ctx)).unwrap();
    client.next_handshake_command().unwrap();

    let err = client
        .process_handshake_command(wire::produce_initiate(REJECT).unwrap())
        .unwrap_err();
    match err {
        ProtocolError::SecurityContext(msg) => assert!(msg.contains("defective token")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(client.status(), Status::Error);
}

#[test]
fn test_peer_error_command() {
    let (client_ctx, _server_ctx) = MockContext::pair();
    let mut client =
        GssapiClient::new(&gssapi_config("service@host", true), Box::new(client_ctx)).unwrap();
    client.next_handshake_command().unwrap();

    match client.process_handshake_command(error_command("400")) {
        Err(ProtocolError::PeerRejected(reason)) => assert_eq!(reason, "status 400"),
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(client.status(), Status::Error);
}

#[test]
fn test_incompatible_peer_socket_type() {
    let (client_ctx, _server_ctx) = MockContext::pair();
    let mut client =
        GssapiClient::new(&gssapi_config("service@host", true), Box::new(client_ctx)).unwrap();
    client.next_handshake_command().unwrap();
    client
        .process_handshake_command(wire::produce_initiate(COMPLETE).unwrap())
        .unwrap();
    client.next_handshake_command().unwrap();

    let ready = command_with_socket_type(READY_COMMAND, SocketType::Pub);
    assert!(matches!(
        client.process_handshake_command(ready),
        Err(ProtocolError::HandshakeSequence(_))
    ));
}

#[test]
fn test_service_name_completed_from_peer_address() {
    let parent = TransportConfig::default();
    let mut peer = Address::new("tcp", "127.0.0.1:5555", &parent);
    peer.resolve(false).unwrap();

    let (client_ctx, _server_ctx) = MockContext::pair();
    let targets = client_ctx.targets();
    let mut client =
        GssapiClient::for_peer(&gssapi_config("zmq", false), &peer, Box::new(client_ctx)).unwrap();
    assert_eq!(client.service_name().name(), "zmq@127.0.0.1");

    client.next_handshake_command().unwrap();
    assert_eq!(*targets.lock().unwrap(), ["zmq@127.0.0.1"]);

    // a complete principal is used as is
    let (client_ctx, _) = MockContext::pair();
    let client = GssapiClient::for_peer(
        &gssapi_config("zmq@broker.example", false),
        &peer,
        Box::new(client_ctx),
    )
    .unwrap();
    assert_eq!(client.service_name().name(), "zmq@broker.example");
}

#[test]
fn test_service_name_needs_resolved_peer() {
    let parent = TransportConfig::default();
    let peer = Address::new("tcp", "127.0.0.1:5555", &parent);
    let (client_ctx, _) = MockContext::pair();
    assert!(matches!(
        GssapiClient::for_peer(&gssapi_config("zmq", false), &peer, Box::new(client_ctx)),
        Err(ProtocolError::ConfigError(_))
    ));
}

#[test]
fn test_factory_builds_gssapi_client() {
    let (client_ctx, _) = MockContext::pair();
    let mut mechanism =
        client_mechanism(&gssapi_config("service@host", false), Some(Box::new(client_ctx)))
            .unwrap();
    assert_eq!(mechanism.name(), MechanismName::Gssapi);
    assert!(mechanism.next_handshake_command().unwrap().is_some());
}
