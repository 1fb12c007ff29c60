//! Tests for the byte-level handshake between the nodes.

mod common;

use common::*;
use door_lock::link::*;
use door_lock::Credential;

// ============================================================================
// Code tables
// ============================================================================

#[test]
fn test_wire_codes() {
    assert_eq!(Intent::Unlock.code(), b'+');
    assert_eq!(Intent::Change.code(), 0x18);
    assert_eq!(Outcome::UnlockGranted.code(), 0x25);
    assert_eq!(Outcome::WrongCredential.code(), 0x30);
    assert_eq!(Outcome::ChangeAccepted.code(), 0x31);
    assert_eq!(SetupOutcome::Match.code(), 1);
    assert_eq!(SetupOutcome::Mismatch.code(), 0);
}

#[test]
fn test_unknown_codes_are_rejected() {
    assert_eq!(Intent::try_from(0x00), Err(ProtocolError::UnknownIntent(0x00)));
    assert_eq!(Intent::try_from(b'-'), Err(ProtocolError::UnknownIntent(b'-')));
    assert_eq!(Outcome::try_from(0x26), Err(ProtocolError::UnknownOutcome(0x26)));
    assert_eq!(
        SetupOutcome::try_from(2),
        Err(ProtocolError::UnknownSetupOutcome(2))
    );
}

#[test]
fn test_protocol_error_display() {
    assert_eq!(
        ProtocolError::UnknownIntent(0x7F).to_string(),
        "unknown intent byte 0x7F"
    );
    assert_eq!(
        ProtocolError::Link(LinkError::Closed).to_string(),
        "serial channel closed"
    );
}

// ============================================================================
// Credential transfer
// ============================================================================

#[test]
fn test_offer_waits_for_receive_ready() {
    let mut link = Link::new(ScriptedLink::new(vec![RECEIVE_READY]));
    link.offer_credential(&Credential::new([1, 2, 3, 4, 5])).unwrap();

    assert_eq!(link.channel().tx, vec![SEND_READY, 1, 2, 3, 4, 5]);
    assert_eq!(link.state(), HandshakeState::Transferring);
}

#[test]
fn test_offer_discards_noise_before_receive_ready() {
    let mut link = Link::new(ScriptedLink::new(vec![0x00, 0x42, RECEIVE_READY]));
    link.offer_credential(&Credential::new([9, 9, 9, 9, 9])).unwrap();
    assert_eq!(link.channel().tx, vec![SEND_READY, 9, 9, 9, 9, 9]);
}

#[test]
fn test_offer_stalls_until_peer_answers() {
    // No receive-ready ever arrives: the initiator never sends a digit.
    let mut link = Link::new(ScriptedLink::new(vec![]));
    let result = link.offer_credential(&Credential::new([1, 2, 3, 4, 5]));

    assert_eq!(result, Err(LinkError::Closed));
    assert_eq!(link.channel().tx, vec![SEND_READY]);
    assert_eq!(link.state(), HandshakeState::AwaitingReadyToReceive);
}

#[test]
fn test_accept_reads_exactly_pass_len_bytes() {
    let mut rx = offer([5, 4, 3, 2, 1]);
    rx.push(b'+');
    let mut link = Link::new(ScriptedLink::new(rx));

    let credential = link.accept_credential().unwrap();
    assert_eq!(credential.digits(), &[5, 4, 3, 2, 1]);
    assert_eq!(link.channel().tx, vec![RECEIVE_READY]);
    // Intent byte is left for the next step
    assert_eq!(link.channel().rx.len(), 1);
}

#[test]
fn test_accept_ignores_bytes_before_send_ready() {
    let mut rx = vec![0x30, 0x99];
    rx.extend(offer([0, 0, 0, 0, 7]));
    let mut link = Link::new(ScriptedLink::new(rx));

    let credential = link.accept_credential().unwrap();
    assert_eq!(credential.digits(), &[0, 0, 0, 0, 7]);
}

#[test]
fn test_accept_truncated_transfer_is_a_link_error() {
    let mut link = Link::new(ScriptedLink::new(vec![SEND_READY, 1, 2]));
    assert_eq!(link.accept_credential(), Err(LinkError::Closed));
}

// ============================================================================
// Intents and outcomes
// ============================================================================

#[test]
fn test_intent_round_trip_through_states() {
    let mut front = Link::new(ScriptedLink::new(vec![UNLOCK_GRANTED]));
    front.send_intent(Intent::Unlock).unwrap();
    assert_eq!(front.state(), HandshakeState::AwaitingOutcome);
    assert_eq!(front.receive_outcome(), Ok(Outcome::UnlockGranted));
    front.finish();
    assert_eq!(front.state(), HandshakeState::Idle);

    let mut back = Link::new(ScriptedLink::new(vec![INTENT_CHANGE]));
    assert_eq!(back.receive_intent(), Ok(Intent::Change));
    assert_eq!(back.state(), HandshakeState::AwaitingIntent);
}

#[test]
fn test_malformed_intent_reports_byte() {
    let mut back = Link::new(ScriptedLink::new(vec![0x7E]));
    assert_eq!(back.receive_intent(), Err(ProtocolError::UnknownIntent(0x7E)));
}

#[test]
fn test_setup_outcome_has_send_ready_preamble() {
    let mut back = Link::new(ScriptedLink::default());
    back.send_setup_outcome(SetupOutcome::Mismatch).unwrap();
    assert_eq!(back.channel().tx, vec![SEND_READY, MISMATCH]);

    let mut front = Link::new(ScriptedLink::new(vec![0x44, SEND_READY, MATCH]));
    assert_eq!(front.receive_setup_outcome(), Ok(SetupOutcome::Match));
}

// ============================================================================
// embedded-io adapter
// ============================================================================

#[test]
fn test_io_channel_over_pipe() {
    let (a, b) = pipe();
    let mut a = IoChannel(a);
    let mut b = IoChannel(b);

    a.send(SEND_READY).unwrap();
    assert_eq!(b.receive(), Ok(SEND_READY));
    b.send(RECEIVE_READY).unwrap();
    assert_eq!(a.receive(), Ok(RECEIVE_READY));
}

#[test]
fn test_io_channel_reports_closed_peer() {
    let (a, b) = pipe();
    drop(b);
    let mut a = IoChannel(a);
    assert_eq!(a.receive(), Err(LinkError::Closed));
    assert_eq!(a.send(1), Err(LinkError::Write));
}
