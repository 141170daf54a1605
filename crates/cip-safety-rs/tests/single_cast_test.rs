// crates/cip-safety-rs/tests/single_cast_test.rs

mod simulator;

use cip_safety_rs::fault::FaultCode;
use cip_safety_rs::frame::{DataMessage, ModeByte, RunIdle, SeedSet};
use cip_safety_rs::svs::{ConnectionStatus, ConsumeOutcome, SvEvent, SvState};
use cip_safety_rs::{
    Cast, ConnectionRole, FormatClass, InstanceId, MessageFormat, ValidatorError, Width,
};
use simulator::{MockCrc, NTEM, SimulatedProducer, TestServer, params, producer_identity, server};

fn format(width: Width, class: FormatClass) -> MessageFormat {
    MessageFormat::new(Cast::Single, width, class, ConnectionRole::Target)
}

/// Opens a connection and runs it through time stamp initialisation: one
/// message before and one after the first Time Coordination reply.
fn establish(
    format: MessageFormat,
    payload: &[u8],
) -> (TestServer, SimulatedProducer, InstanceId) {
    let mut sv = server();
    let mut producer = SimulatedProducer::new(format);
    let id = sv.open(&params(format, payload.len()), 0).unwrap();

    let first = producer.data(payload, RunIdle::Run, 1000);
    assert_eq!(sv.consume(id, &first, 1000), Ok(ConsumeOutcome::Accepted));
    let second = producer.data(payload, RunIdle::Run, 1010);
    assert_eq!(sv.consume(id, &second, 1015), Ok(ConsumeOutcome::Accepted));
    (sv, producer, id)
}

#[test]
fn test_base_short_happy_path() {
    let format = format(Width::Short, FormatClass::Base);
    let mut sv = server();
    let mut producer = SimulatedProducer::new(format);
    let id = sv.open(&params(format, 2), 0).unwrap();
    assert_eq!(sv.state(id), Some(SvState::Initializing));

    let first = producer.data(&[0x11, 0x22], RunIdle::Run, 1000);
    assert_eq!(sv.consume(id, &first, 1000), Ok(ConsumeOutcome::Accepted));
    assert_eq!(sv.state(id), Some(SvState::Established));
    // Initialisation is not complete yet, so Run is withheld.
    assert_eq!(sv.connection_status(id), Ok(ConnectionStatus::Idle));

    // The first message is answered at once.
    let sent = &sv.transport().coordination;
    assert_eq!(sent.len(), 1);
    let reply = producer.accept_coordination(&sent[0].1);
    assert_eq!(reply.ack.ping_count_reply(), 0);
    assert!(reply.ack.ping_response());
    assert_eq!(reply.consumer_time, 1000);

    let second = producer.data(&[0x33, 0x44], RunIdle::Run, 1010);
    assert_eq!(sv.consume(id, &second, 1015), Ok(ConsumeOutcome::Accepted));
    assert_eq!(
        sv.application().events_for(id),
        vec![
            SvEvent::Open,
            SvEvent::FirstDataReceived,
            SvEvent::Active,
            SvEvent::RunTransition
        ]
    );
    assert_eq!(sv.connection_status(id), Ok(ConnectionStatus::ConsumingRun));

    let update = sv.application().last_update().unwrap();
    assert_eq!(update.payload, vec![0x33, 0x44]);
    assert_eq!(update.run_idle, RunIdle::Run);
    assert_eq!(update.connection_point, 0x64);

    let diagnostics = sv.diagnostics(id).unwrap();
    assert!(diagnostics.init_complete);
    assert_eq!(diagnostics.data_age, 5);
    assert_eq!(diagnostics.max_data_age, 5);
    assert!(sv.fault_handler().faults.is_empty());
}

#[test]
fn test_consecutive_timestamps_are_all_published() {
    let format = format(Width::Short, FormatClass::Base);
    let mut sv = server();
    let mut producer = SimulatedProducer::new(format);
    let id = sv.open(&params(format, 1), 0).unwrap();

    for timestamp in [100u16, 101, 102] {
        let message = producer.data(&[timestamp as u8], RunIdle::Run, timestamp);
        assert_eq!(sv.consume(id, &message, u32::from(timestamp)), Ok(ConsumeOutcome::Accepted));
        assert_eq!(sv.state(id), Some(SvState::Established));
    }
    let updates = &sv.application().updates;
    assert_eq!(updates.len(), 3);
    assert_eq!(updates[2].payload, vec![102]);
    assert_eq!(updates[2].run_idle, RunIdle::Run);
}

#[test]
fn test_run_to_idle_transition() {
    let format = format(Width::Short, FormatClass::Base);
    let (mut sv, mut producer, id) = establish(format, &[0x01]);

    let idle = producer.data(&[0x01], RunIdle::Idle, 1020);
    assert_eq!(sv.consume(id, &idle, 1025), Ok(ConsumeOutcome::Accepted));
    assert_eq!(sv.application().events_for(id).last(), Some(&SvEvent::IdleTransition));
    assert_eq!(sv.connection_status(id), Ok(ConnectionStatus::Idle));
}

#[test]
fn test_base_crc_failure_closes_connection() {
    let format = format(Width::Long, FormatClass::Base);
    let (mut sv, mut producer, id) = establish(format, &[1, 2, 3, 4]);

    let mut corrupted = producer.data(&[5, 6, 7, 8], RunIdle::Run, 1020);
    corrupted[0] ^= 0x01;
    assert_eq!(sv.consume(id, &corrupted, 1025), Ok(ConsumeOutcome::ConnectionClosed));

    assert_eq!(sv.state(id), Some(SvState::Failed));
    assert_eq!(sv.fault_handler().codes(), vec![FaultCode::DataCrc]);
    assert_eq!(sv.transport().close_requests, vec![(id, 1)]);
    assert_eq!(sv.application().events_for(id).last(), Some(&SvEvent::Faulted));
    assert_eq!(sv.connection_status(id), Ok(ConnectionStatus::Faulted));
    assert_eq!(sv.fault_count(), 1);

    // The last good payload stays visible, forced to Idle.
    let update = sv.application().last_update().unwrap();
    assert_eq!(update.payload, vec![1, 2, 3, 4]);
    assert_eq!(update.run_idle, RunIdle::Idle);

    // Further messages are dropped without new faults.
    let next = producer.data(&[5, 6, 7, 8], RunIdle::Run, 1030);
    assert_eq!(sv.consume(id, &next, 1035), Ok(ConsumeOutcome::ConnectionClosed));
    assert_eq!(sv.fault_handler().faults.len(), 1);
}

#[test]
fn test_reopen_after_fault() {
    let format = format(Width::Long, FormatClass::Base);
    let (mut sv, mut producer, id) = establish(format, &[1, 2, 3]);
    assert_eq!(sv.reopen(id, 1100), Err(ValidatorError::InvalidState));

    let mut corrupted = producer.data(&[1, 2, 3], RunIdle::Run, 1020);
    let last = corrupted.len() - 1;
    corrupted[last] ^= 0xFF;
    assert_eq!(sv.consume(id, &corrupted, 1025), Ok(ConsumeOutcome::ConnectionClosed));
    assert_eq!(sv.fault_handler().codes(), vec![FaultCode::TimestampCrc]);

    sv.reopen(id, 2000).unwrap();
    assert_eq!(sv.state(id), Some(SvState::Initializing));
    assert_eq!(sv.application().events_for(id).last(), Some(&SvEvent::Open));
    assert!(!sv.diagnostics(id).unwrap().init_complete);

    // Sequencing starts over.
    let fresh = producer.data(&[1, 2, 3], RunIdle::Run, 2000);
    assert_eq!(sv.consume(id, &fresh, 2000), Ok(ConsumeOutcome::Accepted));
    assert_eq!(sv.state(id), Some(SvState::Established));
}

#[test]
fn test_repeated_timestamp_is_fatal() {
    let format = format(Width::Short, FormatClass::Base);
    let (mut sv, mut producer, id) = establish(format, &[0x7F]);

    let updates = sv.application().updates.len();

    let repeated = producer.data(&[0x00], RunIdle::Run, 1010);
    assert_eq!(sv.consume(id, &repeated, 1020), Ok(ConsumeOutcome::ConnectionClosed));
    assert_eq!(sv.fault_handler().codes(), vec![FaultCode::TimestampRepeated]);
    assert_eq!(sv.state(id), Some(SvState::Failed));
    assert!(sv.diagnostics(id).unwrap().connection_fault);

    // Only the invalidation of the previous data reaches the application.
    let app = sv.application();
    assert_eq!(app.updates.len(), updates + 1);
    assert_eq!(app.updates[updates].payload, vec![0x7F]);
    assert_eq!(app.updates[updates].run_idle, RunIdle::Idle);
}

#[test]
fn test_timestamp_delta_too_large() {
    let format = format(Width::Short, FormatClass::Base);
    let (mut sv, mut producer, id) = establish(format, &[0x7F]);

    let jump = producer.data(&[0x7F], RunIdle::Run, 1010 + NTEM + 1);
    assert_eq!(sv.consume(id, &jump, 1420), Ok(ConsumeOutcome::ConnectionClosed));
    assert_eq!(sv.fault_handler().codes(), vec![FaultCode::TimestampDeltaTooLarge]);
}

#[test]
fn test_sequencing_across_timestamp_wrap() {
    // A wrapped time stamp gives a small forward delta, not a negative one.
    let format = format(Width::Short, FormatClass::Base);
    let mut sv = server();
    let mut producer = SimulatedProducer::new(format);
    let id = sv.open(&params(format, 1), 60_000).unwrap();

    let first = producer.data(&[9], RunIdle::Run, 65_520);
    assert_eq!(sv.consume(id, &first, 65_520), Ok(ConsumeOutcome::Accepted));
    let second = producer.data(&[9], RunIdle::Run, 65_530);
    assert_eq!(sv.consume(id, &second, 65_535), Ok(ConsumeOutcome::Accepted));
    let wrapped = producer.data(&[9], RunIdle::Run, 5);
    assert_eq!(sv.consume(id, &wrapped, 65_536 + 10), Ok(ConsumeOutcome::Accepted));

    assert_eq!(sv.diagnostics(id).unwrap().data_age, 5);
    assert!(sv.fault_handler().faults.is_empty());
}

#[test]
fn test_stale_data_is_fatal() {
    let format = format(Width::Short, FormatClass::Base);
    let (mut sv, mut producer, id) = establish(format, &[1]);

    let stale = producer.data(&[1], RunIdle::Run, 1020);
    let now = 1020 + u32::from(NTEM) + 1;
    assert_eq!(sv.consume(id, &stale, now), Ok(ConsumeOutcome::ConnectionClosed));
    assert_eq!(sv.fault_handler().codes(), vec![FaultCode::DataAgeExceeded]);
}

#[test]
fn test_wrong_length_is_fatal_for_base() {
    let format = format(Width::Short, FormatClass::Base);
    let (mut sv, mut producer, id) = establish(format, &[1, 2]);

    let mut message = producer.data(&[1, 2], RunIdle::Run, 1020);
    message.pop();
    assert_eq!(sv.consume(id, &message, 1025), Ok(ConsumeOutcome::ConnectionClosed));
    assert_eq!(sv.fault_handler().codes(), vec![FaultCode::InvalidLength]);
}

#[test]
fn test_mode_byte_redundancy_failure() {
    let format = format(Width::Long, FormatClass::Extended);
    let mut sv = server();
    let mut p = params(format, 3);
    p.max_fault_number = 1;
    let id = sv.open(&p, 0).unwrap();

    // Run with N_Run_Idle also set, protected by otherwise valid CRCs.
    let message = DataMessage {
        data: &[1, 2, 3],
        mode: ModeByte(0b1011_0000),
        timestamp: 1000,
    };
    let mut buffer = vec![0u8; format.data_section_len(3)];
    let pid = SeedSet::derive(&MockCrc, &producer_identity());
    message.serialize(&format, &MockCrc, &pid, 0, &mut buffer).unwrap();

    assert_eq!(sv.consume(id, &buffer, 1000), Ok(ConsumeOutcome::ConnectionClosed));
    assert_eq!(sv.fault_handler().codes(), vec![FaultCode::ModeByteRedundancy]);
}

#[test]
fn test_unknown_instance_is_reported() {
    let mut sv = server();
    let unknown = InstanceId(99);
    assert_eq!(
        sv.consume(unknown, &[0; 8], 0),
        Err(ValidatorError::UnknownInstance(99))
    );
    assert_eq!(
        sv.fault_handler().faults,
        vec![(FaultCode::InvalidInstance, Some(unknown), 99)]
    );
}

#[test]
fn test_coordination_send_failure_is_not_fatal() {
    let format = format(Width::Short, FormatClass::Base);
    let mut sv = server();
    let mut producer = SimulatedProducer::new(format);
    let id = sv.open(&params(format, 1), 0).unwrap();
    sv.transport_mut().fail_sends = true;

    let first = producer.data(&[1], RunIdle::Run, 1000);
    assert_eq!(sv.consume(id, &first, 1000), Ok(ConsumeOutcome::Accepted));
    assert_eq!(sv.fault_handler().codes(), vec![FaultCode::CoordinationSendFailed]);
    assert_eq!(sv.state(id), Some(SvState::Established));
    assert!(sv.transport().coordination.is_empty());
}
