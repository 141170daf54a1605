// crates/cip-safety-rs/tests/simulator/mod.rs
#![allow(dead_code)]

pub mod producer;

pub use producer::SimulatedProducer;

use cip_safety_rs::fault::{FaultCode, FaultHandler};
use cip_safety_rs::frame::RunIdle;
use cip_safety_rs::svs::{OpenParams, SafetyApplication, SvEvent, ValidatorServer};
use cip_safety_rs::types::ConnectionTriad;
use cip_safety_rs::{InstanceId, MessageFormat, SafetyCrc, SafetyTransport, ValidatorError};

/// Number of instance slots used by the test server.
pub const SLOTS: usize = 4;

/// Network Time Expectation used by most scenarios, in ticks.
pub const NTEM: u16 = 400;

pub type TestServer = ValidatorServer<MockCrc, RecordingTransport, RecordingApp, RecordingFaults, SLOTS>;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn server() -> TestServer {
    init_logging();
    ValidatorServer::new(
        MockCrc,
        RecordingTransport::default(),
        RecordingApp::default(),
        RecordingFaults::default(),
    )
}

pub fn producer_identity() -> ConnectionTriad {
    ConnectionTriad {
        vendor_id: 0x0123,
        device_serial: 0x1122_3344,
        connection_serial: 0x0A0B,
    }
}

pub fn consumer_identity() -> ConnectionTriad {
    ConnectionTriad {
        vendor_id: 0x0456,
        device_serial: 0x5566_7788,
        connection_serial: 0x0C0D,
    }
}

pub fn params(format: MessageFormat, payload_size: usize) -> OpenParams {
    OpenParams {
        format,
        connection_point: 0x64,
        payload_size,
        producer: producer_identity(),
        consumer: consumer_identity(),
        network_time_expectation: NTEM,
        consumer_number: 1,
        timeout_multiplier: 2,
        max_fault_number: 3,
    }
}

/// Deterministic, seed-sensitive checksum standing in for the CRC-S
/// polynomials. Only the validator's choice of seed and coverage matters
/// to these tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockCrc;

fn fold(seed: u32, multiplier: u32, data: &[u8]) -> u32 {
    data.iter().fold(seed ^ 0x5A5A_5A5A, |acc, byte| {
        acc.wrapping_mul(multiplier).wrapping_add(u32::from(*byte) + 1)
    })
}

impl SafetyCrc for MockCrc {
    fn crc_s1(&self, seed: u8, data: &[u8]) -> u8 {
        fold(u32::from(seed), 31, data) as u8
    }

    fn crc_s2(&self, seed: u8, data: &[u8]) -> u8 {
        fold(u32::from(seed), 37, data) as u8
    }

    fn crc_s3(&self, seed: u16, data: &[u8]) -> u16 {
        fold(u32::from(seed), 131, data) as u16
    }

    fn crc_s5(&self, seed: u32, data: &[u8]) -> u32 {
        fold(seed, 257, data) & 0x00FF_FFFF
    }
}

#[derive(Debug, Default)]
pub struct RecordingTransport {
    pub coordination: Vec<(InstanceId, Vec<u8>)>,
    pub close_requests: Vec<(InstanceId, u8)>,
    /// Makes every send fail while set.
    pub fail_sends: bool,
}

impl SafetyTransport for RecordingTransport {
    fn send_time_coordination(
        &mut self,
        instance: InstanceId,
        message: &[u8],
    ) -> Result<(), ValidatorError> {
        if self.fail_sends {
            return Err(ValidatorError::TransportError);
        }
        self.coordination.push((instance, message.to_vec()));
        Ok(())
    }

    fn send_close_request(&mut self, instance: InstanceId, consumer_number: u8) {
        self.close_requests.push((instance, consumer_number));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUpdate {
    pub instance: InstanceId,
    pub connection_point: u16,
    pub payload: Vec<u8>,
    pub run_idle: RunIdle,
}

#[derive(Debug, Default)]
pub struct RecordingApp {
    pub events: Vec<(InstanceId, SvEvent)>,
    pub updates: Vec<DataUpdate>,
}

impl RecordingApp {
    pub fn events_for(&self, id: InstanceId) -> Vec<SvEvent> {
        self.events
            .iter()
            .filter(|(instance, _)| *instance == id)
            .map(|(_, event)| *event)
            .collect()
    }

    pub fn last_update(&self) -> Option<&DataUpdate> {
        self.updates.last()
    }
}

impl SafetyApplication for RecordingApp {
    fn on_event(&mut self, instance: InstanceId, event: SvEvent) {
        self.events.push((instance, event));
    }

    fn on_data_update(
        &mut self,
        instance: InstanceId,
        connection_point: u16,
        payload: &[u8],
        run_idle: RunIdle,
    ) {
        self.updates.push(DataUpdate {
            instance,
            connection_point,
            payload: payload.to_vec(),
            run_idle,
        });
    }
}

#[derive(Debug, Default)]
pub struct RecordingFaults {
    pub faults: Vec<(FaultCode, Option<InstanceId>, u32)>,
}

impl RecordingFaults {
    pub fn codes(&self) -> Vec<FaultCode> {
        self.faults.iter().map(|(code, _, _)| *code).collect()
    }

    pub fn count_of(&self, code: FaultCode) -> usize {
        self.faults.iter().filter(|(c, _, _)| *c == code).count()
    }
}

impl FaultHandler for RecordingFaults {
    fn on_fault(&mut self, code: FaultCode, instance: Option<InstanceId>, info: u32) {
        self.faults.push((code, instance, info));
    }
}
