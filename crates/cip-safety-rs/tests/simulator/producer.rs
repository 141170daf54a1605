// crates/cip-safety-rs/tests/simulator/producer.rs

use super::{MockCrc, consumer_identity, producer_identity};
use cip_safety_rs::MessageFormat;
use cip_safety_rs::frame::{
    DataMessage, ModeByte, RunIdle, SeedSet, TIME_CORRECTION_LEN, TimeCoordination,
    TimeCorrection,
};

/// Producer side of a safety connection, building the frames a real
/// Safety Validator Client would put on the wire.
pub struct SimulatedProducer {
    pub format: MessageFormat,
    pub ping_count: u8,
    pub rollover: u16,
    last_timestamp: u16,
    crc: MockCrc,
    pid: SeedSet,
    cid: SeedSet,
}

impl SimulatedProducer {
    pub fn new(format: MessageFormat) -> Self {
        let crc = MockCrc;
        Self {
            format,
            ping_count: 0,
            rollover: 0,
            last_timestamp: 0,
            pid: SeedSet::derive(&crc, &producer_identity()),
            cid: SeedSet::derive(&crc, &consumer_identity()),
            crc,
        }
    }

    /// Advances the 2-bit ping count.
    pub fn next_ping(&mut self) {
        self.ping_count = (self.ping_count + 1) & 0x03;
    }

    /// Builds one data section, tracking the rollover count of the
    /// time stamps handed in.
    pub fn data(&mut self, payload: &[u8], run_idle: RunIdle, timestamp: u16) -> Vec<u8> {
        if timestamp < self.last_timestamp {
            self.rollover = self.rollover.wrapping_add(1);
        }
        self.last_timestamp = timestamp;

        let message = DataMessage {
            data: payload,
            mode: ModeByte::new(self.ping_count, run_idle),
            timestamp,
        };
        let mut buffer = vec![0u8; self.format.data_section_len(payload.len())];
        let len = message
            .serialize(&self.format, &self.crc, &self.pid, self.rollover, &mut buffer)
            .expect("buffer sized for the format");
        buffer.truncate(len);
        buffer
    }

    /// Builds a Time Correction message for one consumer.
    pub fn correction(&self, consumer_number: u8, active: bool, value: u16) -> Vec<u8> {
        let message = TimeCorrection::build(
            self.format.class,
            &self.crc,
            &self.pid,
            consumer_number,
            active,
            value,
        );
        let mut buffer = vec![0u8; TIME_CORRECTION_LEN];
        message
            .serialize(self.format.class, &mut buffer)
            .expect("correction buffer");
        buffer
    }

    /// Data section followed by a Time Correction message (multi-cast).
    pub fn data_with_correction(
        &mut self,
        payload: &[u8],
        run_idle: RunIdle,
        timestamp: u16,
        correction: &[u8],
    ) -> Vec<u8> {
        let mut buffer = self.data(payload, run_idle, timestamp);
        buffer.extend_from_slice(correction);
        buffer
    }

    /// Decodes and checks a Time Coordination message sent by the consumer.
    pub fn accept_coordination(&self, message: &[u8]) -> TimeCoordination {
        let coordination = TimeCoordination::deserialize(self.format.class, message)
            .expect("coordination length");
        assert!(
            coordination.verify(self.format.class, &self.crc, &self.cid),
            "coordination message failed verification: {message:02X?}"
        );
        coordination
    }
}
