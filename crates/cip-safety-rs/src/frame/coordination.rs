// crates/cip-safety-rs/src/frame/coordination.rs

use super::codec::{CodecHelpers, SeedSet};
use super::TIME_COORDINATION_LEN;
use crate::format::FormatClass;
use crate::hal::{SafetyCrc, ValidatorError};

const PING_COUNT_REPLY_MASK: u8 = 0b0000_0011;
const PING_RESPONSE: u8 = 1 << 3;
const RESERVED_MASK: u8 = 0b0111_0100;

/// Acknowledge byte of a Time Coordination message.
///
/// Bits 0-1 ping count reply, bit 3 ping response, bits 2 and 4-6 reserved
/// (zero), bit 7 even parity over the byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AckByte(pub u8);

impl AckByte {
    pub fn new(ping_count_reply: u8, ping_response: bool) -> Self {
        let mut byte = ping_count_reply & PING_COUNT_REPLY_MASK;
        if ping_response {
            byte |= PING_RESPONSE;
        }
        Self(CodecHelpers::with_even_parity(byte))
    }

    pub fn ping_count_reply(self) -> u8 {
        self.0 & PING_COUNT_REPLY_MASK
    }

    pub fn ping_response(self) -> bool {
        self.0 & PING_RESPONSE != 0
    }

    /// Parity and reserved bits are as a conforming producer expects.
    pub fn is_well_formed(self) -> bool {
        CodecHelpers::has_even_parity(self.0) && self.0 & RESERVED_MASK == 0
    }
}

/// Time Coordination message, produced by the consumer in answer to a
/// ping count change.
///
/// Base: ack byte, consumer time value, ack byte 2, CRC-S3.
/// Extended: ack byte, consumer time value, CRC-S5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeCoordination {
    pub ack: AckByte,
    pub consumer_time: u16,
    /// Only transmitted in Base format.
    pub ack_byte_2: u8,
    pub crc: u32,
}

impl TimeCoordination {
    /// Builds a message answering `ping_count`, stamped with the local clock.
    pub fn build<C: SafetyCrc>(
        class: FormatClass,
        crc: &C,
        cid: &SeedSet,
        ping_count: u8,
        consumer_time: u16,
    ) -> Self {
        let ack = AckByte::new(ping_count, true);
        let ack_byte_2 = CodecHelpers::redundancy_byte(ack.0);
        let mut message = Self { ack, consumer_time, ack_byte_2, crc: 0 };
        message.crc = message.compute_crc(class, crc, cid);
        message
    }

    fn compute_crc<C: SafetyCrc>(&self, class: FormatClass, crc: &C, cid: &SeedSet) -> u32 {
        let ctv = self.consumer_time.to_le_bytes();
        match class {
            FormatClass::Base => {
                u32::from(crc.crc_s3(cid.s3, &[self.ack.0, ctv[0], ctv[1], self.ack_byte_2]))
            }
            FormatClass::Extended => crc.crc_s5(cid.s5, &[self.ack.0, ctv[0], ctv[1]]) & 0x00FF_FFFF,
        }
    }

    /// Checks CRC, parity and (Base) the byte 2 redundancy field.
    pub fn verify<C: SafetyCrc>(&self, class: FormatClass, crc: &C, cid: &SeedSet) -> bool {
        let redundancy_ok = match class {
            FormatClass::Base => self.ack_byte_2 == CodecHelpers::redundancy_byte(self.ack.0),
            FormatClass::Extended => true,
        };
        redundancy_ok && self.ack.is_well_formed() && self.crc == self.compute_crc(class, crc, cid)
    }

    pub fn serialize(&self, class: FormatClass, buffer: &mut [u8]) -> Result<usize, ValidatorError> {
        if buffer.len() < TIME_COORDINATION_LEN {
            return Err(ValidatorError::BufferTooShort);
        }
        buffer[0] = self.ack.0;
        buffer[1..3].copy_from_slice(&self.consumer_time.to_le_bytes());
        match class {
            FormatClass::Base => {
                buffer[3] = self.ack_byte_2;
                buffer[4..6].copy_from_slice(&(self.crc as u16).to_le_bytes());
            }
            FormatClass::Extended => CodecHelpers::write_u24(buffer, 3, self.crc),
        }
        Ok(TIME_COORDINATION_LEN)
    }

    pub fn deserialize(class: FormatClass, buffer: &[u8]) -> Result<Self, ValidatorError> {
        if buffer.len() < TIME_COORDINATION_LEN {
            return Err(ValidatorError::BufferTooShort);
        }
        let ack = AckByte(buffer[0]);
        let consumer_time = CodecHelpers::read_u16(buffer, 1)?;
        let (ack_byte_2, crc) = match class {
            FormatClass::Base => (buffer[3], u32::from(CodecHelpers::read_u16(buffer, 4)?)),
            FormatClass::Extended => (0, CodecHelpers::read_u24(buffer, 3)?),
        };
        Ok(Self { ack, consumer_time, ack_byte_2, crc })
    }
}
