// crates/cip-safety-rs/src/frame/correction.rs

use super::codec::{CodecHelpers, SeedSet};
use super::TIME_CORRECTION_LEN;
use crate::fault::FaultCode;
use crate::format::FormatClass;
use crate::hal::{SafetyCrc, ValidatorError};

const CONSUMER_NUMBER_MASK: u8 = 0b0000_1111;
const MCAST_ACTIVE: u8 = 1 << 5;

/// Multicast byte of a Time Correction message.
///
/// Bits 0-3 consumer number, bit 5 multicast active (1) / idle (0),
/// bit 7 even parity over the byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct McastByte(pub u8);

impl McastByte {
    pub fn new(consumer_number: u8, active: bool) -> Self {
        let mut byte = consumer_number & CONSUMER_NUMBER_MASK;
        if active {
            byte |= MCAST_ACTIVE;
        }
        Self(CodecHelpers::with_even_parity(byte))
    }

    pub fn consumer_number(self) -> u8 {
        self.0 & CONSUMER_NUMBER_MASK
    }

    pub fn is_active(self) -> bool {
        self.0 & MCAST_ACTIVE != 0
    }
}

/// Time Correction message sent by a multi-cast producer to one consumer.
///
/// Base: multicast byte, correction value, multicast byte 2, CRC-S3.
/// Extended: multicast byte, correction value, CRC-S5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeCorrection {
    pub mcast: McastByte,
    pub correction_value: u16,
    /// Only transmitted in Base format.
    pub mcast_byte_2: u8,
    pub crc: u32,
}

impl TimeCorrection {
    /// Builds a well-formed correction message (producer side).
    pub fn build<C: SafetyCrc>(
        class: FormatClass,
        crc: &C,
        pid: &SeedSet,
        consumer_number: u8,
        active: bool,
        correction_value: u16,
    ) -> Self {
        let mcast = McastByte::new(consumer_number, active);
        let mcast_byte_2 = CodecHelpers::redundancy_byte(mcast.0);
        let mut message = Self { mcast, correction_value, mcast_byte_2, crc: 0 };
        message.crc = message.compute_crc(class, crc, pid);
        message
    }

    fn compute_crc<C: SafetyCrc>(&self, class: FormatClass, crc: &C, pid: &SeedSet) -> u32 {
        let tcv = self.correction_value.to_le_bytes();
        match class {
            FormatClass::Base => {
                u32::from(crc.crc_s3(pid.s3, &[self.mcast.0, tcv[0], tcv[1], self.mcast_byte_2]))
            }
            FormatClass::Extended => crc.crc_s5(pid.s5, &[self.mcast.0, tcv[0], tcv[1]]) & 0x00FF_FFFF,
        }
    }

    /// Validates CRC, parity and (Base only) the multicast byte 2 field.
    pub fn verify<C: SafetyCrc>(
        &self,
        class: FormatClass,
        crc: &C,
        pid: &SeedSet,
    ) -> Result<(), FaultCode> {
        if self.crc != self.compute_crc(class, crc, pid) {
            return Err(FaultCode::CorrectionCrc);
        }
        if !CodecHelpers::has_even_parity(self.mcast.0) {
            return Err(FaultCode::CorrectionParity);
        }
        if class == FormatClass::Base
            && self.mcast_byte_2 != CodecHelpers::redundancy_byte(self.mcast.0)
        {
            return Err(FaultCode::CorrectionRedundancy);
        }
        Ok(())
    }

    pub fn serialize(&self, class: FormatClass, buffer: &mut [u8]) -> Result<usize, ValidatorError> {
        if buffer.len() < TIME_CORRECTION_LEN {
            return Err(ValidatorError::BufferTooShort);
        }
        buffer[0] = self.mcast.0;
        buffer[1..3].copy_from_slice(&self.correction_value.to_le_bytes());
        match class {
            FormatClass::Base => {
                buffer[3] = self.mcast_byte_2;
                buffer[4..6].copy_from_slice(&(self.crc as u16).to_le_bytes());
            }
            FormatClass::Extended => CodecHelpers::write_u24(buffer, 3, self.crc),
        }
        Ok(TIME_CORRECTION_LEN)
    }

    pub fn deserialize(class: FormatClass, buffer: &[u8]) -> Result<Self, ValidatorError> {
        if buffer.len() < TIME_CORRECTION_LEN {
            return Err(ValidatorError::BufferTooShort);
        }
        let mcast = McastByte(buffer[0]);
        let correction_value = CodecHelpers::read_u16(buffer, 1)?;
        let (mcast_byte_2, crc) = match class {
            FormatClass::Base => (buffer[3], u32::from(CodecHelpers::read_u16(buffer, 4)?)),
            FormatClass::Extended => (0, CodecHelpers::read_u24(buffer, 3)?),
        };
        Ok(Self { mcast, correction_value, mcast_byte_2, crc })
    }
}
