use crate::hal::{SafetyCrc, ValidatorError};
use crate::types::{ConnectionTriad, LONG_PAYLOAD_MAX};

/// Largest byte sequence ever fed to a single CRC computation:
/// mode byte, time stamp and a maximum Long payload.
const CRC_INPUT_MAX: usize = 1 + 2 + LONG_PAYLOAD_MAX;

/// CRC seeds derived from one connection identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeedSet {
    pub s1: u8,
    pub s2: u8,
    pub s3: u16,
    pub s5: u32,
}

impl SeedSet {
    /// Derives every seed from the serialised identity, starting from a zero seed.
    pub fn derive<C: SafetyCrc>(crc: &C, identity: &ConnectionTriad) -> Self {
        let bytes = identity.to_le_bytes();
        Self {
            s1: crc.crc_s1(0, &bytes),
            s2: crc.crc_s2(0, &bytes),
            s3: crc.crc_s3(0, &bytes),
            s5: crc.crc_s5(0, &bytes) & 0x00FF_FFFF,
        }
    }

    /// Folds the rollover count into the CRC-S5 seed (Extended format).
    pub fn rollover_seed<C: SafetyCrc>(&self, crc: &C, rollover: u16) -> u32 {
        crc.crc_s5(self.s5, &rollover.to_le_bytes()) & 0x00FF_FFFF
    }
}

/// Fixed-capacity scratch buffer used to concatenate the fields covered by
/// a CRC without allocating.
pub struct CrcInput {
    buf: [u8; CRC_INPUT_MAX],
    len: usize,
}

impl CrcInput {
    pub fn new() -> Self {
        Self { buf: [0u8; CRC_INPUT_MAX], len: 0 }
    }

    /// Appends `bytes`. Input beyond the capacity is ignored; payload sizes
    /// are validated at open so this cannot happen for a parsed message.
    pub fn push(&mut self, bytes: &[u8]) -> &mut Self {
        let take = bytes.len().min(CRC_INPUT_MAX - self.len);
        self.buf[self.len..self.len + take].copy_from_slice(&bytes[..take]);
        self.len += take;
        self
    }

    /// Appends the bitwise complement of `bytes`.
    pub fn push_complemented(&mut self, bytes: &[u8]) -> &mut Self {
        for byte in bytes {
            if self.len == CRC_INPUT_MAX {
                break;
            }
            self.buf[self.len] = !*byte;
            self.len += 1;
        }
        self
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

impl Default for CrcInput {
    fn default() -> Self {
        Self::new()
    }
}

/// Contains helper functions for common serialization/deserialization tasks.
pub struct CodecHelpers;
impl CodecHelpers {
    /// Reads a little-endian `u16` at `offset`.
    pub fn read_u16(buffer: &[u8], offset: usize) -> Result<u16, ValidatorError> {
        let bytes = buffer
            .get(offset..offset + 2)
            .ok_or(ValidatorError::BufferTooShort)?;
        Ok(u16::from_le_bytes(bytes.try_into()?))
    }

    /// Reads a 24-bit little-endian value at `offset`.
    pub fn read_u24(buffer: &[u8], offset: usize) -> Result<u32, ValidatorError> {
        let bytes = buffer
            .get(offset..offset + 3)
            .ok_or(ValidatorError::BufferTooShort)?;
        Ok(u32::from(bytes[0]) | (u32::from(bytes[1]) << 8) | (u32::from(bytes[2]) << 16))
    }

    /// Writes the low 24 bits of `value` little-endian at `offset`.
    pub fn write_u24(buffer: &mut [u8], offset: usize, value: u32) {
        buffer[offset] = value as u8;
        buffer[offset + 1] = (value >> 8) as u8;
        buffer[offset + 2] = (value >> 16) as u8;
    }

    /// Sets bit 7 so that the byte has an even number of set bits.
    pub fn with_even_parity(byte: u8) -> u8 {
        let low = byte & 0x7F;
        if low.count_ones() % 2 == 1 { low | 0x80 } else { low }
    }

    /// Checks the even parity of a byte whose bit 7 is the parity bit.
    pub fn has_even_parity(byte: u8) -> bool {
        byte.count_ones() % 2 == 0
    }

    /// Redundancy byte of Base format Time Coordination and Time Correction
    /// messages: bits 0-6 complemented, bit 7 (parity) copied.
    pub fn redundancy_byte(byte: u8) -> u8 {
        byte ^ 0x7F
    }
}
