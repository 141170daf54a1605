// crates/cip-safety-rs/src/frame/data.rs

use super::codec::{CodecHelpers, CrcInput, SeedSet};
use super::mode_byte::ModeByte;
use crate::fault::FaultCode;
use crate::format::{FormatClass, MessageFormat, Width};
use crate::hal::{SafetyCrc, ValidatorError};

const S5_MASK: u32 = 0x00FF_FFFF;

/// Redundancy fields of a data section, one variant per format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CheckFields<'a> {
    BaseShort {
        actual_crc: u8,
        complement_crc: u8,
        timestamp_crc: u8,
    },
    BaseLong {
        actual_crc: u16,
        complemented: &'a [u8],
        complement_crc: u16,
        timestamp_crc: u8,
    },
    ExtendedShort {
        crc: u32,
    },
    ExtendedLong {
        actual_crc: u32,
        complemented: &'a [u8],
        complement_crc: u32,
    },
}

/// Borrowed view of a received safety data section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataSection<'a> {
    pub data: &'a [u8],
    pub mode: ModeByte,
    pub timestamp: u16,
    check: CheckFields<'a>,
}

/// Fields a producer places in a data section; used to serialise one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataMessage<'a> {
    pub data: &'a [u8],
    pub mode: ModeByte,
    pub timestamp: u16,
}

impl<'a> DataSection<'a> {
    /// Splits `buffer` into the fields of the given format.
    ///
    /// The buffer must hold exactly one data section for `payload_size`.
    pub fn parse(
        format: &MessageFormat,
        payload_size: usize,
        buffer: &'a [u8],
    ) -> Result<Self, ValidatorError> {
        let expected = format.data_section_len(payload_size);
        if buffer.len() != expected {
            return Err(ValidatorError::InvalidLength {
                expected,
                actual: buffer.len(),
            });
        }
        let n = payload_size;
        let data = &buffer[..n];
        let mode = ModeByte(buffer[n]);

        let (timestamp, check) = match (format.class, format.width) {
            (FormatClass::Base, Width::Short) => (
                CodecHelpers::read_u16(buffer, n + 3)?,
                CheckFields::BaseShort {
                    actual_crc: buffer[n + 1],
                    complement_crc: buffer[n + 2],
                    timestamp_crc: buffer[n + 5],
                },
            ),
            (FormatClass::Base, Width::Long) => (
                CodecHelpers::read_u16(buffer, 2 * n + 5)?,
                CheckFields::BaseLong {
                    actual_crc: CodecHelpers::read_u16(buffer, n + 1)?,
                    complemented: &buffer[n + 3..2 * n + 3],
                    complement_crc: CodecHelpers::read_u16(buffer, 2 * n + 3)?,
                    timestamp_crc: buffer[2 * n + 7],
                },
            ),
            (FormatClass::Extended, Width::Short) => {
                let low = u32::from(CodecHelpers::read_u16(buffer, n + 1)?);
                let high = u32::from(buffer[n + 5]);
                (
                    CodecHelpers::read_u16(buffer, n + 3)?,
                    CheckFields::ExtendedShort { crc: low | (high << 16) },
                )
            }
            (FormatClass::Extended, Width::Long) => (
                CodecHelpers::read_u16(buffer, 2 * n + 7)?,
                CheckFields::ExtendedLong {
                    actual_crc: CodecHelpers::read_u24(buffer, n + 1)?,
                    complemented: &buffer[n + 4..2 * n + 4],
                    complement_crc: CodecHelpers::read_u24(buffer, 2 * n + 4)?,
                },
            ),
        };

        Ok(Self { data, mode, timestamp, check })
    }

    /// Runs the integrity stage: CRCs, complemented data and mode byte
    /// redundancy. Returns the first failing check.
    ///
    /// `rollover` is only used by Extended formats, where it is folded into
    /// the CRC-S5 seed.
    pub fn verify<C: SafetyCrc>(
        &self,
        crc: &C,
        pid: &SeedSet,
        rollover: u16,
    ) -> Result<(), FaultCode> {
        let mode = [self.mode.0];
        let ts = self.timestamp.to_le_bytes();

        match self.check {
            CheckFields::BaseShort { actual_crc, complement_crc, timestamp_crc } => {
                let mut actual = CrcInput::new();
                actual.push(&mode).push(self.data);
                if crc.crc_s1(pid.s1, actual.as_slice()) != actual_crc {
                    return Err(FaultCode::DataCrc);
                }
                let mut complement = CrcInput::new();
                complement.push(&mode).push_complemented(self.data);
                if crc.crc_s2(pid.s2, complement.as_slice()) != complement_crc {
                    return Err(FaultCode::ComplementCrc);
                }
                if crc.crc_s1(pid.s1, &ts) != timestamp_crc {
                    return Err(FaultCode::TimestampCrc);
                }
            }
            CheckFields::BaseLong { actual_crc, complemented, complement_crc, timestamp_crc } => {
                let mut actual = CrcInput::new();
                actual.push(&mode).push(self.data);
                if crc.crc_s3(pid.s3, actual.as_slice()) != actual_crc {
                    return Err(FaultCode::DataCrc);
                }
                if !is_complement(self.data, complemented) {
                    return Err(FaultCode::ComplementData);
                }
                let mut complement = CrcInput::new();
                complement.push(&mode).push(complemented);
                if crc.crc_s3(pid.s3, complement.as_slice()) != complement_crc {
                    return Err(FaultCode::ComplementCrc);
                }
                if crc.crc_s1(pid.s1, &ts) != timestamp_crc {
                    return Err(FaultCode::TimestampCrc);
                }
            }
            CheckFields::ExtendedShort { crc: received } => {
                let seed = pid.rollover_seed(crc, rollover);
                let mut input = CrcInput::new();
                input.push(&mode).push(&ts).push(self.data);
                if crc.crc_s5(seed, input.as_slice()) & S5_MASK != received {
                    return Err(FaultCode::DataCrc);
                }
            }
            CheckFields::ExtendedLong { actual_crc, complemented, complement_crc } => {
                let seed = pid.rollover_seed(crc, rollover);
                let mut actual = CrcInput::new();
                actual.push(&mode).push(&ts).push(self.data);
                if crc.crc_s5(seed, actual.as_slice()) & S5_MASK != actual_crc {
                    return Err(FaultCode::DataCrc);
                }
                if !is_complement(self.data, complemented) {
                    return Err(FaultCode::ComplementData);
                }
                let mut complement = CrcInput::new();
                complement.push(&mode).push(&ts).push(complemented);
                if crc.crc_s5(seed, complement.as_slice()) & S5_MASK != complement_crc {
                    return Err(FaultCode::ComplementCrc);
                }
            }
        }

        if !self.mode.redundancy_ok() {
            return Err(FaultCode::ModeByteRedundancy);
        }
        Ok(())
    }
}

impl DataMessage<'_> {
    /// Serialises a data section in the given format into `buffer` and
    /// returns the number of bytes written.
    pub fn serialize<C: SafetyCrc>(
        &self,
        format: &MessageFormat,
        crc: &C,
        pid: &SeedSet,
        rollover: u16,
        buffer: &mut [u8],
    ) -> Result<usize, ValidatorError> {
        let n = self.data.len();
        let len = format.data_section_len(n);
        if buffer.len() < len {
            return Err(ValidatorError::BufferTooShort);
        }
        let mode = [self.mode.0];
        let ts = self.timestamp.to_le_bytes();
        buffer[..n].copy_from_slice(self.data);
        buffer[n] = self.mode.0;

        match (format.class, format.width) {
            (FormatClass::Base, Width::Short) => {
                let mut actual = CrcInput::new();
                actual.push(&mode).push(self.data);
                let mut complement = CrcInput::new();
                complement.push(&mode).push_complemented(self.data);
                buffer[n + 1] = crc.crc_s1(pid.s1, actual.as_slice());
                buffer[n + 2] = crc.crc_s2(pid.s2, complement.as_slice());
                buffer[n + 3..n + 5].copy_from_slice(&ts);
                buffer[n + 5] = crc.crc_s1(pid.s1, &ts);
            }
            (FormatClass::Base, Width::Long) => {
                let mut actual = CrcInput::new();
                actual.push(&mode).push(self.data);
                let mut complement = CrcInput::new();
                complement.push(&mode).push_complemented(self.data);
                buffer[n + 1..n + 3]
                    .copy_from_slice(&crc.crc_s3(pid.s3, actual.as_slice()).to_le_bytes());
                for (dst, src) in buffer[n + 3..2 * n + 3].iter_mut().zip(self.data) {
                    *dst = !*src;
                }
                buffer[2 * n + 3..2 * n + 5]
                    .copy_from_slice(&crc.crc_s3(pid.s3, complement.as_slice()).to_le_bytes());
                buffer[2 * n + 5..2 * n + 7].copy_from_slice(&ts);
                buffer[2 * n + 7] = crc.crc_s1(pid.s1, &ts);
            }
            (FormatClass::Extended, Width::Short) => {
                let seed = pid.rollover_seed(crc, rollover);
                let mut input = CrcInput::new();
                input.push(&mode).push(&ts).push(self.data);
                let value = crc.crc_s5(seed, input.as_slice()) & S5_MASK;
                buffer[n + 1] = value as u8;
                buffer[n + 2] = (value >> 8) as u8;
                buffer[n + 3..n + 5].copy_from_slice(&ts);
                buffer[n + 5] = (value >> 16) as u8;
            }
            (FormatClass::Extended, Width::Long) => {
                let seed = pid.rollover_seed(crc, rollover);
                let mut actual = CrcInput::new();
                actual.push(&mode).push(&ts).push(self.data);
                let mut complement = CrcInput::new();
                complement.push(&mode).push(&ts).push_complemented(self.data);
                CodecHelpers::write_u24(buffer, n + 1, crc.crc_s5(seed, actual.as_slice()));
                for (dst, src) in buffer[n + 4..2 * n + 4].iter_mut().zip(self.data) {
                    *dst = !*src;
                }
                CodecHelpers::write_u24(buffer, 2 * n + 4, crc.crc_s5(seed, complement.as_slice()));
                buffer[2 * n + 7..2 * n + 9].copy_from_slice(&ts);
            }
        }
        Ok(len)
    }
}

fn is_complement(data: &[u8], complemented: &[u8]) -> bool {
    data.len() == complemented.len() && data.iter().zip(complemented).all(|(a, b)| *a == !*b)
}
