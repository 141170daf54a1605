use crate::types::{InstanceId, InstanceIdError};
use core::array::TryFromSliceError;
use core::fmt;

/// Defines a portable, descriptive Error type for the validator API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidatorError {
    /// The provided buffer is too short for the operation.
    BufferTooShort,
    /// A received message does not have the length its format requires.
    InvalidLength { expected: usize, actual: usize },
    /// All instance slots are in use.
    TableExhausted,
    /// No open instance carries this ID.
    UnknownInstance(u16),
    /// The payload size does not fit the message format (Short: 1-2, Long: 3-250).
    InvalidPayloadSize(usize),
    /// The consumer number is outside the range allowed for the cast type.
    InvalidConsumerNumber(u8),
    /// The Network Time Expectation Multiplier must be non-zero.
    InvalidNetworkTimeExpectation,
    /// Extended format connections need a non-zero Max Fault Number.
    InvalidMaxFaultNumber,
    /// The operation is not allowed in the instance's current state.
    InvalidState,
    /// A multi-byte value could not be parsed from a slice.
    SliceConversion,
    /// The transport layer refused or failed to send a message.
    TransportError,
}

impl fmt::Display for ValidatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferTooShort => write!(f, "Buffer is too short for the message"),
            Self::InvalidLength { expected, actual } => {
                write!(f, "Invalid message length: expected {expected} bytes, got {actual}")
            }
            Self::TableExhausted => write!(f, "No free Safety Validator instance available"),
            Self::UnknownInstance(id) => write!(f, "No open Safety Validator instance with ID {id}"),
            Self::InvalidPayloadSize(size) => {
                write!(f, "Payload size {size} does not match the message format")
            }
            Self::InvalidConsumerNumber(num) => write!(f, "Invalid consumer number: {num}"),
            Self::InvalidNetworkTimeExpectation => {
                write!(f, "Network Time Expectation Multiplier must be non-zero")
            }
            Self::InvalidMaxFaultNumber => {
                write!(f, "Max Fault Number must be non-zero for Extended format")
            }
            Self::InvalidState => write!(f, "Operation not allowed in the current state"),
            Self::SliceConversion => write!(f, "Failed to convert slice to a fixed-size array"),
            Self::TransportError => write!(f, "The transport failed to send the message"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ValidatorError {}

// --- From Implementations for Error Conversion ---

impl From<TryFromSliceError> for ValidatorError {
    fn from(_: TryFromSliceError) -> Self {
        ValidatorError::SliceConversion
    }
}

impl From<InstanceIdError> for ValidatorError {
    fn from(err: InstanceIdError) -> Self {
        match err {
            InstanceIdError::Reserved => ValidatorError::UnknownInstance(0),
        }
    }
}

/// Integrity checker used by the validator.
///
/// The CRC-S1/S2/S3/S5 algorithms are supplied by the platform; the core only
/// decides which bytes and which seed go into each computation. CRC-S5 values
/// are 24 bit wide, carried in the low bits of a `u32`.
pub trait SafetyCrc {
    /// 8-bit CRC-S1.
    fn crc_s1(&self, seed: u8, data: &[u8]) -> u8;

    /// 8-bit CRC-S2, used for the complement CRC of Base Short messages.
    fn crc_s2(&self, seed: u8, data: &[u8]) -> u8;

    /// 16-bit CRC-S3.
    fn crc_s3(&self, seed: u16, data: &[u8]) -> u16;

    /// 24-bit CRC-S5.
    fn crc_s5(&self, seed: u32, data: &[u8]) -> u32;
}

/// Transport abstraction for the messages the consumer produces.
///
/// Implementations must not call back into the validator; a close request
/// is only a notification that the underlying connection must be torn down.
pub trait SafetyTransport {
    /// Sends a serialised Time Coordination message to the producer.
    fn send_time_coordination(
        &mut self,
        instance: InstanceId,
        message: &[u8],
    ) -> Result<(), ValidatorError>;

    /// Requests closing of the underlying transport connection.
    fn send_close_request(&mut self, instance: InstanceId, consumer_number: u8);
}
