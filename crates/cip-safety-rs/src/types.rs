use core::convert::TryFrom;
use core::fmt;

// --- Time base ---

/// Absolute value of the externally supplied, monotonically increasing tick
/// counter. One tick is 128 microseconds; the counter wraps at 2^32.
pub type Ticks = u32;

/// Duration of one tick in microseconds.
pub const TICK_US: u32 = 128;

/// Deadline for completing time stamp initialisation on a Base format connection (10 s).
pub const BASE_INIT_LIMIT_TICKS: Ticks = 78_125;

/// Deadline for completing time stamp initialisation on an Extended format connection (8.3 s).
pub const EXTENDED_INIT_LIMIT_TICKS: Ticks = 64_844;

/// A Time Coordination message must be sent at most 5 s after a ping count change.
pub const COORDINATION_BACKSTOP_TICKS: Ticks = 39_063;

/// Returns `true` once `now` has reached or passed `deadline`, tolerating a
/// wraparound of the 32-bit tick counter between the two values.
///
/// A deadline further than 2^31 ticks in the future is considered reached.
pub fn ticks_reached(now: Ticks, deadline: Ticks) -> bool {
    now.wrapping_sub(deadline) < 0x8000_0000
}

/// Projects the 32-bit tick counter on the 16-bit local safety clock.
pub fn local_clock(now: Ticks) -> u16 {
    now as u16
}

// --- Protocol Constants ---

/// Minimum payload size of a Short format message.
pub const SHORT_PAYLOAD_MIN: usize = 1;
/// Maximum payload size of a Short format message.
pub const SHORT_PAYLOAD_MAX: usize = 2;
/// Minimum payload size of a Long format message.
pub const LONG_PAYLOAD_MIN: usize = 3;
/// Maximum payload size of a Long format message.
pub const LONG_PAYLOAD_MAX: usize = 250;

/// Highest consumer number a multi-cast connection may use.
pub const MAX_CONSUMER_NUMBER: u8 = 15;

/// Upper bound applied to the Timeout Multiplier of Base format connections.
pub const BASE_TIMEOUT_MULTIPLIER_MAX: u8 = 4;

/// Stable identifier of an open Safety Validator Server instance.
///
/// Instance IDs are handed out at open and never reused while the instance
/// is open. The value 0 is reserved and never assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct InstanceId(pub u16);

/// Error type for invalid Instance ID creation.
#[derive(Debug, PartialEq, Eq)]
pub enum InstanceIdError {
    /// Instance ID 0 is reserved.
    Reserved,
}

impl fmt::Display for InstanceIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceIdError::Reserved => write!(f, "Instance ID 0 is reserved"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for InstanceIdError {}

impl TryFrom<u16> for InstanceId {
    type Error = InstanceIdError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Err(InstanceIdError::Reserved),
            _ => Ok(InstanceId(value)),
        }
    }
}

impl From<InstanceId> for u16 {
    fn from(id: InstanceId) -> Self {
        id.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of one end of a safety connection: vendor ID, device serial
/// number and connection serial number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ConnectionTriad {
    pub vendor_id: u16,
    pub device_serial: u32,
    pub connection_serial: u16,
}

impl ConnectionTriad {
    /// Serialises the triad as fed to the CRC seed derivation (little-endian).
    pub fn to_le_bytes(&self) -> [u8; 8] {
        let mut bytes = [0u8; 8];
        bytes[0..2].copy_from_slice(&self.vendor_id.to_le_bytes());
        bytes[2..6].copy_from_slice(&self.device_serial.to_le_bytes());
        bytes[6..8].copy_from_slice(&self.connection_serial.to_le_bytes());
        bytes
    }
}
