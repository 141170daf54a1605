use core::fmt;

/// Severity class of a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum FaultClass {
    /// Internal flow inconsistency. The safety invariant may already be
    /// violated; the validator keeps running defensively.
    FailSafe,
    /// Expected-at-runtime anomaly caused by the unreliable network.
    NotFailSafe,
}

/// Every anomaly the validator can detect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[repr(u16)]
pub enum FaultCode {
    // --- Fail-safe class ---
    /// An operation was addressed to an instance that is not open.
    InvalidInstance = 0x0001,
    /// The state machine received an event not allowed in its current state.
    InvalidTransition = 0x0002,
    /// Published flags are in a combination that cannot occur.
    InconsistentFlags = 0x0003,

    // --- Safety data message ---
    /// The received message does not have the length its format requires.
    InvalidLength = 0x0101,
    /// Mode byte redundancy bits do not match.
    ModeByteRedundancy = 0x0102,
    /// CRC over the time stamp (Base format) mismatch.
    TimestampCrc = 0x0103,
    /// Actual data CRC mismatch.
    DataCrc = 0x0104,
    /// Complement data CRC mismatch.
    ComplementCrc = 0x0105,
    /// Complemented data is not the bitwise complement of the actual data.
    ComplementData = 0x0106,
    /// Time stamp equal to the previous one (repeated or stuck producer).
    TimestampRepeated = 0x0107,
    /// Time stamp delta larger than the Network Time Expectation Multiplier.
    TimestampDeltaTooLarge = 0x0108,
    /// Data age exceeded the Network Time Expectation Multiplier.
    DataAgeExceeded = 0x0109,
    /// No Time Correction message within the Timeout Multiplier window.
    CorrectionNotReceived = 0x010A,

    // --- Time Correction message ---
    /// Time Correction CRC mismatch.
    CorrectionCrc = 0x0201,
    /// Time Correction multicast byte parity error.
    CorrectionParity = 0x0202,
    /// Time Correction multicast byte 2 redundancy mismatch (Base format).
    CorrectionRedundancy = 0x0203,
    /// The multicast active/idle bit went from Active to Idle.
    CorrectionActiveToIdle = 0x0204,

    // --- Supervision ---
    /// No valid message within the Network Time Expectation.
    ActivityTimeout = 0x0301,
    /// Time stamp initialisation did not complete in time.
    InitTimeout = 0x0302,
    /// The transport failed to send a Time Coordination message.
    CoordinationSendFailed = 0x0303,
}

impl FaultCode {
    /// Returns the severity class of this fault.
    pub fn class(self) -> FaultClass {
        match self {
            FaultCode::InvalidInstance
            | FaultCode::InvalidTransition
            | FaultCode::InconsistentFlags => FaultClass::FailSafe,
            _ => FaultClass::NotFailSafe,
        }
    }

    /// Numeric code as reported to diagnostics.
    pub fn code(self) -> u16 {
        self as u16
    }
}

impl fmt::Display for FaultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::InvalidInstance => "invalid instance",
            Self::InvalidTransition => "invalid state/event combination",
            Self::InconsistentFlags => "inconsistent connection flags",
            Self::InvalidLength => "invalid message length",
            Self::ModeByteRedundancy => "mode byte redundancy error",
            Self::TimestampCrc => "time stamp CRC error",
            Self::DataCrc => "data CRC error",
            Self::ComplementCrc => "complement CRC error",
            Self::ComplementData => "complemented data mismatch",
            Self::TimestampRepeated => "repeated time stamp",
            Self::TimestampDeltaTooLarge => "time stamp delta too large",
            Self::DataAgeExceeded => "data age exceeded",
            Self::CorrectionNotReceived => "time correction not received in time",
            Self::CorrectionCrc => "time correction CRC error",
            Self::CorrectionParity => "time correction parity error",
            Self::CorrectionRedundancy => "time correction redundancy error",
            Self::CorrectionActiveToIdle => "multicast active to idle transition",
            Self::ActivityTimeout => "consumer activity timeout",
            Self::InitTimeout => "initialisation timeout",
            Self::CoordinationSendFailed => "time coordination send failed",
        };
        write!(f, "{} ({:#06x})", text, self.code())
    }
}
