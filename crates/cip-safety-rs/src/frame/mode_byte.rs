const PING_COUNT_MASK: u8 = 0b0000_0011;
const TBD_BIT: u8 = 1 << 2;
const TBD_2_BIT: u8 = 1 << 3;
const N_RUN_IDLE: u8 = 1 << 4;
const N_TBD_BIT: u8 = 1 << 5;
const TBD_2_COPY: u8 = 1 << 6;
const RUN_IDLE: u8 = 1 << 7;

/// Run/Idle indication carried in the mode byte and forwarded to the
/// consuming application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum RunIdle {
    #[default]
    Idle,
    Run,
}

/// The mode byte of a safety data message.
///
/// Bits 0-1 carry the ping count, bit 7 Run/Idle. Bits 2-6 are redundancy:
/// bit 4 complements bit 7, bit 5 complements bit 2 and bit 6 copies bit 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModeByte(pub u8);

impl ModeByte {
    /// Builds a mode byte with consistent redundancy bits.
    pub fn new(ping_count: u8, run_idle: RunIdle) -> Self {
        let mut byte = ping_count & PING_COUNT_MASK;
        // TBD bits are left clear, so their complement is set.
        byte |= N_TBD_BIT;
        match run_idle {
            RunIdle::Run => byte |= RUN_IDLE,
            RunIdle::Idle => byte |= N_RUN_IDLE,
        }
        Self(byte)
    }

    pub fn ping_count(self) -> u8 {
        self.0 & PING_COUNT_MASK
    }

    pub fn run_idle(self) -> RunIdle {
        if self.0 & RUN_IDLE != 0 { RunIdle::Run } else { RunIdle::Idle }
    }

    /// Checks the complement and copy pairs of the mode byte.
    pub fn redundancy_ok(self) -> bool {
        let bit = |mask: u8| self.0 & mask != 0;
        bit(RUN_IDLE) != bit(N_RUN_IDLE)
            && bit(TBD_BIT) != bit(N_TBD_BIT)
            && bit(TBD_2_BIT) == bit(TBD_2_COPY)
    }
}
