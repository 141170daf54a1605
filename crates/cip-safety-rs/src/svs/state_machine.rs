// crates/cip-safety-rs/src/svs/state_machine.rs

use super::events::SvEvent;

/// States of a Safety Validator Server instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[repr(u8)]
pub enum SvState {
    /// Not open.
    #[default]
    Idle = 0,
    /// Open, waiting for the first valid safety data message.
    Initializing = 1,
    /// Consuming safety data.
    Established = 2,
    /// A safety fault closed the connection; the instance stays allocated.
    Failed = 3,
}

/// A (state, event) pair the state machine does not define.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub state: SvState,
    pub event: SvEvent,
}

impl InvalidTransition {
    /// Packs the pair into the `info` word of a fault report.
    pub fn info(&self) -> u32 {
        (u32::from(self.state as u8) << 8) | self.event as u32
    }
}

/// Computes the successor state. Every pair not listed is rejected so that
/// the caller can report it; the state must then stay unchanged.
pub fn next_state(state: SvState, event: SvEvent) -> Result<SvState, InvalidTransition> {
    match (state, event) {
        (SvState::Idle | SvState::Failed, SvEvent::Open) => Ok(SvState::Initializing),
        (SvState::Initializing, SvEvent::FirstDataReceived) => Ok(SvState::Established),
        (SvState::Initializing | SvState::Established, SvEvent::Faulted) => Ok(SvState::Failed),
        (SvState::Initializing | SvState::Established | SvState::Failed, SvEvent::Close) => {
            Ok(SvState::Idle)
        }
        // Informational events, forwarded to the application only.
        (
            SvState::Established,
            SvEvent::Active | SvEvent::IdleTransition | SvEvent::RunTransition,
        ) => Ok(SvState::Established),
        (state, event) => Err(InvalidTransition { state, event }),
    }
}
