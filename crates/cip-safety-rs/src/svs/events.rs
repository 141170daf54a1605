// crates/cip-safety-rs/src/svs/events.rs

use crate::frame::RunIdle;
use crate::types::InstanceId;

/// Events that drive the Safety Validator Server state machine. They are
/// also forwarded to the application, including the informational ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum SvEvent {
    /// The connection was opened (or reopened after a fault).
    Open,
    /// The first valid safety data message arrived.
    FirstDataReceived,
    /// The connection was declared faulted.
    Faulted,
    /// The connection was closed by its owner.
    Close,
    /// Time stamp initialisation completed; data age is now supervised.
    Active,
    /// The consumed data changed from Run to Idle.
    IdleTransition,
    /// The consumed data changed from Idle to Run.
    RunTransition,
}

/// Callbacks into the application consuming the safety data.
///
/// The validator owns its application handle, so these callbacks cannot
/// re-enter the validator while it is in the middle of an update.
pub trait SafetyApplication {
    /// A state machine event for `instance`. Called before the validator
    /// changes any data the application can observe.
    fn on_event(&mut self, instance: InstanceId, event: SvEvent);

    /// New safety data (or the last data invalidated to Idle).
    fn on_data_update(
        &mut self,
        instance: InstanceId,
        connection_point: u16,
        payload: &[u8],
        run_idle: RunIdle,
    );
}
