// crates/cip-safety-rs/src/svs/instance.rs

use super::state_machine::SvState;
use crate::fault::{ConsumerFaultCounter, FaultCode};
use crate::format::{FormatClass, MessageFormat};
use crate::frame::{RunIdle, SeedSet, TimeCoordination};
use crate::types::{
    BASE_INIT_LIMIT_TICKS, BASE_TIMEOUT_MULTIPLIER_MAX, ConnectionTriad, EXTENDED_INIT_LIMIT_TICKS,
    Ticks,
};
use alloc::vec::Vec;

/// Configuration fixed at open time.
#[derive(Debug, Clone, Default)]
pub struct InitInfo {
    pub format: MessageFormat,
    pub connection_point: u16,
    pub payload_size: usize,
    pub calc: InitCalc,
}

/// Values derived once from the open parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct InitCalc {
    /// Producer identity, seeds the data and Time Correction CRCs.
    pub pid: ConnectionTriad,
    /// Consumer identity, seeds the Time Coordination CRC.
    pub cid: ConnectionTriad,
    pub pid_seeds: SeedSet,
    pub cid_seeds: SeedSet,
    /// Network Time Expectation Multiplier, in ticks.
    pub ntem: u16,
    pub consumer_number: u8,
    pub max_fault_number: u8,
}

impl InitInfo {
    pub fn class(&self) -> FormatClass {
        self.format.class
    }

    /// Ticks allowed between open and completed time stamp initialisation.
    pub fn init_limit(&self) -> Ticks {
        match self.format.class {
            FormatClass::Base => BASE_INIT_LIMIT_TICKS,
            FormatClass::Extended => EXTENDED_INIT_LIMIT_TICKS,
        }
    }
}

/// State of the data consumption pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsumptionLocals {
    /// Run/Idle of the last accepted message, after initialisation gating.
    pub run_idle: RunIdle,
    /// Time stamp initialisation is complete and data age is supervised.
    pub init_complete: bool,
    /// A message outside the special initial case has been accepted, so
    /// `last_timestamp` is a valid sequencing reference.
    pub sequence_started: bool,
    pub last_timestamp: u16,
    /// Corrected time stamp of the last accepted message.
    pub last_corrected_timestamp: u16,
    pub data_age: u16,
    pub max_data_age: u16,
    /// Time stamp the rollover counter was last updated with.
    pub rollover_reference: u16,
    pub rollover_count: u16,
}

/// State of the Time Coordination producer.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoordinationLocals {
    pub first_received: bool,
    pub last_ping_count: u8,
    /// Data messages still to be seen before the reply is produced.
    pub countdown: u8,
    pub send_pending: bool,
    /// Latest time the pending reply must be produced at.
    pub backstop_deadline: Option<Ticks>,
    pub message: TimeCoordination,
}

/// Effective Timeout Multiplier for Time Correction supervision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TimeoutMultiplier {
    pub raw: u8,
    pub effective: u8,
}

impl TimeoutMultiplier {
    /// Base format caps the multiplier; Extended uses the raw value.
    pub fn new(class: FormatClass, raw: u8) -> Self {
        let effective = match class {
            FormatClass::Base => raw.min(BASE_TIMEOUT_MULTIPLIER_MAX),
            FormatClass::Extended => raw,
        };
        Self { raw, effective }
    }
}

/// State of the Time Correction consumer (multi-cast only).
#[derive(Debug, Clone, Copy, Default)]
pub struct CorrectionLocals {
    pub correction_value: u16,
    pub active: bool,
    pub received: bool,
    /// Ping intervals seen since the last valid correction.
    pub ping_intervals: u16,
    pub timeout_multiplier: TimeoutMultiplier,
}

/// Deadlines checked by the activity monitor.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActivityLocals {
    pub init_deadline: Ticks,
    /// Armed by the first accepted data message.
    pub reception_deadline: Option<Ticks>,
}

/// Fault bookkeeping of one instance.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstanceFaults {
    pub counter: ConsumerFaultCounter,
    /// Most recent not-fail-safe fault, kept for diagnostics.
    pub last: Option<FaultCode>,
}

/// The consumer-visible outputs of an instance. Replaced as a whole on
/// every accepted message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishedData {
    pub payload: Vec<u8>,
    pub run_idle: RunIdle,
    pub init_complete: bool,
    pub connection_fault: bool,
}

/// All runtime data of one Safety Validator Server instance.
#[derive(Debug, Clone, Default)]
pub struct ServerInstance {
    pub state: SvState,
    pub init: InitInfo,
    pub consumption: ConsumptionLocals,
    pub coordination: CoordinationLocals,
    pub correction: CorrectionLocals,
    pub activity: ActivityLocals,
    pub faults: InstanceFaults,
    pub published: PublishedData,
}

impl ServerInstance {
    /// Clears everything a reopen must forget while keeping the state and
    /// the configuration captured at open.
    pub fn reset_runtime(&mut self, now: Ticks) {
        let init = core::mem::take(&mut self.init);
        let multiplier = self.correction.timeout_multiplier;
        *self = Self { state: self.state, init, ..Self::default() };
        self.correction.timeout_multiplier = multiplier;
        self.faults.counter = ConsumerFaultCounter::new(self.init.calc.max_fault_number);
        self.activity.init_deadline = now.wrapping_add(self.init.init_limit());
    }
}

/// Snapshot of an instance for monitoring.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct InstanceDiagnostics {
    pub state: SvState,
    pub format: MessageFormat,
    pub connection_point: u16,
    pub payload_size: usize,
    pub producer: ConnectionTriad,
    pub consumer: ConnectionTriad,
    pub init_complete: bool,
    pub run_idle: RunIdle,
    pub data_age: u16,
    pub max_data_age: u16,
    pub rollover_count: u16,
    pub fault_count: u8,
    pub max_fault_number: u8,
    pub last_fault: Option<FaultCode>,
    pub correction_value: u16,
    pub correction_active: bool,
    /// Timeout multiplier as configured and as applied after the Base cap.
    pub timeout_multiplier: TimeoutMultiplier,
    pub connection_fault: bool,
}

impl From<&ServerInstance> for InstanceDiagnostics {
    fn from(instance: &ServerInstance) -> Self {
        Self {
            state: instance.state,
            format: instance.init.format,
            connection_point: instance.init.connection_point,
            payload_size: instance.init.payload_size,
            producer: instance.init.calc.pid,
            consumer: instance.init.calc.cid,
            init_complete: instance.consumption.init_complete,
            run_idle: instance.published.run_idle,
            data_age: instance.consumption.data_age,
            max_data_age: instance.consumption.max_data_age,
            rollover_count: instance.consumption.rollover_count,
            fault_count: instance.faults.counter.count(),
            max_fault_number: instance.faults.counter.max_fault_number(),
            last_fault: instance.faults.last,
            correction_value: instance.correction.correction_value,
            correction_active: instance.correction.active,
            timeout_multiplier: instance.correction.timeout_multiplier,
            connection_fault: instance.published.connection_fault,
        }
    }
}
