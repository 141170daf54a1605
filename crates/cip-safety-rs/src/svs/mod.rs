//! The Safety Validator Server: the consumer side of a CIP Safety
//! connection.
//!
//! A [`ValidatorServer`] owns a fixed table of instances together with the
//! platform collaborators it reports to. Every entry point takes the current
//! tick count explicitly, so the engine never reads a clock on its own.

pub mod activity;
pub mod consume;
pub mod coordination;
pub mod correction;
pub mod events;
pub mod instance;
pub mod state_machine;
pub mod table;

pub use consume::{ConnectionStatus, ConsumeOutcome};
pub use events::{SafetyApplication, SvEvent};
pub use instance::{InstanceDiagnostics, PublishedData};
pub use state_machine::{InvalidTransition, SvState, next_state};

use crate::fault::{ConsumerFaultCounter, FaultClass, FaultCode, FaultHandler};
use crate::format::MessageFormat;
use crate::frame::{RunIdle, SeedSet};
use crate::hal::{SafetyCrc, SafetyTransport, ValidatorError};
use crate::log::{InstanceLog, sv_error, sv_info, sv_warn};
use crate::types::{ConnectionTriad, InstanceId, MAX_CONSUMER_NUMBER, Ticks};
use instance::{InitCalc, InitInfo, TimeoutMultiplier};
use table::InstanceTable;

/// Parameters of a connection to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenParams {
    pub format: MessageFormat,
    pub connection_point: u16,
    pub payload_size: usize,
    pub producer: ConnectionTriad,
    pub consumer: ConnectionTriad,
    /// Network Time Expectation Multiplier, in ticks.
    pub network_time_expectation: u16,
    /// 1 for single-cast, 1..=15 for multi-cast.
    pub consumer_number: u8,
    pub timeout_multiplier: u8,
    /// Faulted messages an Extended connection tolerates before closing.
    pub max_fault_number: u8,
}

impl OpenParams {
    fn validate(&self) -> Result<(), ValidatorError> {
        if !self.format.accepts_payload_size(self.payload_size) {
            return Err(ValidatorError::InvalidPayloadSize(self.payload_size));
        }
        let max_consumer = if self.format.is_multicast() {
            MAX_CONSUMER_NUMBER
        } else {
            1
        };
        if !(1..=max_consumer).contains(&self.consumer_number) {
            return Err(ValidatorError::InvalidConsumerNumber(self.consumer_number));
        }
        if self.network_time_expectation == 0 {
            return Err(ValidatorError::InvalidNetworkTimeExpectation);
        }
        if self.format.is_extended() && self.max_fault_number == 0 {
            return Err(ValidatorError::InvalidMaxFaultNumber);
        }
        Ok(())
    }
}

/// Consumer-side safety validator for up to `N` concurrent connections.
pub struct ValidatorServer<C, T, A, F, const N: usize>
where
    C: SafetyCrc,
    T: SafetyTransport,
    A: SafetyApplication,
    F: FaultHandler,
{
    table: InstanceTable<N>,
    crc: C,
    transport: T,
    app: A,
    faults: F,
    /// Connection faults across all instances.
    fault_count: u32,
}

impl<C, T, A, F, const N: usize> ValidatorServer<C, T, A, F, N>
where
    C: SafetyCrc,
    T: SafetyTransport,
    A: SafetyApplication,
    F: FaultHandler,
{
    pub fn new(crc: C, transport: T, app: A, faults: F) -> Self {
        Self {
            table: InstanceTable::new(),
            crc,
            transport,
            app,
            faults,
            fault_count: 0,
        }
    }

    /// Opens a connection and returns the ID it is known by from now on.
    pub fn open(&mut self, params: &OpenParams, now: Ticks) -> Result<InstanceId, ValidatorError> {
        params.validate()?;
        let index = self.table.allocate()?;
        let id = self.table.next_free_id();
        self.table.assign(id, index);

        let calc = InitCalc {
            pid: params.producer,
            cid: params.consumer,
            pid_seeds: SeedSet::derive(&self.crc, &params.producer),
            cid_seeds: SeedSet::derive(&self.crc, &params.consumer),
            ntem: params.network_time_expectation,
            consumer_number: params.consumer_number,
            max_fault_number: params.max_fault_number,
        };
        let instance = &mut self.table[index];
        instance.init = InitInfo {
            format: params.format,
            connection_point: params.connection_point,
            payload_size: params.payload_size,
            calc,
        };
        instance.correction.timeout_multiplier =
            TimeoutMultiplier::new(params.format.class, params.timeout_multiplier);
        instance.faults.counter = ConsumerFaultCounter::new(params.max_fault_number);
        instance.activity.init_deadline = now.wrapping_add(instance.init.init_limit());

        let ctx = InstanceLog::new("open", id);
        sv_info!(
            ctx,
            "Opened {:?} connection, payload {} bytes, NTEM {} ticks",
            params.format,
            params.payload_size,
            params.network_time_expectation
        );
        self.transition(index, SvEvent::Open);
        Ok(id)
    }

    /// Restarts a faulted connection with the configuration it was opened with.
    pub fn reopen(&mut self, id: InstanceId, now: Ticks) -> Result<(), ValidatorError> {
        let index = self.resolve(id)?;
        if self.table[index].state != SvState::Failed {
            return Err(ValidatorError::InvalidState);
        }
        self.table[index].reset_runtime(now);
        let ctx = InstanceLog::new("open", id);
        sv_info!(ctx, "Reopening faulted connection");
        self.transition(index, SvEvent::Open);
        Ok(())
    }

    /// Closes a connection and frees its slot. The ID is unknown afterwards.
    pub fn close(&mut self, id: InstanceId) -> Result<(), ValidatorError> {
        let index = self
            .table
            .lookup(id)
            .ok_or(ValidatorError::UnknownInstance(id.0))?;
        self.transition(index, SvEvent::Close);
        self.table.release(id);
        self.table.deallocate(index);
        let ctx = InstanceLog::new("close", id);
        sv_info!(ctx, "Connection closed");
        Ok(())
    }

    /// Closes every open connection.
    pub fn close_all(&mut self) {
        loop {
            let Some(id) = self.table.ids().next() else {
                break;
            };
            // The ID comes from the table, so the lookup cannot fail.
            let _ = self.close(id);
        }
    }

    pub fn state(&self, id: InstanceId) -> Option<SvState> {
        self.table.lookup(id).map(|index| self.table[index].state)
    }

    /// Last data published for `id`.
    pub fn published(&self, id: InstanceId) -> Option<&PublishedData> {
        self.table.lookup(id).map(|index| &self.table[index].published)
    }

    pub fn diagnostics(&self, id: InstanceId) -> Option<InstanceDiagnostics> {
        self.table
            .lookup(id)
            .map(|index| InstanceDiagnostics::from(&self.table[index]))
    }

    /// Clears the worst-case data age seen so far.
    pub fn reset_max_data_age(&mut self, id: InstanceId) -> Result<(), ValidatorError> {
        let index = self.resolve(id)?;
        self.table[index].consumption.max_data_age = 0;
        Ok(())
    }

    /// Connection faults raised since the server was created.
    pub fn fault_count(&self) -> u32 {
        self.fault_count
    }

    pub fn open_connections(&self) -> usize {
        self.table.in_use()
    }

    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    pub fn application(&self) -> &A {
        &self.app
    }

    pub fn application_mut(&mut self) -> &mut A {
        &mut self.app
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn fault_handler(&self) -> &F {
        &self.faults
    }

    /// Maps an application-supplied ID to a slot, reporting unknown IDs.
    fn resolve(&mut self, id: InstanceId) -> Result<usize, ValidatorError> {
        match self.table.lookup(id) {
            Some(index) => Ok(index),
            None => {
                self.faults
                    .on_fault(FaultCode::InvalidInstance, Some(id), u32::from(id.0));
                Err(ValidatorError::UnknownInstance(id.0))
            }
        }
    }

    /// Passes a fault to the handler and records not-fail-safe codes for
    /// diagnostics.
    fn report(&mut self, index: usize, code: FaultCode, info: u32) {
        let id = self.table.id_at(index);
        self.faults.on_fault(code, id, info);
        if code.class() == FaultClass::NotFailSafe {
            self.table[index].faults.last = Some(code);
        }
    }

    /// Reports `code` and takes the connection to Failed.
    fn fault_connection(&mut self, index: usize, code: FaultCode, info: u32) {
        self.report(index, code, info);
        self.fault_count = self.fault_count.saturating_add(1);
        if let Some(id) = self.table.id_at(index) {
            let ctx = InstanceLog::new("fault", id);
            sv_error!(ctx, "Connection faulted: {}", code);
        }
        self.transition(index, SvEvent::Faulted);
    }

    /// Runs one state machine step for the instance at `index`. The
    /// application sees the event before any data it can observe changes.
    fn transition(&mut self, index: usize, event: SvEvent) -> bool {
        let Some(id) = self.table.id_at(index) else {
            return false;
        };
        let ctx = InstanceLog::new("state", id);
        let current = self.table[index].state;
        let next = match next_state(current, event) {
            Ok(next) => next,
            Err(invalid) => {
                sv_warn!(ctx, "Ignoring event {:?} in state {:?}", event, current);
                self.report(index, FaultCode::InvalidTransition, invalid.info());
                return false;
            }
        };

        self.app.on_event(id, event);
        self.table[index].state = next;
        if next != current {
            sv_info!(ctx, "{:?} -> {:?} on {:?}", current, next, event);
        }

        match event {
            SvEvent::Faulted => {
                let consumer_number = self.table[index].init.calc.consumer_number;
                self.transport.send_close_request(id, consumer_number);
                self.publish_idle(index, true);
            }
            SvEvent::Close => self.publish_idle(index, false),
            _ => {}
        }
        true
    }

    /// Invalidates the published data: keeps the last payload, forces Idle.
    fn publish_idle(&mut self, index: usize, connection_fault: bool) {
        let Some(id) = self.table.id_at(index) else {
            return;
        };
        let instance = &mut self.table[index];
        let payload = core::mem::take(&mut instance.published.payload);
        instance.consumption.run_idle = RunIdle::Idle;
        instance.published = PublishedData {
            payload,
            run_idle: RunIdle::Idle,
            init_complete: false,
            connection_fault,
        };
        if !instance.published.payload.is_empty() {
            self.app.on_data_update(
                id,
                instance.init.connection_point,
                &instance.published.payload,
                RunIdle::Idle,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{Cast, ConnectionRole, FormatClass, Width};
    use alloc::vec::Vec;

    struct ZeroCrc;
    impl SafetyCrc for ZeroCrc {
        fn crc_s1(&self, _: u8, _: &[u8]) -> u8 {
            0
        }
        fn crc_s2(&self, _: u8, _: &[u8]) -> u8 {
            0
        }
        fn crc_s3(&self, _: u16, _: &[u8]) -> u16 {
            0
        }
        fn crc_s5(&self, _: u32, _: &[u8]) -> u32 {
            0
        }
    }

    struct NullTransport;
    impl SafetyTransport for NullTransport {
        fn send_time_coordination(&mut self, _: InstanceId, _: &[u8]) -> Result<(), ValidatorError> {
            Ok(())
        }
        fn send_close_request(&mut self, _: InstanceId, _: u8) {}
    }

    #[derive(Default)]
    struct Events(Vec<SvEvent>);
    impl SafetyApplication for Events {
        fn on_event(&mut self, _: InstanceId, event: SvEvent) {
            self.0.push(event);
        }
        fn on_data_update(&mut self, _: InstanceId, _: u16, _: &[u8], _: RunIdle) {}
    }

    #[derive(Default)]
    struct Faults(Vec<(FaultCode, u32)>);
    impl FaultHandler for Faults {
        fn on_fault(&mut self, code: FaultCode, _: Option<InstanceId>, info: u32) {
            self.0.push((code, info));
        }
    }

    fn open_one() -> (ValidatorServer<ZeroCrc, NullTransport, Events, Faults, 2>, InstanceId) {
        let mut server = ValidatorServer::new(ZeroCrc, NullTransport, Events::default(), Faults::default());
        let params = OpenParams {
            format: MessageFormat::new(Cast::Single, Width::Short, FormatClass::Base, ConnectionRole::Target),
            payload_size: 1,
            network_time_expectation: 100,
            consumer_number: 1,
            ..OpenParams::default()
        };
        let id = server.open(&params, 0).unwrap();
        (server, id)
    }

    #[test]
    fn test_invalid_transition_is_reported_without_state_change() {
        let (mut server, id) = open_one();
        let index = server.table.lookup(id).unwrap();

        assert!(!server.transition(index, SvEvent::Active));
        assert_eq!(server.state(id), Some(SvState::Initializing));
        assert_eq!(server.faults.0, [(FaultCode::InvalidTransition, 0x0104)]);
        // The application never saw the rejected event.
        assert_eq!(server.app.0, [SvEvent::Open]);
    }

    #[test]
    fn test_inconsistent_flags_fail_safe() {
        let (mut server, id) = open_one();
        let index = server.table.lookup(id).unwrap();
        server.table[index].published.run_idle = RunIdle::Run;

        assert_eq!(server.connection_status(id), Ok(ConnectionStatus::Faulted));
        assert_eq!(server.faults.0, [(FaultCode::InconsistentFlags, 0)]);
    }

    #[test]
    fn test_diagnostics_of_fresh_instance() {
        let (server, id) = open_one();
        let diagnostics = server.diagnostics(id).unwrap();
        assert_eq!(diagnostics.state, SvState::Initializing);
        assert_eq!(diagnostics.payload_size, 1);
        assert_eq!(diagnostics.last_fault, None);
        assert_eq!(server.open_connections(), 1);
        assert_eq!(server.capacity(), 2);
    }
}
