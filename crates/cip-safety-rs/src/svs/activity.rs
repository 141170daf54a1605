// crates/cip-safety-rs/src/svs/activity.rs

use super::events::SafetyApplication;
use super::state_machine::SvState;
use super::ValidatorServer;
use crate::fault::{FaultCode, FaultHandler};
use crate::hal::{SafetyCrc, SafetyTransport};
use crate::types::{InstanceId, Ticks, ticks_reached};

impl<C, T, A, F, const N: usize> ValidatorServer<C, T, A, F, N>
where
    C: SafetyCrc,
    T: SafetyTransport,
    A: SafetyApplication,
    F: FaultHandler,
{
    /// Periodic supervision of one connection.
    ///
    /// Checks the initialisation deadline and the reception deadline, then
    /// gives the Time Coordination producer a chance to send. Unknown IDs
    /// are ignored so that a tick racing a close does nothing.
    pub fn tick(&mut self, id: InstanceId, now: Ticks) {
        let Some(index) = self.table.lookup(id) else {
            return;
        };
        let instance = &self.table[index];
        if !matches!(instance.state, SvState::Initializing | SvState::Established) {
            return;
        }

        if !instance.consumption.init_complete
            && ticks_reached(now, instance.activity.init_deadline)
        {
            let info = now.wrapping_sub(instance.activity.init_deadline);
            self.fault_connection(index, FaultCode::InitTimeout, info);
            return;
        }

        if let Some(deadline) = instance.activity.reception_deadline
            && ticks_reached(now, deadline)
        {
            self.fault_connection(index, FaultCode::ActivityTimeout, now.wrapping_sub(deadline));
            return;
        }

        self.time_to_send(index, now);
    }

    /// Runs [`Self::tick`] for every open connection.
    pub fn tick_all(&mut self, now: Ticks) {
        for index in 0..self.table.capacity() {
            if let Some(id) = self.table.id_at(index) {
                self.tick(id, now);
            }
        }
    }
}
