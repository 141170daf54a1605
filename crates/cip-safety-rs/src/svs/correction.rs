// crates/cip-safety-rs/src/svs/correction.rs

use super::consume::ConsumeOutcome;
use super::events::SafetyApplication;
use super::state_machine::SvState;
use super::ValidatorServer;
use crate::fault::{FaultCode, FaultHandler};
use crate::frame::TimeCorrection;
use crate::hal::{SafetyCrc, SafetyTransport, ValidatorError};
use crate::log::{InstanceLog, sv_debug, sv_warn};
use crate::types::InstanceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CorrectionOutcome {
    /// Addressed to another consumer of the same multi-cast connection.
    Ignored,
    Accepted,
    /// Faulted, tolerated by the Extended fault budget.
    Discarded,
    /// Faulted, the connection was closed.
    Closed,
}

impl<C, T, A, F, const N: usize> ValidatorServer<C, T, A, F, N>
where
    C: SafetyCrc,
    T: SafetyTransport,
    A: SafetyApplication,
    F: FaultHandler,
{
    /// Handles a Time Correction message received on its own.
    pub fn receive_correction(
        &mut self,
        id: InstanceId,
        message: &[u8],
    ) -> Result<ConsumeOutcome, ValidatorError> {
        let index = self.resolve(id)?;
        if !self.table[index].init.format.is_multicast() {
            return Err(ValidatorError::InvalidState);
        }
        if !matches!(self.table[index].state, SvState::Initializing | SvState::Established) {
            return Ok(ConsumeOutcome::ConnectionClosed);
        }
        Ok(match self.receive_correction_at(index, message) {
            CorrectionOutcome::Ignored | CorrectionOutcome::Accepted => ConsumeOutcome::Accepted,
            CorrectionOutcome::Discarded => ConsumeOutcome::DiscardedButOpen,
            CorrectionOutcome::Closed => ConsumeOutcome::ConnectionClosed,
        })
    }

    pub(crate) fn receive_correction_at(&mut self, index: usize, message: &[u8]) -> CorrectionOutcome {
        let Some(id) = self.table.id_at(index) else {
            return CorrectionOutcome::Closed;
        };
        let ctx = InstanceLog::new("correction", id);
        let instance = &self.table[index];
        let class = instance.init.class();

        let correction = match TimeCorrection::deserialize(class, message) {
            Ok(correction) => correction,
            Err(err) => {
                sv_warn!(ctx, "Malformed Time Correction message: {}", err);
                return self.handle_correction_fault(index, FaultCode::CorrectionCrc, message.len() as u32);
            }
        };
        if correction.mcast.consumer_number() != instance.init.calc.consumer_number {
            return CorrectionOutcome::Ignored;
        }

        let verdict = correction
            .verify(class, &self.crc, &instance.init.calc.pid_seeds)
            .and_then(|()| {
                if instance.correction.active && !correction.mcast.is_active() {
                    Err(FaultCode::CorrectionActiveToIdle)
                } else {
                    Ok(())
                }
            });
        if let Err(code) = verdict {
            return self.handle_correction_fault(index, code, u32::from(correction.mcast.0));
        }

        let locals = &mut self.table[index].correction;
        locals.correction_value = correction.correction_value;
        locals.active = correction.mcast.is_active();
        locals.received = true;
        locals.ping_intervals = 0;
        sv_debug!(
            ctx,
            "Time Correction accepted: value={} active={}",
            correction.correction_value,
            locals.active
        );
        CorrectionOutcome::Accepted
    }

    fn handle_correction_fault(&mut self, index: usize, code: FaultCode, info: u32) -> CorrectionOutcome {
        let instance = &mut self.table[index];
        if instance.init.format.is_extended() && instance.faults.counter.record_fault() {
            self.report(index, code, info);
            return CorrectionOutcome::Discarded;
        }
        self.fault_connection(index, code, info);
        CorrectionOutcome::Closed
    }
}
