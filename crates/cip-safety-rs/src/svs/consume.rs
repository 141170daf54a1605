// crates/cip-safety-rs/src/svs/consume.rs

use super::correction::CorrectionOutcome;
use super::events::{SafetyApplication, SvEvent};
use super::instance::PublishedData;
use super::state_machine::SvState;
use super::ValidatorServer;
use crate::fault::{FaultCode, FaultHandler};
use crate::format::FormatClass;
use crate::frame::{DataSection, RunIdle, TIME_CORRECTION_LEN};
use crate::hal::{SafetyCrc, SafetyTransport, ValidatorError};
use crate::log::{InstanceLog, sv_debug, sv_trace, sv_warn};
use crate::types::{InstanceId, Ticks, local_clock};

/// Result of handing one received message to [`ValidatorServer::consume`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// The data was validated and published.
    Accepted,
    /// The message was faulted, but the Extended format fault budget
    /// allowed the connection to stay open.
    DiscardedButOpen,
    /// The connection is (now) faulted or not open.
    ConnectionClosed,
}

/// Condensed view of the published flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ConnectionStatus {
    Faulted,
    Idle,
    ConsumingRun,
}

/// What the cast specific stage decided about an intact message.
#[derive(Debug, Clone, Copy)]
struct Evaluation {
    corrected_timestamp: u16,
    init_complete: bool,
    run_idle: RunIdle,
    data_age: u16,
}

impl<C, T, A, F, const N: usize> ValidatorServer<C, T, A, F, N>
where
    C: SafetyCrc,
    T: SafetyTransport,
    A: SafetyApplication,
    F: FaultHandler,
{
    /// Validates one received safety message and publishes its data.
    ///
    /// Multi-cast messages may carry a Time Correction message after the
    /// data section; it is processed first.
    pub fn consume(
        &mut self,
        id: InstanceId,
        buffer: &[u8],
        now: Ticks,
    ) -> Result<ConsumeOutcome, ValidatorError> {
        let index = self.resolve(id)?;
        let ctx = InstanceLog::new("consume", id);
        let state = self.table[index].state;
        if !matches!(state, SvState::Initializing | SvState::Established) {
            sv_debug!(ctx, "Dropping message received in state {:?}", state);
            return Ok(ConsumeOutcome::ConnectionClosed);
        }

        let format = self.table[index].init.format;
        let data_len = format.data_section_len(self.table[index].init.payload_size);
        let mut data_part = buffer;
        if format.is_multicast() && buffer.len() == data_len + TIME_CORRECTION_LEN {
            if self.receive_correction_at(index, &buffer[data_len..])
                == CorrectionOutcome::Closed
            {
                return Ok(ConsumeOutcome::ConnectionClosed);
            }
            data_part = &buffer[..data_len];
        }

        Ok(self.consume_data(index, data_part, now))
    }

    fn consume_data(&mut self, index: usize, buffer: &[u8], now: Ticks) -> ConsumeOutcome {
        let Some(id) = self.table.id_at(index) else {
            return ConsumeOutcome::ConnectionClosed;
        };
        let ctx = InstanceLog::new("consume", id);
        let instance = &self.table[index];
        let format = instance.init.format;

        let section = match DataSection::parse(&format, instance.init.payload_size, buffer) {
            Ok(section) => section,
            Err(err) => {
                sv_warn!(ctx, "Malformed data section: {}", err);
                let info = buffer.len() as u32;
                return self.handle_message_fault(index, FaultCode::InvalidLength, info, now);
            }
        };

        // Before initialisation a single-cast producer sends Idle messages
        // stamped 0; those are checked without rollover and sequencing.
        let special = !format.is_multicast()
            && !instance.consumption.init_complete
            && section.mode.run_idle() == RunIdle::Idle
            && section.timestamp == 0;

        let rollover = match format.class {
            FormatClass::Extended if !special => {
                resolve_rollover(&instance.consumption, section.timestamp)
            }
            _ => 0,
        };

        if let Err(code) = section.verify(&self.crc, &instance.init.calc.pid_seeds, rollover) {
            return self.handle_message_fault(index, code, u32::from(section.timestamp), now);
        }

        let delta = if special || !instance.consumption.sequence_started {
            1
        } else {
            section.timestamp.wrapping_sub(instance.consumption.last_timestamp)
        };
        if delta == 0 {
            return self.handle_message_fault(index, FaultCode::TimestampRepeated, 0, now);
        }
        if delta > instance.init.calc.ntem {
            let info = u32::from(delta);
            return self.handle_message_fault(index, FaultCode::TimestampDeltaTooLarge, info, now);
        }

        // Correction starvation and stale data close the connection in
        // every format; the Extended fault budget only covers the
        // integrity and sequencing checks above.
        let evaluation = match self.evaluate(index, &section, special, now) {
            Ok(evaluation) => evaluation,
            Err((code, info)) => {
                sv_warn!(ctx, "Message rejected ({}), closing connection", code);
                self.fault_connection(index, code, info);
                return ConsumeOutcome::ConnectionClosed;
            }
        };

        // Accepted. Commit the pipeline state before any callback runs.
        let instance = &mut self.table[index];
        let consumption = &mut instance.consumption;
        if format.is_extended() && (format.is_multicast() || evaluation.init_complete) {
            update_rollover(consumption, section.timestamp);
        }
        if !special {
            consumption.last_timestamp = section.timestamp;
            consumption.sequence_started = true;
        }
        let became_active = evaluation.init_complete && !consumption.init_complete;
        consumption.init_complete = evaluation.init_complete;
        consumption.run_idle = evaluation.run_idle;
        consumption.last_corrected_timestamp = evaluation.corrected_timestamp;
        consumption.data_age = evaluation.data_age;
        consumption.max_data_age = consumption.max_data_age.max(evaluation.data_age);
        let ntem = instance.init.calc.ntem;
        let previous_run_idle = instance.published.run_idle;

        sv_trace!(
            ctx,
            "Accepted ts={} corrected={} age={}",
            section.timestamp,
            evaluation.corrected_timestamp,
            evaluation.data_age
        );

        self.ping_count_check(index, section.mode, now);

        if became_active {
            self.transition(index, SvEvent::Active);
        }
        if evaluation.run_idle != previous_run_idle {
            let event = match evaluation.run_idle {
                RunIdle::Run => SvEvent::RunTransition,
                RunIdle::Idle => SvEvent::IdleTransition,
            };
            self.transition(index, event);
        }

        self.publish(index, section.data, evaluation);

        let remaining = ntem.saturating_sub(evaluation.data_age);
        let deadline = now.wrapping_add(u32::from(remaining));
        self.table[index].activity.reception_deadline = Some(deadline);
        ConsumeOutcome::Accepted
    }

    /// Cast specific checks and the data age check.
    fn evaluate(
        &self,
        index: usize,
        section: &DataSection<'_>,
        special: bool,
        now: Ticks,
    ) -> Result<Evaluation, (FaultCode, u32)> {
        let instance = &self.table[index];
        let consumption = &instance.consumption;

        let multicast = instance.init.format.is_multicast();
        let (corrected_timestamp, init_complete, run_allowed) = if multicast {
            let correction = &instance.correction;
            let limit = u16::from(correction.timeout_multiplier.effective) + 1;
            if correction.received && correction.ping_intervals > limit {
                let info = u32::from(correction.ping_intervals);
                return Err((FaultCode::CorrectionNotReceived, info));
            }
            (
                section.timestamp.wrapping_add(correction.correction_value),
                correction.received,
                correction.active,
            )
        } else {
            let init_complete = consumption.init_complete
                || (instance.coordination.first_received && !special);
            (section.timestamp, init_complete, true)
        };

        let run_idle = if init_complete && run_allowed && section.mode.run_idle() == RunIdle::Run {
            RunIdle::Run
        } else {
            RunIdle::Idle
        };

        let data_age = if init_complete {
            let age = local_clock(now).wrapping_sub(corrected_timestamp);
            if age > instance.init.calc.ntem {
                return Err((FaultCode::DataAgeExceeded, u32::from(age)));
            }
            age
        } else {
            0
        };

        Ok(Evaluation {
            corrected_timestamp,
            init_complete,
            run_idle,
            data_age,
        })
    }

    /// Local reaction to an integrity or sequencing fault. Extended
    /// connections may discard the message while their fault budget lasts
    /// and the last good data is still fresh; every other case closes the
    /// connection.
    fn handle_message_fault(
        &mut self,
        index: usize,
        code: FaultCode,
        info: u32,
        now: Ticks,
    ) -> ConsumeOutcome {
        let instance = &mut self.table[index];
        if instance.init.format.is_extended() {
            let tolerated = instance.faults.counter.record_fault();
            let age = if instance.consumption.init_complete {
                local_clock(now).wrapping_sub(instance.consumption.last_corrected_timestamp)
            } else {
                0
            };
            if tolerated && age <= instance.init.calc.ntem {
                let count = instance.faults.counter.count();
                self.report(index, code, info);
                if let Some(id) = self.table.id_at(index) {
                    let ctx = InstanceLog::new("consume", id);
                    sv_warn!(ctx, "Discarded message ({}), fault count {}", code, count);
                }
                return ConsumeOutcome::DiscardedButOpen;
            }
        }
        self.fault_connection(index, code, info);
        ConsumeOutcome::ConnectionClosed
    }

    /// Replaces the published data and hands it to the application.
    fn publish(&mut self, index: usize, data: &[u8], evaluation: Evaluation) {
        let Some(id) = self.table.id_at(index) else {
            return;
        };
        let instance = &mut self.table[index];
        let mut payload = core::mem::take(&mut instance.published.payload);
        payload.clear();
        payload.extend_from_slice(data);
        instance.published = PublishedData {
            payload,
            run_idle: evaluation.run_idle,
            init_complete: evaluation.init_complete,
            connection_fault: false,
        };
        self.app.on_data_update(
            id,
            instance.init.connection_point,
            &instance.published.payload,
            evaluation.run_idle,
        );
    }

    /// Summarises the published flags of a connection.
    pub fn connection_status(
        &mut self,
        id: InstanceId,
    ) -> Result<ConnectionStatus, ValidatorError> {
        let index = self.resolve(id)?;
        let published = &self.table[index].published;
        if published.connection_fault {
            return Ok(ConnectionStatus::Faulted);
        }
        match (published.run_idle, published.init_complete) {
            (RunIdle::Idle, _) => Ok(ConnectionStatus::Idle),
            (RunIdle::Run, true) => Ok(ConnectionStatus::ConsumingRun),
            (RunIdle::Run, false) => {
                self.report(index, FaultCode::InconsistentFlags, 0);
                Ok(ConnectionStatus::Faulted)
            }
        }
    }
}

/// Rollover count the producer used for `timestamp`: one more than the
/// stored count when the time stamp wrapped since the last update.
fn resolve_rollover(consumption: &super::instance::ConsumptionLocals, timestamp: u16) -> u16 {
    if timestamp < consumption.rollover_reference {
        consumption.rollover_count.wrapping_add(1)
    } else {
        consumption.rollover_count
    }
}

fn update_rollover(consumption: &mut super::instance::ConsumptionLocals, timestamp: u16) {
    consumption.rollover_count = resolve_rollover(consumption, timestamp);
    consumption.rollover_reference = timestamp;
}
