// crates/cip-safety-rs/src/svs/coordination.rs

use super::events::{SafetyApplication, SvEvent};
use super::ValidatorServer;
use crate::fault::{FaultCode, FaultHandler};
use crate::frame::{ModeByte, TIME_COORDINATION_LEN, TimeCoordination};
use crate::hal::{SafetyCrc, SafetyTransport};
use crate::log::{InstanceLog, sv_debug, sv_warn};
use crate::types::{COORDINATION_BACKSTOP_TICKS, Ticks, local_clock, ticks_reached};

impl<C, T, A, F, const N: usize> ValidatorServer<C, T, A, F, N>
where
    C: SafetyCrc,
    T: SafetyTransport,
    A: SafetyApplication,
    F: FaultHandler,
{
    /// Tracks the producer's ping count and schedules Time Coordination
    /// replies. Runs for every accepted data message.
    ///
    /// A ping count change arms a countdown of `consumer_number` messages so
    /// that the consumers of a multi-cast connection answer in turn. The
    /// first message of a connection is answered at once.
    pub(crate) fn ping_count_check(&mut self, index: usize, mode: ModeByte, now: Ticks) {
        let ping_count = mode.ping_count();
        let instance = &mut self.table[index];
        let consumer_number = instance.init.calc.consumer_number;
        let multicast = instance.init.format.is_multicast();
        let coordination = &mut instance.coordination;

        if !coordination.first_received {
            coordination.first_received = true;
            coordination.last_ping_count = ping_count;
            coordination.countdown = 0;
            self.transition(index, SvEvent::FirstDataReceived);
            self.produce_coordination(index, now);
            self.time_to_send(index, now);
            return;
        }

        if ping_count != coordination.last_ping_count {
            coordination.last_ping_count = ping_count;
            coordination.countdown = consumer_number;
            coordination.backstop_deadline = Some(now.wrapping_add(COORDINATION_BACKSTOP_TICKS));
            if multicast {
                let correction = &mut instance.correction;
                correction.ping_intervals = correction.ping_intervals.saturating_add(1);
            }
        }

        let coordination = &mut self.table[index].coordination;
        if coordination.countdown > 0 {
            coordination.countdown -= 1;
            if coordination.countdown == 0 {
                self.produce_coordination(index, now);
            }
        }
    }

    /// Builds the reply for the last seen ping count, stamped with the local
    /// clock, and marks it for sending.
    fn produce_coordination(&mut self, index: usize, now: Ticks) {
        let instance = &mut self.table[index];
        let message = TimeCoordination::build(
            instance.init.class(),
            &self.crc,
            &instance.init.calc.cid_seeds,
            instance.coordination.last_ping_count,
            local_clock(now),
        );
        let coordination = &mut instance.coordination;
        coordination.message = message;
        coordination.countdown = 0;
        coordination.send_pending = true;
        coordination.backstop_deadline = None;
    }

    /// Forces production once the backstop expired, then flushes a pending
    /// reply to the transport.
    pub(crate) fn time_to_send(&mut self, index: usize, now: Ticks) {
        let Some(id) = self.table.id_at(index) else {
            return;
        };
        let ctx = InstanceLog::new("coordination", id);

        let coordination = &self.table[index].coordination;
        if let Some(deadline) = coordination.backstop_deadline
            && coordination.countdown > 0
            && ticks_reached(now, deadline)
        {
            sv_debug!(ctx, "Backstop expired with countdown {}", coordination.countdown);
            self.produce_coordination(index, now);
        }

        let instance = &mut self.table[index];
        if !instance.coordination.send_pending {
            return;
        }
        instance.coordination.send_pending = false;

        let mut buffer = [0u8; TIME_COORDINATION_LEN];
        let class = instance.init.class();
        let result = instance
            .coordination
            .message
            .serialize(class, &mut buffer)
            .and_then(|len| self.transport.send_time_coordination(id, &buffer[..len]));
        match result {
            Ok(()) => sv_debug!(
                ctx,
                "Sent Time Coordination for ping count {}",
                instance.coordination.last_ping_count
            ),
            Err(err) => {
                sv_warn!(ctx, "Time Coordination dropped: {}", err);
                self.report(index, FaultCode::CoordinationSendFailed, 0);
            }
        }
    }
}
