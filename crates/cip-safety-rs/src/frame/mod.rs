//! Defines the wire layouts exchanged on a safety connection: the safety
//! data section, the Time Coordination message and the Time Correction
//! message.

pub mod codec;
pub mod coordination;
pub mod correction;
pub mod data;
pub mod mode_byte;

pub use codec::{CodecHelpers, SeedSet};
pub use coordination::{AckByte, TimeCoordination};
pub use correction::{McastByte, TimeCorrection};
pub use data::{DataMessage, DataSection};
pub use mode_byte::{ModeByte, RunIdle};

/// Length of a Time Coordination message, for both format classes.
pub const TIME_COORDINATION_LEN: usize = 6;

/// Length of a Time Correction message, for both format classes.
pub const TIME_CORRECTION_LEN: usize = 6;
