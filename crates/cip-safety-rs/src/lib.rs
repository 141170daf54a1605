#![cfg_attr(not(any(feature = "std", test)), no_std)]

// 'alloc' is used for dynamic allocation (e.g., the published payload buffers)
extern crate alloc;

// --- Foundation Modules ---
pub mod types;
pub mod hal;
pub mod format;
mod log;

// --- Wire formats ---
pub mod frame;

// --- Fault reporting ---
pub mod fault;

// --- Safety Validator Server (consumer) ---
pub mod svs;

// --- Top-level Exports ---
pub use types::{InstanceId, Ticks};
pub use hal::{SafetyCrc, SafetyTransport, ValidatorError};
pub use format::{Cast, ConnectionRole, FormatClass, MessageFormat, Width};
pub use fault::{FaultClass, FaultCode, FaultHandler, LoggingFaultHandler, NoOpFaultHandler};
pub use svs::{
    ConnectionStatus, ConsumeOutcome, OpenParams, SafetyApplication, SvEvent, SvState,
    ValidatorServer,
};
