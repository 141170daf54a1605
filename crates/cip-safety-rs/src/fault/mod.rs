//! Centralizes fault reporting for the validator: fault codes, their
//! severity class, the pluggable reporting funnel and the per-connection
//! fault counter.

pub mod counters;
pub mod traits;
pub mod types;

pub use counters::ConsumerFaultCounter;
pub use traits::{FaultHandler, LoggingFaultHandler, NoOpFaultHandler};
pub use types::{FaultClass, FaultCode};

// Re-export common handler implementations for convenience.
#[cfg(feature = "std")]
pub use traits::StdoutFaultHandler;
