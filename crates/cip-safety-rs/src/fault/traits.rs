use super::types::{FaultClass, FaultCode};
use crate::types::InstanceId;
use log::{error, warn};

/// A trait that defines how validator faults are reported.
///
/// Every detected anomaly passes through this funnel exactly once, before the
/// validator performs its local reaction (discard or connection fault).
pub trait FaultHandler {
    fn on_fault(&mut self, code: FaultCode, instance: Option<InstanceId>, info: u32);
}

/// A `no_std` compatible fault handler that does nothing.
pub struct NoOpFaultHandler;
impl FaultHandler for NoOpFaultHandler {
    fn on_fault(&mut self, _code: FaultCode, _instance: Option<InstanceId>, _info: u32) {}
}

/// A fault handler that logs all faults using the `log` facade.
pub struct LoggingFaultHandler;
impl FaultHandler for LoggingFaultHandler {
    fn on_fault(&mut self, code: FaultCode, instance: Option<InstanceId>, info: u32) {
        match code.class() {
            FaultClass::FailSafe => {
                error!("[SV Fault] {:?} (instance {:?}, info {:#x})", code, instance, info)
            }
            FaultClass::NotFailSafe => {
                warn!("[SV Fault] {:?} (instance {:?}, info {:#x})", code, instance, info)
            }
        }
    }
}

/// An example `std`-based fault handler that prints faults to the console.
#[cfg(feature = "std")]
pub struct StdoutFaultHandler;
#[cfg(feature = "std")]
impl FaultHandler for StdoutFaultHandler {
    fn on_fault(&mut self, code: FaultCode, instance: Option<InstanceId>, info: u32) {
        println!("[CIP SAFETY FAULT]: {} (instance {:?}, info {:#x})", code, instance, info);
    }
}
