use crate::types::InstanceId;
use alloc::format;
use alloc::string::String;

/// Trait for structs that provide metadata for logging
pub trait LogMetadata {
    fn meta(&self) -> String;
}

/// Identifies the validator instance a log line belongs to.
pub struct InstanceLog {
    pub component: &'static str,
    pub id: InstanceId,
}

impl InstanceLog {
    pub fn new(component: &'static str, id: InstanceId) -> Self {
        Self { component, id }
    }
}

impl LogMetadata for InstanceLog {
    fn meta(&self) -> String {
        format!("component={}, instance={}", self.component, self.id.0)
    }
}

// =============================================
// Logging Macros (namespaced under crate::log)
// =============================================

// ===== sv_info! =====
macro_rules! sv_info {
    ($ctx:expr, $fmt:literal $(, $($arg:tt)+)?) => {{
        let meta = $crate::log::LogMetadata::meta(&$ctx);
        ::log::info!(concat!("[{}] ", $fmt), meta $(, $($arg)+)?);
    }};
}

// ===== sv_warn! =====
macro_rules! sv_warn {
    ($ctx:expr, $fmt:literal $(, $($arg:tt)+)?) => {{
        let meta = $crate::log::LogMetadata::meta(&$ctx);
        ::log::warn!(concat!("[{}] ", $fmt), meta $(, $($arg)+)?);
    }};
}

// ===== sv_error! =====
macro_rules! sv_error {
    ($ctx:expr, $fmt:literal $(, $($arg:tt)+)?) => {{
        let meta = $crate::log::LogMetadata::meta(&$ctx);
        ::log::error!(concat!("[{}] ", $fmt), meta $(, $($arg)+)?);
    }};
}

// ===== sv_debug! =====
macro_rules! sv_debug {
    ($ctx:expr, $fmt:literal $(, $($arg:tt)+)?) => {{
        let meta = $crate::log::LogMetadata::meta(&$ctx);
        ::log::debug!(concat!("[{}] ", $fmt), meta $(, $($arg)+)?);
    }};
}

// ===== sv_trace! =====
macro_rules! sv_trace {
    ($ctx:expr, $fmt:literal $(, $($arg:tt)+)?) => {{
        let meta = $crate::log::LogMetadata::meta(&$ctx);
        ::log::trace!(concat!("[{}] ", $fmt), meta $(, $($arg)+)?);
    }};
}

// Re-export macros for use in other files
pub(crate) use sv_debug;
pub(crate) use sv_error;
pub(crate) use sv_info;
pub(crate) use sv_trace;
pub(crate) use sv_warn;
