/// Counts faulted messages of an Extended format connection and decides
/// whether the connection may stay open.
///
/// Unlike a threshold counter that decays on good cycles, this counter only
/// moves up; it is cleared when the instance is (re)initialised.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConsumerFaultCounter {
    count: u8,
    max_fault_number: u8,
}

impl ConsumerFaultCounter {
    /// Creates a new counter with the connection's Max Fault Number.
    pub fn new(max_fault_number: u8) -> Self {
        Self {
            count: 0,
            max_fault_number,
        }
    }

    /// Records one faulted message and returns `true` while the count is
    /// still below the Max Fault Number.
    pub fn record_fault(&mut self) -> bool {
        self.count = self.count.saturating_add(1);
        self.count < self.max_fault_number
    }

    pub fn count(&self) -> u8 {
        self.count
    }

    pub fn max_fault_number(&self) -> u8 {
        self.max_fault_number
    }
}
