use parking_lot::Mutex;

/// Running total of inspected bytes reported by segment searches
#[derive(Debug, Default)]
pub struct MetricsCollector {
    total: Mutex<u64>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        MetricsCollector::default()
    }

    pub fn add(&self, bytes: u64) {
        *self.total.lock() += bytes;
    }

    pub fn total_value(&self) -> u64 {
        *self.total.lock()
    }
}
