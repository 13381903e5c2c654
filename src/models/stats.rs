#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProcessStats {
    /// CPU usage (percent of one core, may exceed 100 on multi-core)
    pub cpu_usage: f32,

    /// Resident memory (bytes)
    pub memory_bytes: u64,
}

impl ProcessStats {
    /// Resident memory in mebibytes, for display
    pub fn memory_mb(&self) -> f64 {
        self.memory_bytes as f64 / (1024.0 * 1024.0)
    }
}
