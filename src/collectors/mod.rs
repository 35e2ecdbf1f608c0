pub mod system;

use chrono::NaiveDateTime;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

#[derive(Debug, Clone, PartialEq)]
pub struct DiskSample {
    pub device: String,
    pub free_gb: f64,
    pub total_gb: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemorySample {
    pub total_gb: f64,
    pub available_gb: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub timestamp: NaiveDateTime,
    pub cpu_percent: f64,
    pub memory_total_gb: f64,
    pub memory_available_gb: f64,
    pub disks: Vec<DiskSample>,
}

pub trait MetricsSource {
    fn sample_cpu(&mut self) -> Option<f64>;
    fn sample_memory(&mut self) -> Option<MemorySample>;
    fn sample_disks(&mut self) -> Option<Vec<DiskSample>>;
}

impl Snapshot {
    /// Samples every metric from `source`. Returns `None` as soon as one
    /// of them is unavailable, so no partial snapshot reaches the log.
    pub fn capture(source: &mut impl MetricsSource, timestamp: NaiveDateTime) -> Option<Self> {
        let cpu_percent = source.sample_cpu()?;
        let memory = source.sample_memory()?;
        let disks = source.sample_disks()?;
        Some(Self {
            timestamp,
            cpu_percent,
            memory_total_gb: memory.total_gb,
            memory_available_gb: memory.available_gb,
            disks,
        })
    }
}

pub fn bytes_to_gb(bytes: u64) -> f64 {
    round2(bytes as f64 / BYTES_PER_GB)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
