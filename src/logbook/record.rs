use crate::collectors::Snapshot;
use chrono::NaiveDateTime;

pub const HEADER: [&str; 7] = [
    "Date",
    "CPU Usage (%)",
    "Memory Total (GB)",
    "Memory Available (GB)",
    "Disk Free Space (GB)",
    "Total Disk Space (GB)",
    "Remarks",
];

pub const COLUMN_COUNT: usize = HEADER.len();

pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d,%H:%M";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub date_time: String,
    pub cpu_percent: f64,
    pub memory_total_gb: f64,
    pub memory_available_gb: f64,
    pub disk_free_gb: f64,
    pub disk_total_gb: f64,
    pub remarks: String,
}

impl LogRecord {
    pub fn from_snapshot(snapshot: &Snapshot, now: NaiveDateTime) -> Self {
        let (disk_free_gb, disk_total_gb) = snapshot
            .disks
            .first()
            .map(|d| (d.free_gb, d.total_gb))
            .unwrap_or((0.0, 0.0));

        Self {
            date_time: now.format(DATE_TIME_FORMAT).to_string(),
            cpu_percent: snapshot.cpu_percent,
            memory_total_gb: snapshot.memory_total_gb,
            memory_available_gb: snapshot.memory_available_gb,
            disk_free_gb,
            disk_total_gb,
            remarks: String::new(),
        }
    }

    /// Calendar date part of `date_time` (text before the first comma).
    pub fn date(&self) -> &str {
        date_part(&self.date_time)
    }

    pub fn numbers(&self) -> [f64; 5] {
        [
            self.cpu_percent,
            self.memory_total_gb,
            self.memory_available_gb,
            self.disk_free_gb,
            self.disk_total_gb,
        ]
    }
}

pub fn date_part(date_time: &str) -> &str {
    date_time
        .split_once(',')
        .map_or(date_time, |(date, _)| date)
        .trim()
}
