pub mod record;
pub mod table;
pub mod xlsx;

use crate::collectors::Snapshot;
use crate::config::LogConfig;
use chrono::NaiveDateTime;
use record::{LogRecord, DATE_FORMAT};
use std::path::{Path, PathBuf};
use table::LogTable;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum LogError {
    #[error("failed to open log {path}: {source}")]
    Open {
        path: String,
        source: calamine::XlsxError,
    },
    #[error("log {path} contains no worksheet")]
    MissingSheet { path: String },
    #[error("log {path} has an incompatible layout: {reason}")]
    Schema { path: String, reason: String },
    #[error("failed to build workbook for {path}: {source}")]
    Build {
        path: String,
        source: rust_xlsxwriter::XlsxError,
    },
    #[error("failed to write log {path}: {source}")]
    Save {
        path: String,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Appended {
    pub path: PathBuf,
    pub date: String,
    pub previous_latest_date: String,
    pub row: usize,
    pub duplicate: bool,
    pub marked: usize,
}

#[derive(Debug, Clone)]
pub struct LogWriter {
    path: PathBuf,
    column_width: f64,
    duplicate_remark: String,
}

impl LogWriter {
    pub fn new(path: impl Into<PathBuf>, cfg: &LogConfig) -> Self {
        Self {
            path: path.into(),
            column_width: cfg.column_width,
            duplicate_remark: cfg.duplicate_remark.clone(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// On error nothing is written; the in-memory table is dropped.
    pub fn append(
        &self,
        snapshot: &Snapshot,
        previous_latest_date: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<Appended, LogError> {
        let today = now.format(DATE_FORMAT).to_string();
        let previous_latest_date = previous_latest_date
            .map(str::to_string)
            .unwrap_or_else(|| today.clone());

        let mut table = match xlsx::load(&self.path)? {
            Some(table) => {
                debug!(path = %self.path.display(), rows = table.records.len(), "loaded existing log");
                table
            }
            None => {
                info!(path = %self.path.display(), "creating new log");
                LogTable::default()
            }
        };

        let row = table.push(LogRecord::from_snapshot(snapshot, now));
        let marked = table.mark_duplicates(&self.duplicate_remark);
        let duplicate = table.records[row].remarks == self.duplicate_remark;

        xlsx::save(&table, &self.path, self.column_width)?;
        debug!(
            path = %self.path.display(),
            row,
            marked,
            duplicate,
            "log saved"
        );

        Ok(Appended {
            path: self.path.clone(),
            date: today,
            previous_latest_date,
            row,
            duplicate,
            marked,
        })
    }

    pub fn latest_date(&self) -> Result<Option<String>, LogError> {
        let Some(table) = xlsx::load(&self.path)? else {
            return Ok(None);
        };
        Ok(table
            .records
            .iter()
            .rev()
            .map(LogRecord::date)
            .find(|d| !d.is_empty())
            .map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::DiskSample;
    use crate::config::LogConfig;
    use chrono::NaiveDate;
    use std::fs;

    const DUP: &str = "重複";

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .and_then(|d| d.and_hms_opt(hour, minute, 0))
            .expect("valid timestamp")
    }

    fn snapshot(disks: Vec<DiskSample>) -> Snapshot {
        Snapshot {
            timestamp: at(1, 0, 0),
            cpu_percent: 12.5,
            memory_total_gb: 16.0,
            memory_available_gb: 8.2,
            disks,
        }
    }

    fn c_drive() -> Vec<DiskSample> {
        vec![DiskSample {
            device: "C:".to_string(),
            free_gb: 100.0,
            total_gb: 500.0,
        }]
    }

    fn writer(dir: &tempfile::TempDir) -> LogWriter {
        LogWriter::new(dir.path().join("system_info.xlsx"), &LogConfig::default())
    }

    fn reload(writer: &LogWriter) -> LogTable {
        xlsx::load(writer.path())
            .expect("load")
            .expect("log exists")
    }

    #[test]
    fn first_write_creates_log_with_single_row() {
        let dir = tempfile::tempdir().expect("tempdir");
        let writer = writer(&dir);

        let appended = writer
            .append(&snapshot(c_drive()), None, at(1, 9, 15))
            .expect("append");
        assert_eq!(appended.path, writer.path());
        assert_eq!(appended.date, "2024-01-01");
        assert_eq!(appended.previous_latest_date, "2024-01-01");
        assert_eq!(appended.row, 0);
        assert!(!appended.duplicate);

        let table = reload(&writer);
        assert_eq!(table.records.len(), 1);
        let row = &table.records[0];
        assert_eq!(row.date_time, "2024-01-01,09:15");
        assert_eq!(row.numbers(), [12.5, 16.0, 8.2, 100.0, 500.0]);
        assert_eq!(row.remarks, "");
    }

    #[test]
    fn second_write_on_same_day_is_marked() {
        let dir = tempfile::tempdir().expect("tempdir");
        let writer = writer(&dir);

        writer
            .append(&snapshot(c_drive()), None, at(1, 9, 0))
            .expect("first append");
        let second = writer
            .append(&snapshot(c_drive()), Some("2024-01-01"), at(1, 17, 45))
            .expect("second append");
        assert!(second.duplicate);
        assert_eq!(second.row, 1);
        assert_eq!(second.marked, 1);

        let table = reload(&writer);
        let remarks: Vec<&str> = table.records.iter().map(|r| r.remarks.as_str()).collect();
        assert_eq!(remarks, vec!["", DUP]);
    }

    #[test]
    fn many_writes_on_one_day_leave_exactly_one_unmarked_row() {
        let dir = tempfile::tempdir().expect("tempdir");
        let writer = writer(&dir);
        for hour in 0..5 {
            writer
                .append(&snapshot(c_drive()), None, at(3, hour, 0))
                .expect("append");
        }

        let table = reload(&writer);
        assert_eq!(table.records.len(), 5);
        let unmarked: Vec<&LogRecord> = table.records.iter().filter(|r| r.remarks.is_empty()).collect();
        assert_eq!(unmarked.len(), 1);
        assert_eq!(unmarked[0].date_time, "2024-01-03,00:00");
    }

    #[test]
    fn distinct_days_produce_no_remarks() {
        let dir = tempfile::tempdir().expect("tempdir");
        let writer = writer(&dir);
        for day in 1..=4 {
            let appended = writer
                .append(&snapshot(c_drive()), None, at(day, 8, 0))
                .expect("append");
            assert!(!appended.duplicate);
        }

        let table = reload(&writer);
        assert_eq!(table.records.len(), 4);
        assert!(table.records.iter().all(|r| r.remarks.is_empty()));
    }

    #[test]
    fn header_survives_repeated_writes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let writer = writer(&dir);
        for day in 1..=3 {
            writer
                .append(&snapshot(c_drive()), None, at(day, 8, 0))
                .expect("append");
        }

        // A duplicated or altered header would fail the schema check or
        // show up as a data row with a non-numeric cell.
        let table = reload(&writer);
        assert_eq!(table.records.len(), 3);
        assert!(table.records.iter().all(|r| r.date_time.starts_with("2024-01-0")));
    }

    #[test]
    fn empty_disks_are_recorded_as_zero() {
        let dir = tempfile::tempdir().expect("tempdir");
        let writer = writer(&dir);
        writer
            .append(&snapshot(Vec::new()), None, at(1, 8, 0))
            .expect("append");

        let table = reload(&writer);
        let row = table.last().expect("row");
        assert_eq!(row.disk_free_gb, 0.0);
        assert_eq!(row.disk_total_gb, 0.0);
    }

    #[test]
    fn incompatible_log_is_left_untouched() {
        let dir = tempfile::tempdir().expect("tempdir");
        let writer = writer(&dir);
        let mut workbook = rust_xlsxwriter::Workbook::new();
        workbook
            .add_worksheet()
            .write_string(0, 0, "Timestamp")
            .expect("write");
        workbook.save(writer.path()).expect("save foreign workbook");
        let before = fs::read(writer.path()).expect("read");

        let err = writer
            .append(&snapshot(c_drive()), None, at(1, 8, 0))
            .expect_err("schema mismatch must fail");
        assert!(matches!(err, LogError::Schema { .. }), "got {err}");
        assert_eq!(fs::read(writer.path()).expect("read"), before);
    }

    #[test]
    fn missing_directory_reports_save_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let writer = LogWriter::new(
            dir.path().join("no-such-dir").join("system_info.xlsx"),
            &LogConfig::default(),
        );
        let err = writer
            .append(&snapshot(c_drive()), None, at(1, 8, 0))
            .expect_err("save must fail");
        assert!(matches!(err, LogError::Save { .. }), "got {err}");
    }

    #[test]
    fn latest_date_reads_last_row() {
        let dir = tempfile::tempdir().expect("tempdir");
        let writer = writer(&dir);
        assert_eq!(writer.latest_date().expect("latest"), None);

        writer
            .append(&snapshot(c_drive()), None, at(5, 8, 0))
            .expect("append");
        writer
            .append(&snapshot(c_drive()), None, at(2, 8, 0))
            .expect("append");
        // Last written, not most recent.
        assert_eq!(
            writer.latest_date().expect("latest"),
            Some("2024-01-02".to_string())
        );
    }

    #[test]
    fn latest_date_skips_rows_without_date() {
        let dir = tempfile::tempdir().expect("tempdir");
        let writer = writer(&dir);
        writer
            .append(&snapshot(c_drive()), None, at(4, 8, 0))
            .expect("append");

        let mut table = reload(&writer);
        let mut undated = table.records[0].clone();
        undated.date_time = String::new();
        table.push(undated);
        xlsx::save(&table, writer.path(), 20.0).expect("save");

        assert_eq!(
            writer.latest_date().expect("latest"),
            Some("2024-01-04".to_string())
        );
    }

    #[test]
    fn custom_remark_is_used() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = LogConfig {
            duplicate_remark: "duplicate".to_string(),
            ..LogConfig::default()
        };
        let writer = LogWriter::new(dir.path().join("log.xlsx"), &cfg);
        writer
            .append(&snapshot(c_drive()), None, at(1, 8, 0))
            .expect("append");
        writer
            .append(&snapshot(c_drive()), None, at(1, 9, 0))
            .expect("append");

        let table = reload(&writer);
        assert_eq!(table.records[1].remarks, "duplicate");
    }
}
