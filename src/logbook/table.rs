use crate::logbook::record::LogRecord;
use std::collections::HashSet;

pub const DEFAULT_SHEET_NAME: &str = "Sheet";

#[derive(Debug, Clone, PartialEq)]
pub struct LogTable {
    pub sheet_name: String,
    pub records: Vec<LogRecord>,
}

impl Default for LogTable {
    fn default() -> Self {
        Self {
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
            records: Vec::new(),
        }
    }
}

impl LogTable {
    pub fn new(sheet_name: impl Into<String>) -> Self {
        Self {
            sheet_name: sheet_name.into(),
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, record: LogRecord) -> usize {
        self.records.push(record);
        self.records.len() - 1
    }

    pub fn last(&self) -> Option<&LogRecord> {
        self.records.last()
    }

    /// Marks every record whose date was already seen earlier in the
    /// table with `remark`. The first record of each date is left as is,
    /// records with an empty date are skipped. Scans the whole table;
    /// returns how many remarks changed.
    pub fn mark_duplicates(&mut self, remark: &str) -> usize {
        let mut seen: HashSet<String> = HashSet::with_capacity(self.records.len());
        let mut changed = 0;
        for record in &mut self.records {
            let date = record.date();
            if date.is_empty() {
                continue;
            }
            if seen.insert(date.to_string()) {
                continue;
            }
            if record.remarks != remark {
                record.remarks = remark.to_string();
                changed += 1;
            }
        }
        changed
    }
}
