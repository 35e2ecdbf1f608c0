use crate::logbook::record::{LogRecord, COLUMN_COUNT, HEADER};
use crate::logbook::table::LogTable;
use crate::logbook::LogError;
use calamine::{open_workbook, Data, Reader, Xlsx};
use rust_xlsxwriter::Workbook;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

pub fn load(path: &Path) -> Result<Option<LogTable>, LogError> {
    if !path.exists() {
        return Ok(None);
    }

    let mut workbook: Xlsx<_> = open_workbook(path).map_err(|source| LogError::Open {
        path: path.display().to_string(),
        source,
    })?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| LogError::MissingSheet {
            path: path.display().to_string(),
        })?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|source| LogError::Open {
            path: path.display().to_string(),
            source,
        })?;

    let mut table = LogTable::new(sheet_name);
    // A workbook with a blank first sheet is treated like a new log.
    if range.is_empty() {
        return Ok(Some(table));
    }
    if range.start() != Some((0, 0)) {
        return Err(schema(path, "header row must start at cell A1"));
    }
    if range.width() != COLUMN_COUNT {
        return Err(schema(
            path,
            format!(
                "expected {COLUMN_COUNT} columns, found {}",
                range.width()
            ),
        ));
    }

    let mut rows = range.rows();
    if let Some(header) = rows.next() {
        check_header(path, header)?;
    }
    for (offset, row) in rows.enumerate() {
        // 1-based spreadsheet row number, header is row 1.
        let row_number = offset + 2;
        table.records.push(parse_row(path, row_number, row)?);
    }

    Ok(Some(table))
}

pub fn save(table: &LogTable, path: &Path, column_width: f64) -> Result<(), LogError> {
    let bytes = build(table, column_width).map_err(|source| LogError::Build {
        path: path.display().to_string(),
        source,
    })?;
    replace_file(path, |file| file.write_all(&bytes)).map_err(|source| LogError::Save {
        path: path.display().to_string(),
        source,
    })
}

// `path` is only replaced once the new content is fully on disk.
fn replace_file(
    path: &Path,
    write: impl FnOnce(&mut File) -> io::Result<()>,
) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    write(tmp.as_file_mut())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

fn build(table: &LogTable, column_width: f64) -> Result<Vec<u8>, rust_xlsxwriter::XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(&table.sheet_name)?;

    for (col, title) in HEADER.iter().enumerate() {
        let col = col as u16;
        worksheet.write_string(0, col, *title)?;
        worksheet.set_column_width(col, column_width)?;
    }

    for (idx, record) in table.records.iter().enumerate() {
        let row = idx as u32 + 1;
        if !record.date_time.is_empty() {
            worksheet.write_string(row, 0, &record.date_time)?;
        }
        for (col, value) in record.numbers().into_iter().enumerate() {
            worksheet.write_number(row, col as u16 + 1, value)?;
        }
        if !record.remarks.is_empty() {
            worksheet.write_string(row, COLUMN_COUNT as u16 - 1, &record.remarks)?;
        }
    }

    workbook.save_to_buffer()
}

fn check_header(path: &Path, row: &[Data]) -> Result<(), LogError> {
    for (idx, expected) in HEADER.iter().enumerate() {
        let found = match row.get(idx) {
            Some(Data::String(s)) => s.trim(),
            _ => "",
        };
        if found != *expected {
            return Err(schema(
                path,
                format!(
                    "header column {} is '{found}', expected '{expected}'",
                    idx + 1
                ),
            ));
        }
    }
    Ok(())
}

fn parse_row(path: &Path, row_number: usize, row: &[Data]) -> Result<LogRecord, LogError> {
    let date_time = match row.first() {
        Some(Data::String(s)) => s.trim().to_string(),
        Some(Data::Empty) | None => String::new(),
        Some(other) => {
            return Err(schema(
                path,
                format!("row {row_number}: date cell must be text, found '{other}'"),
            ))
        }
    };

    let mut numbers = [0.0_f64; 5];
    for (slot, col) in numbers.iter_mut().zip(1..) {
        *slot = number_cell(row.get(col)).ok_or_else(|| {
            schema(
                path,
                format!(
                    "row {row_number}: column '{}' must be a number",
                    HEADER[col]
                ),
            )
        })?;
    }

    let remarks = match row.get(COLUMN_COUNT - 1) {
        Some(Data::Empty) | None => String::new(),
        Some(Data::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };

    let [cpu_percent, memory_total_gb, memory_available_gb, disk_free_gb, disk_total_gb] =
        numbers;
    Ok(LogRecord {
        date_time,
        cpu_percent,
        memory_total_gb,
        memory_available_gb,
        disk_free_gb,
        disk_total_gb,
        remarks,
    })
}

fn number_cell(cell: Option<&Data>) -> Option<f64> {
    match cell? {
        Data::Float(v) => Some(*v),
        Data::Int(v) => Some(*v as f64),
        Data::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn schema(path: &Path, reason: impl Into<String>) -> LogError {
    LogError::Schema {
        path: path.display().to_string(),
        reason: reason.into(),
    }
}
