//! Persistence: data-map CSVs, the key-listing side file, XLSX workbooks.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use rust_xlsxwriter::XlsxError;
use tracing::{debug, instrument};

use crate::core::consolidate::Workbook;
use crate::core::table::{Cell, ColumnKey, FILE_SIZE, Table, TableError};
use crate::core::tokenize::Entry;

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("cannot create output directory {path}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {path}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path} has no header row")]
    MissingHeader { path: PathBuf },

    #[error("invalid table in {path}")]
    Table {
        path: PathBuf,
        #[source]
        source: TableError,
    },

    #[error("cannot write workbook {path}")]
    Xlsx {
        path: PathBuf,
        #[source]
        source: XlsxError,
    },
}

/// Create `dir` (and parents) if needed. Call once per run, before writes.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    fs::create_dir_all(dir).map_err(|source| PersistError::OutputDir {
        path: dir.to_path_buf(),
        source,
    })
}

/// Write a table as CSV: header row of column keys, `missing` for missing cells.
#[instrument(skip(table), fields(rows = table.len()))]
pub fn write_table_csv(table: &Table, path: &Path, missing: &str) -> Result<(), PersistError> {
    let csv_err = |source| PersistError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    write_records(table, &mut writer, missing).map_err(csv_err)?;
    writer.flush().map_err(|source| PersistError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    debug!(path = %path.display(), "wrote data map");
    Ok(())
}

/// Render a table as CSV text.
pub fn table_to_csv_string(table: &Table, missing: &str) -> Result<String, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    write_records(table, &mut writer, missing)?;
    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn write_records<W: Write>(
    table: &Table,
    writer: &mut csv::Writer<W>,
    missing: &str,
) -> Result<(), csv::Error> {
    writer.write_record(table.columns().iter().map(|c| c.to_string()))?;
    for row in table.rows() {
        writer.write_record(row.cells().iter().map(|c| c.render(missing)).map(|s| s.into_owned()))?;
    }
    Ok(())
}

/// Reload a persisted data map. Numeric headers become positional columns,
/// `File Size (Bytes)` values parse back to integers, and fields equal to a
/// non-empty `missing` marker become [`Cell::Missing`].
#[instrument]
pub fn read_table_csv(path: &Path, missing: &str) -> Result<Table, PersistError> {
    let csv_err = |source| PersistError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::Reader::from_path(path).map_err(csv_err)?;
    let headers = reader.headers().map_err(csv_err)?.clone();
    if headers.is_empty() {
        return Err(PersistError::MissingHeader {
            path: path.to_path_buf(),
        });
    }

    let columns: Vec<ColumnKey> = headers.iter().map(ColumnKey::from_header).collect();
    let size_col = columns.iter().position(|c| *c == ColumnKey::from(FILE_SIZE));

    let table_err = |source| PersistError::Table {
        path: path.to_path_buf(),
        source,
    };
    let mut table = Table::new(columns).map_err(table_err)?;

    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        let cells = record
            .iter()
            .enumerate()
            .map(|(i, field)| parse_cell(field, Some(i) == size_col, missing))
            .collect();
        table.push_row(cells).map_err(table_err)?;
    }

    debug!(rows = table.len(), "read data map");
    Ok(table)
}

fn parse_cell(field: &str, numeric: bool, missing: &str) -> Cell {
    if !missing.is_empty() && field == missing {
        return Cell::Missing;
    }
    if numeric {
        if let Ok(n) = field.parse::<u64>() {
            return Cell::Int(n);
        }
    }
    Cell::text(field)
}

/// Write the key listing side file: one member path per line, no header.
pub fn write_key_listing(entries: &[Entry], path: &Path) -> Result<(), PersistError> {
    let write_err = |source| PersistError::Write {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(write_err)?;
    let mut out = BufWriter::new(file);
    for entry in entries {
        writeln!(out, "{}", entry.path).map_err(write_err)?;
    }
    out.flush().map_err(write_err)?;

    debug!(keys = entries.len(), path = %path.display(), "wrote key listing");
    Ok(())
}

/// Write every sheet of `workbook`, in order, to an `.xlsx` file.
/// Integers are written as numbers, everything else as text.
#[instrument(skip(workbook), fields(sheets = workbook.sheets().len()))]
pub fn write_workbook_xlsx(workbook: &Workbook, path: &Path, missing: &str) -> Result<(), PersistError> {
    let xlsx_err = |source| PersistError::Xlsx {
        path: path.to_path_buf(),
        source,
    };

    let mut book = rust_xlsxwriter::Workbook::new();
    for sheet in workbook.sheets() {
        let ws = book.add_worksheet();
        ws.set_name(&sheet.name).map_err(xlsx_err)?;

        for (col, key) in sheet.table.columns().iter().enumerate() {
            ws.write_string(0, col as u16, key.to_string()).map_err(xlsx_err)?;
        }
        for (r, row) in sheet.table.rows().enumerate() {
            let r = (r + 1) as u32;
            for (col, cell) in row.cells().iter().enumerate() {
                let col = col as u16;
                match cell {
                    Cell::Int(n) => ws.write_number(r, col, *n as f64).map(|_| ()),
                    Cell::Text(s) if s.is_empty() => Ok(()),
                    Cell::Text(s) => ws.write_string(r, col, s).map(|_| ()),
                    Cell::Missing if missing.is_empty() => Ok(()),
                    Cell::Missing => ws.write_string(r, col, missing).map(|_| ()),
                }
                .map_err(xlsx_err)?;
            }
        }
    }

    book.save(path).map_err(xlsx_err)?;
    debug!(path = %path.display(), "wrote workbook");
    Ok(())
}

/// Archive-mode data map name: `{key}_{bucket}_data_map.csv`. Slashes in
/// the key are kept, so the file lands in matching subdirectories.
pub fn archive_map_name(key: &str, bucket: &str) -> String {
    format!("{}_{bucket}_data_map.csv", key.trim_start_matches("./"))
}

/// Prefix-mode data map name: `{bucket}_{prefix}_data_map.csv`.
pub fn prefix_map_name(bucket: &str, prefix: &str) -> String {
    format!("{bucket}_{}_data_map.csv", prefix.trim_matches('/'))
}

pub fn key_listing_name(bucket: &str) -> String {
    format!("{bucket}_all_keys.csv")
}

pub fn workbook_name(version: &str) -> String {
    format!("land_da_test_case_{version}_data_maps.xlsx")
}
