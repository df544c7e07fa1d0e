//! Delimited catalog table I/O
//!
//! Rows are kept as plain cell vectors aligned with the header so that columns
//! the harvester knows nothing about are written back byte-for-byte.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use tracing::debug;

/// One data row, one cell per header column
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRow {
    cells: Vec<String>,
}

impl TableRow {
    pub fn new<S: Into<String>>(cells: impl IntoIterator<Item = S>) -> Self {
        Self {
            cells: cells.into_iter().map(Into::into).collect(),
        }
    }

    /// Cell at `index`; missing cells read as empty
    #[must_use]
    pub fn get(&self, index: usize) -> &str {
        self.cells.get(index).map_or("", String::as_str)
    }

    pub fn set(&mut self, index: usize, value: impl Into<String>) {
        if index >= self.cells.len() {
            self.cells.resize(index + 1, String::new());
        }
        self.cells[index] = value.into();
    }

    /// Pad with empty cells or drop overflow so the row has exactly `width` cells
    pub fn fit_to(&mut self, width: usize) {
        self.cells.resize(width, String::new());
    }

    #[must_use]
    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// A whole catalog table held in memory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogTable {
    headers: Vec<String>,
    rows: Vec<TableRow>,
}

impl CatalogTable {
    #[must_use]
    pub fn new(headers: Vec<String>, rows: Vec<TableRow>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.fit_to(width);
                row
            })
            .collect();
        Self { headers, rows }
    }

    /// Read a headed table. Short rows are padded with empty cells.
    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Self, csv::Error> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()?
            .iter()
            .enumerate()
            .map(|(i, h)| {
                // Spreadsheet exports like to prepend a BOM to the first header
                let name = if i == 0 { h.trim_start_matches('\u{feff}') } else { h };
                name.to_string()
            })
            .collect();

        let mut rows = Vec::new();
        for record in rdr.records() {
            rows.push(TableRow::new(record?.iter()));
        }

        Ok(Self::new(headers, rows))
    }

    pub fn read(path: &Path, delimiter: u8) -> Result<Self, csv::Error> {
        let table = Self::from_reader(File::open(path)?, delimiter)?;
        debug!("Read {} rows from {}", table.len(), path.display());
        Ok(table)
    }

    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    #[must_use]
    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Split into header and rows for streaming out
    #[must_use]
    pub fn into_parts(self) -> (Vec<String>, Vec<TableRow>) {
        (self.headers, self.rows)
    }
}

/// Streams rows out; the header is written once on creation
pub struct TableWriter<W: Write> {
    inner: csv::Writer<W>,
    width: usize,
    rows_written: usize,
}

impl TableWriter<File> {
    /// Create (or truncate) `path`, creating missing parent directories
    pub fn create(path: &Path, delimiter: u8, headers: &[String]) -> Result<Self, csv::Error> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Self::from_writer(File::create(path)?, delimiter, headers)
    }
}

impl<W: Write> TableWriter<W> {
    pub fn from_writer(writer: W, delimiter: u8, headers: &[String]) -> Result<Self, csv::Error> {
        let mut inner = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .from_writer(writer);
        inner.write_record(headers)?;

        Ok(Self {
            inner,
            width: headers.len(),
            rows_written: 0,
        })
    }

    /// Write one fully reconciled row
    pub fn write_row(&mut self, row: &TableRow) -> Result<(), csv::Error> {
        debug_assert_eq!(row.len(), self.width, "row width must match header");
        self.inner.write_record(row.cells())?;
        self.rows_written += 1;
        Ok(())
    }

    /// Flush and report how many data rows went out
    pub fn finish(mut self) -> Result<usize, csv::Error> {
        self.inner.flush()?;
        Ok(self.rows_written)
    }
}
