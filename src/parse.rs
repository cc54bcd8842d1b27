use std::{collections::HashMap, fs::File, io::Read, num::ParseIntError, path::Path};

use derive_more::Display;
use log::{debug, trace};

/// The axis of a table that failed validation
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    #[display(fmt = "rows")]
    Rows,
    #[display(fmt = "columns")]
    Columns,
}

#[derive(Debug, Display)]
pub enum ParseTableError {
    /// The number of data rows or columns disagrees with the declared count
    #[display(fmt = "expected {} {}, found {}", expected, axis, actual)]
    DimensionMismatch {
        axis: Axis,
        expected: usize,
        actual: usize,
    },
    /// A cell that should hold an integer did not
    #[display(fmt = "invalid value {:?} at ({}, {}): {}", value, row, column, source)]
    InvalidValue {
        row: String,
        column: String,
        value: String,
        source: ParseIntError,
    },
    /// The same row or column label occurs twice
    #[display(fmt = "duplicate {} label {:?}", axis, label)]
    DuplicateLabel { axis: Axis, label: String },
    /// The source did not even contain a header row
    #[display(fmt = "table has no header row")]
    Empty,
    Io(std::io::Error),
    Csv(csv::Error),
}

impl std::error::Error for ParseTableError {}

impl From<std::io::Error> for ParseTableError {
    fn from(err: std::io::Error) -> Self {
        ParseTableError::Io(err)
    }
}

impl From<csv::Error> for ParseTableError {
    fn from(err: csv::Error) -> Self {
        ParseTableError::Csv(err)
    }
}

/// A rectangular table of integer parameters indexed by (row label, column label).
///
/// Labels are lower-cased and kept in order of first appearance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    rows: Vec<String>,
    columns: Vec<String>,
    values: HashMap<String, HashMap<String, i64>>,
}

impl Table {
    /// Read the table at `path`, which must have exactly `rows` data rows and `columns` data columns.
    pub fn read<P: AsRef<Path>>(
        path: P,
        rows: usize,
        columns: usize,
    ) -> Result<Table, ParseTableError> {
        let path = path.as_ref();
        debug!("Reading {rows}x{columns} table from {}", path.display());
        Table::from_reader(File::open(path)?, rows, columns)
    }

    /// Parse a comma delimited table from any reader.
    pub fn from_reader<R: Read>(
        reader: R,
        rows: usize,
        columns: usize,
    ) -> Result<Table, ParseTableError> {
        use ParseTableError::*;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(b',')
            .from_reader(reader);

        let mut records = reader.records();
        let header = records.next().ok_or(Empty)??;

        // every record holds the label column plus one cell per data column
        let check_width = |len: usize| match len == columns + 1 {
            true => Ok(()),
            false => Err(DimensionMismatch {
                axis: Axis::Columns,
                expected: columns,
                actual: len.saturating_sub(1),
            }),
        };

        check_width(header.len())?;
        let column_labels = header.iter().skip(1).map(normalize).collect::<Vec<_>>();
        for (i, label) in column_labels.iter().enumerate() {
            if column_labels[..i].contains(label) {
                return Err(DuplicateLabel {
                    axis: Axis::Columns,
                    label: label.clone(),
                });
            }
        }

        let mut row_labels = Vec::with_capacity(rows);
        let mut values = HashMap::with_capacity(rows);

        for record in records {
            let record = record?;
            check_width(record.len())?;

            let label = normalize(&record[0]);
            let mut row = HashMap::with_capacity(columns);
            for (column, cell) in column_labels.iter().zip(record.iter().skip(1)) {
                let value = cell.trim().parse::<i64>().map_err(|source| InvalidValue {
                    row: label.clone(),
                    column: column.clone(),
                    value: cell.to_string(),
                    source,
                })?;
                row.insert(column.clone(), value);
            }

            trace!("row {label}: {row:?}");
            if values.insert(label.clone(), row).is_some() {
                return Err(DuplicateLabel {
                    axis: Axis::Rows,
                    label,
                });
            }
            row_labels.push(label);
        }

        if row_labels.len() != rows {
            return Err(DimensionMismatch {
                axis: Axis::Rows,
                expected: rows,
                actual: row_labels.len(),
            });
        }

        Ok(Table {
            rows: row_labels,
            columns: column_labels,
            values,
        })
    }

    /// Build a table directly from labels and a dense matrix of values, indexed `[row][column]`.
    pub fn from_rows<S: AsRef<str>>(rows: &[S], columns: &[S], matrix: &[Vec<i64>]) -> Table {
        let rows = rows.iter().map(|r| normalize(r.as_ref())).collect::<Vec<_>>();
        let columns = columns
            .iter()
            .map(|c| normalize(c.as_ref()))
            .collect::<Vec<_>>();
        let values = rows
            .iter()
            .zip(matrix)
            .map(|(r, values)| (r.clone(), columns.iter().cloned().zip(values.iter().copied()).collect()))
            .collect();

        Table {
            rows,
            columns,
            values,
        }
    }

    /// Row labels, in order of appearance
    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    /// Column labels, in order of appearance
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The value at (`row`, `column`), if both labels exist
    pub fn get(&self, row: &str, column: &str) -> Option<i64> {
        self.values.get(row)?.get(column).copied()
    }
}

fn normalize(label: &str) -> String {
    label.trim().to_lowercase()
}
