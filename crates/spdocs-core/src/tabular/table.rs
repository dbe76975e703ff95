use std::collections::HashMap;
use std::fmt;

use calamine::{Data, Range};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;

/// One spreadsheet cell value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Empty,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    DateTime(NaiveDateTime),
    Error(String),
}

/// Excel serial dates count days from 1899-12-30.
fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round();
    if !millis.is_finite() || millis.abs() > 1e15 {
        return None;
    }
    epoch.checked_add_signed(Duration::milliseconds(millis as i64))
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::Bool(b) => Cell::Bool(*b),
            Data::Int(i) => Cell::Int(*i),
            Data::Float(f) => Cell::Float(*f),
            Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
            Data::DateTime(dt) => {
                let serial = dt.as_f64();
                if dt.is_duration() {
                    Cell::Float(serial)
                } else {
                    excel_serial_to_datetime(serial)
                        .map(Cell::DateTime)
                        .unwrap_or(Cell::Float(serial))
                }
            }
            Data::Error(e) => Cell::Error(format!("{:?}", e)),
        }
    }
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Cell::Int(i) => write!(f, "{}", i),
            // Whole floats print without a trailing ".0"
            Cell::Float(v) if v.fract() == 0.0 && v.abs() < 1e15 => write!(f, "{:.0}", v),
            Cell::Float(v) => write!(f, "{}", v),
            Cell::Text(s) => f.write_str(s),
            Cell::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            Cell::Error(e) => write!(f, "#ERROR: {}", e),
        }
    }
}

/// A worksheet materialized as named columns and typed rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub sheet: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Build a table from a worksheet range: the first row supplies column
    /// names, every later row is data. Blank header cells become
    /// `Unnamed: {index}`; repeated names get a `.1`, `.2` suffix.
    pub fn from_range(sheet: impl Into<String>, range: &Range<Data>) -> Self {
        let mut rows = range.rows();

        let columns = match rows.next() {
            Some(header) => Self::column_names(header),
            None => Vec::new(),
        };
        let width = columns.len();

        let rows = rows
            .map(|row| {
                let mut cells: Vec<Cell> = row.iter().map(Cell::from).collect();
                cells.resize(width, Cell::Empty);
                cells
            })
            .collect();

        Self {
            sheet: sheet.into(),
            columns,
            rows,
        }
    }

    fn column_names(header: &[Data]) -> Vec<String> {
        let mut seen: HashMap<String, usize> = HashMap::new();
        header
            .iter()
            .enumerate()
            .map(|(idx, cell)| {
                let name = Cell::from(cell).to_string();
                let name = if name.trim().is_empty() {
                    format!("Unnamed: {}", idx)
                } else {
                    name
                };
                let count = seen.entry(name.clone()).or_insert(0);
                let unique = if *count == 0 {
                    name
                } else {
                    format!("{}.{}", name, count)
                };
                *count += 1;
                unique
            })
            .collect()
    }

    /// (rows, columns), header excluded.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.columns.len())
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First `n` data rows.
    pub fn head(&self, n: usize) -> &[Vec<Cell>] {
        &self.rows[..n.min(self.rows.len())]
    }

    /// All values of one column, by name.
    pub fn column(&self, name: &str) -> Option<Vec<&Cell>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }
}
