//! Spreadsheet-to-table conversion.
//!
//! `WorkbookReader` reads xls/xlsx/xlsm/xlsb files through calamine. The first
//! row of a worksheet becomes the column names, the remaining rows the data.

pub mod table;
pub mod workbook;

pub use table::{Cell, Table};
pub use workbook::{read_table, TabularReader, WorkbookReader};

use thiserror::Error;

/// File extensions treated as spreadsheets when listing library contents.
pub const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xls", "xlsm"];

#[derive(Error, Debug)]
pub enum TabularError {
    #[error("Failed to open workbook: {0}")]
    Open(String),

    #[error("Worksheet not found: {0}")]
    SheetNotFound(String),

    #[error("Workbook has no worksheets")]
    Empty,

    #[error("Failed to read worksheet {sheet}: {message}")]
    Sheet { sheet: String, message: String },

    #[error("Spreadsheet task failed: {0}")]
    Task(String),
}

/// True when the name ends with a spreadsheet extension (case-insensitive).
pub fn is_spreadsheet_name(name: &str) -> bool {
    std::path::Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SPREADSHEET_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}
