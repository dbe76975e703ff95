use std::path::{Path, PathBuf};
use std::sync::Arc;

use calamine::{open_workbook_auto, Reader};
use tracing::debug;

use super::{Table, TabularError};

/// Turns a spreadsheet file on disk into a [`Table`].
pub trait TabularReader: Send + Sync {
    /// Read `sheet`, or the first worksheet when `None`.
    fn read(&self, path: &Path, sheet: Option<&str>) -> Result<Table, TabularError>;
}

/// calamine-backed reader; the format is picked from the file extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkbookReader;

impl WorkbookReader {
    pub fn new() -> Self {
        Self
    }

    /// Worksheet names in workbook order.
    pub fn sheet_names(&self, path: &Path) -> Result<Vec<String>, TabularError> {
        let workbook = open_workbook_auto(path)
            .map_err(|e| TabularError::Open(format!("{}: {}", path.display(), e)))?;
        Ok(workbook.sheet_names().to_vec())
    }
}

impl TabularReader for WorkbookReader {
    fn read(&self, path: &Path, sheet: Option<&str>) -> Result<Table, TabularError> {
        let mut workbook = open_workbook_auto(path)
            .map_err(|e| TabularError::Open(format!("{}: {}", path.display(), e)))?;

        let names = workbook.sheet_names().to_vec();
        let name = match sheet {
            Some(wanted) => names
                .iter()
                .find(|n| n.as_str() == wanted)
                .cloned()
                .ok_or_else(|| TabularError::SheetNotFound(wanted.to_string()))?,
            None => names.first().cloned().ok_or(TabularError::Empty)?,
        };

        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| TabularError::Sheet {
                sheet: name.clone(),
                message: e.to_string(),
            })?;

        let table = Table::from_range(name, &range);
        debug!(sheet = %table.sheet, rows = table.rows.len(), columns = table.columns.len(), "Read worksheet");
        Ok(table)
    }
}

/// Run a (blocking) reader on tokio's blocking pool.
pub async fn read_table(
    reader: Arc<dyn TabularReader>,
    path: PathBuf,
    sheet: Option<String>,
) -> Result<Table, TabularError> {
    tokio::task::spawn_blocking(move || reader.read(&path, sheet.as_deref()))
        .await
        .map_err(|e| TabularError::Task(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tabular::Cell;
    use std::io::Write;

    const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
    const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

    fn inline(cell: &str, text: &str) -> String {
        format!(r#"<c r="{}" t="inlineStr"><is><t>{}</t></is></c>"#, cell, text)
    }

    fn number(cell: &str, value: f64) -> String {
        format!(r#"<c r="{}"><v>{}</v></c>"#, cell, value)
    }

    fn worksheet(rows: &[Vec<String>]) -> String {
        let body: String = rows
            .iter()
            .enumerate()
            .map(|(idx, cells)| format!(r#"<row r="{}">{}</row>"#, idx + 1, cells.concat()))
            .collect();
        format!(r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="{}"><sheetData>{}</sheetData></worksheet>"#, MAIN_NS, body)
    }

    /// Write a minimal xlsx package with the given (name, sheet xml) parts.
    fn write_workbook(sheets: &[(&str, String)]) -> tempfile::NamedTempFile {
        let file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
        let mut zip = zip::ZipWriter::new(file.reopen().unwrap());
        let options = zip::write::FileOptions::<()>::default()
            .compression_method(zip::CompressionMethod::Deflated);

        let overrides: String = (1..=sheets.len())
            .map(|i| format!(r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#, i))
            .collect();
        let content_types = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>{}</Types>"#,
            overrides
        );
        let package_rels = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{}/officeDocument" Target="xl/workbook.xml"/></Relationships>"#,
            REL_NS
        );
        let sheet_entries: String = sheets
            .iter()
            .enumerate()
            .map(|(i, (name, _))| format!(r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#, name, i + 1, i + 1))
            .collect();
        let workbook = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><workbook xmlns="{}" xmlns:r="{}"><sheets>{}</sheets></workbook>"#,
            MAIN_NS, REL_NS, sheet_entries
        );
        let workbook_rels: String = (1..=sheets.len())
            .map(|i| format!(r#"<Relationship Id="rId{}" Type="{}/worksheet" Target="worksheets/sheet{}.xml"/>"#, i, REL_NS, i))
            .collect();
        let workbook_rels = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}</Relationships>"#,
            workbook_rels
        );

        let mut parts = vec![
            ("[Content_Types].xml".to_string(), content_types),
            ("_rels/.rels".to_string(), package_rels),
            ("xl/workbook.xml".to_string(), workbook),
            ("xl/_rels/workbook.xml.rels".to_string(), workbook_rels),
        ];
        for (i, (_, xml)) in sheets.iter().enumerate() {
            parts.push((format!("xl/worksheets/sheet{}.xml", i + 1), xml.clone()));
        }
        for (name, body) in parts {
            zip.start_file(name, options).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
        file
    }

    fn two_sheet_workbook() -> tempfile::NamedTempFile {
        let data = worksheet(&[
            vec![inline("A1", "Project"), inline("B1", "Hours")],
            vec![inline("A2", "Apollo"), number("B2", 12.5)],
            vec![inline("A3", "Gemini"), number("B3", 40.0)],
        ]);
        let notes = worksheet(&[
            vec![inline("A1", "Note")],
            vec![inline("A2", "Reviewed")],
        ]);
        write_workbook(&[("Data", data), ("Notes", notes)])
    }

    #[test]
    fn test_read_defaults_to_first_sheet() {
        let file = two_sheet_workbook();
        let table = WorkbookReader::new().read(file.path(), None).unwrap();

        assert_eq!(table.sheet, "Data");
        assert_eq!(table.columns, vec!["Project", "Hours"]);
        assert_eq!(table.shape(), (2, 2));
        assert_eq!(table.rows[0][0], Cell::Text("Apollo".into()));
        assert_eq!(table.rows[0][1].to_string(), "12.5");
        assert_eq!(table.rows[1][1].to_string(), "40");
    }

    #[test]
    fn test_read_named_sheet() {
        let file = two_sheet_workbook();
        let table = WorkbookReader::new().read(file.path(), Some("Notes")).unwrap();

        assert_eq!(table.sheet, "Notes");
        assert_eq!(table.columns, vec!["Note"]);
        assert_eq!(table.rows, vec![vec![Cell::Text("Reviewed".into())]]);
    }

    #[test]
    fn test_read_unknown_sheet_in_real_workbook() {
        let file = two_sheet_workbook();
        let err = WorkbookReader::new().read(file.path(), Some("Budget")).unwrap_err();
        assert!(matches!(err, TabularError::SheetNotFound(name) if name == "Budget"));
    }

    #[test]
    fn test_read_workbook_without_sheets() {
        let file = write_workbook(&[]);
        let err = WorkbookReader::new().read(file.path(), None).unwrap_err();
        assert!(matches!(err, TabularError::Empty));
    }

    #[test]
    fn test_sheet_names_in_workbook_order() {
        let file = two_sheet_workbook();
        let names = WorkbookReader::new().sheet_names(file.path()).unwrap();
        assert_eq!(names, vec!["Data", "Notes"]);
    }

    #[tokio::test]
    async fn test_read_table_with_workbook_reader() {
        let file = two_sheet_workbook();
        let table = read_table(
            Arc::new(WorkbookReader::new()),
            file.path().to_path_buf(),
            Some("Notes".into()),
        )
        .await
        .unwrap();
        assert_eq!(table.shape(), (1, 1));
    }

    #[test]
    fn test_read_rejects_non_spreadsheet_content() {
        let mut file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
        file.write_all(b"definitely not a zip archive").unwrap();

        let err = WorkbookReader::new().read(file.path(), None).unwrap_err();
        assert!(matches!(err, TabularError::Open(_)));
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = WorkbookReader::new()
            .read(&dir.path().join("absent.xlsx"), Some("Sheet1"))
            .unwrap_err();
        assert!(matches!(err, TabularError::Open(_)));
    }

    struct FixedReader;

    impl TabularReader for FixedReader {
        fn read(&self, _path: &Path, sheet: Option<&str>) -> Result<Table, TabularError> {
            Ok(Table {
                sheet: sheet.unwrap_or("first").to_string(),
                columns: vec!["A".into()],
                rows: Vec::new(),
            })
        }
    }

    #[tokio::test]
    async fn test_read_table_runs_reader_off_the_runtime() {
        let table = read_table(Arc::new(FixedReader), PathBuf::from("x.xlsx"), Some("Data".into()))
            .await
            .unwrap();
        assert_eq!(table.sheet, "Data");

        let table = read_table(Arc::new(FixedReader), PathBuf::from("x.xlsx"), None)
            .await
            .unwrap();
        assert_eq!(table.sheet, "first");
    }
}
