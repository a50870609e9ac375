//! Spreadsheet decoding.
//!
//! Reads the first worksheet of an `.xlsx`/`.xls` workbook into a
//! [`Dataset`]. The first row is the header; every following row is data.

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info};

use crate::config::ALLOWED_EXTENSIONS;
use crate::error::{SheetError, SheetResult};
use crate::models::{format_number, CellValue, Dataset, Row};

/// True when the file name ends in an accepted extension (any case).
pub fn validate_file_extension(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
}

pub fn validate_file_size(size: usize, max_size: usize) -> bool {
    size <= max_size
}

/// Decode a workbook held in memory.
pub fn parse_spreadsheet_bytes(bytes: &[u8]) -> SheetResult<Dataset> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| SheetError::Unreadable(e.to_string()))?;

    let sheet_names = workbook.sheet_names().to_vec();
    let first = sheet_names.first().ok_or(SheetError::NoWorksheets)?;
    debug!(sheet = %first, sheets = sheet_names.len(), "reading first worksheet");

    let range = workbook
        .worksheet_range(first)
        .map_err(|e| SheetError::Unreadable(e.to_string()))?;

    let dataset = dataset_from_rows(range.rows());
    info!(
        rows = dataset.len(),
        columns = dataset.columns().len(),
        "spreadsheet read"
    );
    Ok(dataset)
}

/// Decode a workbook from disk.
pub fn parse_spreadsheet_file<P: AsRef<Path>>(path: P) -> SheetResult<Dataset> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_spreadsheet_bytes(&bytes)
}

/// Build a dataset from worksheet rows.
///
/// Blank header cells become `Unnamed: <i>`. Fully empty data rows are
/// dropped, but row numbers still count them so reports point at the
/// spreadsheet position.
pub fn dataset_from_rows<'a, I>(rows: I) -> Dataset
where
    I: IntoIterator<Item = &'a [Data]>,
{
    let mut rows = rows.into_iter();

    let columns: Vec<String> = match rows.next() {
        Some(header) => header
            .iter()
            .enumerate()
            .map(|(i, cell)| header_name(i, cell))
            .collect(),
        None => return Dataset::new(Vec::new(), Vec::new()),
    };

    let data = rows
        .enumerate()
        .filter_map(|(i, cells)| {
            let values: Vec<CellValue> = cells.iter().map(cell_value).collect();
            if values.iter().all(|v| *v == CellValue::Empty) {
                None
            } else {
                Some(Row::new(i + 1, values))
            }
        })
        .collect();

    Dataset::new(columns, data)
}

fn header_name(position: usize, cell: &Data) -> String {
    match cell_value(cell) {
        CellValue::Empty => format!("Unnamed: {}", position),
        other => other.as_text(),
    }
}

/// Map a worksheet cell to a [`CellValue`].
pub fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::String(s) if s.is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Text(if *b { "True" } else { "False" }.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ndt) => CellValue::Text(ndt.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => CellValue::Text(format_number(dt.as_f64())),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(_) | Data::Empty => CellValue::Empty,
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{self, Cell};
    use super::*;

    fn to_dataset(rows: &[Vec<Data>]) -> Dataset {
        dataset_from_rows(rows.iter().map(|r| r.as_slice()))
    }

    #[test]
    fn test_extension_check() {
        assert!(validate_file_extension("notas.xlsx"));
        assert!(validate_file_extension("NOTAS.XLS"));
        assert!(!validate_file_extension("notas.csv"));
        assert!(!validate_file_extension("xlsx"));
        assert!(!validate_file_extension(""));
    }

    #[test]
    fn test_size_check() {
        assert!(validate_file_size(10, 10));
        assert!(!validate_file_size(11, 10));
    }

    #[test]
    fn test_cell_conversion() {
        assert_eq!(cell_value(&Data::Int(30123456)).as_text(), "30123456");
        assert_eq!(cell_value(&Data::Float(7.5)), CellValue::Number(7.5));
        assert_eq!(cell_value(&Data::String("FRBA".into())), CellValue::Text("FRBA".into()));
        assert_eq!(cell_value(&Data::String(String::new())), CellValue::Empty);
        assert_eq!(cell_value(&Data::Bool(true)), CellValue::Text("True".into()));
        assert_eq!(cell_value(&Data::Empty), CellValue::Empty);
    }

    #[test]
    fn test_rows_to_dataset() {
        let rows = vec![
            vec![Data::String("DNI".into()), Data::Empty, Data::String("Nota".into())],
            vec![Data::Float(30123456.0), Data::Empty, Data::Int(7)],
            vec![Data::Empty, Data::Empty, Data::Empty],
            vec![Data::String("40123456".into()), Data::Empty, Data::String("ausente".into())],
        ];
        let ds = to_dataset(&rows);

        assert_eq!(ds.columns(), ["DNI", "Unnamed: 1", "Nota"]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.rows()[0].number, 1);
        assert_eq!(ds.rows()[0].text(0), "30123456");
        assert_eq!(ds.rows()[1].number, 3);
        assert_eq!(ds.rows()[1].text(2), "ausente");
    }

    #[test]
    fn test_empty_sheet() {
        let ds = to_dataset(&[]);
        assert!(ds.columns().is_empty());
        assert!(ds.is_empty());
    }

    #[test]
    fn test_xlsx_workbook_cells() {
        // 45352 is 2024-03-01 in the 1900 date system.
        let bytes = fixtures::workbook(&[
            fixtures::header(),
            vec![
                Cell::Number(1001.0),
                Cell::Number(7.0),
                Cell::Text("Si"),
                Cell::Text("Gomez"),
                Cell::Text("Ana"),
                Cell::Number(30123456.0),
                Cell::Number(2024.0),
                Cell::Date(45352.0),
                Cell::Text("FRBA"),
            ],
            vec![Cell::Blank],
            vec![
                Cell::Number(1002.0),
                Cell::Text("ausente"),
                Cell::Text("No"),
                Cell::Text("Perez"),
                Cell::Text("Luis"),
                Cell::Number(30999888.0),
                Cell::Number(2024.0),
                Cell::Date(45352.5),
                Cell::Text("UTN FRBA"),
            ],
        ]);

        let ds = parse_spreadsheet_bytes(&bytes).unwrap();
        assert_eq!(ds.columns(), crate::config::REQUIRED_COLUMNS);
        assert_eq!(ds.len(), 2);

        let first = &ds.rows()[0];
        assert_eq!(first.number, 1);
        assert_eq!(first.text(1), "7");
        assert_eq!(first.text(5), "30123456");
        assert_eq!(first.text(7), "2024-03-01 00:00:00");

        let second = &ds.rows()[1];
        assert_eq!(second.number, 3);
        assert_eq!(second.text(1), "ausente");
        assert_eq!(second.text(7), "2024-03-01 12:00:00");
    }

    #[test]
    fn test_garbage_bytes_unreadable() {
        let err = parse_spreadsheet_bytes(b"not a workbook").unwrap_err();
        assert!(matches!(err, SheetError::Unreadable(_)));
    }
}
