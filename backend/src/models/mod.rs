//! Domain models for the gradesheet pipeline.
//!
//! - [`CellValue`] - Untyped spreadsheet cell (text, number or empty)
//! - [`Row`] - One data row with its source row number
//! - [`Dataset`] - Ordered columns and rows, with a [`HeaderIndex`]
//! - [`FormParams`] - The six free-text values supplied with an upload

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// =============================================================================
// Cell Values
// =============================================================================

/// A raw cell as decoded from the spreadsheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum CellValue {
    Text(String),
    Number(f64),
    Empty,
}

impl CellValue {
    /// Render the cell the way validation rules and extracts see it.
    ///
    /// Integral numbers drop the fractional part so that document numbers
    /// stored as numeric cells stay all-digit.
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Empty => String::new(),
        }
    }

    /// Trimmed rendering.
    pub fn trimmed(&self) -> String {
        self.as_text().trim().to_string()
    }

    /// True for empty cells, blank text and the literal `nan`.
    pub fn is_blank(&self) -> bool {
        is_blank_text(&self.as_text())
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s.to_string())
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

/// Format a number without a trailing `.0` when it is integral.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Blank after trimming, or the literal `nan` left behind by spreadsheet exports.
pub fn is_blank_text(s: &str) -> bool {
    let t = s.trim();
    t.is_empty() || t == "nan"
}

// =============================================================================
// Rows and Datasets
// =============================================================================

static EMPTY_CELL: CellValue = CellValue::Empty;

/// A data row. `number` is the 1-based position among the source data rows
/// (header excluded) and survives filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub number: usize,
    pub cells: Vec<CellValue>,
}

impl Row {
    pub fn new(number: usize, cells: Vec<CellValue>) -> Self {
        Self { number, cells }
    }

    /// Cell at `column`; short rows read as empty.
    pub fn get(&self, column: usize) -> &CellValue {
        self.cells.get(column).unwrap_or(&EMPTY_CELL)
    }

    /// Trimmed text of the cell at `column`.
    pub fn text(&self, column: usize) -> String {
        self.get(column).trimmed()
    }
}

/// Normalized header lookup, built once per dataset.
///
/// Keys are trimmed and lower-cased; the first occurrence of a duplicated
/// header wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderIndex {
    positions: HashMap<String, usize>,
}

impl HeaderIndex {
    pub fn new(columns: &[String]) -> Self {
        let mut positions = HashMap::with_capacity(columns.len());
        for (i, col) in columns.iter().enumerate() {
            positions.entry(normalize_header(col)).or_insert(i);
        }
        Self { positions }
    }

    /// Position of `name`, compared case-insensitively.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(&normalize_header(name)).copied()
    }
}

/// Trim and lower-case a header name.
pub fn normalize_header(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Tabular dataset: declared column order plus rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Row>,
    index: HeaderIndex,
}

impl Dataset {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        let index = HeaderIndex::new(&columns);
        Self { columns, rows, index }
    }

    /// Build a dataset from cell vectors, numbering rows from 1.
    pub fn from_records(columns: Vec<String>, records: Vec<Vec<CellValue>>) -> Self {
        let rows = records
            .into_iter()
            .enumerate()
            .map(|(i, cells)| Row::new(i + 1, cells))
            .collect();
        Self::new(columns, rows)
    }

    /// Build a dataset of text cells; empty strings become [`CellValue::Empty`].
    pub fn from_text_rows(columns: &[&str], rows: &[Vec<&str>]) -> Self {
        let columns = columns.iter().map(|c| c.to_string()).collect();
        let records = rows
            .iter()
            .map(|r| r.iter().map(|v| CellValue::from(*v)).collect())
            .collect();
        Self::from_records(columns, records)
    }

    /// Same columns, different rows.
    pub fn with_rows(&self, rows: Vec<Row>) -> Self {
        Self {
            columns: self.columns.clone(),
            rows,
            index: self.index.clone(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Case-insensitive column position.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.index.position(name)
    }

    pub fn index(&self) -> &HeaderIndex {
        &self.index
    }
}

// =============================================================================
// Form Parameters
// =============================================================================

pub const DEFAULT_PROGRAM: &str = "asdasdasd";
pub const DEFAULT_COMMISSION: &str = "asdasdasdas";
pub const DEFAULT_ACTIVITY: &str = "dasdasada";
pub const DEFAULT_ACADEMIC_PERIOD: &str = "asdasdadasd";
pub const DEFAULT_REGULARITY_DATE: &str = "12/31/2312";
pub const DEFAULT_PROMOTION_DATE: &str = "13/12/3131";

/// Form field names, in order.
pub const FORM_FIELDS: [&str; 6] = ["campo1", "campo2", "campo3", "campo4", "campo5", "campo6"];

/// The six free-text values copied into every extract line.
///
/// Values are opaque: nothing here trims or validates them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormParams {
    /// Academic program (`Propuesta`).
    #[serde(rename = "campo1", default)]
    pub program: Option<String>,
    /// Commission (`Comision`).
    #[serde(rename = "campo2", default)]
    pub commission: Option<String>,
    /// Activity (`Actividad`).
    #[serde(rename = "campo3", default)]
    pub activity: Option<String>,
    /// Academic period (`Periodo Lectivo`).
    #[serde(rename = "campo4", default)]
    pub academic_period: Option<String>,
    /// Regularity date.
    #[serde(rename = "campo5", default)]
    pub regularity_date: Option<String>,
    /// Promotion date.
    #[serde(rename = "campo6", default)]
    pub promotion_date: Option<String>,
}

impl FormParams {
    /// Collect `campoN` pairs, ignoring unknown keys.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            params.set(key.as_ref(), value);
        }
        params
    }

    /// Set a field by its form name. Returns false for unknown names.
    pub fn set(&mut self, field: &str, value: impl Into<String>) -> bool {
        let slot = match field {
            "campo1" => &mut self.program,
            "campo2" => &mut self.commission,
            "campo3" => &mut self.activity,
            "campo4" => &mut self.academic_period,
            "campo5" => &mut self.regularity_date,
            "campo6" => &mut self.promotion_date,
            _ => return false,
        };
        *slot = Some(value.into());
        true
    }

    /// Form names of fields that are absent or empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let values = [
            &self.program,
            &self.commission,
            &self.activity,
            &self.academic_period,
            &self.regularity_date,
            &self.promotion_date,
        ];
        FORM_FIELDS
            .iter()
            .zip(values)
            .filter(|(_, v)| v.as_deref().map_or(true, str::is_empty))
            .map(|(name, _)| *name)
            .collect()
    }

    pub fn program(&self) -> &str {
        self.program.as_deref().unwrap_or(DEFAULT_PROGRAM)
    }

    pub fn commission(&self) -> &str {
        self.commission.as_deref().unwrap_or(DEFAULT_COMMISSION)
    }

    pub fn activity(&self) -> &str {
        self.activity.as_deref().unwrap_or(DEFAULT_ACTIVITY)
    }

    pub fn academic_period(&self) -> &str {
        self.academic_period.as_deref().unwrap_or(DEFAULT_ACADEMIC_PERIOD)
    }

    pub fn regularity_date(&self) -> &str {
        self.regularity_date.as_deref().unwrap_or(DEFAULT_REGULARITY_DATE)
    }

    pub fn promotion_date(&self) -> &str {
        self.promotion_date.as_deref().unwrap_or(DEFAULT_PROMOTION_DATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_rendering() {
        assert_eq!(CellValue::Number(30123456.0).as_text(), "30123456");
        assert_eq!(CellValue::Number(7.0).as_text(), "7");
        assert_eq!(CellValue::Number(7.5).as_text(), "7.5");
        assert_eq!(CellValue::Empty.as_text(), "");
    }

    #[test]
    fn test_blank_detection() {
        assert!(CellValue::Empty.is_blank());
        assert!(CellValue::Text("  ".into()).is_blank());
        assert!(CellValue::Text("nan".into()).is_blank());
        assert!(!CellValue::Text("NaN".into()).is_blank());
        assert!(!CellValue::Number(0.0).is_blank());
    }

    #[test]
    fn test_header_index_normalizes() {
        let cols = vec![" DNI ".to_string(), "nota".to_string(), "Nota".to_string()];
        let index = HeaderIndex::new(&cols);
        assert_eq!(index.position("dni"), Some(0));
        assert_eq!(index.position("NOTA"), Some(1));
        assert_eq!(index.position("Apellido"), None);
    }

    #[test]
    fn test_short_row_reads_empty() {
        let row = Row::new(1, vec![CellValue::from("a")]);
        assert_eq!(row.get(5), &CellValue::Empty);
        assert_eq!(row.text(0), "a");
    }

    #[test]
    fn test_from_text_rows_numbers_rows() {
        let ds = Dataset::from_text_rows(&["A", "B"], &[vec!["1", ""], vec!["2", "x"]]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.rows()[1].number, 2);
        assert_eq!(ds.rows()[0].get(1), &CellValue::Empty);
        assert_eq!(ds.column("b"), Some(1));
    }

    #[test]
    fn test_form_defaults() {
        let params = FormParams::default();
        assert_eq!(params.program(), "asdasdasd");
        assert_eq!(params.commission(), "asdasdasdas");
        assert_eq!(params.activity(), "dasdasada");
        assert_eq!(params.academic_period(), "asdasdadasd");
        assert_eq!(params.regularity_date(), "12/31/2312");
        assert_eq!(params.promotion_date(), "13/12/3131");
    }

    #[test]
    fn test_form_missing_fields() {
        let params = FormParams::from_pairs([("campo1", "Ing"), ("campo3", ""), ("other", "x")]);
        assert_eq!(params.program(), "Ing");
        assert_eq!(
            params.missing_fields(),
            vec!["campo2", "campo3", "campo4", "campo5", "campo6"]
        );
    }

    #[test]
    fn test_form_deserializes_campo_names() {
        let params: FormParams =
            serde_json::from_str(r#"{"campo2": "K1021", "campo6": "01/12/2024"}"#).unwrap();
        assert_eq!(params.commission(), "K1021");
        assert_eq!(params.promotion_date(), "01/12/2024");
        assert_eq!(params.program(), DEFAULT_PROGRAM);
    }
}
