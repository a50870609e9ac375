//! Per-row semantic checks.
//!
//! Each rule runs only when its column is present in the dataset. A row
//! collects every violation it has; rows without violations are kept in
//! their original order.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::consolidate::consolidate_errors;
use crate::config::{
    DATE_COLUMN, DOCUMENT_COLUMN, FACULTY_COLUMN, GRADE_COLUMN, MAX_GRADE, MIN_DOCUMENT_DIGITS,
    MIN_GRADE, REQUIRED_TEXT_COLUMNS, SPECIAL_GRADES,
};
use crate::models::{format_number, is_blank_text, Dataset, Row};

/// Violations found on one row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowViolations {
    /// 1-based source row number.
    pub row: usize,
    pub violations: Vec<String>,
}

/// Column positions resolved once per dataset.
#[derive(Debug, Clone, Copy)]
struct RuleColumns {
    faculty: Option<usize>,
    grade: Option<usize>,
    document: Option<usize>,
    date: Option<usize>,
    surname: Option<usize>,
    given_name: Option<usize>,
}

impl RuleColumns {
    fn resolve(dataset: &Dataset) -> Self {
        Self {
            faculty: dataset.column(FACULTY_COLUMN),
            grade: dataset.column(GRADE_COLUMN),
            document: dataset.column(DOCUMENT_COLUMN),
            date: dataset.column(DATE_COLUMN),
            surname: dataset.column(REQUIRED_TEXT_COLUMNS[0]),
            given_name: dataset.column(REQUIRED_TEXT_COLUMNS[1]),
        }
    }
}

/// Validate every row and split the dataset.
///
/// Returns the valid rows (same columns, original order) and the
/// consolidated error lines for the invalid ones.
pub fn validate_content(dataset: &Dataset) -> (Dataset, Vec<String>) {
    let (valid, invalid) = partition_rows(dataset);

    info!(
        valid = valid.len(),
        invalid = invalid.len(),
        "content validation finished"
    );

    (valid, consolidate_errors(&invalid))
}

/// Validate every row, keeping the raw per-row violations.
pub fn partition_rows(dataset: &Dataset) -> (Dataset, Vec<RowViolations>) {
    let columns = RuleColumns::resolve(dataset);
    let mut valid_rows = Vec::new();
    let mut invalid = Vec::new();

    debug!(rows = dataset.len(), "starting content validation");

    for row in dataset.rows() {
        let violations = check_row(row, &columns);
        if violations.is_empty() {
            valid_rows.push(row.clone());
        } else {
            debug!(row = row.number, ?violations, "row has errors");
            invalid.push(RowViolations {
                row: row.number,
                violations,
            });
        }
    }

    (dataset.with_rows(valid_rows), invalid)
}

fn check_row(row: &Row, columns: &RuleColumns) -> Vec<String> {
    let mut violations = Vec::new();

    if let Some(col) = columns.faculty {
        if is_blank_text(&row.text(col)) {
            violations.push("faculty is empty".to_string());
        }
    }

    if let Some(col) = columns.grade {
        if let Some(v) = check_grade(&row.text(col)) {
            violations.push(v);
        }
    }

    if let Some(col) = columns.document {
        if let Some(v) = check_document(&row.text(col)) {
            violations.push(v);
        }
    }

    if let Some(col) = columns.date {
        if let Some(v) = check_date(&row.text(col)) {
            violations.push(v);
        }
    }

    let text_fields = [
        (REQUIRED_TEXT_COLUMNS[0], columns.surname),
        (REQUIRED_TEXT_COLUMNS[1], columns.given_name),
    ];
    for (name, col) in text_fields {
        if let Some(col) = col {
            if is_blank_text(&row.text(col)) {
                violations.push(format!("field '{}' is empty", name));
            }
        }
    }

    violations
}

/// Grade rule: special token, or a finite number within the grade bounds.
pub fn check_grade(value: &str) -> Option<String> {
    let value = value.trim();
    if is_special_grade(value) {
        return None;
    }

    match value.parse::<f64>() {
        Ok(grade) if grade.is_finite() => {
            if !(MIN_GRADE..=MAX_GRADE).contains(&grade) {
                Some(format!(
                    "grade {} out of range {}-{}",
                    format_number(grade),
                    format_number(MIN_GRADE),
                    format_number(MAX_GRADE)
                ))
            } else {
                None
            }
        }
        _ => Some(format!(
            "grade '{}' is neither a number nor an accepted special value",
            value
        )),
    }
}

pub fn is_special_grade(value: &str) -> bool {
    let lower = value.trim().to_lowercase();
    SPECIAL_GRADES.contains(&lower.as_str())
}

/// Document rule: all ASCII digits, at least [`MIN_DOCUMENT_DIGITS`] long.
pub fn check_document(value: &str) -> Option<String> {
    let value = value.trim();
    let valid = value.len() >= MIN_DOCUMENT_DIGITS && value.bytes().all(|b| b.is_ascii_digit());
    if valid {
        None
    } else {
        Some(format!(
            "document number '{}' is invalid (must be numeric with at least {} digits)",
            value, MIN_DOCUMENT_DIGITS
        ))
    }
}

/// Date rule. Blank dates are accepted; the field is optional.
pub fn check_date(value: &str) -> Option<String> {
    let value = value.trim();
    if is_valid_date(value) {
        None
    } else {
        Some(format!(
            "date '{}' has no valid format (accepts DD/MM/YYYY, YYYY-MM-DD, ...)",
            value
        ))
    }
}

/// Shapes accepted without parsing. Day and month ranges are not checked.
static DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^\d{1,2}/\d{1,2}/\d{4}$",
        r"^\d{4}-\d{1,2}-\d{1,2}$",
        r"^\d{4}-\d{1,2}-\d{1,2} \d{1,2}:\d{1,2}:\d{1,2}$",
        r"^\d{1,2}-\d{1,2}-\d{4}$",
        r"^\d{1,2}/\d{1,2}/\d{2}$",
        r"^\d{4}/\d{1,2}/\d{1,2}$",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

pub fn is_valid_date(value: &str) -> bool {
    let value = value.trim();
    if is_blank_text(value) || value == "None" {
        return true;
    }
    DATE_PATTERNS.iter().any(|re| re.is_match(value)) || parse_flexible_date(value).is_some()
}

const FLEXIBLE_DATETIME_FORMATS: [&str; 20] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%d/%m/%y %H:%M:%S",
    "%d/%m/%y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%d-%b-%Y %H:%M:%S",
    "%d-%b-%Y %H:%M",
    "%Y%m%d %H:%M:%S",
];

const FLEXIBLE_DATE_FORMATS: [&str; 16] = [
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%Y.%m.%d",
    "%Y%m%d",
    "%d-%m-%y",
    "%d.%m.%y",
    "%d %B %Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%b %d, %Y",
    "%d-%b-%Y",
    "%d-%B-%Y",
    "%d %b %Y",
    "%b %d %Y",
    "%Y-%b-%d",
    "%d-%b-%y",
];

/// Year-month spellings and the day appended to complete them.
const PARTIAL_DATE_FORMATS: [(&str, &str); 3] = [
    ("%Y-%m-%d", "-01"),
    ("%Y/%m/%d", "/01"),
    ("%m/%Y/%d", "/01"),
];

/// Fallback parser for date spellings the fixed shapes do not cover.
pub fn parse_flexible_date(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }

    for fmt in FLEXIBLE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt);
        }
    }

    FLEXIBLE_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .or_else(|| parse_partial_date(value))
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// `2024-03`, `2024/03`, `03/2024` and a bare `2024`, read as the first
/// day of the period.
fn parse_partial_date(value: &str) -> Option<NaiveDate> {
    if value.len() == 4 && value.bytes().all(|b| b.is_ascii_digit()) {
        return NaiveDate::from_ymd_opt(value.parse().ok()?, 1, 1);
    }

    PARTIAL_DATE_FORMATS
        .iter()
        .find_map(|(fmt, day)| NaiveDate::parse_from_str(&format!("{}{}", value, day), fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::REQUIRED_COLUMNS;

    fn row<'a>(
        grade: &'a str,
        dni: &'a str,
        surname: &'a str,
        name: &'a str,
        date: &'a str,
        faculty: &'a str,
    ) -> Vec<&'a str> {
        vec!["1001", grade, "Si", surname, name, dni, "2024", date, faculty]
    }

    fn valid_row() -> Vec<&'static str> {
        row("7", "30123456", "Gomez", "Ana", "01/03/2024", "FRBA")
    }

    #[test]
    fn test_grade_within_range() {
        assert_eq!(check_grade("5"), None);
        assert_eq!(check_grade("1"), None);
        assert_eq!(check_grade("10"), None);
        assert_eq!(check_grade(" 7.5 "), None);
    }

    #[test]
    fn test_grade_out_of_range() {
        assert_eq!(check_grade("11").as_deref(), Some("grade 11 out of range 1-10"));
        assert_eq!(check_grade("0.5").as_deref(), Some("grade 0.5 out of range 1-10"));
    }

    #[test]
    fn test_grade_special_tokens_any_case() {
        let tokens = [
            "ausente",
            "AUSENTE",
            "Ausente",
            "-",
            "Equivalencia",
            "aprobado",
            "DESAPROBADO",
        ];
        for token in tokens {
            assert_eq!(check_grade(token), None, "{}", token);
        }
    }

    #[test]
    fn test_grade_unparsable() {
        let msg = check_grade("siete").unwrap();
        assert!(msg.contains("'siete'"));
        assert!(check_grade("7,5").is_some());
        assert!(check_grade("").is_some());
        assert!(check_grade("nan").is_some());
        assert!(check_grade("inf").is_some());
    }

    #[test]
    fn test_document_rule() {
        assert!(check_document("1234").is_some());
        assert_eq!(check_document("12345678"), None);
        assert_eq!(check_document(" 1234567 "), None);
        assert!(check_document("12.345.678").is_some());
        assert!(check_document("").is_some());
    }

    #[test]
    fn test_date_shapes() {
        for d in [
            "01/03/2024",
            "2024-03-01",
            "2024-03-01 00:00:00",
            "1-3-2024",
            "01/03/24",
            "2024/3/1",
            "",
            "nan",
            "None",
        ] {
            assert!(is_valid_date(d), "{}", d);
        }
    }

    #[test]
    fn test_date_flexible_fallback() {
        assert!(is_valid_date("2024-03-01T10:30:00"));
        assert!(is_valid_date("01.03.2024"));
        assert!(is_valid_date("March 1, 2024"));
        assert!(is_valid_date("20240301"));
        assert!(!is_valid_date("mañana"));
        assert!(!is_valid_date("2024-13-45T00:00:00"));
        assert!(check_date("32.13.2024").is_some());
    }

    #[test]
    fn test_date_with_time_of_day() {
        for d in [
            "25/03/2024 10:00:00",
            "25/03/2024 10:00",
            "2024/03/25 10:00:00",
            "2024/03/25 10:00",
            "25-03-2024 10:00",
            "25-03-2024 10:00:00",
            "25/03/24 08:15",
        ] {
            assert!(is_valid_date(d), "{}", d);
        }
        assert!(!is_valid_date("25/03/2024 25:00"));
    }

    #[test]
    fn test_date_short_year_and_partial() {
        assert!(is_valid_date("25-03-24"));
        assert!(is_valid_date("2024-03"));
        assert!(is_valid_date("2024/03"));
        assert!(is_valid_date("03/2024"));
        assert!(is_valid_date("2024"));
        assert!(!is_valid_date("2024-13"));
        assert_eq!(
            parse_flexible_date("2024-03").map(|d| d.date()),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
    }

    #[test]
    fn test_valid_row_passes() {
        let ds = Dataset::from_text_rows(&REQUIRED_COLUMNS, &[valid_row()]);
        let (valid, errors) = validate_content(&ds);
        assert_eq!(valid.len(), 1);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_row_accumulates_all_violations() {
        let ds = Dataset::from_text_rows(
            &REQUIRED_COLUMNS,
            &[row("15", "1234", "", "nan", "someday", " ")],
        );
        let (valid, invalid) = partition_rows(&ds);
        assert!(valid.is_empty());
        assert_eq!(invalid.len(), 1);
        assert_eq!(invalid[0].row, 1);
        assert_eq!(
            invalid[0].violations,
            vec![
                "faculty is empty".to_string(),
                "grade 15 out of range 1-10".to_string(),
                "document number '1234' is invalid (must be numeric with at least 7 digits)"
                    .to_string(),
                "date 'someday' has no valid format (accepts DD/MM/YYYY, YYYY-MM-DD, ...)"
                    .to_string(),
                "field 'Apellido' is empty".to_string(),
                "field 'Nombre' is empty".to_string(),
            ]
        );
    }

    #[test]
    fn test_absent_columns_skip_rules() {
        let ds = Dataset::from_text_rows(&["Legajo", "Apellido"], &[vec!["1", "Perez"]]);
        let (valid, errors) = validate_content(&ds);
        assert_eq!(valid.len(), 1);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_column_lookup_case_insensitive() {
        let ds = Dataset::from_text_rows(&["dni", "NOTA"], &[vec!["123", "5"]]);
        let (_, invalid) = partition_rows(&ds);
        assert_eq!(invalid.len(), 1);
        assert!(invalid[0].violations[0].contains("'123'"));
    }

    #[test]
    fn test_valid_rows_keep_order_and_numbers() {
        let ds = Dataset::from_text_rows(
            &REQUIRED_COLUMNS,
            &[
                valid_row(),
                row("11", "30123456", "Gomez", "Ana", "", "FRBA"),
                row("8", "40123456", "Lopez", "Juan", "", "FRBA"),
            ],
        );
        let (valid, errors) = validate_content(&ds);
        let numbers: Vec<usize> = valid.rows().iter().map(|r| r.number).collect();
        assert_eq!(numbers, vec![1, 3]);
        assert_eq!(errors, vec!["Row 2: grade 11 out of range 1-10"]);
    }

    #[test]
    fn test_numeric_document_cell() {
        use crate::models::CellValue;
        let ds = Dataset::from_records(
            vec!["DNI".into(), "Nota".into()],
            vec![vec![CellValue::Number(30123456.0), CellValue::Number(9.0)]],
        );
        let (valid, errors) = validate_content(&ds);
        assert_eq!(valid.len(), 1, "{:?}", errors);
    }
}
