//! High-level pipeline: structure check, faculty filter, content
//! validation and extract generation.
//!
//! # Example
//!
//! ```rust,ignore
//! use gradesheet::{process_spreadsheet, ExtractOptions, FormParams};
//!
//! let bytes = std::fs::read("planilla.xlsx")?;
//! let params = FormParams::default();
//! let output = process_spreadsheet(&bytes, "planilla.xlsx", &params, &ExtractOptions::default())?;
//! println!("{} records", output.total_records);
//! ```

use serde::{Deserialize, Serialize};

use super::extract::{generate_grades_with, generate_roster_with, ExtractOptions};
use super::filter::filter_by_faculty;
use crate::api::logs::{log_error, log_info, log_info_indent, log_success, log_warning};
use crate::config::{ALLOWED_EXTENSIONS, REQUIRED_COLUMNS};
use crate::error::{PipelineError, PipelineResult, SheetError};
use crate::models::{Dataset, FormParams};
use crate::parser::{parse_spreadsheet_bytes, validate_file_extension};
use crate::validation::{validate_content, validate_structure};

/// Successful pipeline output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessOutput {
    pub roster_csv: String,
    pub grades_csv: String,
    /// Number of valid records.
    pub total_records: usize,
    /// Consolidated content errors for the rows that were left out.
    pub content_errors: Vec<String>,
    /// Data rows read from the file.
    pub rows_read: usize,
    /// Rows left after the faculty filter.
    pub rows_after_filter: usize,
}

/// Flat success/failure record handed to callers that do not use `Result`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roster_csv: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grades_csv: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_records: Option<usize>,
    #[serde(default)]
    pub content_errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub detailed_errors: Vec<String>,
}

impl From<PipelineResult<ProcessOutput>> for ProcessReport {
    fn from(result: PipelineResult<ProcessOutput>) -> Self {
        match result {
            Ok(output) => ProcessReport {
                success: true,
                roster_csv: Some(output.roster_csv),
                grades_csv: Some(output.grades_csv),
                total_records: Some(output.total_records),
                content_errors: output.content_errors,
                error: None,
                detailed_errors: Vec::new(),
            },
            Err(e) => ProcessReport {
                success: false,
                roster_csv: None,
                grades_csv: None,
                total_records: None,
                content_errors: Vec::new(),
                error: Some(e.message()),
                detailed_errors: e.details().to_vec(),
            },
        }
    }
}

/// Run the full pipeline on an uploaded spreadsheet.
pub fn process_spreadsheet(
    bytes: &[u8],
    filename: &str,
    params: &FormParams,
    options: &ExtractOptions,
) -> PipelineResult<ProcessOutput> {
    log_info(format!("📄 Processing file: {}", filename));

    if !validate_file_extension(filename) {
        log_warning(format!("Invalid file extension: {}", filename));
        return Err(SheetError::UnsupportedExtension {
            allowed: ALLOWED_EXTENSIONS.join(", "),
        }
        .into());
    }

    let dataset = parse_spreadsheet_bytes(bytes).map_err(|e| {
        log_error(format!("Could not read the spreadsheet: {}", e));
        e
    })?;

    process_dataset(&dataset, params, options)
}

/// Run the pipeline on an already decoded dataset.
///
/// Structural errors and an empty valid set are fatal; content violations
/// are reported in [`ProcessOutput::content_errors`].
pub fn process_dataset(
    dataset: &Dataset,
    params: &FormParams,
    options: &ExtractOptions,
) -> PipelineResult<ProcessOutput> {
    log_info(format!(
        "📋 Read {} rows, {} columns:",
        dataset.len(),
        dataset.columns().len()
    ));
    for (i, col) in dataset.columns().iter().enumerate() {
        log_info_indent(format!("[{:2}] {}", i + 1, col), 1);
    }

    // 1. Structure
    let (ok, structure_errors) = validate_structure(dataset, &REQUIRED_COLUMNS);
    if !ok {
        log_error("File structure is invalid");
        for err in &structure_errors {
            log_error(format!("• {}", err));
        }
        return Err(PipelineError::Structure {
            errors: structure_errors,
        });
    }
    log_success("File structure is valid");

    // 2. Faculty filter
    let filtered = filter_by_faculty(dataset);
    log_info(format!(
        "🏛️  Faculty filter: {} of {} rows kept",
        filtered.len(),
        dataset.len()
    ));

    // 3. Content
    let (valid, content_errors) = validate_content(&filtered);
    if content_errors.is_empty() {
        log_success(format!("All {} rows valid", valid.len()));
    } else {
        log_warning(format!(
            "{} valid rows, {} error lines",
            valid.len(),
            content_errors.len()
        ));
        for err in content_errors.iter().take(3) {
            log_warning(format!("• {}", err));
        }
    }

    if valid.is_empty() {
        log_error("No valid records found");
        return Err(PipelineError::NoValidRecords {
            errors: content_errors,
        });
    }

    // 4. Extracts
    let roster_csv = generate_roster_with(&valid, params, options)?;
    let grades_csv = generate_grades_with(&valid, params, options)?;
    log_success(format!("✨ Generated extracts for {} records", valid.len()));

    Ok(ProcessOutput {
        roster_csv,
        grades_csv,
        total_records: valid.len(),
        content_errors,
        rows_read: dataset.len(),
        rows_after_filter: filtered.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> Dataset {
        Dataset::from_text_rows(
            &REQUIRED_COLUMNS,
            &[
                vec!["1001", "7", "Si", "Gomez", "Ana", "30123456", "2024", "01/03/2024", "FRBA"],
                vec!["1002", "4", "No", "Perez", "Luis", "30999888", "2024", "01/03/2024", "OTRA"],
                vec![
                    "1003", "15", "No", "Diaz", "Eva", "31222333", "2024", "01/03/2024", "UTN FRBA",
                ],
            ],
        )
    }

    fn run(ds: &Dataset) -> PipelineResult<ProcessOutput> {
        process_dataset(ds, &FormParams::default(), &ExtractOptions::default())
    }

    #[test]
    fn test_end_to_end_scenario() {
        let output = run(&scenario()).unwrap();

        assert_eq!(output.rows_read, 3);
        assert_eq!(output.rows_after_filter, 2);
        assert_eq!(output.total_records, 1);
        assert_eq!(output.content_errors, vec!["Row 3: grade 15 out of range 1-10"]);

        let roster: Vec<&str> = output.roster_csv.lines().collect();
        assert_eq!(roster.len(), 2);
        assert!(roster[1].starts_with("30123456,"));

        let grades: Vec<&str> = output.grades_csv.lines().collect();
        assert_eq!(grades.len(), 2);
        assert_eq!(grades[1], "30123456,7,12/31/2312,7,13/12/3131");
    }

    #[test]
    fn test_structure_failure_is_fatal() {
        let ds = Dataset::from_text_rows(&["DNI", "Nota"], &[vec!["30123456", "7"]]);
        let err = run(&ds).unwrap_err();
        assert!(matches!(err, PipelineError::Structure { .. }));
        assert!(!err.details().is_empty());
    }

    #[test]
    fn test_no_valid_records_carries_content_errors() {
        let ds = Dataset::from_text_rows(
            &REQUIRED_COLUMNS,
            &[vec!["1", "11", "No", "Diaz", "Eva", "31222333", "2024", "", "FRBA"]],
        );
        let err = run(&ds).unwrap_err();
        assert_eq!(err.message(), "No valid records found in the file");
        assert_eq!(err.details(), ["Row 1: grade 11 out of range 1-10".to_string()]);
    }

    #[test]
    fn test_all_rows_filtered_out() {
        let ds = Dataset::from_text_rows(
            &REQUIRED_COLUMNS,
            &[vec!["1", "8", "No", "Diaz", "Eva", "31222333", "2024", "", "UTN FRC"]],
        );
        let err = run(&ds).unwrap_err();
        assert!(matches!(err, PipelineError::NoValidRecords { ref errors } if errors.is_empty()));
    }

    #[test]
    fn test_bad_extension_rejected() {
        let options = ExtractOptions::default();
        let err = process_spreadsheet(b"a,b", "notas.csv", &FormParams::default(), &options)
            .unwrap_err();
        assert!(err.message().contains(".xlsx, .xls"));
    }

    #[test]
    fn test_xlsx_upload_end_to_end() {
        use crate::parser::fixtures::{self, Cell};

        let student = |grade: Cell, dni: f64, faculty: &'static str| {
            vec![
                Cell::Number(1001.0),
                grade,
                Cell::Text("Si"),
                Cell::Text("Gomez"),
                Cell::Text("Ana"),
                Cell::Number(dni),
                Cell::Number(2024.0),
                Cell::Date(45352.0),
                Cell::Text(faculty),
            ]
        };
        let bytes = fixtures::workbook(&[
            fixtures::header(),
            student(Cell::Number(7.0), 30123456.0, "FRBA"),
            student(Cell::Number(4.0), 30999888.0, "UTN FRC"),
            student(Cell::Number(15.0), 31222333.0, "utn frba"),
            student(Cell::Text("ausente"), 32444555.0, " FRBA "),
        ]);

        let params = FormParams::from_pairs([("campo2", "K1021"), ("campo3", "AM1")]);
        let output =
            process_spreadsheet(&bytes, "notas.xlsx", &params, &ExtractOptions::default()).unwrap();

        assert_eq!(output.rows_read, 4);
        assert_eq!(output.rows_after_filter, 3);
        assert_eq!(output.total_records, 2);
        assert_eq!(output.content_errors, vec!["Row 3: grade 15 out of range 1-10"]);

        let grades: Vec<&str> = output.grades_csv.lines().collect();
        assert_eq!(grades[1], "30123456,7,12/31/2312,7,13/12/3131");
        assert_eq!(grades[2], "32444555,ausente,12/31/2312,ausente,13/12/3131");
        assert!(output.roster_csv.lines().nth(1).unwrap().contains(",K1021,AM1,"));
    }

    #[test]
    fn test_report_from_result() {
        let ok = run(&scenario());
        let report = ProcessReport::from(ok);
        assert!(report.success);
        assert_eq!(report.total_records, Some(1));
        assert_eq!(report.content_errors.len(), 1);

        let err: PipelineResult<ProcessOutput> = Err(PipelineError::Structure {
            errors: vec!["file is empty".into()],
        });
        let report = ProcessReport::from(err);
        assert!(!report.success);
        assert_eq!(report.error.as_deref(), Some("The file does not have the correct structure"));
        assert_eq!(report.detailed_errors, vec!["file is empty"]);
    }
}
