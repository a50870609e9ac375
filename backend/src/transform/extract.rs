//! Roster and grades extract generation.
//!
//! Both extracts are keyed by document number. Form parameters are copied
//! verbatim into every line.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{DOCUMENT_COLUMN, GRADE_COLUMN};
use crate::error::{GenerationError, GenerationResult};
use crate::models::{is_blank_text, Dataset, FormParams};

pub const ROSTER_HEADER: [&str; 5] = [
    "DNI",
    "Propuesta",
    "Comision",
    "Actividad",
    "Periodo Lectivo",
];

pub const GRADES_HEADER: [&str; 5] = [
    "documento",
    "nota_regularidad",
    "fecha_regularidad",
    "nota_promocion",
    "fecha_promocion",
];

/// Grade written when the dataset has no grade column.
pub const FALLBACK_GRADE: &str = "9";

/// How fields are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quoting {
    /// Fields joined with commas as-is. Embedded commas or quotes are not
    /// escaped; this is what the SIU import expects today.
    #[default]
    Raw,
    /// RFC 4180: fields containing delimiters, quotes or newlines are quoted.
    Rfc4180,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractOptions {
    pub quoting: Quoting,
}

impl ExtractOptions {
    pub fn quoted() -> Self {
        Self {
            quoting: Quoting::Rfc4180,
        }
    }
}

/// Roster extract with default options.
pub fn generate_roster(valid_rows: &Dataset, params: &FormParams) -> GenerationResult<String> {
    generate_roster_with(valid_rows, params, &ExtractOptions::default())
}

/// `DNI,Propuesta,Comision,Actividad,Periodo Lectivo`, one line per row with
/// a document number.
pub fn generate_roster_with(
    valid_rows: &Dataset,
    params: &FormParams,
    options: &ExtractOptions,
) -> GenerationResult<String> {
    let dni_col = valid_rows
        .column(DOCUMENT_COLUMN)
        .ok_or(GenerationError::MissingDocumentColumn { extract: "roster" })?;

    let records: Vec<[String; 5]> = valid_rows
        .rows()
        .iter()
        .map(|row| row.text(dni_col))
        .filter(|dni| !is_blank_text(dni))
        .map(|dni| {
            [
                dni,
                params.program().to_string(),
                params.commission().to_string(),
                params.activity().to_string(),
                params.academic_period().to_string(),
            ]
        })
        .collect();

    let csv = render(&ROSTER_HEADER, &records, options.quoting)?;
    info!(records = records.len(), "roster extract generated");
    debug!(preview = ?csv.lines().take(3).collect::<Vec<_>>(), "roster extract preview");
    Ok(csv)
}

/// Grades extract with default options.
pub fn generate_grades(valid_rows: &Dataset, params: &FormParams) -> GenerationResult<String> {
    generate_grades_with(valid_rows, params, &ExtractOptions::default())
}

/// `documento,nota_regularidad,fecha_regularidad,nota_promocion,fecha_promocion`.
///
/// The same grade fills both grade slots.
pub fn generate_grades_with(
    valid_rows: &Dataset,
    params: &FormParams,
    options: &ExtractOptions,
) -> GenerationResult<String> {
    let dni_col = valid_rows
        .column(DOCUMENT_COLUMN)
        .ok_or(GenerationError::MissingDocumentColumn { extract: "grades" })?;
    let grade_col = valid_rows.column(GRADE_COLUMN);

    let records: Vec<[String; 5]> = valid_rows
        .rows()
        .iter()
        .filter_map(|row| {
            let dni = row.text(dni_col);
            if is_blank_text(&dni) {
                return None;
            }
            let grade = grade_col
                .map(|col| row.text(col))
                .unwrap_or_else(|| FALLBACK_GRADE.to_string());
            Some([
                dni,
                grade.clone(),
                params.regularity_date().to_string(),
                grade,
                params.promotion_date().to_string(),
            ])
        })
        .collect();

    let csv = render(&GRADES_HEADER, &records, options.quoting)?;
    info!(records = records.len(), "grades extract generated");
    debug!(preview = ?csv.lines().take(3).collect::<Vec<_>>(), "grades extract preview");
    Ok(csv)
}

/// Header plus records, `\n`-separated, no trailing newline.
fn render(header: &[&str], records: &[[String; 5]], quoting: Quoting) -> GenerationResult<String> {
    match quoting {
        Quoting::Raw => {
            let mut lines = Vec::with_capacity(records.len() + 1);
            lines.push(header.join(","));
            lines.extend(records.iter().map(|r| r.join(",")));
            Ok(lines.join("\n"))
        }
        Quoting::Rfc4180 => {
            let mut writer = csv::WriterBuilder::new()
                .terminator(csv::Terminator::Any(b'\n'))
                .from_writer(Vec::new());
            writer.write_record(header)?;
            for record in records {
                writer.write_record(record)?;
            }
            let bytes = writer
                .into_inner()
                .map_err(|e| GenerationError::Csv(csv::Error::from(e.into_error())))?;
            let text = String::from_utf8_lossy(&bytes);
            Ok(text.trim_end_matches('\n').to_string())
        }
    }
}
