//! REST API types for the upload page.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::cache::{ExtractKind, StoredExtract};

/// Response sent after a successful upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Human-readable outcome
    pub success: String,

    pub uploaded_filename: String,

    /// Store id of the generated extracts
    pub file_id: String,

    /// Download URL of the roster extract
    pub processed_file_alumnos: String,

    /// Download URL of the grades extract
    pub processed_file_notas: String,

    pub records_count: usize,

    /// Advisory content errors for rows that were left out
    pub content_errors: Vec<String>,
}

impl UploadResponse {
    pub fn new(
        uploaded_filename: String,
        file_id: String,
        records_count: usize,
        content_errors: Vec<String>,
    ) -> Self {
        Self {
            success: format!(
                "Files processed successfully. {} records were processed.",
                records_count
            ),
            uploaded_filename,
            processed_file_alumnos: download_url(&file_id, ExtractKind::Roster),
            processed_file_notas: download_url(&file_id, ExtractKind::Grades),
            file_id,
            records_count,
            content_errors,
        }
    }
}

/// Query of `GET /download`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DownloadQuery {
    pub file_id: Option<String>,
    pub file_type: Option<String>,
}

/// One row of the `GET /api/extracts` listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractInfo {
    pub id: String,
    pub alumnos_filename: String,
    pub notas_filename: String,
    pub timestamp: String,
    pub alumnos_exists: bool,
    pub notas_exists: bool,
}

impl From<&StoredExtract> for ExtractInfo {
    fn from(entry: &StoredExtract) -> Self {
        Self {
            id: entry.id.clone(),
            alumnos_filename: entry.roster_filename.clone(),
            notas_filename: entry.grades_filename.clone(),
            timestamp: entry.created_at.to_rfc3339(),
            alumnos_exists: entry.roster_path.exists(),
            notas_exists: entry.grades_path.exists(),
        }
    }
}

/// Relative download URL for one extract.
pub fn download_url(file_id: &str, kind: ExtractKind) -> String {
    format!("/download?file_id={}&file_type={}", file_id, kind.as_str())
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({ "error": error })
}

/// Error response with detail lines
pub fn detailed_error_response(error: &str, details: &[String]) -> Value {
    json!({
        "error": error,
        "detailedErrors": details,
    })
}
