//! Application configuration.
//!
//! The academic schema and validation bounds are fixed constants. Server
//! settings come from the environment (a `.env` file is loaded by the
//! binary) and fall back to the defaults below.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Columns every spreadsheet must carry, in this order.
pub const REQUIRED_COLUMNS: [&str; 9] = [
    "Legajo",
    "Nota",
    "Promocionado",
    "Apellido",
    "Nombre",
    "DNI",
    "Edicion",
    "Fecha de inicio",
    "Facultad regional",
];

pub const FACULTY_COLUMN: &str = "Facultad regional";
pub const GRADE_COLUMN: &str = "Nota";
pub const DOCUMENT_COLUMN: &str = "DNI";
pub const DATE_COLUMN: &str = "Fecha de inicio";

/// Free-text columns that must not be blank.
pub const REQUIRED_TEXT_COLUMNS: [&str; 2] = ["Apellido", "Nombre"];

/// Faculties whose rows are kept, compared trimmed and lower-cased.
pub const FACULTY_FILTER: [&str; 2] = ["frba", "utn frba"];

pub const MIN_GRADE: f64 = 1.0;
pub const MAX_GRADE: f64 = 10.0;

/// Grade values accepted without a numeric check (lower-cased).
pub const SPECIAL_GRADES: [&str; 6] = [
    "-",
    "ausente",
    "equivalencia",
    "equivalente",
    "aprobado",
    "desaprobado",
];

/// Document numbers shorter than this are rejected.
pub const MIN_DOCUMENT_DIGITS: usize = 7;

/// Accepted upload extensions (lower-cased, with dot).
pub const ALLOWED_EXTENSIONS: [&str; 2] = [".xlsx", ".xls"];

/// 16 MB upload limit.
pub const MAX_FILE_SIZE: usize = 16 * 1024 * 1024;

/// Stored extracts live for one hour.
pub const DEFAULT_EXTRACT_TTL: Duration = Duration::from_secs(3600);

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

pub const DEFAULT_PORT: u16 = 5000;

/// Subdirectory of the system temp dir holding generated extracts.
pub const DEFAULT_EXTRACT_SUBDIR: &str = "gradesheet-extracts";

/// Server settings resolved from the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub max_file_size: usize,
    pub extract_ttl: Duration,
    pub sweep_interval: Duration,
    pub extract_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            max_file_size: MAX_FILE_SIZE,
            extract_ttl: DEFAULT_EXTRACT_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            extract_dir: env::temp_dir().join(DEFAULT_EXTRACT_SUBDIR),
        }
    }
}

impl ServerConfig {
    /// Read `PORT`, `MAX_FILE_SIZE_MB`, `EXTRACT_TTL_SECS`,
    /// `SWEEP_INTERVAL_SECS` and `EXTRACT_DIR`. Unset or unparsable values
    /// keep their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: parse_var("PORT").unwrap_or(defaults.port),
            max_file_size: parse_var::<usize>("MAX_FILE_SIZE_MB")
                .and_then(megabytes)
                .unwrap_or(defaults.max_file_size),
            extract_ttl: parse_var("EXTRACT_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.extract_ttl),
            sweep_interval: parse_var("SWEEP_INTERVAL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.sweep_interval),
            extract_dir: env::var("EXTRACT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.extract_dir),
        }
    }

    /// Override the port (CLI flag wins over the environment).
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

/// Byte count for a size in MiB; `None` when it does not fit in `usize`.
fn megabytes(mb: usize) -> Option<usize> {
    mb.checked_mul(1024 * 1024)
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
