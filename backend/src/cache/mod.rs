//! Extract Store - short-lived hand-off of generated CSV files
//!
//! Each successful upload writes its roster and grades extracts to disk
//! under a generated id. Entries expire after a TTL; expired entries are
//! swept on every insert and by the server's periodic sweeper.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{DEFAULT_EXTRACT_SUBDIR, DEFAULT_EXTRACT_TTL};
use crate::error::{StoreError, StoreResult};

/// Which of the two extracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractKind {
    /// Roster (`alumnos`).
    Roster,
    /// Grades (`notas`).
    Grades,
}

impl ExtractKind {
    /// Value used in download URLs and file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractKind::Roster => "alumnos",
            ExtractKind::Grades => "notas",
        }
    }
}

impl FromStr for ExtractKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "alumnos" | "roster" => Ok(ExtractKind::Roster),
            "notas" | "grades" => Ok(ExtractKind::Grades),
            other => Err(StoreError::InvalidKind(other.to_string())),
        }
    }
}

/// Download names for a pair of extracts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractNames {
    pub roster: String,
    pub grades: String,
}

impl ExtractNames {
    /// `Subir_Alumnos_<commission>_<activity>_<timestamp>.csv` and the
    /// matching `Subir_Notas_...` name.
    ///
    /// Path separators, quotes and control characters in the form values
    /// become `_`, so each name is a single path component.
    pub fn for_upload(commission: &str, activity: &str, at: NaiveDateTime) -> Self {
        let timestamp = at.format("%Y%m%d_%H%M%S");
        let commission = file_component(commission);
        let activity = file_component(activity);
        Self {
            roster: format!("Subir_Alumnos_{}_{}_{}.csv", commission, activity, timestamp),
            grades: format!("Subir_Notas_{}_{}_{}.csv", commission, activity, timestamp),
        }
    }
}

fn file_component(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '/' | '\\' | '"' | ':' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// A stored pair of extracts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredExtract {
    /// Unique identifier
    pub id: String,
    pub roster_filename: String,
    pub grades_filename: String,
    pub roster_path: PathBuf,
    pub grades_path: PathBuf,
    /// Insertion time; drives expiry
    pub created_at: DateTime<Utc>,
}

impl StoredExtract {
    pub fn path(&self, kind: ExtractKind) -> &Path {
        match kind {
            ExtractKind::Roster => &self.roster_path,
            ExtractKind::Grades => &self.grades_path,
        }
    }

    pub fn filename(&self, kind: ExtractKind) -> &str {
        match kind {
            ExtractKind::Roster => &self.roster_filename,
            ExtractKind::Grades => &self.grades_filename,
        }
    }
}

/// Directory-backed store with a time-to-live policy.
pub struct ExtractStore {
    /// Directory where extract files are written
    dir: PathBuf,
    ttl: Duration,
    /// Live entries (id -> entry)
    entries: HashMap<String, StoredExtract>,
}

impl ExtractStore {
    /// Store under the system temp dir with the default TTL.
    pub fn new() -> Self {
        Self::with_dir(std::env::temp_dir().join(DEFAULT_EXTRACT_SUBDIR), DEFAULT_EXTRACT_TTL)
    }

    /// Store under a custom directory and TTL.
    pub fn with_dir(dir: impl AsRef<Path>, ttl: Duration) -> Self {
        Self {
            dir: PathBuf::from(dir.as_ref()),
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Write both extracts and register them. Expired entries are swept first.
    pub fn insert(
        &mut self,
        roster_csv: &str,
        grades_csv: &str,
        names: ExtractNames,
    ) -> StoreResult<String> {
        self.insert_at(roster_csv, grades_csv, names, Utc::now())
    }

    /// [`insert`](Self::insert) with an explicit clock.
    pub fn insert_at(
        &mut self,
        roster_csv: &str,
        grades_csv: &str,
        names: ExtractNames,
        now: DateTime<Utc>,
    ) -> StoreResult<String> {
        self.sweep_at(now);
        fs::create_dir_all(&self.dir)?;

        let id = Uuid::new_v4().to_string();
        let roster_path = self.dir.join(format!("{}_{}.csv", id, ExtractKind::Roster.as_str()));
        let grades_path = self.dir.join(format!("{}_{}.csv", id, ExtractKind::Grades.as_str()));

        write_pair((roster_path.as_path(), roster_csv), (grades_path.as_path(), grades_csv))?;

        let stored = StoredExtract {
            id: id.clone(),
            roster_filename: names.roster,
            grades_filename: names.grades,
            roster_path,
            grades_path,
            created_at: now,
        };
        info!(
            id = %id,
            roster = %stored.roster_filename,
            grades = %stored.grades_filename,
            "extracts stored"
        );

        self.entries.insert(id.clone(), stored);
        debug!(entries = self.entries.len(), "store size");
        Ok(id)
    }

    /// Get an entry by id
    pub fn get(&self, id: &str) -> Option<&StoredExtract> {
        self.entries.get(id)
    }

    /// Download name and contents of one extract.
    pub fn read(&self, id: &str, kind: ExtractKind) -> StoreResult<(String, Vec<u8>)> {
        let entry = self
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let path = entry.path(kind);
        if !path.exists() {
            return Err(StoreError::MissingFile(path.display().to_string()));
        }
        let contents = fs::read(path)?;
        Ok((entry.filename(kind).to_string(), contents))
    }

    /// All live entries, oldest first.
    pub fn list(&self) -> Vec<&StoredExtract> {
        let mut entries: Vec<_> = self.entries.values().collect();
        entries.sort_by_key(|e| e.created_at);
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove expired entries. Returns how many were removed.
    pub fn sweep(&mut self) -> usize {
        self.sweep_at(Utc::now())
    }

    /// [`sweep`](Self::sweep) with an explicit clock.
    pub fn sweep_at(&mut self, now: DateTime<Utc>) -> usize {
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::MAX);
        let expired: Vec<String> = self
            .entries
            .values()
            .filter(|e| now.signed_duration_since(e.created_at) > ttl)
            .map(|e| e.id.clone())
            .collect();

        for id in &expired {
            if let Some(entry) = self.entries.remove(id) {
                for path in [&entry.roster_path, &entry.grades_path] {
                    if let Err(e) = fs::remove_file(path) {
                        warn!(
                            path = %path.display(),
                            error = %e,
                            "could not delete expired extract"
                        );
                    }
                }
            }
        }

        if !expired.is_empty() {
            info!(
                removed = expired.len(),
                remaining = self.entries.len(),
                "expired extracts swept"
            );
        }
        expired.len()
    }
}

/// Write both files, or neither: a failed second write removes the first.
fn write_pair(roster: (&Path, &str), grades: (&Path, &str)) -> StoreResult<()> {
    fs::write(roster.0, roster.1)?;
    if let Err(e) = fs::write(grades.0, grades.1) {
        if let Err(cleanup) = fs::remove_file(roster.0) {
            warn!(path = %roster.0.display(), error = %cleanup, "could not remove partial extract");
        }
        return Err(e.into());
    }
    Ok(())
}

impl Default for ExtractStore {
    fn default() -> Self {
        Self::new()
    }
}
