//! Snapshot store - persist the prepared table between runs.
//!
//! A snapshot is a columnar JSON document:
//!
//! ```json
//! {
//!   "format_version": 1,
//!   "id": "0b6c...",
//!   "created_at": "2024-04-18T09:12:44+00:00",
//!   "target_categories": ["foundation_food"],
//!   "columns": ["food_id", "food_name", "Calories (per 100g)", ...],
//!   "food_id": [1, 2],
//!   "food_name": ["Apple, raw", "Banana, raw"],
//!   "values": [[52.0, 89.0], ...]
//! }
//! ```
//!
//! `values[c][r]` is measurement column `c` (counted after the two identity
//! columns) for row `r`. Files are replaced atomically, so a failed prepare
//! never leaves a truncated snapshot behind.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{SnapshotError, SnapshotResult};
use crate::models::{
    Basis, FoodNutrientRow, Measure, NutrientTable, FOOD_ID_COLUMN, FOOD_NAME_COLUMN,
};

/// Current on-disk format.
pub const FORMAT_VERSION: u32 = 1;

/// A persisted nutrient table with metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub format_version: u32,
    /// Unique identifier of this build
    pub id: String,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
    /// Categories the table was built from
    pub target_categories: Vec<String>,
    /// All column names, identity columns first
    pub columns: Vec<String>,
    pub food_id: Vec<i64>,
    pub food_name: Vec<String>,
    /// One vector per measurement column
    pub values: Vec<Vec<Measure>>,
}

/// Metadata shown without the table body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotInfo {
    pub id: String,
    pub created_at: String,
    pub target_categories: Vec<String>,
    pub rows: usize,
    pub columns: usize,
}

impl Snapshot {
    /// Capture a table as a new snapshot.
    pub fn from_table(table: &NutrientTable, target_categories: &[String]) -> Self {
        let measure_columns = table.labels.len() * Basis::ALL.len();
        let values = (0..measure_columns)
            .map(|c| table.rows.iter().map(|row| row.measures[c]).collect())
            .collect();

        Self {
            format_version: FORMAT_VERSION,
            id: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            target_categories: target_categories.to_vec(),
            columns: table.columns(),
            food_id: table.rows.iter().map(|r| r.food_id).collect(),
            food_name: table.rows.iter().map(|r| r.food_name.clone()).collect(),
            values,
        }
    }

    pub fn info(&self) -> SnapshotInfo {
        SnapshotInfo {
            id: self.id.clone(),
            created_at: self.created_at.clone(),
            target_categories: self.target_categories.clone(),
            rows: self.food_id.len(),
            columns: self.columns.len(),
        }
    }

    /// Rebuild the row-oriented table, checking the columns are consistent.
    pub fn into_table(self) -> SnapshotResult<NutrientTable> {
        let labels = labels_from_columns(&self.columns)?;
        let rows = self.food_id.len();

        if self.food_name.len() != rows {
            return Err(SnapshotError::Corrupt(format!(
                "{} food ids but {} food names",
                rows,
                self.food_name.len()
            )));
        }
        if self.values.len() != labels.len() * Basis::ALL.len() {
            return Err(SnapshotError::Corrupt(format!(
                "{} measurement columns declared but {} value vectors stored",
                labels.len() * Basis::ALL.len(),
                self.values.len()
            )));
        }
        if let Some((c, column)) = self.values.iter().enumerate().find(|(_, v)| v.len() != rows) {
            return Err(SnapshotError::Corrupt(format!(
                "column '{}' has {} values for {} rows",
                self.columns[c + 2],
                column.len(),
                rows
            )));
        }

        let mut table_rows: Vec<FoodNutrientRow> = self
            .food_id
            .into_iter()
            .zip(self.food_name)
            .map(|(food_id, food_name)| FoodNutrientRow {
                food_id,
                food_name,
                measures: Vec::with_capacity(self.values.len()),
            })
            .collect();
        for column in &self.values {
            for (row, measure) in table_rows.iter_mut().zip(column) {
                row.measures.push(*measure);
            }
        }

        Ok(NutrientTable::new(labels, table_rows))
    }
}

/// Recover nutrient labels from a full column list.
///
/// Expects `food_id`, `food_name`, then one `(per 100g)`, `(per gram)`,
/// `(per ounce)` triple per label.
pub fn labels_from_columns(columns: &[String]) -> SnapshotResult<Vec<String>> {
    match columns {
        [id, name, ..] if id == FOOD_ID_COLUMN && name == FOOD_NAME_COLUMN => {}
        _ => {
            return Err(SnapshotError::Corrupt(format!(
                "columns must start with '{}' and '{}'",
                FOOD_ID_COLUMN, FOOD_NAME_COLUMN
            )))
        }
    }

    let measures = &columns[2..];
    if measures.len() % Basis::ALL.len() != 0 {
        return Err(SnapshotError::Corrupt(format!(
            "{} measurement columns is not a multiple of {}",
            measures.len(),
            Basis::ALL.len()
        )));
    }

    measures
        .chunks(Basis::ALL.len())
        .map(|triple| {
            let mut label: Option<&str> = None;
            for (column, expected) in triple.iter().zip(Basis::ALL) {
                match Basis::parse_column(column) {
                    Some((l, basis)) if basis == expected && label.map_or(true, |x| x == l) => {
                        label = Some(l);
                    }
                    _ => {
                        return Err(SnapshotError::Corrupt(format!(
                            "unexpected column '{}' (expected a '{}' column)",
                            column,
                            expected.suffix()
                        )))
                    }
                }
            }
            Ok(label.unwrap_or_default().to_string())
        })
        .collect()
}

/// Write `bytes` to `path` through a temporary sibling file.
///
/// The destination is only replaced once the whole content is on disk.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp = temp_sibling(path);
    let result = fs::File::create(&tmp)
        .and_then(|mut file| {
            file.write_all(bytes)?;
            file.sync_all()
        })
        .and_then(|_| fs::rename(&tmp, path));

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("snapshot");
    path.with_file_name(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4().simple()))
}

/// Persist a snapshot.
pub fn save(snapshot: &Snapshot, path: &Path) -> SnapshotResult<()> {
    let content = serde_json::to_vec(snapshot)?;
    write_atomic(path, &content)?;
    Ok(())
}

/// Read a snapshot, rejecting other format versions.
pub fn load(path: &Path) -> SnapshotResult<Snapshot> {
    if !path.is_file() {
        return Err(SnapshotError::NotFound(path.to_path_buf()));
    }

    let content = fs::read(path)?;

    // Version first, so an old layout reports a version error rather than a field error
    #[derive(Deserialize)]
    struct Header {
        format_version: u32,
    }
    let header: Header = serde_json::from_slice(&content)?;
    if header.format_version != FORMAT_VERSION {
        return Err(SnapshotError::UnsupportedVersion {
            found: header.format_version,
            expected: FORMAT_VERSION,
        });
    }

    Ok(serde_json::from_slice(&content)?)
}

/// Read a snapshot straight into a table.
pub fn load_table(path: &Path) -> SnapshotResult<NutrientTable> {
    load(path)?.into_table()
}
