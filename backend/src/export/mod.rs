//! JSON export of the prepared table.
//!
//! The output is an array of row objects whose keys are the column names in
//! column order. Missing values stay the string `"N/A"`.

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::path::{Path, PathBuf};

use crate::api::logs::{log_error, log_info, log_success, log_warning};
use crate::error::ExportResult;
use crate::models::NutrientTable;
use crate::snapshot::{self, write_atomic};
use crate::validation::{validate_records, ValidationReport};

const INDENT: &[u8] = b"    ";

/// What an export wrote.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    pub path: PathBuf,
    pub rows: usize,
    pub columns: usize,
    pub validation: Option<ValidationReport>,
}

/// Serialize the table as pretty JSON with a 4-space indent.
pub fn to_json_string(table: &NutrientTable) -> ExportResult<String> {
    Ok(String::from_utf8_lossy(&to_json_bytes(table)?).into_owned())
}

fn to_json_bytes(table: &NutrientTable) -> ExportResult<Vec<u8>> {
    let mut buf = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(INDENT));
    table.records().serialize(&mut serializer)?;
    Ok(buf)
}

/// Write `table` to `path`, replacing any previous file atomically.
pub fn export_table(table: &NutrientTable, path: &Path) -> ExportResult<ExportSummary> {
    let bytes = to_json_bytes(table)?;
    write_atomic(path, &bytes)?;

    Ok(ExportSummary {
        path: path.to_path_buf(),
        rows: table.len(),
        columns: table.columns().len(),
        validation: None,
    })
}

/// Load the snapshot, export it to `output` and validate what was written.
pub fn export(snapshot_path: &Path, output: &Path) -> ExportResult<ExportSummary> {
    log_info(format!(
        "📖 Loading prepared data from {}...",
        snapshot_path.display()
    ));
    let table = snapshot::load_table(snapshot_path)?;
    log_success(format!("Loaded {} food items", table.len()));

    let mut summary = export_table(&table, output)?;
    log_success(format!("Data exported to {}", output.display()));

    log_info("✔️  Validating exported rows...");
    let records = serde_json::to_value(table.records())?;
    let records = records.as_array().map(Vec::as_slice).unwrap_or_default();
    match validate_records(records, &table.measure_columns()) {
        Ok(report) => {
            if report.is_valid() {
                log_success(format!("All {} rows valid", report.valid));
            } else {
                log_warning(format!("{} rows failed validation", report.invalid));
                for (row, errors) in report.errors.iter().take(3) {
                    log_error(format!("Row {}: {}", row, errors.join(", ")));
                }
            }
            summary.validation = Some(report);
        }
        Err(errors) => log_warning(format!("Validation skipped: {}", errors.join(", "))),
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FoodNutrientRow, Measure};
    use crate::snapshot::Snapshot;
    use serde_json::Value;
    use std::fs;
    use tempfile::tempdir;

    fn table() -> NutrientTable {
        NutrientTable::new(
            vec!["Calories".into()],
            vec![
                FoodNutrientRow {
                    food_id: 1,
                    food_name: "Apple, raw".into(),
                    measures: vec![
                        Measure::Value(52.0),
                        Measure::Value(0.52),
                        Measure::Value(14.7417),
                    ],
                },
                FoodNutrientRow {
                    food_id: 2,
                    food_name: "Water".into(),
                    measures: vec![Measure::NotAvailable; 3],
                },
            ],
        )
    }

    #[test]
    fn test_pretty_four_space_indent() {
        let json = to_json_string(&table()).unwrap();
        assert!(json.starts_with("[\n    {\n        \"food_id\": 1,\n        \"food_name\": \"Apple, raw\","));
        assert!(json.contains("\"Calories (per 100g)\": 52.0"));
    }

    #[test]
    fn test_export_keeps_not_available_string() {
        let json = to_json_string(&table()).unwrap();
        let rows: Vec<Value> = serde_json::from_str(&json).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["Calories (per ounce)"], 14.7417);
        assert_eq!(rows[1]["Calories (per gram)"], Value::String("N/A".into()));
    }

    #[test]
    fn test_column_order_in_file() {
        let json = to_json_string(&table()).unwrap();
        let first = &json[..json.find('}').unwrap()];

        let positions: Vec<usize> = table()
            .columns()
            .iter()
            .map(|c| first.find(&format!("\"{}\"", c)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_export_from_snapshot() {
        let dir = tempdir().unwrap();
        let snap = dir.path().join("prepared_food_data.json");
        let out = dir.path().join("food_data.json");
        snapshot::save(&Snapshot::from_table(&table(), &[]), &snap).unwrap();

        let summary = export(&snap, &out).unwrap();

        assert_eq!(summary.rows, 2);
        assert_eq!(summary.columns, 5);
        assert!(summary.validation.unwrap().is_valid());
        let written: Vec<Value> = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(written[0]["food_name"], "Apple, raw");
    }

    #[test]
    fn test_export_without_snapshot_writes_nothing() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("food_data.json");

        assert!(export(&dir.path().join("missing.json"), &out).is_err());
        assert!(!out.exists());
    }
}
