//! High-level prepare step: load, build, persist.
//!
//! # Example
//!
//! ```rust,ignore
//! use nutritab::config::{BuildConfig, DataPaths};
//! use nutritab::transform::pipeline::prepare;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let result = prepare(&DataPaths::from_env(), &BuildConfig::default())?;
//!     println!("Prepared {} foods", result.table.len());
//!     Ok(())
//! }
//! ```

use serde::Serialize;
use std::path::{Path, PathBuf};

use super::builder::{build, Build, BuildReport};
use crate::api::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::config::{BuildConfig, DataPaths};
use crate::error::{PipelineError, PipelineResult};
use crate::models::{NutrientTable, SourceTables};
use crate::parser::{category_counts, load_inputs};
use crate::snapshot::{self, Snapshot, SnapshotInfo};

/// Result of a complete prepare run
#[derive(Debug, Clone)]
pub struct PrepareResult {
    /// The table that was persisted
    pub table: NutrientTable,
    /// Stage counts and warnings
    pub report: BuildReport,
    /// Metadata of the written snapshot
    pub snapshot: SnapshotInfo,
    /// Where the snapshot was written
    pub snapshot_path: PathBuf,
}

/// Summary sent to API clients and printed by the CLI.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareSummary {
    pub snapshot_id: String,
    pub created_at: String,
    pub foods: usize,
    pub nutrients: usize,
    pub used_fallback: bool,
    pub warnings: Vec<String>,
}

impl PrepareResult {
    pub fn summary(&self) -> PrepareSummary {
        PrepareSummary {
            snapshot_id: self.snapshot.id.clone(),
            created_at: self.snapshot.created_at.clone(),
            foods: self.table.len(),
            nutrients: self.table.labels.len(),
            used_fallback: self.report.used_fallback,
            warnings: self.report.warnings.iter().map(|w| w.to_string()).collect(),
        }
    }
}

/// Load the raw tables from `paths.data_dir`, build the table and persist it
/// to `paths.snapshot`.
///
/// Nothing is written when any step fails.
pub fn prepare(paths: &DataPaths, config: &BuildConfig) -> PipelineResult<PrepareResult> {
    log_info(format!(
        "📖 Loading FoodData Central tables from {}...",
        paths.data_dir.display()
    ));
    let tables = load_inputs(paths)?;
    log_success(format!("Loaded food data: {} rows", tables.foods.len()));
    log_success(format!("Loaded food nutrient data: {} rows", tables.links.len()));
    log_success(format!("Loaded nutrient data: {} rows", tables.definitions.len()));

    prepare_tables(&tables, config, &paths.snapshot)
}

/// Build from already-loaded tables and persist to `snapshot_path`.
pub fn prepare_tables(
    tables: &SourceTables,
    config: &BuildConfig,
    snapshot_path: &Path,
) -> PipelineResult<PrepareResult> {
    log_info("📋 Food categories:");
    for (category, count) in category_counts(&tables.foods) {
        log_info_indent(format!("{}: {}", category, count), 1);
    }

    let Build { table, report } = build_table(tables, config)?;

    if table.labels.is_empty() {
        return Err(PipelineError::EmptyTable {
            categories: config.target_categories.clone(),
        });
    }

    log_info(format!("💾 Saving snapshot to {}...", snapshot_path.display()));
    let snapshot = Snapshot::from_table(&table, &config.target_categories);
    snapshot::save(&snapshot, snapshot_path)?;
    log_success(format!(
        "Prepared data saved: {} foods, {} columns",
        table.len(),
        table.columns().len()
    ));

    Ok(PrepareResult {
        table,
        report,
        snapshot: snapshot.info(),
        snapshot_path: snapshot_path.to_path_buf(),
    })
}

/// Run the builder and log each stage.
pub fn build_table(tables: &SourceTables, config: &BuildConfig) -> PipelineResult<Build> {
    log_info(format!(
        "🔄 Building nutrient table for: {}",
        config.target_categories.join(", ")
    ));
    let result = build(tables, config)?;
    let stats = &result.report.stats;

    log_success(format!("Filtered food data: {} rows", stats.filtered_foods));
    log_success(format!("Merged with food data: {} rows", stats.joined_with_foods));
    log_success(format!("Merged with nutrient data: {} rows", stats.joined_with_nutrients));
    log_success(format!("Selected nutrients: {} rows", stats.selected_rows));
    log_success(format!(
        "Pivoted: {} foods x {} nutrients",
        stats.pivoted_foods, stats.nutrient_columns
    ));

    for warning in &result.report.warnings {
        log_warning(warning.to_string());
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuildError;
    use crate::models::{Food, NutrientDefinition, NutrientLink};
    use std::fs;
    use tempfile::tempdir;

    fn tables() -> SourceTables {
        SourceTables {
            foods: vec![
                Food {
                    id: 1,
                    description: "Apple, raw".into(),
                    category: "foundation_food".into(),
                },
                Food {
                    id: 2,
                    description: "Cola".into(),
                    category: "branded_food".into(),
                },
            ],
            links: vec![
                NutrientLink {
                    food_id: 1,
                    nutrient_id: 1008,
                    amount: Some(52.0),
                },
                NutrientLink {
                    food_id: 2,
                    nutrient_id: 1008,
                    amount: Some(42.0),
                },
            ],
            definitions: vec![NutrientDefinition {
                id: 1008,
                name: "Energy".into(),
                unit: "KCAL".into(),
            }],
        }
    }

    #[test]
    fn test_prepare_tables_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prepared_food_data.json");

        let result = prepare_tables(&tables(), &BuildConfig::default(), &path).unwrap();

        assert_eq!(result.table.len(), 1);
        assert_eq!(result.summary().nutrients, 1);
        assert_eq!(snapshot::load_table(&path).unwrap(), result.table);
    }

    #[test]
    fn test_no_matching_foods_writes_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prepared_food_data.json");
        let config = BuildConfig::default().with_categories(["survey_fndds_food"]);

        let err = prepare_tables(&tables(), &config, &path).unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Build(BuildError::NoMatchingFoods { .. })
        ));
        assert!(!path.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_empty_table_not_persisted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prepared_food_data.json");
        let mut tables = tables();
        tables.links.clear();

        let err = prepare_tables(&tables, &BuildConfig::default(), &path).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyTable { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_prepare_missing_inputs() {
        let dir = tempdir().unwrap();
        let paths = DataPaths::default().with_overrides(
            Some(dir.path().to_path_buf()),
            Some(dir.path().join("snap.json")),
            None,
        );

        let err = prepare(&paths, &BuildConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Input(_)));
        assert!(!dir.path().join("snap.json").exists());
    }
}
