//! Nutrient table builder: join, filter, pivot and derive.
//!
//! Turns the three normalized FoodData Central tables into one row per food
//! with three unit-converted columns per nutrient.
//!
//! # Stages
//!
//! ```text
//! foods ──filter(category)──┐
//!                           ├─join(fdc_id)──┐
//! links ────────────────────┘               ├─join(nutrient_id)──▶ long rows
//! definitions ──────────────────────────────┘
//!
//! long rows ──allow-list (or fallback)──▶ pivot ──▶ labels + units ──▶ NutrientTable
//! ```
//!
//! Every stage is a pure function; [`build`] chains them and collects the
//! non-fatal anomalies into a [`BuildReport`].

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use super::labels::display_label;
use super::units::derive;
use crate::config::BuildConfig;
use crate::error::{BuildError, BuildResult};
use crate::models::{
    Food, FoodNutrientRow, NutrientDefinition, NutrientLink, NutrientTable, SourceTables,
};

/// A non-fatal anomaly found while building.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BuildWarning {
    /// Allow-listed names that never occur in the joined data.
    MissingAllowlistNutrients { names: Vec<String> },

    /// The allow-list matched nothing; every present nutrient was kept instead.
    EmptyAllowlistFilter { fallback_nutrients: usize },

    /// Two nutrient names reduce to the same display label; the later one is dropped.
    DuplicateLabel {
        nutrient: String,
        label: String,
        kept: String,
    },
}

impl std::fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildWarning::MissingAllowlistNutrients { names } => write!(
                f,
                "Selected nutrients not found in the data (check spelling/existence): {}",
                names.join(", ")
            ),
            BuildWarning::EmptyAllowlistFilter { fallback_nutrients } => write!(
                f,
                "Filtering for selected nutrients left no rows; kept all {} available nutrients",
                fallback_nutrients
            ),
            BuildWarning::DuplicateLabel { nutrient, label, kept } => write!(
                f,
                "Nutrient '{}' maps to label '{}' already used by '{}'; skipped",
                nutrient, label, kept
            ),
        }
    }
}

/// Row counts after each stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BuildStats {
    pub filtered_foods: usize,
    pub joined_with_foods: usize,
    pub joined_with_nutrients: usize,
    pub selected_rows: usize,
    pub pivoted_foods: usize,
    pub nutrient_columns: usize,
}

/// What happened during a build, besides the table itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BuildReport {
    pub stats: BuildStats,
    pub warnings: Vec<BuildWarning>,
    /// Whether the allow-list fallback ran
    pub used_fallback: bool,
}

/// Result of a successful build.
#[derive(Debug, Clone)]
pub struct Build {
    pub table: NutrientTable,
    pub report: BuildReport,
}

/// One (food, nutrient) pair after both joins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LongRow<'a> {
    pub food_id: i64,
    pub food_name: &'a str,
    pub nutrient: &'a str,
    pub unit: &'a str,
    pub amount: Option<f64>,
}

/// Long rows retained for pivoting and the nutrient order to lay them out in.
#[derive(Debug, Clone)]
pub struct Selection<'a> {
    pub rows: Vec<LongRow<'a>>,
    /// `None` after the fallback: the order comes from the pivot itself
    pub nutrients: Option<Vec<&'a str>>,
}

/// One food after pivoting.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotRow<'a> {
    pub food_id: i64,
    pub food_name: &'a str,
    pub amounts: HashMap<&'a str, f64>,
}

/// Wide table: one row per food (ordered by id), plus the columns that hold data.
#[derive(Debug, Clone, Default)]
pub struct Pivot<'a> {
    pub rows: Vec<PivotRow<'a>>,
    pub columns: BTreeSet<&'a str>,
}

/// Build the per-food nutrient table.
///
/// Fails only with [`BuildError::NoMatchingFoods`]; everything else degrades
/// and is recorded in the report.
pub fn build(tables: &SourceTables, config: &BuildConfig) -> BuildResult<Build> {
    let mut report = BuildReport::default();

    let foods = filter_foods(&tables.foods, &config.target_categories)?;
    report.stats.filtered_foods = foods.len();

    let with_foods = join_foods(&tables.links, &foods);
    report.stats.joined_with_foods = with_foods.len();

    let long = join_definitions(&with_foods, &tables.definitions);
    report.stats.joined_with_nutrients = long.len();

    let missing = missing_allowlist(&long, &config.nutrient_allowlist);
    if !missing.is_empty() {
        report
            .warnings
            .push(BuildWarning::MissingAllowlistNutrients { names: missing });
    }

    let selection = select_nutrients(long, &config.nutrient_allowlist);
    report.stats.selected_rows = selection.rows.len();

    let pivot = pivot(&selection.rows);
    report.stats.pivoted_foods = pivot.rows.len();

    let nutrients: Vec<&str> = match selection.nutrients {
        Some(nutrients) => nutrients,
        None => {
            report.used_fallback = true;
            report.warnings.push(BuildWarning::EmptyAllowlistFilter {
                fallback_nutrients: pivot.columns.len(),
            });
            pivot.columns.iter().copied().collect()
        }
    };

    let (table, label_warnings) = assemble(&pivot, &nutrients, config);
    report.stats.nutrient_columns = table.labels.len();
    report.warnings.extend(label_warnings);

    Ok(Build { table, report })
}

/// Keep foods whose category is a target; the first row wins for a repeated id.
pub fn filter_foods<'a>(foods: &'a [Food], categories: &[String]) -> BuildResult<Vec<&'a Food>> {
    let mut seen = HashSet::new();
    let filtered: Vec<&Food> = foods
        .iter()
        .filter(|f| categories.iter().any(|c| *c == f.category))
        .filter(|f| seen.insert(f.id))
        .collect();

    if filtered.is_empty() {
        return Err(BuildError::NoMatchingFoods {
            categories: categories.to_vec(),
        });
    }
    Ok(filtered)
}

/// Inner join of links with the retained foods on food id, in link order.
pub fn join_foods<'a>(
    links: &'a [NutrientLink],
    foods: &[&'a Food],
) -> Vec<(&'a Food, &'a NutrientLink)> {
    let by_id: HashMap<i64, &'a Food> = foods.iter().map(|f| (f.id, *f)).collect();
    links
        .iter()
        .filter_map(|link| by_id.get(&link.food_id).map(|food| (*food, link)))
        .collect()
}

/// Inner join with nutrient definitions on nutrient id.
pub fn join_definitions<'a>(
    joined: &[(&'a Food, &'a NutrientLink)],
    definitions: &'a [NutrientDefinition],
) -> Vec<LongRow<'a>> {
    let mut by_id: HashMap<i64, &'a NutrientDefinition> = HashMap::new();
    for def in definitions {
        by_id.entry(def.id).or_insert(def);
    }

    joined
        .iter()
        .filter_map(|(food, link)| {
            by_id.get(&link.nutrient_id).map(|def| LongRow {
                food_id: food.id,
                food_name: food.description.as_str(),
                nutrient: def.name.as_str(),
                unit: def.unit.as_str(),
                amount: link.amount,
            })
        })
        .collect()
}

/// Allow-list names absent from the joined rows, in allow-list order.
pub fn missing_allowlist(rows: &[LongRow<'_>], allowlist: &[String]) -> Vec<String> {
    let present: HashSet<&str> = rows.iter().map(|r| r.nutrient).collect();
    allowlist
        .iter()
        .filter(|name| !present.contains(name.as_str()))
        .cloned()
        .collect()
}

/// Keep allow-listed nutrients.
///
/// When that keeps nothing, every row is kept and the nutrient order is left
/// to the pivot (the fallback branch).
pub fn select_nutrients<'a>(rows: Vec<LongRow<'a>>, allowlist: &'a [String]) -> Selection<'a> {
    let allowed: HashSet<&str> = allowlist.iter().map(String::as_str).collect();
    let selected: Vec<LongRow<'a>> = rows
        .iter()
        .filter(|r| allowed.contains(r.nutrient))
        .copied()
        .collect();

    if selected.is_empty() {
        return Selection { rows, nutrients: None };
    }

    Selection {
        rows: selected,
        nutrients: Some(allowlist.iter().map(String::as_str).collect()),
    }
}

/// Long to wide; the first non-missing amount of a (food, nutrient) pair wins.
///
/// A nutrient becomes a column only if at least one food has a value for it,
/// and a food becomes a row only if it has at least one value. Rows are
/// ordered by id.
pub fn pivot<'a>(rows: &[LongRow<'a>]) -> Pivot<'a> {
    let mut wide: BTreeMap<i64, PivotRow<'a>> = BTreeMap::new();
    let mut columns = BTreeSet::new();

    for row in rows {
        let entry = wide.entry(row.food_id).or_insert_with(|| PivotRow {
            food_id: row.food_id,
            food_name: row.food_name,
            amounts: HashMap::new(),
        });
        if let Some(amount) = row.amount {
            entry.amounts.entry(row.nutrient).or_insert(amount);
            columns.insert(row.nutrient);
        }
    }

    Pivot {
        rows: wide
            .into_values()
            .filter(|row| !row.amounts.is_empty())
            .collect(),
        columns,
    }
}

/// Derive labels and unit columns, then fill gaps with the "not available" marker.
pub fn assemble(
    pivot: &Pivot<'_>,
    nutrients: &[&str],
    config: &BuildConfig,
) -> (NutrientTable, Vec<BuildWarning>) {
    let mut warnings = Vec::new();
    let mut labels: Vec<String> = Vec::new();
    let mut sources: Vec<&str> = Vec::new();

    for nutrient in nutrients {
        if !pivot.columns.contains(nutrient) {
            continue;
        }
        let label = display_label(nutrient, config);
        if let Some(i) = labels.iter().position(|l| *l == label) {
            warnings.push(BuildWarning::DuplicateLabel {
                nutrient: nutrient.to_string(),
                label,
                kept: sources[i].to_string(),
            });
            continue;
        }
        labels.push(label);
        sources.push(nutrient);
    }

    let rows = pivot
        .rows
        .iter()
        .map(|row| FoodNutrientRow {
            food_id: row.food_id,
            food_name: row.food_name.to_string(),
            measures: sources
                .iter()
                .flat_map(|nutrient| {
                    derive(row.amounts.get(nutrient).copied(), config.grams_per_ounce)
                })
                .collect(),
        })
        .collect();

    (NutrientTable::new(labels, rows), warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Basis, Measure};

    fn food(id: i64, description: &str, category: &str) -> Food {
        Food {
            id,
            description: description.into(),
            category: category.into(),
        }
    }

    fn link(food_id: i64, nutrient_id: i64, amount: f64) -> NutrientLink {
        NutrientLink {
            food_id,
            nutrient_id,
            amount: Some(amount),
        }
    }

    fn def(id: i64, name: &str, unit: &str) -> NutrientDefinition {
        NutrientDefinition {
            id,
            name: name.into(),
            unit: unit.into(),
        }
    }

    fn config(allowlist: &[&str]) -> BuildConfig {
        BuildConfig {
            nutrient_allowlist: allowlist.iter().map(|s| s.to_string()).collect(),
            ..BuildConfig::default()
        }
    }

    fn sample() -> SourceTables {
        SourceTables {
            foods: vec![
                food(1, "Apple, raw", "foundation_food"),
                food(2, "Banana, raw", "foundation_food"),
                food(3, "Cola, branded", "branded_food"),
            ],
            links: vec![
                link(1, 1008, 52.0),
                link(1, 1003, 0.26),
                link(2, 1008, 89.0),
                link(3, 1008, 42.0),
                link(99, 1008, 10.0),
                link(1, 4242, 1.0),
            ],
            definitions: vec![def(1008, "Energy", "KCAL"), def(1003, "Protein", "G")],
        }
    }

    fn value(table: &NutrientTable, food_id: i64, label: &str, basis: Basis) -> Measure {
        let row = table.get(food_id).unwrap();
        table.measure(row, label, basis).unwrap()
    }

    #[test]
    fn test_apple_example() {
        let tables = SourceTables {
            foods: vec![food(1, "Apple, raw", "foundation_food")],
            links: vec![link(1, 10, 52.0)],
            definitions: vec![def(10, "Energy", "KCAL")],
        };
        let build = build(&tables, &config(&["Energy"])).unwrap();
        let json = serde_json::to_value(build.table.records()).unwrap();

        assert_eq!(json[0]["food_id"], 1);
        assert_eq!(json[0]["food_name"], "Apple, raw");
        assert_eq!(json[0]["Calories (per 100g)"], 52.0);
        assert_eq!(json[0]["Calories (per gram)"], 0.52);
        let per_ounce = json[0]["Calories (per ounce)"].as_f64().unwrap();
        assert!((per_ounce - 14.7417).abs() < 1e-9);
    }

    #[test]
    fn test_one_row_per_food() {
        let mut tables = sample();
        tables.links.push(link(1, 1008, 60.0));
        tables.foods.push(food(1, "Apple, duplicate", "foundation_food"));

        let build = build(&tables, &config(&["Energy", "Protein"])).unwrap();
        let ids: Vec<i64> = build.table.rows.iter().map(|r| r.food_id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(build.table.rows[0].food_name, "Apple, raw");
    }

    #[test]
    fn test_first_amount_wins() {
        let mut tables = sample();
        tables.links.push(link(1, 1008, 60.0));

        let build = build(&tables, &config(&["Energy"])).unwrap();
        assert_eq!(
            value(&build.table, 1, "Calories", Basis::Per100g),
            Measure::Value(52.0)
        );
    }

    #[test]
    fn test_missing_amount_skipped_by_first() {
        let mut tables = sample();
        tables.links.insert(
            0,
            NutrientLink {
                food_id: 2,
                nutrient_id: 1003,
                amount: None,
            },
        );
        tables.links.push(link(2, 1003, 1.09));

        let build = build(&tables, &config(&["Protein"])).unwrap();
        assert_eq!(
            value(&build.table, 2, "Protein", Basis::Per100g),
            Measure::Value(1.09)
        );
    }

    #[test]
    fn test_missing_nutrient_is_not_available() {
        let build = build(&sample(), &config(&["Energy", "Protein"])).unwrap();
        for basis in Basis::ALL {
            assert_eq!(value(&build.table, 2, "Protein", basis), Measure::NotAvailable);
        }
        let json = serde_json::to_value(build.table.records()).unwrap();
        assert_eq!(json[1]["Protein (per gram)"], "N/A");
    }

    #[test]
    fn test_no_matching_foods() {
        let mut cfg = config(&["Energy"]);
        cfg.target_categories = vec!["survey_fndds_food".into()];

        match build(&sample(), &cfg).unwrap_err() {
            BuildError::NoMatchingFoods { categories } => {
                assert_eq!(categories, vec!["survey_fndds_food"]);
            }
        }
    }

    #[test]
    fn test_column_order_follows_allowlist() {
        let build = build(&sample(), &config(&["Protein", "Vitamin K (phylloquinone)", "Energy"]))
            .unwrap();
        assert_eq!(build.table.labels, vec!["Protein", "Calories"]);
        assert_eq!(
            build.table.columns()[2..5],
            ["Protein (per 100g)", "Protein (per gram)", "Protein (per ounce)"]
        );
    }

    #[test]
    fn test_missing_allowlist_names_warn() {
        let build = build(&sample(), &config(&["Energy", "Vitamin K (phylloquinone)"])).unwrap();
        assert!(build.report.warnings.contains(&BuildWarning::MissingAllowlistNutrients {
            names: vec!["Vitamin K (phylloquinone)".into()],
        }));
        assert!(!build.report.used_fallback);
    }

    #[test]
    fn test_fallback_when_allowlist_matches_nothing() {
        let build = build(&sample(), &config(&["Caffeine"])).unwrap();

        assert!(build.report.used_fallback);
        assert!(build
            .report
            .warnings
            .contains(&BuildWarning::EmptyAllowlistFilter { fallback_nutrients: 2 }));
        // Sorted by canonical name, then relabelled
        assert_eq!(build.table.labels, vec!["Calories", "Protein"]);
        assert!(!build.table.is_empty());
    }

    #[test]
    fn test_unknown_ids_dropped() {
        let build = build(&sample(), &config(&["Energy", "Protein"])).unwrap();
        assert_eq!(build.report.stats.filtered_foods, 2);
        // link to food 99 and to food 3 (branded) are dropped
        assert_eq!(build.report.stats.joined_with_foods, 4);
        // link to nutrient 4242 has no definition
        assert_eq!(build.report.stats.joined_with_nutrients, 3);
        assert_eq!(build.report.stats.pivoted_foods, 2);
    }

    #[test]
    fn test_duplicate_labels_keep_first() {
        let tables = SourceTables {
            foods: vec![food(1, "Oats", "foundation_food")],
            links: vec![link(1, 1, 10.0), link(1, 2, 20.0)],
            definitions: vec![def(1, "Sugars, total", "G"), def(2, "Sugars", "G")],
        };
        let build = build(&tables, &config(&["Sugars, total", "Sugars"])).unwrap();

        assert_eq!(build.table.labels, vec!["Sugars"]);
        assert_eq!(
            value(&build.table, 1, "Sugars", Basis::Per100g),
            Measure::Value(10.0)
        );
        assert!(matches!(
            build.report.warnings.last(),
            Some(BuildWarning::DuplicateLabel { .. })
        ));
    }

    #[test]
    fn test_nutrient_without_values_has_no_columns() {
        let mut tables = sample();
        tables.definitions.push(def(1004, "Total lipid (fat)", "G"));
        tables.links.push(NutrientLink {
            food_id: 1,
            nutrient_id: 1004,
            amount: None,
        });

        let build = build(&tables, &config(&["Energy", "Total lipid (fat)"])).unwrap();
        assert_eq!(build.table.labels, vec!["Calories"]);
    }

    #[test]
    fn test_food_without_values_has_no_row() {
        let tables = SourceTables {
            foods: vec![
                food(1, "Apple, raw", "foundation_food"),
                food(2, "Tap water", "foundation_food"),
            ],
            links: vec![
                link(1, 1008, 52.0),
                NutrientLink {
                    food_id: 2,
                    nutrient_id: 1008,
                    amount: None,
                },
            ],
            definitions: vec![def(1008, "Energy", "KCAL")],
        };
        let build = build(&tables, &config(&["Energy"])).unwrap();

        let ids: Vec<i64> = build.table.rows.iter().map(|r| r.food_id).collect();
        assert_eq!(ids, vec![1]);
        assert!(build.table.get(2).is_none());
        assert_eq!(build.report.stats.pivoted_foods, 1);
    }
}
