//! Typed readers for the three FoodData Central tables.
//!
//! | Table               | Required columns                   |
//! |---------------------|------------------------------------|
//! | `food.csv`          | `fdc_id`, `description`, `data_type` |
//! | `food_nutrient.csv` | `fdc_id`, `nutrient_id`, `amount`  |
//! | `nutrient.csv`      | `id`, `name`, `unit_name`          |

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use super::{parse_bytes_auto, CsvError, RawTable};
use crate::config::DataPaths;
use crate::error::{InputError, InputResult};
use crate::models::{Food, NutrientDefinition, NutrientLink, SourceTables};

pub const FOOD_TABLE: &str = "food";
pub const FOOD_NUTRIENT_TABLE: &str = "food_nutrient";
pub const NUTRIENT_TABLE: &str = "nutrient";

/// Load all three tables from the data directory.
///
/// Every file is checked for existence before any is read, so a missing
/// file is reported without parsing the (large) others first.
pub fn load_inputs(paths: &DataPaths) -> InputResult<SourceTables> {
    let files = [
        (FOOD_TABLE, paths.food_csv()),
        (FOOD_NUTRIENT_TABLE, paths.food_nutrient_csv()),
        (NUTRIENT_TABLE, paths.nutrient_csv()),
    ];

    for (table, path) in &files {
        if !path.is_file() {
            return Err(InputError::MissingInputFile {
                table: table.to_string(),
                path: path.clone(),
            });
        }
    }

    let [(_, food_path), (_, link_path), (_, nutrient_path)] = files;

    Ok(SourceTables {
        foods: read_foods(&read_raw(FOOD_TABLE, &food_path)?)?,
        links: read_links(&read_raw(FOOD_NUTRIENT_TABLE, &link_path)?)?,
        definitions: read_definitions(&read_raw(NUTRIENT_TABLE, &nutrient_path)?)?,
    })
}

/// Load only `food.csv` (enough for category counts).
pub fn load_foods(paths: &DataPaths) -> InputResult<Vec<Food>> {
    let path = paths.food_csv();
    if !path.is_file() {
        return Err(InputError::MissingInputFile {
            table: FOOD_TABLE.to_string(),
            path,
        });
    }
    read_foods(&read_raw(FOOD_TABLE, &path)?)
}

fn read_raw(table: &str, path: &Path) -> InputResult<RawTable> {
    let bytes = fs::read(path).map_err(|source| InputError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_bytes_auto(&bytes).map_err(|source| InputError::Malformed {
        table: table.to_string(),
        source,
    })
}

/// Read `food.csv` rows.
pub fn read_foods(raw: &RawTable) -> InputResult<Vec<Food>> {
    let id = require(raw, FOOD_TABLE, "fdc_id")?;
    let description = require(raw, FOOD_TABLE, "description")?;
    let category = require(raw, FOOD_TABLE, "data_type")?;

    raw.rows
        .iter()
        .map(|(line, record)| {
            Ok(Food {
                id: int_cell(FOOD_TABLE, *line, "fdc_id", record.get(id))?,
                description: record.get(description).unwrap_or("").to_string(),
                category: record.get(category).unwrap_or("").to_string(),
            })
        })
        .collect()
}

/// Read `food_nutrient.csv` rows.
pub fn read_links(raw: &RawTable) -> InputResult<Vec<NutrientLink>> {
    let food_id = require(raw, FOOD_NUTRIENT_TABLE, "fdc_id")?;
    let nutrient_id = require(raw, FOOD_NUTRIENT_TABLE, "nutrient_id")?;
    let amount = require(raw, FOOD_NUTRIENT_TABLE, "amount")?;

    raw.rows
        .iter()
        .map(|(line, record)| {
            Ok(NutrientLink {
                food_id: int_cell(FOOD_NUTRIENT_TABLE, *line, "fdc_id", record.get(food_id))?,
                nutrient_id: int_cell(
                    FOOD_NUTRIENT_TABLE,
                    *line,
                    "nutrient_id",
                    record.get(nutrient_id),
                )?,
                amount: record.get(amount).and_then(amount_cell),
            })
        })
        .collect()
}

/// Read `nutrient.csv` rows.
pub fn read_definitions(raw: &RawTable) -> InputResult<Vec<NutrientDefinition>> {
    let id = require(raw, NUTRIENT_TABLE, "id")?;
    let name = require(raw, NUTRIENT_TABLE, "name")?;
    let unit = require(raw, NUTRIENT_TABLE, "unit_name")?;

    raw.rows
        .iter()
        .map(|(line, record)| {
            Ok(NutrientDefinition {
                id: int_cell(NUTRIENT_TABLE, *line, "id", record.get(id))?,
                name: record.get(name).unwrap_or("").to_string(),
                unit: record.get(unit).unwrap_or("").to_string(),
            })
        })
        .collect()
}

/// Number of foods per `data_type`, most frequent first.
pub fn category_counts(foods: &[Food]) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for food in foods {
        *counts.entry(food.category.as_str()).or_default() += 1;
    }

    let mut counts: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(category, n)| (category.to_string(), n))
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

fn require(raw: &RawTable, table: &str, column: &str) -> InputResult<usize> {
    raw.position(column).ok_or_else(|| InputError::SchemaMismatch {
        table: table.to_string(),
        column: column.to_string(),
    })
}

fn int_cell(table: &str, line: usize, column: &str, cell: Option<&str>) -> InputResult<i64> {
    let cell = cell.unwrap_or("");
    cell.parse::<i64>().map_err(|_| InputError::Malformed {
        table: table.to_string(),
        source: CsvError::new(line, "expected an integer id")
            .with_column(column)
            .with_value(cell),
    })
}

/// Empty or non-numeric amounts are missing, not zero.
fn amount_cell(cell: &str) -> Option<f64> {
    cell.parse::<f64>().ok().filter(|v| v.is_finite())
}
