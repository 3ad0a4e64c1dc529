//! Domain models for the nutrient table pipeline.
//!
//! Raw inputs (one struct per FoodData Central table):
//!
//! - [`Food`] - a food with its description and `data_type` category
//! - [`NutrientLink`] - amount of one nutrient in 100 g of one food
//! - [`NutrientDefinition`] - nutrient name and unit
//!
//! Output:
//!
//! - [`NutrientTable`] - one [`FoodNutrientRow`] per food, three [`Measure`]s per nutrient
//! - [`Basis`] - the three reporting bases (per 100 g, per gram, per ounce)

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Marker written wherever a food has no value for a nutrient.
pub const NOT_AVAILABLE: &str = "N/A";

/// Identity column holding the FDC id.
pub const FOOD_ID_COLUMN: &str = "food_id";

/// Identity column holding the food description.
pub const FOOD_NAME_COLUMN: &str = "food_name";

// =============================================================================
// Raw tables
// =============================================================================

/// A row of `food.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Food {
    pub id: i64,
    pub description: String,
    /// FDC `data_type` (e.g. `foundation_food`, `sr_legacy_food`)
    pub category: String,
}

/// A row of `food_nutrient.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutrientLink {
    pub food_id: i64,
    pub nutrient_id: i64,
    /// Amount per 100 g; `None` when the cell is empty
    pub amount: Option<f64>,
}

/// A row of `nutrient.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutrientDefinition {
    pub id: i64,
    pub name: String,
    pub unit: String,
}

/// The three raw tables, fully loaded.
#[derive(Debug, Clone, Default)]
pub struct SourceTables {
    pub foods: Vec<Food>,
    pub links: Vec<NutrientLink>,
    pub definitions: Vec<NutrientDefinition>,
}

// =============================================================================
// Reporting basis
// =============================================================================

/// Quantity of food a measurement refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Basis {
    Per100g,
    PerGram,
    PerOunce,
}

impl Basis {
    /// All bases in column order.
    pub const ALL: [Basis; 3] = [Basis::Per100g, Basis::PerGram, Basis::PerOunce];

    /// Text used inside the column name parentheses.
    pub fn suffix(&self) -> &'static str {
        match self {
            Basis::Per100g => "per 100g",
            Basis::PerGram => "per gram",
            Basis::PerOunce => "per ounce",
        }
    }

    /// Parse from the column name suffix.
    pub fn from_suffix(s: &str) -> Option<Self> {
        match s {
            "per 100g" => Some(Basis::Per100g),
            "per gram" => Some(Basis::PerGram),
            "per ounce" => Some(Basis::PerOunce),
            _ => None,
        }
    }

    /// Column name for a nutrient label on this basis, e.g. `Calories (per gram)`.
    pub fn column_name(&self, label: &str) -> String {
        format!("{} ({})", label, self.suffix())
    }

    /// Split a measurement column name back into its label and basis.
    pub fn parse_column(column: &str) -> Option<(&str, Basis)> {
        let caps = COLUMN_RE.captures(column)?;
        let label = caps.get(1)?.as_str();
        let basis = Basis::from_suffix(caps.get(2)?.as_str())?;
        Some((label, basis))
    }
}

static COLUMN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.+) \((per 100g|per gram|per ounce)\)$").expect("valid column regex")
});

// =============================================================================
// Measure
// =============================================================================

/// One measurement cell: a number, or the "not available" marker.
///
/// Serializes as a JSON number or the literal string `"N/A"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measure {
    Value(f64),
    NotAvailable,
}

impl Measure {
    pub fn value(&self) -> Option<f64> {
        match self {
            Measure::Value(v) => Some(*v),
            Measure::NotAvailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Measure::Value(_))
    }
}

impl From<Option<f64>> for Measure {
    fn from(value: Option<f64>) -> Self {
        match value {
            Some(v) if v.is_finite() => Measure::Value(v),
            _ => Measure::NotAvailable,
        }
    }
}

impl std::fmt::Display for Measure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // Debug keeps the trailing ".0" on whole numbers
            Measure::Value(v) => write!(f, "{:?}", v),
            Measure::NotAvailable => f.write_str(NOT_AVAILABLE),
        }
    }
}

impl Serialize for Measure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Measure::Value(v) => serializer.serialize_f64(*v),
            Measure::NotAvailable => serializer.serialize_str(NOT_AVAILABLE),
        }
    }
}

impl<'de> Deserialize<'de> for Measure {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(v) => Ok(Measure::Value(v)),
            Raw::Text(s) if s == NOT_AVAILABLE => Ok(Measure::NotAvailable),
            Raw::Text(s) => Err(de::Error::custom(format!(
                "expected a number or \"{}\", found \"{}\"",
                NOT_AVAILABLE, s
            ))),
        }
    }
}

// =============================================================================
// Output table
// =============================================================================

/// One food with all its derived measurements.
#[derive(Debug, Clone, PartialEq)]
pub struct FoodNutrientRow {
    pub food_id: i64,
    pub food_name: String,
    /// `labels.len() * 3` cells: per nutrient, per-100g / per-gram / per-ounce
    pub measures: Vec<Measure>,
}

/// The prepared per-food nutrient table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NutrientTable {
    /// Nutrient display labels, in column order
    pub labels: Vec<String>,
    /// Rows ordered by `food_id`
    pub rows: Vec<FoodNutrientRow>,
}

impl NutrientTable {
    pub fn new(labels: Vec<String>, rows: Vec<FoodNutrientRow>) -> Self {
        Self { labels, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Measurement column names, three per label.
    pub fn measure_columns(&self) -> Vec<String> {
        self.labels
            .iter()
            .flat_map(|label| Basis::ALL.iter().map(move |b| b.column_name(label)))
            .collect()
    }

    /// All column names: identity columns first, then the measurement triples.
    pub fn columns(&self) -> Vec<String> {
        let mut columns = vec![FOOD_ID_COLUMN.to_string(), FOOD_NAME_COLUMN.to_string()];
        columns.extend(self.measure_columns());
        columns
    }

    /// Find a row by FDC id.
    pub fn get(&self, food_id: i64) -> Option<&FoodNutrientRow> {
        self.rows.iter().find(|r| r.food_id == food_id)
    }

    /// Cell for `label` on `basis` in `row`.
    pub fn measure(&self, row: &FoodNutrientRow, label: &str, basis: Basis) -> Option<Measure> {
        let idx = self.labels.iter().position(|l| l == label)?;
        let offset = Basis::ALL.iter().position(|b| *b == basis)?;
        row.measures.get(idx * 3 + offset).copied()
    }

    /// Serializable view of every row as an ordered JSON object.
    pub fn records(&self) -> Vec<RowObject<'_>> {
        let columns = Arc::new(self.measure_columns());
        self.rows
            .iter()
            .map(|row| RowObject {
                columns: columns.clone(),
                row,
            })
            .collect()
    }

    /// Serializable view of one row.
    pub fn record<'a>(&self, row: &'a FoodNutrientRow) -> RowObject<'a> {
        RowObject {
            columns: Arc::new(self.measure_columns()),
            row,
        }
    }
}

/// A row serialized as `{food_id, food_name, <measure columns>...}` in column order.
#[derive(Debug, Clone)]
pub struct RowObject<'a> {
    columns: Arc<Vec<String>>,
    row: &'a FoodNutrientRow,
}

impl Serialize for RowObject<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len() + 2))?;
        map.serialize_entry(FOOD_ID_COLUMN, &self.row.food_id)?;
        map.serialize_entry(FOOD_NAME_COLUMN, &self.row.food_name)?;
        for (column, measure) in self.columns.iter().zip(&self.row.measures) {
            map.serialize_entry(column, measure)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_table() -> NutrientTable {
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
    fn test_column_names() {
        let table = sample_table();
        assert_eq!(
            table.columns(),
            vec![
                "food_id",
                "food_name",
                "Calories (per 100g)",
                "Calories (per gram)",
                "Calories (per ounce)"
            ]
        );
    }

    #[test]
    fn test_measure_serialization() {
        assert_eq!(serde_json::to_value(Measure::Value(0.52)).unwrap(), json!(0.52));
        assert_eq!(serde_json::to_value(Measure::NotAvailable).unwrap(), json!("N/A"));

        let parsed: Measure = serde_json::from_value(json!("N/A")).unwrap();
        assert_eq!(parsed, Measure::NotAvailable);
        assert!(serde_json::from_value::<Measure>(json!("zero")).is_err());
    }

    #[test]
    fn test_missing_never_becomes_zero() {
        assert_eq!(Measure::from(None), Measure::NotAvailable);
        assert_eq!(Measure::from(Some(f64::NAN)), Measure::NotAvailable);
        assert_eq!(Measure::from(Some(0.0)), Measure::Value(0.0));
    }

    #[test]
    fn test_measure_display() {
        assert_eq!(Measure::Value(52.0).to_string(), "52.0");
        assert_eq!(Measure::Value(14.7417).to_string(), "14.7417");
        assert_eq!(Measure::NotAvailable.to_string(), "N/A");
    }

    #[test]
    fn test_row_object_keeps_column_order() {
        let table = sample_table();
        let json = serde_json::to_string(&table.record(&table.rows[0])).unwrap();

        let positions: Vec<usize> = table
            .columns()
            .iter()
            .map(|c| json.find(&format!("\"{}\"", c)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_lookup_helpers() {
        let table = sample_table();
        let apple = table.get(1).unwrap();
        assert_eq!(
            table.measure(apple, "Calories", Basis::PerGram),
            Some(Measure::Value(0.52))
        );
        assert!(table.get(99).is_none());
        assert_eq!(Basis::from_suffix("per ounce"), Some(Basis::PerOunce));
    }

    #[test]
    fn test_parse_column() {
        assert_eq!(
            Basis::parse_column("Vitamin C ascorbic acid (per 100g)"),
            Some(("Vitamin C ascorbic acid", Basis::Per100g))
        );
        assert_eq!(
            Basis::parse_column("Folate, DFE (per ounce)"),
            Some(("Folate, DFE", Basis::PerOunce))
        );
        assert_eq!(Basis::parse_column("food_name"), None);
        assert_eq!(Basis::parse_column("Calories (per cup)"), None);
    }
}
