//! Build configuration and file locations.
//!
//! [`BuildConfig`] carries every knob of the table builder (target categories,
//! nutrient allow-list, label rewriting, ounce factor). Its `Default` is the
//! curated USDA FoodData Central setup. [`DataPaths`] resolves where raw CSVs
//! are read from and where the prepared table and its JSON export are written.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, PipelineResult};

/// Grams in one avoirdupois ounce.
pub const GRAMS_PER_OUNCE: f64 = 28.3495;

/// Default FoodData Central category kept in the table.
pub const DEFAULT_CATEGORY: &str = "foundation_food";

/// Nutrients kept in the table, in output column order.
pub const DEFAULT_ALLOWLIST: &[&str] = &[
    "Energy",
    "Protein",
    "Total lipid (fat)",
    "Carbohydrate, by difference",
    "Fiber, total dietary",
    "Sugars, total",
    "Calcium, Ca",
    "Iron, Fe",
    "Magnesium, Mg",
    "Phosphorus, P",
    "Potassium, K",
    "Sodium, Na",
    "Zinc, Zn",
    "Copper, Cu",
    "Manganese, Mn",
    "Selenium, Se",
    "Vitamin C, total ascorbic acid",
    "Vitamin A, RAE",
    "Vitamin E (alpha-tocopherol)",
    "Vitamin D (D2 + D3)",
    "Thiamin",
    "Riboflavin",
    "Niacin",
    "Vitamin B-6",
    "Folate, DFE",
    "Vitamin B-12",
    "Vitamin K (phylloquinone)",
];

/// Qualifiers removed from nutrient names, applied in order.
///
/// `", total"` comes before `", total ascorbic acid"`, so
/// "Vitamin C, total ascorbic acid" becomes "Vitamin C ascorbic acid".
pub const DEFAULT_LABEL_STRIPS: &[&str] = &[
    ", by difference",
    ", total",
    ", Ca",
    ", Fe",
    ", Mg",
    ", P",
    ", K",
    ", Na",
    ", Zn",
    ", Cu",
    ", Mn",
    ", Se",
    ", total ascorbic acid",
    ", RAE",
    " (alpha-tocopherol)",
    " (D2 + D3)",
    " (phylloquinone)",
];

/// Display renames applied after stripping.
pub const DEFAULT_ALIASES: &[(&str, &str)] = &[
    ("Energy", "Calories"),
    ("Total lipid (fat)", "Fat"),
    ("Carbohydrate", "Carbohydrates"),
    ("Vitamin B-6", "Vitamin B6"),
    ("Vitamin B-12", "Vitamin B12"),
];

/// Display groups used when showing one food's details.
pub const DEFAULT_GROUPS: &[(&str, &[&str])] = &[
    ("Macros", &["Calories", "Protein", "Fat", "Carbohydrates", "Fiber dietary", "Sugars"]),
    (
        "Minerals",
        &[
            "Calcium", "Iron", "Magnesium", "Phosphorus", "Potassium", "Sodium", "Zinc", "Copper",
            "Manganese", "Selenium",
        ],
    ),
    (
        "Vitamins",
        &[
            "Vitamin C ascorbic acid",
            "Vitamin A",
            "Vitamin E",
            "Vitamin D",
            "Thiamin",
            "Riboflavin",
            "Niacin",
            "Vitamin B6",
            "Folate, DFE",
            "Vitamin B12",
            "Vitamin K",
        ],
    ),
];

/// A named set of display labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutrientGroup {
    pub name: String,
    pub labels: Vec<String>,
}

/// Everything the table builder needs besides the raw tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Food categories (`data_type` values) to keep
    pub target_categories: Vec<String>,

    /// Canonical nutrient names to keep, in column order
    pub nutrient_allowlist: Vec<String>,

    /// Substrings removed from nutrient names, in order
    #[serde(default = "default_label_strips")]
    pub label_strips: Vec<String>,

    /// Stripped name -> display label
    #[serde(default = "default_aliases")]
    pub aliases: Vec<(String, String)>,

    /// Conversion factor for the per-ounce column
    #[serde(default = "default_grams_per_ounce")]
    pub grams_per_ounce: f64,

    /// Groups for the details view
    #[serde(default = "default_groups")]
    pub groups: Vec<NutrientGroup>,
}

fn default_label_strips() -> Vec<String> {
    DEFAULT_LABEL_STRIPS.iter().map(|s| s.to_string()).collect()
}

fn default_aliases() -> Vec<(String, String)> {
    DEFAULT_ALIASES
        .iter()
        .map(|(from, to)| (from.to_string(), to.to_string()))
        .collect()
}

fn default_grams_per_ounce() -> f64 {
    GRAMS_PER_OUNCE
}

fn default_groups() -> Vec<NutrientGroup> {
    DEFAULT_GROUPS
        .iter()
        .map(|(name, labels)| NutrientGroup {
            name: name.to_string(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
        })
        .collect()
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            target_categories: vec![DEFAULT_CATEGORY.to_string()],
            nutrient_allowlist: DEFAULT_ALLOWLIST.iter().map(|s| s.to_string()).collect(),
            label_strips: default_label_strips(),
            aliases: default_aliases(),
            grams_per_ounce: GRAMS_PER_OUNCE,
            groups: default_groups(),
        }
    }
}

impl BuildConfig {
    /// Load a configuration from a JSON file.
    ///
    /// Omitted optional fields fall back to the USDA defaults.
    pub fn from_file(path: &Path) -> PipelineResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| PipelineError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_json(&content).map_err(|e| PipelineError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Replace the target categories.
    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_categories = categories.into_iter().map(Into::into).collect();
        self
    }
}

/// Environment variable for the raw CSV directory.
pub const ENV_DATA_DIR: &str = "NUTRITAB_DATA_DIR";
/// Environment variable for the prepared table.
pub const ENV_SNAPSHOT: &str = "NUTRITAB_SNAPSHOT";
/// Environment variable for the JSON export.
pub const ENV_JSON_OUTPUT: &str = "NUTRITAB_JSON_OUTPUT";

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_SNAPSHOT: &str = "prepared_food_data.json";
const DEFAULT_JSON_OUTPUT: &str = "food_data.json";

/// File names inside the data directory.
pub const FOOD_FILE: &str = "food.csv";
pub const FOOD_NUTRIENT_FILE: &str = "food_nutrient.csv";
pub const NUTRIENT_FILE: &str = "nutrient.csv";

/// Where inputs are read from and outputs written to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPaths {
    pub data_dir: PathBuf,
    pub snapshot: PathBuf,
    pub json_output: PathBuf,
}

impl Default for DataPaths {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            snapshot: PathBuf::from(DEFAULT_SNAPSHOT),
            json_output: PathBuf::from(DEFAULT_JSON_OUTPUT),
        }
    }
}

impl DataPaths {
    /// Resolve paths from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        // Try loading .env file
        let _ = dotenvy::dotenv();

        let defaults = Self::default();
        Self {
            data_dir: env::var_os(ENV_DATA_DIR).map(PathBuf::from).unwrap_or(defaults.data_dir),
            snapshot: env::var_os(ENV_SNAPSHOT).map(PathBuf::from).unwrap_or(defaults.snapshot),
            json_output: env::var_os(ENV_JSON_OUTPUT)
                .map(PathBuf::from)
                .unwrap_or(defaults.json_output),
        }
    }

    /// Override individual paths (CLI flags win over the environment).
    pub fn with_overrides(
        mut self,
        data_dir: Option<PathBuf>,
        snapshot: Option<PathBuf>,
        json_output: Option<PathBuf>,
    ) -> Self {
        if let Some(dir) = data_dir {
            self.data_dir = dir;
        }
        if let Some(path) = snapshot {
            self.snapshot = path;
        }
        if let Some(path) = json_output {
            self.json_output = path;
        }
        self
    }

    pub fn food_csv(&self) -> PathBuf {
        self.data_dir.join(FOOD_FILE)
    }

    pub fn food_nutrient_csv(&self) -> PathBuf {
        self.data_dir.join(FOOD_NUTRIENT_FILE)
    }

    pub fn nutrient_csv(&self) -> PathBuf {
        self.data_dir.join(NUTRIENT_FILE)
    }
}
