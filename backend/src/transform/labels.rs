//! Nutrient display labels.
//!
//! FoodData Central names carry qualifiers ("Calcium, Ca", "Carbohydrate, by
//! difference") that are noise in a column header. A label is derived by
//! removing each configured qualifier in order, trimming, then applying the
//! alias map:
//!
//! ```text
//! "Carbohydrate, by difference"  →  "Carbohydrate"  →  "Carbohydrates"
//! "Vitamin K (phylloquinone)"    →  "Vitamin K"
//! "Energy"                       →  "Energy"        →  "Calories"
//! ```

use crate::config::BuildConfig;

/// Derive the display label of a canonical nutrient name.
pub fn display_label(name: &str, config: &BuildConfig) -> String {
    let stripped = strip_qualifiers(name, &config.label_strips);
    apply_alias(&stripped, &config.aliases)
}

/// Remove every qualifier, in list order.
pub fn strip_qualifiers(name: &str, strips: &[String]) -> String {
    strips
        .iter()
        .fold(name.to_string(), |acc, pattern| acc.replace(pattern.as_str(), ""))
        .trim()
        .to_string()
}

/// Rename through the alias map; unmapped names pass through.
pub fn apply_alias(name: &str, aliases: &[(String, String)]) -> String {
    aliases
        .iter()
        .find(|(from, _)| from == name)
        .map(|(_, to)| to.clone())
        .unwrap_or_else(|| name.to_string())
}
