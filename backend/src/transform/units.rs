//! Per-100g / per-gram / per-ounce derivation.
//!
//! FoodData Central amounts are per 100 g of food. All three reported values
//! come from that single amount; a missing amount yields three
//! [`Measure::NotAvailable`] cells.

use crate::models::Measure;

/// Decimals kept on the per-100g value.
pub const PER_100G_DECIMALS: i32 = 2;

/// Decimals kept on the per-gram and per-ounce values.
pub const PER_GRAM_DECIMALS: i32 = 4;

/// Round half to even at `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}

/// The three cells of one nutrient for one food.
pub fn derive(amount_per_100g: Option<f64>, grams_per_ounce: f64) -> [Measure; 3] {
    let per_gram = amount_per_100g.map(|a| a / 100.0);
    [
        amount_per_100g.map(|a| round_to(a, PER_100G_DECIMALS)).into(),
        per_gram.map(|g| round_to(g, PER_GRAM_DECIMALS)).into(),
        per_gram
            .map(|g| round_to(g * grams_per_ounce, PER_GRAM_DECIMALS))
            .into(),
    ]
}
