//! Transformation module.
//!
//! This module turns the raw FoodData Central tables into the nutrient table:
//! - Builder: join, filter, pivot
//! - Labels: display names of nutrients
//! - Units: per-100g / per-gram / per-ounce derivation
//! - Pipeline: load, build and persist with logging

pub mod builder;
pub mod labels;
pub mod pipeline;
pub mod units;

pub use builder::{build, Build, BuildReport, BuildStats, BuildWarning};
pub use labels::display_label;
pub use pipeline::{prepare, prepare_tables, PrepareResult, PrepareSummary};
