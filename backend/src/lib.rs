//! # Nutritab - USDA FoodData Central nutrient tables
//!
//! Nutritab joins the normalized FoodData Central CSV exports (`food.csv`,
//! `food_nutrient.csv`, `nutrient.csv`) into one table with a row per food and
//! three columns per nutrient: per 100 g, per gram and per ounce.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  FDC CSVs   │────▶│   Parser    │────▶│  Transform  │────▶│  Snapshot   │
//! │ (3 tables)  │     │  (auto-enc) │     │ (join/pivot)│     │   (JSON)    │
//! └─────────────┘     └─────────────┘     └─────────────┘     └──────┬──────┘
//!                                                                    │
//!                                ┌──────────────┬────────────────────┤
//!                                ▼              ▼                    ▼
//!                           ┌─────────┐   ┌──────────┐        ┌────────────┐
//!                           │ Lookup  │   │  Export  │        │  HTTP API  │
//!                           └─────────┘   └──────────┘        └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use nutritab::{prepare, BuildConfig, DataPaths};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let result = prepare(&DataPaths::from_env(), &BuildConfig::default())?;
//!     println!("Prepared {} foods", result.table.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types per layer
//! - [`config`] - Build configuration and data paths
//! - [`models`] - Raw rows, measures and the nutrient table
//! - [`parser`] - CSV reading with auto-detection, typed FDC table readers
//! - [`transform`] - Builder, labels, unit derivation and the prepare pipeline
//! - [`snapshot`] - Persisted table
//! - [`lookup`] - Search, details, paging and the interactive session
//! - [`export`] - JSON export
//! - [`validation`] - JSON Schema validation of exported rows
//! - [`api`] - HTTP API server and log streaming

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// Storage and output
pub mod export;
pub mod snapshot;

// Querying
pub mod lookup;

// Validation
pub mod validation;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    BuildError, ExportError, InputError, PipelineError, ServerError, SnapshotError,
};

// =============================================================================
// Re-exports - Configuration and models
// =============================================================================

pub use config::{BuildConfig, DataPaths, NutrientGroup};

pub use models::{
    Basis, Food, FoodNutrientRow, Measure, NutrientDefinition, NutrientLink, NutrientTable,
    SourceTables, NOT_AVAILABLE,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use parser::{load_inputs, CsvError};

pub use transform::{
    build, prepare, Build, BuildReport, BuildWarning, PrepareResult, PrepareSummary,
};

pub use snapshot::{Snapshot, SnapshotInfo};

pub use export::{export_table, to_json_string};

pub use lookup::{search, Session};

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
