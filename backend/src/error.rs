//! Error types for the nutrient table pipeline.
//!
//! This module defines one error type per layer:
//!
//! - [`InputError`] - raw CSV input problems (missing file, missing column, bad cell)
//! - [`BuildError`] - fatal conditions of the table builder
//! - [`SnapshotError`] - persisted table read/write errors
//! - [`ExportError`] - JSON export errors
//! - [`PipelineError`] - top-level orchestration errors
//! - [`ServerError`] - HTTP server errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use std::path::PathBuf;
use thiserror::Error;

use crate::parser::CsvError;

// =============================================================================
// Input Errors
// =============================================================================

/// Errors while loading the raw FoodData Central tables.
#[derive(Debug, Error)]
pub enum InputError {
    /// One of the raw input files does not exist.
    #[error("Missing input file for table '{table}': {}", .path.display())]
    MissingInputFile { table: String, path: PathBuf },

    /// A required column is absent from an input table.
    #[error("Table '{table}' has no column '{column}'")]
    SchemaMismatch { table: String, column: String },

    /// A cell could not be parsed.
    #[error("Table '{table}': {source}")]
    Malformed {
        table: String,
        #[source]
        source: CsvError,
    },

    /// Failed to read a file.
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// =============================================================================
// Build Errors
// =============================================================================

/// Fatal conditions of the nutrient table builder.
#[derive(Debug, Error)]
pub enum BuildError {
    /// No food belongs to any of the target categories.
    #[error("No foods found matching target categories: {}", .categories.join(", "))]
    NoMatchingFoods { categories: Vec<String> },
}

// =============================================================================
// Snapshot Errors
// =============================================================================

/// Errors reading or writing the persisted table.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// No snapshot at the given path.
    #[error("Snapshot not found: {} (run 'nutritab prepare' first)", .0.display())]
    NotFound(PathBuf),

    /// Snapshot written by an incompatible format version.
    #[error("Unsupported snapshot format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    /// Snapshot columns disagree with each other.
    #[error("Corrupt snapshot: {0}")]
    Corrupt(String),

    /// IO error.
    #[error("Snapshot IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("Snapshot JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors during JSON export.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Could not load the table to export.
    #[error("Export source error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// IO error.
    #[error("Export IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("Export JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the main error type returned by [`crate::transform::pipeline::prepare`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Raw input error.
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    /// Build error.
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// Snapshot error.
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// The build produced no nutrient columns; nothing is persisted.
    #[error("Built table has no nutrient data for categories: {}", .categories.join(", "))]
    EmptyTable { categories: Vec<String> },

    /// Configuration file could not be read.
    #[error("Invalid configuration {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Unknown food id.
    #[error("Food not found: {0}")]
    NotFound(i64),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// A prepare run is already in progress.
    #[error("Busy: {0}")]
    Conflict(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for input loading.
pub type InputResult<T> = Result<T, InputError>;

/// Result type for the builder.
pub type BuildResult<T> = Result<T, BuildError>;

/// Result type for snapshot operations.
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
