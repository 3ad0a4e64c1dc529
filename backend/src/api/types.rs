//! REST API types.
//!
//! Row payloads use the exported column names as keys, so a client renders
//! API pages and `food_data.json` with the same code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{PipelineError, ServerError, SnapshotError};
use crate::lookup::{more_message, Page, PREVIEW_LIMIT};
use crate::models::{FoodNutrientRow, NutrientTable, RowObject};
use crate::snapshot::SnapshotInfo;

/// Default rows per page of `GET /api/foods`.
pub const DEFAULT_PER_PAGE: usize = 25;

/// Query of `GET /api/foods`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_per_page", alias = "per_page")]
    pub per_page: usize,
}

fn default_page() -> usize {
    1
}

fn default_per_page() -> usize {
    DEFAULT_PER_PAGE
}

/// Query of `GET /api/search`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Query of `POST /api/prepare`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrepareQuery {
    /// Comma-separated categories overriding the configured ones
    pub categories: Option<String>,
}

impl PrepareQuery {
    pub fn categories(&self) -> Option<Vec<String>> {
        let categories: Vec<String> = self
            .categories
            .as_deref()?
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from)
            .collect();
        (!categories.is_empty()).then_some(categories)
    }
}

/// One page of the table.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<'a> {
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
    pub total_foods: usize,
    pub foods: Vec<RowObject<'a>>,
}

impl<'a> PageResponse<'a> {
    pub fn new(table: &'a NutrientTable, page: Page<'a>) -> Self {
        Self {
            page: page.page,
            per_page: page.per_page,
            total_pages: page.total_pages,
            total_foods: page.total,
            foods: page.rows.iter().map(|row| table.record(row)).collect(),
        }
    }
}

/// A search match.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub food_id: i64,
    pub food_name: String,
}

/// Search results: the first matches plus the total count.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub query: String,
    pub total: usize,
    pub foods: Vec<SearchHit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub more: Option<String>,
}

impl SearchResponse {
    pub fn new(query: &str, matches: &[&FoodNutrientRow]) -> Self {
        Self {
            query: query.to_string(),
            total: matches.len(),
            foods: matches
                .iter()
                .take(PREVIEW_LIMIT)
                .map(|row| SearchHit {
                    food_id: row.food_id,
                    food_name: row.food_name.clone(),
                })
                .collect(),
            more: more_message(matches.len()),
        }
    }
}

/// Column listing plus metadata of the served snapshot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnsResponse {
    pub columns: Vec<String>,
    pub labels: Vec<String>,
    pub snapshot: Option<SnapshotInfo>,
}

/// Create an error body
pub fn error_response(error: &str) -> Value {
    json!({
        "status": "error",
        "error": error,
    })
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Conflict(_) => StatusCode::CONFLICT,
            ServerError::Pipeline(PipelineError::Snapshot(SnapshotError::NotFound(_))) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ServerError::Pipeline(
                PipelineError::Input(_) | PipelineError::Build(_) | PipelineError::EmptyTable { .. },
            ) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::Pipeline(_) | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(error_response(&self.to_string()))).into_response()
    }
}
