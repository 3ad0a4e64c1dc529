//! HTTP server for the nutrient table.
//!
//! # API Endpoints
//!
//! | Method | Path               | Description                              |
//! |--------|--------------------|------------------------------------------|
//! | GET    | `/health`          | Health check                             |
//! | GET    | `/api/foods`       | Table page (`?page=1&perPage=25`)        |
//! | GET    | `/api/foods/{id}`  | One food, grouped by nutrient category   |
//! | GET    | `/api/search`      | Name search (`?q=apple`)                 |
//! | GET    | `/api/columns`     | Column names and snapshot metadata       |
//! | GET    | `/api/export`      | Whole table as `food_data.json`          |
//! | POST   | `/api/prepare`     | Rebuild from the data directory          |
//! | GET    | `/api/logs`        | SSE stream for real-time logs            |

use axum::{
    extract::{Path, Query, State},
    http::{header, Method},
    response::{sse::Event, IntoResponse, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio::sync::{Mutex, RwLock};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, log_warning, LogEntry, LOG_BROADCASTER};
use super::types::{
    ColumnsResponse, PageQuery, PageResponse, PrepareQuery, SearchQuery, SearchResponse,
};
use crate::config::{BuildConfig, DataPaths};
use crate::error::{ServerError, ServerResult, SnapshotError};
use crate::export::to_json_string;
use crate::lookup::{grouped_details, page, search, GroupedDetails};
use crate::models::NutrientTable;
use crate::snapshot::{self, SnapshotInfo};
use crate::transform::pipeline::{prepare, PrepareSummary};

/// The table being served and where it came from.
#[derive(Debug, Clone, Default)]
pub struct Served {
    pub table: Arc<NutrientTable>,
    pub snapshot: Option<SnapshotInfo>,
}

/// Shared server state.
pub struct AppState {
    served: RwLock<Served>,
    paths: DataPaths,
    config: BuildConfig,
    /// Held for the duration of a rebuild
    preparing: Mutex<()>,
}

impl AppState {
    pub fn new(served: Served, paths: DataPaths, config: BuildConfig) -> Self {
        Self {
            served: RwLock::new(served),
            paths,
            config,
            preparing: Mutex::new(()),
        }
    }

    /// State serving the snapshot at `paths.snapshot`, or an empty table if
    /// there is none yet.
    pub fn load(paths: DataPaths, config: BuildConfig) -> Result<Self, SnapshotError> {
        let served = match snapshot::load(&paths.snapshot) {
            Ok(snap) => {
                let info = snap.info();
                Served {
                    table: Arc::new(snap.into_table()?),
                    snapshot: Some(info),
                }
            }
            Err(SnapshotError::NotFound(path)) => {
                log_warning(format!(
                    "No prepared data at {}; serving an empty table until POST /api/prepare",
                    path.display()
                ));
                Served::default()
            }
            Err(e) => return Err(e),
        };
        Ok(Self::new(served, paths, config))
    }

    async fn table(&self) -> Arc<NutrientTable> {
        self.served.read().await.table.clone()
    }
}

/// Build the router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/foods", get(list_foods))
        .route("/api/foods/{id}", get(food_details))
        .route("/api/search", get(search_foods))
        .route("/api/columns", get(columns))
        .route("/api/export", get(export_json))
        .route("/api/prepare", post(prepare_table))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(
    port: u16,
    paths: DataPaths,
    config: BuildConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState::load(paths, config)?);
    let foods = state.table().await.len();
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 Nutritab server running on http://localhost:{}", port);
    println!("   Serving {} foods", foods);
    println!("   GET  /api/foods    - Browse the table");
    println!("   GET  /api/search   - Search by name");
    println!("   POST /api/prepare  - Rebuild from raw CSV");
    println!("   GET  /api/logs     - SSE log stream");
    println!("   GET  /health       - Health check");
    println!();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "nutritab",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "foods": "GET /api/foods",
            "search": "GET /api/search?q=",
            "prepare": "POST /api/prepare",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

async fn list_foods(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> ServerResult<Json<Value>> {
    let table = state.table().await;
    let page = page(&table, query.page, query.per_page);
    let body = serde_json::to_value(PageResponse::new(&table, page))
        .map_err(|e| ServerError::Internal(e.to_string()))?;
    Ok(Json(body))
}

async fn food_details(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ServerResult<Json<GroupedDetails>> {
    let table = state.table().await;
    let row = table.get(id).ok_or(ServerError::NotFound(id))?;
    Ok(Json(grouped_details(&table, row, &state.config.groups)))
}

async fn search_foods(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> ServerResult<Json<SearchResponse>> {
    let q = query.q.trim();
    if q.is_empty() {
        return Err(ServerError::BadRequest("Please enter a food name to search.".into()));
    }

    let table = state.table().await;
    Ok(Json(SearchResponse::new(q, &search(&table, q))))
}

async fn columns(State(state): State<Arc<AppState>>) -> Json<ColumnsResponse> {
    let served = state.served.read().await;
    Json(ColumnsResponse {
        columns: served.table.columns(),
        labels: served.table.labels.clone(),
        snapshot: served.snapshot.clone(),
    })
}

async fn export_json(State(state): State<Arc<AppState>>) -> ServerResult<impl IntoResponse> {
    let table = state.table().await;
    let body = to_json_string(&table).map_err(|e| ServerError::Internal(e.to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"food_data.json\""),
        ],
        body,
    ))
}

/// Rebuild on the blocking pool; the served table changes only on success.
async fn prepare_table(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PrepareQuery>,
) -> ServerResult<Json<PrepareSummary>> {
    let _guard = state
        .preparing
        .try_lock()
        .map_err(|_| ServerError::Conflict("a prepare run is already in progress".into()))?;

    let paths = state.paths.clone();
    let config = match query.categories() {
        Some(categories) => state.config.clone().with_categories(categories),
        None => state.config.clone(),
    };

    let result = tokio::task::spawn_blocking(move || prepare(&paths, &config))
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?
        .inspect_err(|e| log_error(e.to_string()))?;

    let summary = result.summary();
    *state.served.write().await = Served {
        table: Arc::new(result.table),
        snapshot: Some(result.snapshot),
    };

    Ok(Json(summary))
}

/// SSE endpoint: recent history first, then live entries
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();
    let history = LOG_BROADCASTER.recent();

    let live = BroadcastStream::new(rx).filter_map(|result| result.ok());
    let stream = tokio_stream::iter(history)
        .chain(live)
        .filter_map(|entry: LogEntry| {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
