// HTTP API: health, pitcher listing and lookup, game log upload.
//
// Every request rebuilds its snapshot from the backing file; handlers share
// nothing mutable.

use std::sync::Arc;

use axum::{
    extract::{
        multipart::MultipartRejection, rejection::QueryRejection, DefaultBodyLimit, Multipart,
        Path, Query, State,
    },
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use bullpen_core::query::find_by_name;
use bullpen_core::{ListParams, QueryError, ScoredPitcher, Snapshot};
use chrono::NaiveDate;
use serde_json::{json, Value};
use thiserror::Error;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Config;
use crate::storage::{allowed_file, RowSource, StorageError};

/// Multipart field carrying the uploaded game log.
pub const UPLOAD_FIELD: &str = "file";

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// The date fatigue is scored against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceDate {
    /// Today's local date, read per request.
    Today,
    Fixed(NaiveDate),
}

impl ReferenceDate {
    pub fn resolve(&self) -> NaiveDate {
        match self {
            ReferenceDate::Today => chrono::Local::now().date_naive(),
            ReferenceDate::Fixed(date) => *date,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub source: RowSource,
    pub reference: ReferenceDate,
}

impl AppState {
    pub fn new(source: RowSource, reference: ReferenceDate) -> Self {
        Self { source, reference }
    }

    pub fn from_config(config: &Config) -> Self {
        let reference = match config.fatigue.reference_date {
            Some(date) => ReferenceDate::Fixed(date),
            None => ReferenceDate::Today,
        };
        Self::new(
            RowSource::new(&config.data.dir, &config.data.csv_filename),
            reference,
        )
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ApiError {
    /// The game log is missing required columns.
    #[error("game log failed schema validation")]
    Schema {
        errors: Vec<String>,
        /// Include an empty `data` array alongside the errors (list endpoint).
        with_data: bool,
    },

    #[error(transparent)]
    Query(#[from] QueryError),

    /// The query string itself could not be decoded.
    #[error("{0}")]
    MalformedQuery(String),

    #[error("Pitcher '{0}' not found")]
    NotFound(String),

    #[error("No file part in request")]
    NoFilePart,

    #[error("No selected file")]
    NoSelectedFile,

    #[error("Only CSV files are allowed")]
    NotCsv,

    #[error("{message}")]
    Multipart { status: StatusCode, message: String },

    #[error("Failed to save file")]
    SaveFailed { details: String },

    #[error("Failed to read pitcher data")]
    ReadFailed { details: String },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Schema { .. }
            | ApiError::Query(_)
            | ApiError::MalformedQuery(_)
            | ApiError::NoFilePart
            | ApiError::NoSelectedFile
            | ApiError::NotCsv => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Multipart { status, .. } => *status,
            ApiError::SaveFailed { .. } | ApiError::ReadFailed { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Schema {
                errors,
                with_data: true,
            } => json!({ "errors": errors, "data": [] }),
            ApiError::Schema { errors, .. } => json!({ "errors": errors }),
            ApiError::SaveFailed { details } | ApiError::ReadFailed { details } => {
                json!({ "error": self.to_string(), "details": details })
            }
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// CORS policy for the dashboard origin. `*` allows any origin.
pub fn cors_layer(origin: &str) -> CorsLayer {
    let allow_origin = if origin == "*" {
        AllowOrigin::any()
    } else {
        match HeaderValue::from_str(origin) {
            Ok(value) => AllowOrigin::exact(value),
            Err(_) => {
                warn!("ignoring invalid CORS origin '{origin}'");
                AllowOrigin::list(Vec::<HeaderValue>::new())
            }
        }
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

/// Build the router over an explicit state.
pub fn router(state: AppState, cors: CorsLayer, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/health", get(health))
        .route("/api/pitchers", get(list_pitchers))
        .route("/api/pitchers/:name", get(get_pitcher))
        .route("/api/upload", post(upload))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Build the router from loaded configuration.
pub fn build_router(config: &Config) -> Router {
    router(
        AppState::from_config(config),
        cors_layer(&config.cors.frontend_origin),
        config.upload.max_bytes,
    )
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn index() -> Json<Value> {
    Json(json!({
        "message": "Bullpen Buddy backend is running. Use /api/health, /api/pitchers, etc."
    }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Rebuild the snapshot off the async runtime.
async fn load_snapshot(state: &AppState) -> Result<Snapshot, ApiError> {
    let source = state.source.clone();
    let result = tokio::task::spawn_blocking(move || source.load())
        .await
        .map_err(|e| ApiError::ReadFailed {
            details: e.to_string(),
        })?;
    result.map_err(|e: StorageError| {
        warn!("{e}");
        ApiError::ReadFailed {
            details: e.to_string(),
        }
    })
}

async fn list_pitchers(
    State(state): State<Arc<AppState>>,
    pairs: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<Vec<ScoredPitcher>>, ApiError> {
    let Query(pairs) = pairs.map_err(|e| {
        warn!("list query rejected: {e}");
        ApiError::MalformedQuery(e.body_text())
    })?;
    let params = ListParams::from_pairs(pairs);

    let snapshot = load_snapshot(&state).await?;
    if snapshot.has_errors() {
        return Err(ApiError::Schema {
            errors: snapshot.errors().to_vec(),
            with_data: true,
        });
    }

    let query = bullpen_core::Query::from_params(&params)?;
    let rows = query.run(&snapshot, state.reference.resolve());
    Ok(Json(rows))
}

async fn get_pitcher(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<ScoredPitcher>, ApiError> {
    let snapshot = load_snapshot(&state).await?;
    if snapshot.has_errors() {
        return Err(ApiError::Schema {
            errors: snapshot.errors().to_vec(),
            with_data: false,
        });
    }

    find_by_name(&snapshot, &name, state.reference.resolve())
        .map(Json)
        .ok_or(ApiError::NotFound(name))
}

async fn upload(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, ApiError> {
    let origin = headers
        .get("origin")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");
    info!("upload request received (origin: {origin})");

    let mut multipart = multipart.map_err(|e| {
        warn!("upload rejected: {e}");
        ApiError::NoFilePart
    })?;

    let (filename, contents) = loop {
        let field = multipart.next_field().await.map_err(|e| ApiError::Multipart {
            status: e.status(),
            message: e.body_text(),
        })?;
        let Some(field) = field else {
            warn!("upload without '{UPLOAD_FIELD}' part");
            return Err(ApiError::NoFilePart);
        };
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        if filename.is_empty() {
            warn!("upload with empty filename");
            return Err(ApiError::NoSelectedFile);
        }
        if !allowed_file(&filename) {
            warn!("upload with disallowed filename '{filename}'");
            return Err(ApiError::NotCsv);
        }

        let contents = field.bytes().await.map_err(|e| ApiError::Multipart {
            status: e.status(),
            message: e.body_text(),
        })?;
        break (filename, contents);
    };

    let source = state.source.clone();
    let report = tokio::task::spawn_blocking(move || source.replace(&contents))
        .await
        .map_err(|e| ApiError::SaveFailed {
            details: e.to_string(),
        })?
        .map_err(|e| {
            warn!("failed to save upload '{filename}': {e}");
            ApiError::SaveFailed {
                details: e.to_string(),
            }
        })?;

    info!(
        "game log uploaded (original: {filename}, saved as {})",
        report.saved_as
    );
    Ok(Json(json!({
        "message": "File uploaded successfully",
        "debug": report,
    })))
}
