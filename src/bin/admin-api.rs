/// Admin API - HTTP surface over the selector-driven page patcher
///
/// Thin boundary layer: each request loads the backing HTML fresh, runs the
/// generic extractor/updater against the field registry, and persists. No
/// state is shared between requests beyond the immutable registry and config.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use pagepatch::{
    extract, DocumentType, DocumentStore, FieldRecord, FieldRegistry, NameReport, SiteConfig,
    StoreError, TargetReport, Updater,
};

struct AppState {
    registry: FieldRegistry,
    store: DocumentStore,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load environment variables
    dotenv::dotenv().ok();

    let config = match std::env::var("PAGEPATCH_CONFIG") {
        Ok(path) => SiteConfig::load_from_file(&path).expect("Failed to load site config"),
        Err(_) => match std::env::var("SITE_ROOT") {
            Ok(root) => SiteConfig::with_root(root),
            Err(_) => SiteConfig::default(),
        },
    };

    let state = Arc::new(AppState {
        registry: FieldRegistry::standard(),
        store: DocumentStore::new(config),
    });

    // Build router
    let app = Router::new()
        .route("/api/documents/:doc_type", get(get_fields).post(update_fields))
        .route("/api/name", post(update_name))
        .route("/health", get(health_check))
        .layer(CorsLayer::permissive())
        .with_state(state.clone());

    // Run server
    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .expect("Invalid PORT");

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Admin API listening on {}", addr);
    tracing::info!("Site root: {}", state.store.config().root.display());

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

fn parse_doc_type(raw: &str) -> Result<DocumentType, AppError> {
    raw.parse().map_err(AppError::ValidationError)
}

/// Read every registered field of a document. Always total: locate failures
/// come back as the field's default value.
async fn get_fields(
    State(state): State<Arc<AppState>>,
    Path(doc_type): Path<String>,
) -> Result<Json<FieldRecord>, AppError> {
    let doc_type = parse_doc_type(&doc_type)?;
    let document = state.store.load(doc_type)?;
    Ok(Json(extract(&document, doc_type, &state.registry)))
}

/// Apply a partial field record to a document.
async fn update_fields(
    State(state): State<Arc<AppState>>,
    Path(doc_type): Path<String>,
    Json(request): Json<UpdateRequest>,
) -> Result<Json<UpdateResponse>, AppError> {
    let doc_type = parse_doc_type(&doc_type)?;

    let updater = Updater::new(&state.registry, &state.store);
    let outcome = updater.update(doc_type, &request.fields)?;

    tracing::info!(
        document = %doc_type,
        applied = outcome.applied_fields.len(),
        skipped = outcome.skipped_fields.len(),
        "update applied"
    );

    Ok(Json(UpdateResponse {
        success: true,
        applied_fields: outcome.applied_fields,
        touched_documents: outcome.touched_documents,
        skipped_fields: outcome.skipped_fields,
        documents: outcome.reports,
    }))
}

/// Rewrite the account-holder name across the whole site tree (minus the
/// configured deny list). Partial failure is still a success response; the
/// body enumerates per-file outcomes.
async fn update_name(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NameRequest>,
) -> Result<Json<NameResponse>, AppError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(AppError::ValidationError("Name must not be empty".to_string()));
    }

    let files = state.store.html_files();
    let updater = Updater::new(&state.registry, &state.store);
    let documents = updater.propagate_name(name, &files);

    Ok(Json(NameResponse {
        success: true,
        documents,
    }))
}

/// Health check endpoint (liveness)
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "admin-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// Error handling

#[derive(Debug)]
enum AppError {
    ValidationError(String),
    NotFound(String),
    InternalError(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => AppError::NotFound(err.to_string()),
            _ => AppError::InternalError(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(serde_json::json!({
            "success": false,
            "error": message
        }))).into_response()
    }
}

// Request/response types

#[derive(Debug, serde::Deserialize)]
struct UpdateRequest {
    fields: FieldRecord,
}

#[derive(Debug, serde::Serialize)]
struct UpdateResponse {
    success: bool,
    applied_fields: Vec<String>,
    touched_documents: Vec<DocumentType>,
    skipped_fields: Vec<String>,
    documents: Vec<TargetReport>,
}

#[derive(Debug, serde::Deserialize)]
struct NameRequest {
    name: String,
}

#[derive(Debug, serde::Serialize)]
struct NameResponse {
    success: bool,
    documents: Vec<NameReport>,
}
