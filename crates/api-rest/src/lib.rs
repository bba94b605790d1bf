//! # API REST
//!
//! Admin REST API for the Plantão reference data.
//!
//! Handles:
//! - HTTP endpoints with axum (`GET/PUT/DELETE /api/data/…`)
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, token gating, write locks)
//!
//! Every write goes through the core pipeline one entry at a time: the
//! source file is replaced atomically and all four compiled documents are
//! rebuilt, so the compiled cache can never drift from source through this
//! surface. Writes to the same collection type are serialized by a per-type
//! async mutex; writes to different types may interleave, which is safe
//! because each type's source files are disjoint and recompilation is
//! idempotent.

#![warn(rust_2018_idioms)]

use std::sync::Arc;

use axum::{
    extract::{Path as AxumPath, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, put},
    Router,
};
use serde_json::Value;
use tokio::sync::Mutex;
use utoipa::OpenApi;

use plantao_core::{DataError, DataPipeline, DataType};
use plantao_types::DataId;

/// Header carrying the admin token on write requests.
pub const ADMIN_TOKEN_HEADER: &str = "X-Admin-Token";

/// Application state shared across request handlers.
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<DataPipeline>,
    admin_token: Option<String>,
    locks: Arc<WriteLocks>,
}

impl AppState {
    /// Builds the shared state. A `None` or blank token disables the write
    /// endpoints entirely (they answer 503 instead of 401).
    pub fn new(pipeline: DataPipeline, admin_token: Option<String>) -> Self {
        let admin_token = admin_token
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());
        Self {
            pipeline: Arc::new(pipeline),
            admin_token,
            locks: Arc::new(WriteLocks::default()),
        }
    }
}

/// One async mutex per collection type.
///
/// A write or delete plus the full recompile is a multi-step sequence that
/// is not otherwise atomic as a unit; the guard is held across both steps
/// and released on success or failure alike, so a failed operation never
/// blocks the next queued one.
#[derive(Default)]
struct WriteLocks {
    medications: Mutex<()>,
    medication_classes: Mutex<()>,
    physical_exam: Mutex<()>,
    conditions: Mutex<()>,
}

impl WriteLocks {
    fn for_type(&self, data_type: DataType) -> &Mutex<()> {
        match data_type {
            DataType::Medications => &self.medications,
            DataType::MedicationClasses => &self.medication_classes,
            DataType::PhysicalExam => &self.physical_exam,
            DataType::Conditions => &self.conditions,
        }
    }
}

#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct WriteRes {
    pub success: bool,
    pub id: String,
    pub message: String,
}

#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct ErrorRes {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorRes>);

#[derive(OpenApi)]
#[openapi(
    paths(health, get_data, put_data, delete_data),
    components(schemas(HealthRes, WriteRes, ErrorRes))
)]
pub struct ApiDoc;

/// Builds the API router over the given state.
///
/// Swagger UI and the CORS layer are added by the binary, not here.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/data/:data_type", get(get_data))
        .route("/api/data/:data_type/:id", put(put_data).delete(delete_data))
        .with_state(state)
}

fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorRes {
            error: message.into(),
        }),
    )
}

fn parse_type(raw: &str) -> Result<DataType, ApiError> {
    raw.parse()
        .map_err(|e: DataError| bad_request(e.to_string()))
}

fn parse_id(raw: &str) -> Result<DataId, ApiError> {
    DataId::new(raw).map_err(|e| bad_request(format!("invalid entry id: {e}")))
}

/// Maps a pipeline failure to a 400 response. The message is the error's
/// display form; stack traces and source chains stay in the log.
fn pipeline_error(error: DataError) -> ApiError {
    tracing::error!("pipeline error: {error:?}");
    bad_request(error.to_string())
}

fn check_token(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = state.admin_token.as_deref() else {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorRes {
                error: "admin writes are disabled: no admin token configured".into(),
            }),
        ));
    };

    let provided = headers
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok());
    if provided != Some(expected) {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(ErrorRes {
                error: "invalid or missing admin token".into(),
            }),
        ));
    }

    Ok(())
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint, used for monitoring and load balancer checks.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "Plantão admin API is alive".into(),
    })
}

#[utoipa::path(
    get,
    path = "/api/data/{data_type}",
    responses(
        (status = 200, description = "Compiled-equivalent document for the type", body = Object),
        (status = 400, description = "Invalid data type", body = ErrorRes)
    )
)]
/// Returns the compiled-equivalent view of one collection, derived from the
/// current source tree (physical-exam wrapped under `addons`).
#[axum::debug_handler]
async fn get_data(
    State(state): State<AppState>,
    AxumPath(raw_type): AxumPath<String>,
) -> Result<Json<Value>, ApiError> {
    let data_type = parse_type(&raw_type)?;
    let view = state
        .pipeline
        .compiled_view(data_type)
        .map_err(pipeline_error)?;
    Ok(Json(view))
}

#[utoipa::path(
    put,
    path = "/api/data/{data_type}/{id}",
    request_body = Object,
    responses(
        (status = 200, description = "Entry saved and documents recompiled", body = WriteRes),
        (status = 400, description = "Invalid type, id or payload", body = ErrorRes),
        (status = 401, description = "Invalid or missing admin token", body = ErrorRes),
        (status = 503, description = "No admin token configured", body = ErrorRes)
    )
)]
/// Creates or updates a single source entry, then recompiles all four
/// compiled documents.
///
/// The id is validated before any lock or file is touched.
#[axum::debug_handler]
async fn put_data(
    State(state): State<AppState>,
    AxumPath((raw_type, raw_id)): AxumPath<(String, String)>,
    headers: HeaderMap,
    Json(entry): Json<Value>,
) -> Result<Json<WriteRes>, ApiError> {
    let data_type = parse_type(&raw_type)?;
    let id = parse_id(&raw_id)?;
    check_token(&state, &headers)?;

    let _guard = state.locks.for_type(data_type).lock().await;
    state
        .pipeline
        .write_source_entry(data_type, &id, &entry)
        .map_err(pipeline_error)?;
    state.pipeline.compile_from_source().map_err(pipeline_error)?;

    tracing::info!(%data_type, %id, "saved source entry");
    Ok(Json(WriteRes {
        success: true,
        id: id.to_string(),
        message: format!("Entry \"{id}\" saved successfully"),
    }))
}

#[utoipa::path(
    delete,
    path = "/api/data/{data_type}/{id}",
    responses(
        (status = 200, description = "Entry deleted and documents recompiled", body = WriteRes),
        (status = 400, description = "Invalid type or id", body = ErrorRes),
        (status = 401, description = "Invalid or missing admin token", body = ErrorRes),
        (status = 404, description = "Entry not found", body = ErrorRes),
        (status = 503, description = "No admin token configured", body = ErrorRes)
    )
)]
/// Deletes a single source entry and recompiles. A missing entry is a
/// normal 404, not a write failure.
#[axum::debug_handler]
async fn delete_data(
    State(state): State<AppState>,
    AxumPath((raw_type, raw_id)): AxumPath<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<WriteRes>, ApiError> {
    let data_type = parse_type(&raw_type)?;
    let id = parse_id(&raw_id)?;
    check_token(&state, &headers)?;

    let _guard = state.locks.for_type(data_type).lock().await;
    let existed = state
        .pipeline
        .delete_source_entry(data_type, &id)
        .map_err(pipeline_error)?;
    if !existed {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ErrorRes {
                error: format!("Entry \"{id}\" not found"),
            }),
        ));
    }
    state.pipeline.compile_from_source().map_err(pipeline_error)?;

    tracing::info!(%data_type, %id, "deleted source entry");
    Ok(Json(WriteRes {
        success: true,
        id: id.to_string(),
        message: format!("Entry \"{id}\" deleted successfully"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use plantao_core::CoreConfig;
    use serde_json::json;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn state(temp: &TempDir, token: Option<&str>) -> AppState {
        let pipeline = DataPipeline::new(CoreConfig::new(temp.path().to_path_buf()));
        AppState::new(pipeline, token.map(str::to_string))
    }

    fn seed(state: &AppState) {
        state
            .pipeline
            .write_source_entry(
                DataType::Medications,
                &DataId::new("dipirona").unwrap(),
                &json!({ "name": "Dipirona 500mg", "instruction": "De 6/6 horas" }),
            )
            .unwrap();
        state
            .pipeline
            .write_source_entry(
                DataType::PhysicalExam,
                &DataId::new("orofaringe").unwrap(),
                &json!({ "label": "Orofaringe", "text": "Orofaringe hiperemiada." }),
            )
            .unwrap();
        state.pipeline.compile_from_source().unwrap();
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn get_req(path: &str) -> Request<Body> {
        Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap()
    }

    fn put_req(path: &str, token: Option<&str>, body: &Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("PUT")
            .uri(path)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header(ADMIN_TOKEN_HEADER, token);
        }
        builder
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    fn delete_req(path: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("DELETE").uri(path);
        if let Some(token) = token {
            builder = builder.header(ADMIN_TOKEN_HEADER, token);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn get_returns_the_compiled_equivalent_view() {
        let temp = TempDir::new().unwrap();
        let state = state(&temp, None);
        seed(&state);

        let (status, body) = send(app(state.clone()), get_req("/api/data/medications")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["dipirona"]["name"], "Dipirona 500mg");

        // physical-exam wraps its mapping under addons
        let (status, body) = send(app(state), get_req("/api/data/physical-exam")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["addons"]["orofaringe"]["label"], "Orofaringe");
    }

    #[tokio::test]
    async fn get_rejects_unknown_types() {
        let temp = TempDir::new().unwrap();
        let (status, body) = send(app(state(&temp, None)), get_req("/api/data/bogus")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid data type: bogus");
    }

    #[tokio::test]
    async fn writes_are_disabled_without_a_configured_token() {
        let temp = TempDir::new().unwrap();
        let state = state(&temp, None);
        seed(&state);

        let entry = json!({ "name": "X", "instruction": "Y" });
        let (status, _) = send(
            app(state.clone()),
            put_req("/api/data/medications/novo", Some("whatever"), &entry),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        // a blank configured token also counts as not configured
        let blank = self::state(&temp, Some("   "));
        let (status, _) = send(
            app(blank),
            put_req("/api/data/medications/novo", Some("   "), &entry),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn writes_require_the_right_token() {
        let temp = TempDir::new().unwrap();
        let state = state(&temp, Some("secret"));
        seed(&state);
        let entry = json!({ "name": "X", "instruction": "Y" });

        let (status, _) = send(
            app(state.clone()),
            put_req("/api/data/medications/novo", None, &entry),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(
            app(state.clone()),
            put_req("/api/data/medications/novo", Some("wrong"), &entry),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(
            app(state),
            delete_req("/api/data/medications/dipirona", Some("wrong")),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn invalid_ids_are_rejected_before_anything_else() {
        let temp = TempDir::new().unwrap();
        let state = state(&temp, Some("secret"));
        seed(&state);

        let (status, body) = send(
            app(state),
            put_req(
                "/api/data/medications/Not_A_Slug",
                Some("secret"),
                &json!({ "name": "X", "instruction": "Y" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("invalid entry id"));
    }

    #[tokio::test]
    async fn put_writes_the_entry_and_recompiles_everything() {
        let temp = TempDir::new().unwrap();
        let state = state(&temp, Some("secret"));
        seed(&state);

        let entry = json!({ "name": "Loratadina 10mg", "instruction": "1x ao dia" });
        let (status, body) = send(
            app(state.clone()),
            put_req("/api/data/medications/loratadina", Some("secret"), &entry),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["id"], "loratadina");

        let compiled = state
            .pipeline
            .read_compiled_file(DataType::Medications)
            .unwrap();
        assert_eq!(compiled["loratadina"], entry);
    }

    #[tokio::test]
    async fn delete_of_a_missing_entry_is_a_404() {
        let temp = TempDir::new().unwrap();
        let state = state(&temp, Some("secret"));
        seed(&state);

        let (status, body) = send(
            app(state.clone()),
            delete_req("/api/data/medications/fantasma", Some("secret")),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Entry \"fantasma\" not found");

        let (status, _) = send(
            app(state.clone()),
            delete_req("/api/data/medications/dipirona", Some("secret")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let compiled = state
            .pipeline
            .read_compiled_file(DataType::Medications)
            .unwrap();
        assert!(compiled.get("dipirona").is_none());
    }

    #[tokio::test]
    async fn concurrent_puts_to_the_same_type_both_land() {
        let temp = TempDir::new().unwrap();
        let state = state(&temp, Some("secret"));
        seed(&state);
        let router = app(state.clone());

        let entry_a = json!({ "name": "Med A", "instruction": "A" });
        let entry_b = json!({ "name": "Med B", "instruction": "B" });
        let (res_a, res_b) = tokio::join!(
            router
                .clone()
                .oneshot(put_req("/api/data/medications/med-a", Some("secret"), &entry_a)),
            router
                .clone()
                .oneshot(put_req("/api/data/medications/med-b", Some("secret"), &entry_b)),
        );
        assert_eq!(res_a.unwrap().status(), StatusCode::OK);
        assert_eq!(res_b.unwrap().status(), StatusCode::OK);

        let compiled = state
            .pipeline
            .read_compiled_file(DataType::Medications)
            .unwrap();
        assert_eq!(compiled["med-a"], entry_a);
        assert_eq!(compiled["med-b"], entry_b);
    }

    #[tokio::test]
    async fn health_answers() {
        let temp = TempDir::new().unwrap();
        let (status, body) = send(app(state(&temp, None)), get_req("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
    }
}
