//! REST API for the cutting service.
//!
//! Provides HTTP endpoints for optimization, refinement, export and saved
//! projects. Uses Axum as the web framework and supports CORS.

use std::sync::{Arc, OnceLock};

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use utoipa::{IntoParams, OpenApi, ToSchema};

use crate::config::{ApiConfig, OptimizerConfig};
use crate::export::{ExportError, ExportFormat, export_pattern};
use crate::model::{
    CostAnalysis, CutPattern, CutRequest, DropReason, DroppedCut, Material, OptimizationResult,
    PlacedCut, SortStrategy, UnitCut, ValidationError,
};
use crate::optimizer::{
    CuttingConfig, genetic_refine_with_config, optimize_with_config, optimize_with_progress,
    validate_input,
};
use crate::placement::find_conflicts;
use crate::project::{
    InMemoryProjectRepository, NewProject, ProjectRepository, RepositoryError, SavedProject,
};

#[derive(Clone)]
struct ApiState {
    optimizer_config: OptimizerConfig,
    repository: Arc<dyn ProjectRepository>,
}

impl ApiState {
    fn new(optimizer_config: OptimizerConfig, repository: Arc<dyn ProjectRepository>) -> Self {
        Self {
            optimizer_config,
            repository,
        }
    }

    /// Server configuration with the request-level rotation switch applied.
    fn cutting_config(&self, allow_rotation: Option<bool>) -> CuttingConfig {
        let mut config = self.optimizer_config.cutting_config();
        if let Some(allow_rotation) = allow_rotation {
            config.allow_rotation = allow_rotation;
        }
        config
    }
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

// SRI hashes verified against https://unpkg.com/swagger-ui-dist@5.17.14/ on 2025-10-29.
const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>cut-it-now API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            integrity="sha384-wxLW6kwyHktdDGr6Pv1zgm/VGJh99lfUbzSn6HNHBENZlCN7W602k9VkGdxuFvPn"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            integrity="sha384-wmyclcVGX/WhUkdkATwhaK1X1JtiNrr2EoYJ+diV3vj4v6OC5yCeSu+yW13SYJep"
            crossorigin="anonymous"
        ></script>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-standalone-preset.js"
            integrity="sha384-2YH8WDRaj7V2OqU/trsmzSagmk/E2SutiCsGkdgoQwC9pNUJV1u/141DHB6jgs8t"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                window.ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                    presets: [SwaggerUIBundle.presets.apis, SwaggerUIStandalonePreset],
                    layout: "StandaloneLayout",
                });
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// Request structure for the optimization endpoints.
#[derive(Deserialize, Clone, ToSchema)]
#[schema(
    example = json!({
        "cuts": [
            { "id": "door", "width": 600.0, "height": 400.0, "quantity": 2 },
            { "id": "shelf", "width": 800.0, "height": 300.0, "quantity": 4, "rotatable": false }
        ],
        "material": {
            "width": 2440.0,
            "height": 1220.0,
            "thickness": 18.0,
            "cost_per_m2": 500.0,
            "kerf": 3.0,
            "material_type": "MDF"
        },
        "allow_rotation": true
    })
)]
pub struct OptimizeRequest {
    pub cuts: Vec<CutRequest>,
    pub material: Material,
    #[serde(default)]
    #[schema(nullable = true)]
    pub allow_rotation: Option<bool>,
}

/// Request structure for the refinement endpoint.
///
/// `generations` defaults to the server configuration; a fixed `seed` makes
/// the result reproducible.
#[derive(Deserialize, Clone, ToSchema)]
pub struct RefineRequest {
    pub cuts: Vec<CutRequest>,
    pub material: Material,
    #[serde(default)]
    #[schema(nullable = true)]
    pub allow_rotation: Option<bool>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub generations: Option<usize>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub seed: Option<u64>,
}

/// Request structure for the export endpoint.
#[derive(Deserialize, Clone, ToSchema)]
pub struct ExportRequest {
    pub pattern: CutPattern,
    pub material: Material,
    #[schema(example = "csv")]
    pub format: String,
}

/// Query parameters for listing projects.
#[derive(Deserialize, Debug, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProjectsQuery {
    /// Only return projects of this owner.
    pub owner_id: Option<String>,
}

/// Upper bound for unit pieces (sum of all quantities) in one HTTP job.
const MAX_PIECES_PER_JOB: u64 = 10_000;

#[derive(Debug)]
struct ValidatedCutJob {
    cuts: Vec<CutRequest>,
    material: Material,
    allow_rotation: Option<bool>,
}

#[derive(Debug)]
enum CutJobValidationError {
    MissingCuts,
    TooManyPieces(u64),
    Invalid(ValidationError),
}

impl From<ValidationError> for CutJobValidationError {
    fn from(err: ValidationError) -> Self {
        CutJobValidationError::Invalid(err)
    }
}

fn validate_cut_job(
    cuts: Vec<CutRequest>,
    material: Material,
    allow_rotation: Option<bool>,
) -> Result<ValidatedCutJob, CutJobValidationError> {
    if cuts.is_empty() {
        return Err(CutJobValidationError::MissingCuts);
    }
    validate_input(&cuts, &material)?;

    let pieces: u64 = cuts.iter().map(|cut| u64::from(cut.quantity)).sum();
    if pieces > MAX_PIECES_PER_JOB {
        return Err(CutJobValidationError::TooManyPieces(pieces));
    }

    Ok(ValidatedCutJob {
        cuts,
        material,
        allow_rotation,
    })
}

impl OptimizeRequest {
    fn into_validated(self) -> Result<ValidatedCutJob, CutJobValidationError> {
        validate_cut_job(self.cuts, self.material, self.allow_rotation)
    }
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    details: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    (status, Json(ErrorResponse::new(error, details))).into_response()
}

fn json_deserialize_error(err: JsonRejection) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid JSON data",
        err.to_string(),
    )
}

fn validation_error(details: impl Into<String>) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid input data",
        details,
    )
}

fn internal_error(details: impl Into<String>) -> Response {
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error",
        details,
    )
}

fn cut_job_error(err: CutJobValidationError) -> Response {
    match err {
        CutJobValidationError::MissingCuts => {
            validation_error("At least one cut must be specified")
        }
        CutJobValidationError::TooManyPieces(pieces) => validation_error(format!(
            "The job expands to {} pieces; at most {} are accepted per request",
            pieces, MAX_PIECES_PER_JOB
        )),
        CutJobValidationError::Invalid(err) => validation_error(err.to_string()),
    }
}

fn export_error(err: ExportError) -> Response {
    match err {
        ExportError::UnsupportedFormat(_) => {
            error_response(StatusCode::BAD_REQUEST, "Unsupported format", err.to_string())
        }
        ExportError::Serialization(_) => internal_error(err.to_string()),
    }
}

fn repository_error(err: RepositoryError) -> Response {
    match err {
        RepositoryError::EmptyName => validation_error(err.to_string()),
        RepositoryError::Unavailable(_) => error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Project store unavailable",
            err.to_string(),
        ),
    }
}

fn parse_optimize_request(
    payload: Result<Json<OptimizeRequest>, JsonRejection>,
) -> Result<ValidatedCutJob, Response> {
    let Json(payload) = payload.map_err(json_deserialize_error)?;
    payload.into_validated().map_err(cut_job_error)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handle_optimize,
        handle_optimize_stream,
        handle_refine,
        handle_export,
        handle_create_project,
        handle_list_projects
    ),
    components(
        schemas(
            OptimizeRequest,
            RefineRequest,
            ExportRequest,
            OptimizationResult,
            CutPattern,
            CutRequest,
            UnitCut,
            PlacedCut,
            DroppedCut,
            DropReason,
            SortStrategy,
            Material,
            CostAnalysis,
            NewProject,
            SavedProject,
            ErrorResponse
        )
    ),
    tags(
        (name = "cutting", description = "Endpoints for cutting optimization"),
        (name = "projects", description = "Saved cutting projects")
    )
)]
struct ApiDoc;

fn build_router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        // API endpoints
        .route("/optimize", post(handle_optimize))
        .route("/optimize_stream", post(handle_optimize_stream))
        .route("/refine", post(handle_refine))
        .route("/export", post(handle_export))
        .route(
            "/projects",
            post(handle_create_project).get(handle_list_projects),
        )
        // API documentation
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(cors)
        .with_state(state)
}

/// Starts the API server on the configured address.
///
/// Configures CORS for cross-origin requests and keeps saved projects in
/// process memory. Blocks until the server is terminated.
pub async fn start_api_server(config: ApiConfig, optimizer_config: OptimizerConfig) {
    let repository: Arc<dyn ProjectRepository> = Arc::new(InMemoryProjectRepository::new());
    let app = build_router(ApiState::new(optimizer_config, repository));

    let addr = config.socket_addr();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            log::error!("❌ Could not bind API server to {}: {}", addr, err);
            return;
        }
    };

    log::info!(
        "🚀 Server running on http://{}:{}",
        config.display_host(),
        config.port()
    );
    if config.binds_to_all_interfaces() && config.uses_default_host() {
        log::info!("💡 Local access: http://localhost:{}", config.port());
    }
    log::info!("🪚 API Endpoints:");
    log::info!("   - POST /optimize");
    log::info!("   - POST /optimize_stream");
    log::info!("   - POST /refine");
    log::info!("   - POST /export");
    log::info!("   - POST /projects, GET /projects");
    log::info!("📑 Documentation:");
    log::info!("   - GET /docs");
    log::info!("   - GET /docs/openapi.json");

    if let Err(err) = axum::serve(listener, app).await {
        log::error!("❌ API server terminated with an error: {err}");
    }
}

/// Handler for POST /optimize endpoint.
///
/// Lays out the requested cuts on stock sheets and compares sort strategies.
///
/// # Parameters
/// * `payload` - JSON payload with cut list, material and optional rotation switch
///
/// # Returns
/// JSON response with the primary pattern, alternatives, costs and recommendations
#[utoipa::path(
    post,
    path = "/optimize",
    request_body = OptimizeRequest,
    responses(
        (status = 200, description = "Successfully optimized cut list", body = OptimizationResult),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid cut list or material",
            body = ErrorResponse
        )
    ),
    tag = "cutting"
)]
async fn handle_optimize(
    State(state): State<ApiState>,
    payload: Result<Json<OptimizeRequest>, JsonRejection>,
) -> Response {
    let job = match parse_optimize_request(payload) {
        Ok(job) => job,
        Err(response) => return response,
    };

    log::info!(
        "📥 New optimize request: {} cut entries on {}x{} sheets",
        job.cuts.len(),
        job.material.width,
        job.material.height
    );
    let config = state.cutting_config(job.allow_rotation);

    let outcome = tokio::task::spawn_blocking(move || {
        optimize_with_config(&job.cuts, &job.material, &config)
    })
    .await;

    match outcome {
        Ok(Ok(result)) => {
            log::info!(
                "🪵 Result: {} sheets, {:.2}% efficiency, {} dropped",
                result.pattern.sheets_needed,
                result.pattern.efficiency,
                result.pattern.dropped.len()
            );
            (StatusCode::OK, Json(result)).into_response()
        }
        Ok(Err(err)) => validation_error(err.to_string()),
        Err(err) => internal_error(err.to_string()),
    }
}

/// Handler for POST /optimize_stream endpoint (SSE).
///
/// Streams placement events of the primary pattern as Server-Sent Events
/// (text/event-stream), so a client can draw the layout while it is built.
#[utoipa::path(
    post,
    path = "/optimize_stream",
    request_body = OptimizeRequest,
    responses(
        (
            status = 200,
            description = "Streams placement events in real-time",
            content_type = "text/event-stream",
            body = String
        ),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid cut list or material",
            body = ErrorResponse
        )
    ),
    tag = "cutting"
)]
async fn handle_optimize_stream(
    State(state): State<ApiState>,
    payload: Result<Json<OptimizeRequest>, JsonRejection>,
) -> Response {
    let job = match parse_optimize_request(payload) {
        Ok(job) => job,
        Err(response) => return response,
    };

    let config = state.cutting_config(job.allow_rotation);
    let (tx, rx) = mpsc::channel::<String>(32);

    tokio::task::spawn_blocking(move || {
        let outcome = optimize_with_progress(&job.cuts, &job.material, &config, |evt| {
            if let Ok(json) = serde_json::to_string(evt) {
                // A closed receiver only means the client went away.
                let _ = tx.blocking_send(json);
            }
        });
        if let Err(err) = outcome {
            log::warn!("⚠️ Streamed optimization failed: {}", err);
        }
    });

    let stream = ReceiverStream::new(rx)
        .map(|msg| Ok::<_, std::convert::Infallible>(Event::default().data(msg)));
    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(std::time::Duration::from_secs(10))
                .text("keep-alive"),
        )
        .into_response()
}

/// Handler for POST /refine endpoint.
///
/// Searches random piece orders for a more efficient pattern than the
/// deterministic area order.
#[utoipa::path(
    post,
    path = "/refine",
    request_body = RefineRequest,
    responses(
        (status = 200, description = "Best pattern found", body = CutPattern),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid cut list or material",
            body = ErrorResponse
        )
    ),
    tag = "cutting"
)]
async fn handle_refine(
    State(state): State<ApiState>,
    payload: Result<Json<RefineRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(err) => return json_deserialize_error(err),
    };
    let RefineRequest {
        cuts,
        material,
        allow_rotation,
        generations,
        seed,
    } = request;

    let job = match validate_cut_job(cuts, material, allow_rotation) {
        Ok(job) => job,
        Err(err) => return cut_job_error(err),
    };

    let config = state.cutting_config(job.allow_rotation);
    let generations = generations.unwrap_or(config.refine_generations);
    log::info!(
        "📥 New refine request: {} cut entries, {} generations",
        job.cuts.len(),
        generations
    );

    let outcome = tokio::task::spawn_blocking(move || {
        genetic_refine_with_config(&job.cuts, &job.material, generations, seed, &config)
    })
    .await;

    match outcome {
        Ok(Ok(pattern)) => (StatusCode::OK, Json(pattern)).into_response(),
        Ok(Err(err)) => validation_error(err.to_string()),
        Err(err) => internal_error(err.to_string()),
    }
}

/// Handler for POST /export endpoint.
///
/// Renders a pattern as JSON or CSV and answers with the matching content type.
#[utoipa::path(
    post,
    path = "/export",
    request_body = ExportRequest,
    responses(
        (status = 200, description = "Rendered export document", body = String),
        (status = BAD_REQUEST, description = "Unsupported export format", body = ErrorResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid JSON data", body = ErrorResponse)
    ),
    tag = "cutting"
)]
async fn handle_export(payload: Result<Json<ExportRequest>, JsonRejection>) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(err) => return json_deserialize_error(err),
    };

    let format = match request.format.parse::<ExportFormat>() {
        Ok(format) => format,
        Err(err) => return export_error(err),
    };

    match export_pattern(&request.pattern, &request.material, format) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, format.content_type())],
            body,
        )
            .into_response(),
        Err(err) => export_error(err),
    }
}

/// Handler for POST /projects endpoint.
///
/// Stores a named project after checking that its pattern is a valid layout
/// for the given material.
#[utoipa::path(
    post,
    path = "/projects",
    request_body = NewProject,
    responses(
        (status = CREATED, description = "Project saved", body = SavedProject),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid project data or conflicting layout",
            body = ErrorResponse
        ),
        (
            status = SERVICE_UNAVAILABLE,
            description = "Project store unavailable",
            body = ErrorResponse
        )
    ),
    tag = "projects"
)]
async fn handle_create_project(
    State(state): State<ApiState>,
    payload: Result<Json<NewProject>, JsonRejection>,
) -> Response {
    let Json(project) = match payload {
        Ok(payload) => payload,
        Err(err) => return json_deserialize_error(err),
    };

    if let Err(err) = validate_input(&project.cuts, &project.material) {
        return validation_error(err.to_string());
    }

    let conflicts = find_conflicts(
        &project.pattern,
        project.material.sheet_dims(),
        project.material.kerf,
    );
    if !conflicts.is_empty() {
        let details = conflicts
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Pattern is not a valid layout",
            details,
        );
    }

    match state.repository.save(project) {
        Ok(saved) => {
            log::info!("💾 Saved project {} for owner {}", saved.id, saved.project.owner_id);
            (StatusCode::CREATED, Json(saved)).into_response()
        }
        Err(err) => repository_error(err),
    }
}

/// Handler for GET /projects endpoint.
#[utoipa::path(
    get,
    path = "/projects",
    params(ProjectsQuery),
    responses(
        (status = 200, description = "Saved projects, oldest first", body = [SavedProject]),
        (
            status = SERVICE_UNAVAILABLE,
            description = "Project store unavailable",
            body = ErrorResponse
        )
    ),
    tag = "projects"
)]
async fn handle_list_projects(
    State(state): State<ApiState>,
    Query(query): Query<ProjectsQuery>,
) -> Response {
    match state.repository.list(query.owner_id.as_deref()) {
        Ok(projects) => (StatusCode::OK, Json(projects)).into_response(),
        Err(err) => repository_error(err),
    }
}

async fn serve_openapi_json() -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui() -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::optimize;

    fn test_state() -> ApiState {
        ApiState::new(
            OptimizerConfig::from(CuttingConfig::default()),
            Arc::new(InMemoryProjectRepository::new()),
        )
    }

    fn board() -> Material {
        Material {
            width: 2440.0,
            height: 1220.0,
            thickness: 18.0,
            cost_per_m2: 500.0,
            kerf: 3.0,
            material_type: "MDF".to_string(),
            density: None,
        }
    }

    fn optimize_request(cuts: Vec<CutRequest>) -> OptimizeRequest {
        OptimizeRequest {
            cuts,
            material: board(),
            allow_rotation: None,
        }
    }

    #[test]
    fn openapi_doc_lists_expected_paths() {
        let doc = openapi_doc();
        let paths = &doc.paths.paths;
        for path in [
            "/optimize",
            "/optimize_stream",
            "/refine",
            "/export",
            "/projects",
        ] {
            assert!(
                paths.contains_key(path),
                "OpenAPI documentation is missing the {} path",
                path
            );
        }
    }

    #[test]
    fn openapi_doc_contains_key_schemas() {
        let doc = openapi_doc();
        let components = doc
            .components
            .as_ref()
            .expect("OpenAPI documentation contains no components");
        let schemas = &components.schemas;
        for name in [
            "OptimizeRequest",
            "OptimizationResult",
            "CutPattern",
            "SavedProject",
            "ErrorResponse",
        ] {
            assert!(
                schemas.contains_key(name),
                "Expected schema '{}' is missing from OpenAPI spec",
                name
            );
        }
    }

    #[test]
    fn optimize_request_parses_allow_rotation() {
        let base = r#""cuts": [{"id": "A", "width": 600.0, "height": 400.0, "quantity": 1}],
            "material": {"width": 2440.0, "height": 1220.0, "thickness": 18.0,
                         "cost_per_m2": 500.0, "kerf": 3.0}"#;

        for (suffix, expected) in [
            (r#", "allow_rotation": true"#, Some(true)),
            (r#", "allow_rotation": false"#, Some(false)),
            (r#", "allow_rotation": null"#, None),
            ("", None),
        ] {
            let json = format!("{{{}{}}}", base, suffix);
            let request: OptimizeRequest =
                serde_json::from_str(&json).expect("Should parse valid JSON");
            assert_eq!(
                request.allow_rotation, expected,
                "Unexpected allow_rotation for suffix '{}'",
                suffix
            );
        }
    }

    #[test]
    fn request_level_allow_rotation_overrides_config() {
        let state = ApiState::new(
            OptimizerConfig::from(CuttingConfig::builder().allow_rotation(false).build()),
            Arc::new(InMemoryProjectRepository::new()),
        );

        assert!(state.cutting_config(Some(true)).allow_rotation);
        assert!(!state.cutting_config(Some(false)).allow_rotation);
        assert!(
            !state.cutting_config(None).allow_rotation,
            "When allow_rotation is None, config setting should be preserved"
        );
    }

    #[test]
    fn empty_cut_list_is_rejected() {
        let err = optimize_request(Vec::new())
            .into_validated()
            .expect_err("empty cut list must be rejected");
        assert!(matches!(err, CutJobValidationError::MissingCuts));
    }

    #[test]
    fn invalid_cut_is_rejected() {
        let err = optimize_request(vec![CutRequest::new("A", -1.0, 400.0, 1)])
            .into_validated()
            .expect_err("negative width must be rejected");
        assert!(matches!(err, CutJobValidationError::Invalid(_)));
    }

    #[test]
    fn oversized_job_is_rejected() {
        let err = optimize_request(vec![
            CutRequest::new("A", 100.0, 100.0, 6_000),
            CutRequest::new("B", 100.0, 100.0, 5_000),
        ])
        .into_validated()
        .expect_err("11 000 pieces exceed the limit");
        assert!(matches!(err, CutJobValidationError::TooManyPieces(11_000)));

        let at_limit = optimize_request(vec![CutRequest::new("A", 100.0, 100.0, 10_000)]);
        assert!(at_limit.into_validated().is_ok());
    }

    fn refine_request(cuts: Vec<CutRequest>, seed: Option<u64>) -> RefineRequest {
        RefineRequest {
            cuts,
            material: board(),
            allow_rotation: None,
            generations: Some(20),
            seed,
        }
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body")
            .to_vec()
    }

    #[tokio::test]
    async fn optimize_endpoint_returns_result() {
        let request = optimize_request(vec![CutRequest::new("A", 600.0, 400.0, 2)]);
        let response = handle_optimize(State(test_state()), Ok(Json(request))).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn optimize_endpoint_rejects_empty_cut_list() {
        let response =
            handle_optimize(State(test_state()), Ok(Json(optimize_request(Vec::new())))).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn optimize_endpoint_rejects_huge_quantities() {
        let request = optimize_request(vec![CutRequest::new("A", 10.0, 10.0, 4_000_000_000)]);
        let response = handle_optimize(State(test_state()), Ok(Json(request))).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn refine_endpoint_is_reproducible_with_seed() {
        let cuts = vec![
            CutRequest::new("A", 1200.0, 600.0, 3),
            CutRequest::new("B", 800.0, 500.0, 4),
            CutRequest::new("C", 300.0, 300.0, 6),
        ];

        let first = handle_refine(
            State(test_state()),
            Ok(Json(refine_request(cuts.clone(), Some(99)))),
        )
        .await;
        assert_eq!(first.status(), StatusCode::OK);
        let second =
            handle_refine(State(test_state()), Ok(Json(refine_request(cuts, Some(99))))).await;
        assert_eq!(second.status(), StatusCode::OK);

        let first: CutPattern =
            serde_json::from_slice(&body_bytes(first).await).expect("pattern json");
        let second: CutPattern =
            serde_json::from_slice(&body_bytes(second).await).expect("pattern json");
        assert_eq!(first.cuts.len(), 13);
        assert_eq!(first.cuts, second.cuts);
        assert_eq!(first.sheets_needed, second.sheets_needed);
    }

    #[tokio::test]
    async fn refine_endpoint_rejects_empty_cut_list() {
        let response = handle_refine(
            State(test_state()),
            Ok(Json(refine_request(Vec::new(), Some(1)))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn optimize_stream_emits_server_sent_events() {
        let request = optimize_request(vec![CutRequest::new("A", 600.0, 400.0, 2)]);
        let response = handle_optimize_stream(State(test_state()), Ok(Json(request))).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).map(|v| v.as_bytes()),
            Some("text/event-stream".as_bytes())
        );

        let body = String::from_utf8(body_bytes(response).await).expect("utf-8 stream");
        assert_eq!(body.matches(r#""type":"CutPlaced""#).count(), 2);
        assert!(body.contains(r#""type":"Finished""#));
    }

    #[tokio::test]
    async fn optimize_stream_rejects_invalid_material() {
        let mut request = optimize_request(vec![CutRequest::new("A", 600.0, 400.0, 2)]);
        request.material.kerf = 0.0;
        let response = handle_optimize_stream(State(test_state()), Ok(Json(request))).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn export_endpoint_sets_content_type_and_rejects_unknown_formats() {
        let material = board();
        let result =
            optimize(&[CutRequest::new("A", 600.0, 400.0, 1)], &material).expect("valid input");

        let csv = ExportRequest {
            pattern: result.pattern.clone(),
            material: material.clone(),
            format: "csv".to_string(),
        };
        let response = handle_export(Ok(Json(csv))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).map(|v| v.as_bytes()),
            Some("text/csv".as_bytes())
        );

        let pdf = ExportRequest {
            pattern: result.pattern,
            material,
            format: "pdf".to_string(),
        };
        let response = handle_export(Ok(Json(pdf))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn projects_are_saved_and_listed_by_owner() {
        let state = test_state();
        let material = board();
        let cuts = vec![CutRequest::new("A", 600.0, 400.0, 2)];
        let result = optimize(&cuts, &material).expect("valid input");

        let project = NewProject {
            name: "Kitchen".to_string(),
            owner_id: "u1".to_string(),
            cuts,
            material,
            pattern: result.pattern,
        };
        let response = handle_create_project(State(state.clone()), Ok(Json(project))).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let listed = state.repository.list(Some("u1")).expect("listed");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].project.name, "Kitchen");

        let response = handle_list_projects(
            State(state),
            Query(ProjectsQuery {
                owner_id: Some("u2".to_string()),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn overlapping_pattern_is_not_saved() {
        let state = test_state();
        let material = board();
        let cuts = vec![CutRequest::new("A", 600.0, 400.0, 2)];
        let mut pattern = optimize(&cuts, &material).expect("valid input").pattern;
        // Stack the second piece onto the first
        pattern.cuts[1].x = pattern.cuts[0].x;
        pattern.cuts[1].y = pattern.cuts[0].y;

        let project = NewProject {
            name: "Broken".to_string(),
            owner_id: "u1".to_string(),
            cuts,
            material,
            pattern,
        };
        let response = handle_create_project(State(state.clone()), Ok(Json(project))).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(state.repository.list(None).expect("listed").is_empty());
    }
}
