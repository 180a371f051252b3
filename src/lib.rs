use axum::{
    Router,
    extract::FromRef,
    http::{HeaderName, HeaderValue, Method, header},
    middleware,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod join;
pub mod memory_store;
pub mod models;
pub mod policy;
pub mod repository;

// Route table, split by access requirement (public / guarded).
pub mod routes;
use routes::{guarded, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{ApiError, RepoError};
pub use memory_store::MemoryRepository;
pub use repository::{PostgresRepository, Repository, RepositoryState};

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and `ToSchema` model into the
/// OpenAPI document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::root, handlers::issue_jwt, handlers::logout,
        handlers::filter_assignments, handlers::search_assignments, handlers::list_assignments,
        handlers::get_assignment, handlers::update_assignment, handlers::create_assignment,
        handlers::delete_assignment, handlers::my_submissions, handlers::pending_submissions,
        handlers::get_submission, handlers::give_mark, handlers::create_submission
    ),
    components(
        schemas(
            models::Assignment, models::AssignmentFields, models::AssignmentPatch,
            models::Submission, models::SubmissionFields, models::GradeRequest,
            models::InsertResult, models::UpdateResult, models::DeleteResult,
            join::JoinedSubmission, auth::IdentityPayload, handlers::SessionResponse,
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "assignment-hub", description = "Assignment sharing and peer grading API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, immutable container holding the injected dependencies every
/// request needs: the store handle and the loaded configuration (which carries
/// the signing secret). Nothing else is shared between requests.
#[derive(Clone)]
pub struct AppState {
    /// Store adapters for the `assignment` and `submitted` collections.
    pub repo: RepositoryState,
    /// The loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// cors_layer
///
/// The web client runs on its own origin and sends the session cookie, so the
/// allowed origins must be listed explicitly (a wildcard cannot carry credentials).
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .client_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE])
}

/// create_router
///
/// Assembles the route table, applies the access guard to the guarded routes,
/// and wraps everything in the observability and CORS layers.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        // Guarded routes: the access guard runs before any of their handlers.
        .merge(
            guarded::guarded_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth::access_guard,
            )),
        )
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                // Generates a unique UUID for every incoming request.
                .layer(SetRequestIdLayer::new(
                    x_request_id.clone(),
                    MakeRequestUuid,
                ))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // Echoes x-request-id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the per-request span so every log line of one request is correlated
/// by its `x-request-id`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
