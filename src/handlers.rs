use crate::{
    AppState,
    auth::{self, Caller, IdentityPayload},
    config::{AppConfig, GradingPolicy},
    error::{ApiError, ErrorResponse},
    extract::{JsonBody, QueryParams},
    join::{self, JoinedSubmission},
    models::{
        Assignment, AssignmentFields, AssignmentPatch, AssignmentQuery, DeleteResult,
        GradeRequest, InsertResult, Submission, SubmissionFields, SubmissionQuery, UpdateResult,
    },
    policy,
};
use axum::{
    Json,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

// --- Query Structs ---

/// DifficultyFilter
///
/// Query parameters of `GET /filter`.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DifficultyFilter {
    /// Exact difficulty to match. Empty or `all` disables the filter.
    pub difficulty: Option<String>,
}

/// SearchQuery
///
/// Query parameters of `GET /search`.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Case-insensitive substring of the title. Blank matches everything.
    pub search: Option<String>,
}

/// OwnerQuery
///
/// Query parameters of `GET /mySubmission`.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OwnerQuery {
    /// Owner whose submissions are requested; must be the caller in guarded mode.
    pub email: Option<String>,
}

/// SessionResponse
///
/// Body of the two cookie-mutating endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, TS, utoipa::ToSchema, PartialEq)]
#[ts(export)]
pub struct SessionResponse {
    pub success: bool,
}

/// Parses a store id taken from the path.
fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request(format!("invalid id: {raw}")))
}

// --- Liveness ---

/// root
///
/// [Public Route] Plain-text liveness answer.
#[utoipa::path(get, path = "/", responses((status = 200, description = "Alive", body = String)))]
pub async fn root() -> &'static str {
    "Assignment Hub server is running"
}

// --- Session ---

/// issue_jwt
///
/// [Public Route] Signs a session credential for the posted identity and attaches
/// it as an HTTP-only cookie.
#[utoipa::path(
    post,
    path = "/jwt",
    request_body = IdentityPayload,
    responses(
        (status = 200, description = "Cookie set", body = SessionResponse),
        (status = 400, description = "Missing email", body = ErrorResponse)
    )
)]
pub async fn issue_jwt(
    State(config): State<AppConfig>,
    JsonBody(identity): JsonBody<IdentityPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let email = identity.email.clone();
    let token = auth::issue_token(identity, &config.jwt_secret, chrono::Utc::now())?;
    tracing::info!(%email, "session credential issued");

    Ok((
        [(
            header::SET_COOKIE,
            auth::session_cookie(&token, config.secure_cookies()),
        )],
        Json(SessionResponse { success: true }),
    ))
}

/// logout
///
/// [Public Route] Clears the session cookie. Tokens are not tracked server-side,
/// so there is nothing else to revoke.
#[utoipa::path(
    post,
    path = "/logout",
    responses((status = 200, description = "Cookie cleared", body = SessionResponse))
)]
pub async fn logout(State(config): State<AppConfig>) -> impl IntoResponse {
    (
        [(
            header::SET_COOKIE,
            auth::clear_session_cookie(config.secure_cookies()),
        )],
        Json(SessionResponse { success: true }),
    )
}

// --- Assignments ---

/// filter_assignments
///
/// [Public Route] Lists assignments of one difficulty, or all of them.
#[utoipa::path(
    get,
    path = "/filter",
    params(DifficultyFilter),
    responses((status = 200, description = "Assignments", body = [Assignment]))
)]
pub async fn filter_assignments(
    State(state): State<AppState>,
    QueryParams(filter): QueryParams<DifficultyFilter>,
) -> Result<Json<Vec<Assignment>>, ApiError> {
    let query = AssignmentQuery::by_difficulty(filter.difficulty);
    Ok(Json(state.repo.list_assignments(&query).await?))
}

/// search_assignments
///
/// [Public Route] Lists assignments whose title contains the search term.
#[utoipa::path(
    get,
    path = "/search",
    params(SearchQuery),
    responses((status = 200, description = "Assignments", body = [Assignment]))
)]
pub async fn search_assignments(
    State(state): State<AppState>,
    QueryParams(search): QueryParams<SearchQuery>,
) -> Result<Json<Vec<Assignment>>, ApiError> {
    let query = AssignmentQuery::by_title(search.search);
    Ok(Json(state.repo.list_assignments(&query).await?))
}

/// list_assignments
///
/// [Public Route] Lists every assignment in insertion order.
#[utoipa::path(
    get,
    path = "/assignments",
    responses((status = 200, description = "Assignments", body = [Assignment]))
)]
pub async fn list_assignments(
    State(state): State<AppState>,
) -> Result<Json<Vec<Assignment>>, ApiError> {
    Ok(Json(
        state.repo.list_assignments(&AssignmentQuery::default()).await?,
    ))
}

/// get_assignment
///
/// [Guarded Route] Fetches one assignment.
#[utoipa::path(
    get,
    path = "/assignments/{id}",
    params(("id" = String, Path, description = "Assignment ID")),
    responses(
        (status = 200, description = "Found", body = Assignment),
        (status = 401, description = "No valid session", body = ErrorResponse),
        (status = 404, description = "Not Found", body = ErrorResponse)
    )
)]
pub async fn get_assignment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Assignment>, ApiError> {
    let id = parse_id(&id)?;
    state
        .repo
        .get_assignment(id)
        .await?
        .map(Json)
        .ok_or(ApiError::not_found("assignment"))
}

/// update_assignment
///
/// [Guarded Route] Sets the editable fields present in the body. Creates the
/// assignment under this id when it does not exist yet.
///
/// Any authenticated caller may edit any assignment: documents record no creator.
#[utoipa::path(
    put,
    path = "/update/{id}",
    params(("id" = String, Path, description = "Assignment ID")),
    request_body = AssignmentPatch,
    responses(
        (status = 200, description = "Write result", body = UpdateResult),
        (status = 401, description = "No valid session", body = ErrorResponse)
    )
)]
pub async fn update_assignment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<AssignmentPatch>,
) -> Result<Json<UpdateResult>, ApiError> {
    let id = parse_id(&id)?;
    let result = state.repo.update_assignment(id, &patch).await?;
    tracing::info!(%id, modified = result.modified_count, upserted = result.upserted_count, "assignment updated");
    Ok(Json(result))
}

/// create_assignment
///
/// [Guarded Route] Stores the posted assignment document as-is.
#[utoipa::path(
    post,
    path = "/createAssignment",
    request_body = AssignmentFields,
    responses(
        (status = 200, description = "Created", body = InsertResult),
        (status = 401, description = "No valid session", body = ErrorResponse)
    )
)]
pub async fn create_assignment(
    State(state): State<AppState>,
    JsonBody(fields): JsonBody<AssignmentFields>,
) -> Result<Json<InsertResult>, ApiError> {
    let assignment = state.repo.create_assignment(fields.without_id()).await?;
    tracing::info!(id = %assignment.id, "assignment created");
    Ok(Json(InsertResult::new(assignment.id)))
}

/// delete_assignment
///
/// [Guarded Route] Deletes an assignment. Submissions that reference it are kept
/// and simply stop being enriched by the join.
#[utoipa::path(
    delete,
    path = "/assignments/{id}",
    params(("id" = String, Path, description = "Assignment ID")),
    responses(
        (status = 200, description = "Write result", body = DeleteResult),
        (status = 401, description = "No valid session", body = ErrorResponse)
    )
)]
pub async fn delete_assignment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResult>, ApiError> {
    let id = parse_id(&id)?;
    let result = state.repo.delete_assignment(id).await?;
    tracing::info!(%id, deleted = result.deleted_count, "assignment deleted");
    Ok(Json(result))
}

// --- Submissions ---

/// my_submissions
///
/// [Guarded + Owner-Checked Route] Lists the caller's own submissions, joined with
/// their assignments. The owner check runs before the store is queried.
#[utoipa::path(
    get,
    path = "/mySubmission",
    params(OwnerQuery),
    responses(
        (status = 200, description = "My submissions", body = [JoinedSubmission]),
        (status = 401, description = "No valid session", body = ErrorResponse),
        (status = 403, description = "Not the caller's email", body = ErrorResponse)
    )
)]
pub async fn my_submissions(
    caller: Caller,
    State(state): State<AppState>,
    QueryParams(owner): QueryParams<OwnerQuery>,
) -> Result<Json<Vec<JoinedSubmission>>, ApiError> {
    policy::ensure_owner(state.config.access_mode, &caller, owner.email.as_deref())?;

    let email = owner
        .email
        .ok_or_else(|| ApiError::bad_request("email is required"))?;

    let submissions = state
        .repo
        .list_submissions(&SubmissionQuery::owned_by(email))
        .await?;
    Ok(Json(
        join::join_submissions(state.repo.as_ref(), submissions).await?,
    ))
}

/// pending_submissions
///
/// [Guarded Route] Lists every submission still waiting for a grade, joined with
/// their assignments.
#[utoipa::path(
    get,
    path = "/pending",
    responses(
        (status = 200, description = "Pending submissions", body = [JoinedSubmission]),
        (status = 401, description = "No valid session", body = ErrorResponse)
    )
)]
pub async fn pending_submissions(
    State(state): State<AppState>,
) -> Result<Json<Vec<JoinedSubmission>>, ApiError> {
    let submissions = state
        .repo
        .list_submissions(&SubmissionQuery::pending())
        .await?;
    Ok(Json(
        join::join_submissions(state.repo.as_ref(), submissions).await?,
    ))
}

/// get_submission
///
/// [Guarded Route] Fetches one submission, without the join.
#[utoipa::path(
    get,
    path = "/pending/{id}",
    params(("id" = String, Path, description = "Submission ID")),
    responses(
        (status = 200, description = "Found", body = Submission),
        (status = 401, description = "No valid session", body = ErrorResponse),
        (status = 404, description = "Not Found", body = ErrorResponse)
    )
)]
pub async fn get_submission(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Submission>, ApiError> {
    let id = parse_id(&id)?;
    state
        .repo
        .get_submission(id)
        .await?
        .map(Json)
        .ok_or(ApiError::not_found("submission"))
}

/// give_mark
///
/// [Guarded Route] Grades a submission: writes status, awarded mark and feedback.
///
/// *Unknown id*: with `GradingPolicy::Strict` the answer is 404 and nothing is
/// written; with `GradingPolicy::Upsert` a new submission holding only the grade
/// fields is created.
#[utoipa::path(
    patch,
    path = "/giveMark/{id}",
    params(("id" = String, Path, description = "Submission ID")),
    request_body = GradeRequest,
    responses(
        (status = 200, description = "Write result", body = UpdateResult),
        (status = 401, description = "No valid session", body = ErrorResponse),
        (status = 404, description = "Not Found (strict policy)", body = ErrorResponse)
    )
)]
pub async fn give_mark(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(grade): JsonBody<GradeRequest>,
) -> Result<Json<UpdateResult>, ApiError> {
    let id = parse_id(&id)?;
    let upsert = state.config.grading_policy == GradingPolicy::Upsert;

    let result = state.repo.grade_submission(id, &grade, upsert).await?;
    if result.wrote_nothing() {
        return Err(ApiError::not_found("submission"));
    }
    if result.upserted_count > 0 {
        tracing::warn!(%id, "grading created a new submission (upsert policy)");
    }

    tracing::info!(%id, status = %grade.status, "submission graded");
    Ok(Json(result))
}

/// create_submission
///
/// [Guarded + Owner-Checked Route] Records a submission. The submission's `email`
/// must be the caller's own; status defaults to `Pending`.
#[utoipa::path(
    post,
    path = "/submittedAssignment",
    request_body = SubmissionFields,
    responses(
        (status = 200, description = "Created", body = InsertResult),
        (status = 400, description = "Missing assignmentId", body = ErrorResponse),
        (status = 401, description = "No valid session", body = ErrorResponse),
        (status = 403, description = "Submitting for someone else", body = ErrorResponse)
    )
)]
pub async fn create_submission(
    caller: Caller,
    State(state): State<AppState>,
    JsonBody(fields): JsonBody<SubmissionFields>,
) -> Result<Json<InsertResult>, ApiError> {
    policy::ensure_owner(state.config.access_mode, &caller, Some(fields.email.as_str()))?;

    if fields.assignment_id.trim().is_empty() {
        return Err(ApiError::bad_request("assignmentId is required"));
    }

    let submission = state.repo.create_submission(fields.without_id()).await?;
    tracing::info!(id = %submission.id, assignment = %submission.fields.assignment_id, "submission recorded");
    Ok(Json(InsertResult::new(submission.id)))
}
