use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, patch, post, put},
};

/// Guarded Router Module
///
/// Every mutating or identity-scoped endpoint. The caller wraps this router in
/// `auth::access_guard`; handlers that are additionally owner-checked
/// (`/mySubmission`, `/submittedAssignment`) call `policy::ensure_owner` before
/// touching the store.
pub fn guarded_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Assignments ---
        // GET/DELETE /assignments/{id}
        .route(
            "/assignments/{id}",
            get(handlers::get_assignment).delete(handlers::delete_assignment),
        )
        // PUT /update/{id}
        // Partial update with upsert semantics.
        .route("/update/{id}", put(handlers::update_assignment))
        // POST /createAssignment
        .route("/createAssignment", post(handlers::create_assignment))
        // --- Submissions ---
        // GET /mySubmission?email=...
        // Owner-checked: the email must be the caller's.
        .route("/mySubmission", get(handlers::my_submissions))
        // GET /pending
        // All submissions awaiting a grade, joined with their assignments.
        .route("/pending", get(handlers::pending_submissions))
        // GET /pending/{id}
        .route("/pending/{id}", get(handlers::get_submission))
        // PATCH /giveMark/{id}
        .route("/giveMark/{id}", patch(handlers::give_mark))
        // POST /submittedAssignment
        // Owner-checked: the submission's email must be the caller's.
        .route("/submittedAssignment", post(handlers::create_submission))
}
