use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a session credential: liveness, the two
/// cookie-mutating session endpoints, and the read-only assignment listings.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /
        // Liveness check for monitoring and load balancers.
        .route("/", get(handlers::root))
        // POST /jwt
        // Issues the session credential cookie for the posted identity.
        .route("/jwt", post(handlers::issue_jwt))
        // POST /logout
        // Clears the session credential cookie.
        .route("/logout", post(handlers::logout))
        // GET /filter?difficulty=...
        .route("/filter", get(handlers::filter_assignments))
        // GET /search?search=...
        .route("/search", get(handlers::search_assignments))
        // GET /assignments
        .route("/assignments", get(handlers::list_assignments))
}
