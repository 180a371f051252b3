/// Router Module Index
///
/// Splits the route table by access requirement. The access guard is applied to
/// the whole `guarded` router as a layer, so a route cannot be added there and
/// accidentally skip it.

/// Routes that never require a session credential.
pub mod public;

/// Routes behind the access guard (see `auth::access_guard`).
pub mod guarded;
