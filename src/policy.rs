use crate::{auth::Caller, config::AccessMode, error::ApiError};

/// ensure_owner
///
/// Resource authorization for identity-scoped routes: the authenticated caller
/// must be the identity that owns the requested data (`owner`).
///
/// * `AccessMode::Guarded`: anonymous callers get `Unauthorized`; a missing owner
///   or an owner that differs from the caller's email gets `Forbidden`.
/// * `AccessMode::Open`: no check is made.
///
/// Must run before any store query so a refused request never touches the store.
pub fn ensure_owner(mode: AccessMode, caller: &Caller, owner: Option<&str>) -> Result<(), ApiError> {
    if mode == AccessMode::Open {
        return Ok(());
    }

    let email = caller.email().ok_or(ApiError::Unauthorized)?;

    match owner {
        Some(owner) if owner == email => Ok(()),
        _ => {
            tracing::debug!(caller = %email, requested = ?owner, "owner check refused");
            Err(ApiError::Forbidden)
        }
    }
}
