//! Object-level authorization for books

use axum::http::Method;

use crate::error::ApiError;
use crate::models::{Book, User};

/// Methods that never modify state
pub fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Owner-or-staff-or-read-only.
///
/// Reads are open to everyone. Anything else needs an authenticated caller
/// who either owns the book or is staff.
pub fn can_mutate(method: &Method, identity: Option<&User>, book: &Book) -> bool {
    if is_safe_method(method) {
        return true;
    }

    match identity {
        Some(user) => book.owner_id == Some(user.id) || user.is_staff,
        None => false,
    }
}

/// [`can_mutate`] as a guard for handlers
pub fn check_object_permission(
    method: &Method,
    identity: Option<&User>,
    book: &Book,
) -> Result<(), ApiError> {
    if can_mutate(method, identity, book) {
        Ok(())
    } else {
        tracing::info!(
            book_id = book.id,
            user_id = ?identity.map(|user| user.id),
            %method,
            "Permission denied"
        );
        Err(ApiError::Forbidden)
    }
}
