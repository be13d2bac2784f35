//! Book store routes

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{Method, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, patch},
};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    error::{ApiError, ApiResult},
    filters::{BookFilter, BookListParams},
    middleware::{CurrentUser, authenticate},
    models::{BookPayload, BookResponse, Relation, RelationPatch, User},
    permissions::check_object_permission,
    rating,
    state::AppState,
};


/// Create the router for the book store service
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/books", get(list_books).post(create_book))
        .route(
            "/books/:id",
            get(retrieve_book)
                .put(update_book)
                .patch(update_book)
                .delete(delete_book),
        )
        .route(
            "/relations/:book_id",
            patch(upsert_relation).put(upsert_relation),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn identity(current: &Option<Extension<CurrentUser>>) -> Option<&User> {
    current.as_ref().map(|Extension(CurrentUser(user))| user)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "store"
    }))
}

/// List books with optional `price`, `search` and `ordering`
pub async fn list_books(
    State(state): State<AppState>,
    Query(params): Query<BookListParams>,
) -> ApiResult<Json<Vec<BookResponse>>> {
    let filter = BookFilter::try_from(params)?;
    let books = state.books.list(&filter).await?;

    Ok(Json(books.into_iter().map(BookResponse::from).collect()))
}

/// Get a single book
pub async fn retrieve_book(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<BookResponse>> {
    let detail = state
        .books
        .find_detail(id)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(detail.into()))
}

/// Create a book owned by the caller
pub async fn create_book(
    State(state): State<AppState>,
    current: Option<Extension<CurrentUser>>,
    payload: Result<Json<BookPayload>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let owner = identity(&current).ok_or(ApiError::Unauthorized)?;
    let Json(payload) = payload?;
    let new_book = payload.into_new_book()?;

    let book = state.books.create(&new_book, owner.id).await?;
    info!(book_id = book.id, owner_id = %owner.id, "Book created");

    let detail = state
        .books
        .find_detail(book.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("book {} missing right after insert", book.id))?;

    Ok((StatusCode::CREATED, Json(BookResponse::from(detail))))
}

/// Full (`PUT`) or partial (`PATCH`) update
pub async fn update_book(
    State(state): State<AppState>,
    method: Method,
    current: Option<Extension<CurrentUser>>,
    Path(id): Path<i64>,
    payload: Result<Json<BookPayload>, JsonRejection>,
) -> ApiResult<Json<BookResponse>> {
    let book = state
        .books
        .find_by_id(id)
        .await?
        .ok_or(ApiError::NotFound)?;
    check_object_permission(&method, identity(&current), &book)?;

    let Json(payload) = payload?;
    let changes = payload.into_changes(method == Method::PATCH)?;

    state
        .books
        .update(id, &changes)
        .await?
        .ok_or(ApiError::NotFound)?;
    info!(book_id = id, %method, "Book updated");

    let detail = state
        .books
        .find_detail(id)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(detail.into()))
}

pub async fn delete_book(
    State(state): State<AppState>,
    method: Method,
    current: Option<Extension<CurrentUser>>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let book = state
        .books
        .find_by_id(id)
        .await?
        .ok_or(ApiError::NotFound)?;
    check_object_permission(&method, identity(&current), &book)?;

    if !state.books.delete(id).await? {
        return Err(ApiError::NotFound);
    }
    info!(book_id = id, "Book deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Like, bookmark or rate a book as the caller.
///
/// The relation is created on first use. Touching `rate`, including setting
/// it to `null`, recomputes the book's rating.
pub async fn upsert_relation(
    State(state): State<AppState>,
    current: Option<Extension<CurrentUser>>,
    Path(book_id): Path<i64>,
    payload: Result<Json<RelationPatch>, JsonRejection>,
) -> ApiResult<Json<Relation>> {
    let user = identity(&current).ok_or(ApiError::Unauthorized)?;
    let Json(patch) = payload?;
    let changes = patch.validate()?;

    if state.books.find_by_id(book_id).await?.is_none() {
        return Err(ApiError::NotFound);
    }

    let mut relation = state.relations.get_or_create(user.id, book_id).await?;
    changes.apply(&mut relation);
    let relation = state.relations.save(&relation).await?;

    if changes.touches_rate() {
        rating::set_rating(state.books.as_ref(), state.relations.as_ref(), book_id).await?;
    }

    info!(book_id, user_id = %user.id, "Relation saved");
    Ok(Json(relation))
}
