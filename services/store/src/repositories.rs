//! Persistence seams for books, relations and users

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::filters::BookFilter;
use crate::models::{Book, BookChanges, BookDetail, NewBook, Rate, Relation, User};

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::{PgBookRepository, PgRelationRepository, PgUserRepository};

/// Book storage
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Books matching the filter, in the filter's order, with derived fields
    async fn list(&self, filter: &BookFilter) -> Result<Vec<BookDetail>>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Book>>;

    /// A single book with owner name, like count and readers
    async fn find_detail(&self, id: i64) -> Result<Option<BookDetail>>;

    async fn create(&self, book: &NewBook, owner_id: Uuid) -> Result<Book>;

    /// Apply the given changes; `None` when the book is gone
    async fn update(&self, id: i64, changes: &BookChanges) -> Result<Option<Book>>;

    /// Delete a book and its relations; `false` when nothing was deleted
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Overwrite the stored aggregate rating
    async fn set_rating(&self, id: i64, rating: Option<Decimal>) -> Result<()>;
}

/// User-book relation storage
#[async_trait]
pub trait RelationRepository: Send + Sync {
    /// Fetch the relation for `(user, book)`, creating a blank one if missing.
    ///
    /// Concurrent callers for the same pair must all end up with the same row.
    async fn get_or_create(&self, user_id: Uuid, book_id: i64) -> Result<Relation>;

    /// Persist every field of an existing relation
    async fn save(&self, relation: &Relation) -> Result<Relation>;

    /// Every non-null rate given to a book
    async fn rates_for_book(&self, book_id: i64) -> Result<Vec<Rate>>;
}

/// Read access to users managed by the authentication collaborator
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;
}
