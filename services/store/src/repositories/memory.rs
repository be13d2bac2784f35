//! In-memory repositories backing the handler and rating tests

use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{BookRepository, RelationRepository, UserRepository};
use crate::filters::BookFilter;
use crate::models::book::fixed_scale;
use crate::models::{Book, BookChanges, BookDetail, NewBook, Rate, Reader, Relation, User};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    books: BTreeMap<i64, Book>,
    relations: BTreeMap<(Uuid, i64), Relation>,
    last_book_id: i64,
}

impl Inner {
    fn detail(&self, book: &Book) -> BookDetail {
        let owner_name = book
            .owner_id
            .and_then(|id| self.users.get(&id))
            .map(|user| user.username.clone())
            .unwrap_or_default();

        let relations: Vec<&Relation> = self
            .relations
            .values()
            .filter(|relation| relation.book_id == book.id)
            .collect();

        let annotated_likes = relations.iter().filter(|relation| relation.like).count() as i64;

        let mut readers: Vec<&User> = relations
            .iter()
            .filter_map(|relation| self.users.get(&relation.user_id))
            .collect();
        readers.sort_by(|a, b| a.username.cmp(&b.username));

        BookDetail {
            book: book.clone(),
            owner_name,
            annotated_likes,
            readers: readers.into_iter().map(Reader::from).collect(),
        }
    }
}

/// Every repository trait over one shared in-memory state
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(
        &self,
        username: &str,
        first_name: &str,
        last_name: &str,
        is_staff: bool,
    ) -> Uuid {
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            is_staff,
        };
        let id = user.id;
        self.inner.write().await.users.insert(id, user);
        id
    }

    pub async fn insert_book(
        &self,
        name: &str,
        price: i64,
        author_name: &str,
        owner_id: Option<Uuid>,
    ) -> i64 {
        let mut inner = self.inner.write().await;
        inner.last_book_id += 1;
        let id = inner.last_book_id;
        inner.books.insert(
            id,
            Book {
                id,
                name: name.to_string(),
                price: fixed_scale(Decimal::from(price)),
                author_name: author_name.to_string(),
                owner_id,
                rating: None,
            },
        );
        id
    }

    /// Insert or replace the relation for `(user_id, book_id)`
    pub async fn insert_relation(
        &self,
        user_id: Uuid,
        book_id: i64,
        like: bool,
        rate: Option<i16>,
    ) {
        let relation = Relation {
            user_id,
            book_id,
            like,
            in_bookmarks: false,
            rate: rate.map(|rate| Rate::try_from(rate).unwrap()),
        };
        self.inner
            .write()
            .await
            .relations
            .insert((user_id, book_id), relation);
    }

    pub async fn book(&self, id: i64) -> Option<Book> {
        self.inner.read().await.books.get(&id).cloned()
    }

    pub async fn relation(&self, user_id: Uuid, book_id: i64) -> Option<Relation> {
        self.inner
            .read()
            .await
            .relations
            .get(&(user_id, book_id))
            .cloned()
    }
}

#[async_trait]
impl BookRepository for MemoryStore {
    async fn list(&self, filter: &BookFilter) -> Result<Vec<BookDetail>> {
        let inner = self.inner.read().await;

        let mut books: Vec<&Book> = inner
            .books
            .values()
            .filter(|book| filter.matches(book))
            .collect();
        books.sort_by(|a, b| filter.compare(a, b));

        Ok(books.into_iter().map(|book| inner.detail(book)).collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Book>> {
        Ok(self.book(id).await)
    }

    async fn find_detail(&self, id: i64) -> Result<Option<BookDetail>> {
        let inner = self.inner.read().await;
        Ok(inner.books.get(&id).map(|book| inner.detail(book)))
    }

    async fn create(&self, book: &NewBook, owner_id: Uuid) -> Result<Book> {
        let mut inner = self.inner.write().await;
        inner.last_book_id += 1;

        let book = Book {
            id: inner.last_book_id,
            name: book.name.clone(),
            price: book.price,
            author_name: book.author_name.clone(),
            owner_id: Some(owner_id),
            rating: None,
        };
        inner.books.insert(book.id, book.clone());
        Ok(book)
    }

    async fn update(&self, id: i64, changes: &BookChanges) -> Result<Option<Book>> {
        let mut inner = self.inner.write().await;
        Ok(inner.books.get_mut(&id).map(|book| {
            changes.apply(book);
            book.clone()
        }))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let removed = inner.books.remove(&id).is_some();
        inner.relations.retain(|(_, book_id), _| *book_id != id);
        Ok(removed)
    }

    async fn set_rating(&self, id: i64, rating: Option<Decimal>) -> Result<()> {
        if let Some(book) = self.inner.write().await.books.get_mut(&id) {
            book.rating = rating;
        }
        Ok(())
    }
}

#[async_trait]
impl RelationRepository for MemoryStore {
    async fn get_or_create(&self, user_id: Uuid, book_id: i64) -> Result<Relation> {
        let mut inner = self.inner.write().await;
        let relation = inner
            .relations
            .entry((user_id, book_id))
            .or_insert_with(|| Relation::new(user_id, book_id));
        Ok(relation.clone())
    }

    async fn save(&self, relation: &Relation) -> Result<Relation> {
        self.inner
            .write()
            .await
            .relations
            .insert((relation.user_id, relation.book_id), relation.clone());
        Ok(relation.clone())
    }

    async fn rates_for_book(&self, book_id: i64) -> Result<Vec<Rate>> {
        let inner = self.inner.read().await;
        Ok(inner
            .relations
            .values()
            .filter(|relation| relation.book_id == book_id)
            .filter_map(|relation| relation.rate)
            .collect())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }
}
