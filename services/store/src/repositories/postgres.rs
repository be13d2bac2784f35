//! PostgreSQL-backed repositories

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use super::{BookRepository, RelationRepository, UserRepository};
use crate::filters::BookFilter;
use crate::models::{Book, BookChanges, BookDetail, NewBook, Rate, Reader, Relation, User};

const BOOK_COLUMNS: &str = "id, name, price, author_name, owner_id, rating";

const BOOK_DETAIL_SELECT: &str = r#"
    SELECT b.id, b.name, b.price, b.author_name, b.owner_id, b.rating,
           COALESCE(u.username, '') AS owner_name,
           (SELECT COUNT(*)
              FROM user_book_relations r
             WHERE r.book_id = b.id AND r.liked) AS annotated_likes
    FROM books b
    LEFT JOIN users u ON u.id = b.owner_id
"#;

const RELATION_COLUMNS: &str = "user_id, book_id, liked, in_bookmarks, rate";

/// Book repository for database operations
#[derive(Clone)]
pub struct PgBookRepository {
    pool: PgPool,
}

impl PgBookRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Readers of every given book, ordered by username
    async fn readers_for(&self, book_ids: &[i64]) -> Result<HashMap<i64, Vec<Reader>>> {
        if book_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query(
            r#"
            SELECT r.book_id, u.first_name, u.last_name
            FROM user_book_relations r
            JOIN users u ON u.id = r.user_id
            WHERE r.book_id = ANY($1)
            ORDER BY u.username
            "#,
        )
        .bind(book_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut readers: HashMap<i64, Vec<Reader>> = HashMap::new();
        for row in rows {
            readers
                .entry(row.get("book_id"))
                .or_default()
                .push(Reader::from_row(&row)?);
        }

        Ok(readers)
    }

    async fn with_readers(&self, rows: Vec<PgRow>) -> Result<Vec<BookDetail>> {
        let ids: Vec<i64> = rows.iter().map(|row| row.get("id")).collect();
        let mut readers = self.readers_for(&ids).await?;

        rows.into_iter()
            .map(|row| -> Result<BookDetail> {
                let book = Book::from_row(&row)?;
                Ok(BookDetail {
                    readers: readers.remove(&book.id).unwrap_or_default(),
                    owner_name: row.get("owner_name"),
                    annotated_likes: row.get("annotated_likes"),
                    book,
                })
            })
            .collect()
    }
}

#[async_trait]
impl BookRepository for PgBookRepository {
    async fn list(&self, filter: &BookFilter) -> Result<Vec<BookDetail>> {
        let mut query = QueryBuilder::<Postgres>::new(BOOK_DETAIL_SELECT);
        query.push(" WHERE TRUE");

        if let Some(price) = filter.price {
            query.push(" AND b.price = ").push_bind(price);
        }

        if let Some(pattern) = filter.search_pattern() {
            query
                .push(" AND (b.name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR b.author_name ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        query.push(" ORDER BY ");
        for ordering in &filter.ordering {
            query
                .push(ordering.field.column())
                .push(if ordering.descending { " DESC, " } else { " ASC, " });
        }
        query.push("b.id ASC");

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .context("failed to list books")?;

        self.with_readers(rows).await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(book)
    }

    async fn find_detail(&self, id: i64) -> Result<Option<BookDetail>> {
        let row = sqlx::query(&format!("{BOOK_DETAIL_SELECT} WHERE b.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(self.with_readers(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn create(&self, book: &NewBook, owner_id: Uuid) -> Result<Book> {
        let book = sqlx::query_as::<_, Book>(&format!(
            r#"
            INSERT INTO books (name, price, author_name, owner_id)
            VALUES ($1, $2, $3, $4)
            RETURNING {BOOK_COLUMNS}
            "#
        ))
        .bind(&book.name)
        .bind(book.price)
        .bind(&book.author_name)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await
        .context("failed to insert book")?;

        Ok(book)
    }

    async fn update(&self, id: i64, changes: &BookChanges) -> Result<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(&format!(
            r#"
            UPDATE books
            SET name = COALESCE($2, name),
                price = COALESCE($3, price),
                author_name = COALESCE($4, author_name)
            WHERE id = $1
            RETURNING {BOOK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.name.as_deref())
        .bind(changes.price)
        .bind(changes.author_name.as_deref())
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("failed to update book {id}"))?;

        Ok(book)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        // Relations go with the book through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_rating(&self, id: i64, rating: Option<Decimal>) -> Result<()> {
        sqlx::query("UPDATE books SET rating = $2 WHERE id = $1")
            .bind(id)
            .bind(rating)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// Relation repository for database operations
#[derive(Clone)]
pub struct PgRelationRepository {
    pool: PgPool,
}

impl PgRelationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn relation_from_row(row: &PgRow) -> Result<Relation> {
    let rate = row
        .get::<Option<i16>, _>("rate")
        .map(Rate::try_from)
        .transpose()
        .context("stored rate out of range")?;

    Ok(Relation {
        user_id: row.get("user_id"),
        book_id: row.get("book_id"),
        like: row.get("liked"),
        in_bookmarks: row.get("in_bookmarks"),
        rate,
    })
}

#[async_trait]
impl RelationRepository for PgRelationRepository {
    async fn get_or_create(&self, user_id: Uuid, book_id: i64) -> Result<Relation> {
        let mut tx = self.pool.begin().await?;

        // A racing insert for the same pair blocks here until it commits,
        // after which the conflict turns this into a no-op.
        sqlx::query(
            r#"
            INSERT INTO user_book_relations (user_id, book_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, book_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("failed to create relation for book {book_id}"))?;

        let row = sqlx::query(&format!(
            "SELECT {RELATION_COLUMNS} FROM user_book_relations WHERE user_id = $1 AND book_id = $2"
        ))
        .bind(user_id)
        .bind(book_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        relation_from_row(&row)
    }

    async fn save(&self, relation: &Relation) -> Result<Relation> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE user_book_relations
            SET liked = $3, in_bookmarks = $4, rate = $5
            WHERE user_id = $1 AND book_id = $2
            RETURNING {RELATION_COLUMNS}
            "#
        ))
        .bind(relation.user_id)
        .bind(relation.book_id)
        .bind(relation.like)
        .bind(relation.in_bookmarks)
        .bind(relation.rate.map(Rate::get))
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("failed to save relation for book {}", relation.book_id))?;

        relation_from_row(&row)
    }

    async fn rates_for_book(&self, book_id: i64) -> Result<Vec<Rate>> {
        let rates: Vec<i16> = sqlx::query_scalar(
            "SELECT rate FROM user_book_relations WHERE book_id = $1 AND rate IS NOT NULL",
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        rates
            .into_iter()
            .map(|rate| Rate::try_from(rate).context("stored rate out of range"))
            .collect()
    }
}

/// User lookups for authentication
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, first_name, last_name, is_staff
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}
