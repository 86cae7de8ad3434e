//! PostgreSQL storage: one row per book and reader, a junction row per loan.
//!
//! Only record changes are accepted; each request is applied in one
//! transaction.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, FromRow, PgConnection, Pool, Postgres};

use crate::{
    config::DatabaseConfig,
    models::{Book, BookKey, Reader},
};

use super::{
    Capability, Change, LibrarySnapshot, SaveRequest, StorageError, StorageGateway, StorageResult,
};

#[derive(Debug, FromRow)]
struct BookRow {
    title: String,
    author: String,
    available_quantity: i32,
    total_quantity: i32,
}

impl TryFrom<BookRow> for Book {
    type Error = StorageError;

    fn try_from(row: BookRow) -> Result<Self, Self::Error> {
        let key = BookKey::new(row.title, row.author);
        let available = u32::try_from(row.available_quantity)
            .map_err(|_| StorageError::Corrupt(format!("negative available quantity for {}", key)))?;
        let total = u32::try_from(row.total_quantity)
            .map_err(|_| StorageError::Corrupt(format!("negative total quantity for {}", key)))?;
        Book::from_parts(key, available, total).map_err(|e| StorageError::Corrupt(e.to_string()))
    }
}

#[derive(Debug, FromRow)]
struct BorrowRow {
    reader_name: String,
    title: String,
    author: String,
}

fn quantity(book: &Book, value: u32) -> StorageResult<i32> {
    i32::try_from(value)
        .map_err(|_| StorageError::Corrupt(format!("quantity {} out of range for {}", value, book.key())))
}

#[derive(Clone)]
pub struct PostgresGateway {
    pool: Pool<Postgres>,
}

impl PostgresGateway {
    /// Connect, then bring the schema up to date
    pub async fn connect(config: &DatabaseConfig) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect(&config.url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations completed");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }

    async fn upsert_book(conn: &mut PgConnection, book: &Book) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO books (title, author, available_quantity, total_quantity)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (title, author) DO UPDATE
            SET available_quantity = EXCLUDED.available_quantity,
                total_quantity = EXCLUDED.total_quantity
            "#,
        )
        .bind(book.title())
        .bind(book.author())
        .bind(quantity(book, book.available_quantity())?)
        .bind(quantity(book, book.total_quantity())?)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    async fn insert_reader(conn: &mut PgConnection, name: &str) -> StorageResult<()> {
        sqlx::query("INSERT INTO readers (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(name)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    async fn link_borrow(conn: &mut PgConnection, reader: &str, book: &BookKey) -> StorageResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO borrowed_books (reader_name, title, author)
            VALUES ($1, $2, $3)
            ON CONFLICT (reader_name, title, author) DO NOTHING
            "#,
        )
        .bind(reader)
        .bind(&book.title)
        .bind(&book.author)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            tracing::warn!("Loan of {} to \"{}\" was already stored", book, reader);
        }
        Ok(())
    }

    async fn unlink_borrow(conn: &mut PgConnection, reader: &str, book: &BookKey) -> StorageResult<()> {
        let result = sqlx::query(
            "DELETE FROM borrowed_books WHERE reader_name = $1 AND title = $2 AND author = $3",
        )
        .bind(reader)
        .bind(&book.title)
        .bind(&book.author)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            tracing::warn!("No stored loan of {} to \"{}\" to delete", book, reader);
        }
        Ok(())
    }

    async fn apply(conn: &mut PgConnection, change: &Change) -> StorageResult<()> {
        match change {
            Change::UpsertBook(book) => Self::upsert_book(conn, book).await,
            Change::InsertReader(name) => Self::insert_reader(conn, name).await,
            Change::LinkBorrow { reader, book } => Self::link_borrow(conn, reader, book).await,
            Change::UnlinkBorrow { reader, book } => Self::unlink_borrow(conn, reader, book).await,
        }
    }

    async fn save_changes(&self, changes: &[Change]) -> StorageResult<()> {
        let mut tx = self.pool.begin().await?;
        for change in changes {
            Self::apply(&mut tx, change).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl StorageGateway for PostgresGateway {
    fn capability(&self) -> Capability {
        Capability::Incremental
    }

    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn load(&self) -> StorageResult<LibrarySnapshot> {
        let books = sqlx::query_as::<_, BookRow>(
            r#"
            SELECT title, author, available_quantity, total_quantity
            FROM books
            ORDER BY position
            "#,
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Book::try_from)
        .collect::<StorageResult<Vec<_>>>()?;

        let names: Vec<String> = sqlx::query_scalar("SELECT name FROM readers ORDER BY position")
            .fetch_all(&self.pool)
            .await?;

        let loans = sqlx::query_as::<_, BorrowRow>(
            "SELECT reader_name, title, author FROM borrowed_books ORDER BY position",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut borrowed: HashMap<String, Vec<BookKey>> = HashMap::new();
        for loan in loans {
            borrowed
                .entry(loan.reader_name)
                .or_default()
                .push(BookKey::new(loan.title, loan.author));
        }

        let readers = names
            .into_iter()
            .map(|name| {
                let keys = borrowed.remove(&name).unwrap_or_default();
                Reader::with_borrowed(name, keys)
            })
            .collect();

        Ok(LibrarySnapshot { books, readers })
    }

    async fn save(&self, request: SaveRequest<'_>) -> StorageResult<()> {
        match request {
            SaveRequest::Changes(changes) => self.save_changes(changes).await,
            SaveRequest::Catalog(_) | SaveRequest::Readers(_) => {
                Err(StorageError::Unsupported(request.describe()))
            }
        }
    }
}
