use anyhow::Context;
use tokio_postgres::error::SqlState;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls, Row, Statement};

use crate::api::{Book, BookId, NewBook};
use crate::books_repository::{BookRepository, BookRepositoryError};
use crate::search::BookSpecification;

const BOOK_COLUMNS: &str =
    "id, title, author, publication_date, category, isbn, rating, price, visible";

pub struct PostgresBooksRepository {
    client: Client,
}

#[derive(Debug, Clone)]
pub struct PostgresBooksRepositoryConfig {
    pub hostname: String,
    pub username: String,
    pub password: String,
}

impl PostgresBooksRepository {
    pub async fn init(config: PostgresBooksRepositoryConfig) -> anyhow::Result<Self> {
        let connection_str = format!(
            "postgresql://{}:{}@{}",
            config.username, config.password, config.hostname
        );
        tracing::info!(
            "Postgres connection to {} as {}",
            config.hostname,
            config.username
        );
        let (client, connection) = tokio_postgres::connect(&connection_str, NoTls)
            .await
            .context("Failed to start postgres")?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("Postgres connection error: {}", e);
            }
        });

        client
            .batch_execute(
                "
        CREATE TABLE IF NOT EXISTS books (
            id                  BIGSERIAL PRIMARY KEY,
            title               VARCHAR(200) NOT NULL,
            author              VARCHAR(150) NOT NULL,
            publication_date    DATE,
            category            VARCHAR(100),
            isbn                VARCHAR(20) UNIQUE,
            rating              INTEGER,
            price               NUMERIC(10, 2) NOT NULL,
            visible             BOOLEAN NOT NULL
            )
        ",
            )
            .await
            .context("Failed to setup table")?;
        Ok(Self { client })
    }
}

fn book_from_row(row: &Row) -> Result<Book, BookRepositoryError> {
    let book = || -> Result<Book, tokio_postgres::Error> {
        Ok(Book {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            author: row.try_get("author")?,
            publication_date: row.try_get("publication_date")?,
            category: row.try_get("category")?,
            isbn: row.try_get("isbn")?,
            rating: row.try_get("rating")?,
            price: row.try_get("price")?,
            visible: row.try_get("visible")?,
        })
    };
    book().map_err(|err| BookRepositoryError::DeserializationError(err.to_string()))
}

const PRIMARY_KEY_CONSTRAINT: &str = "books_pkey";

/// Translates constraint violations reported by postgres into repository errors
fn write_error(err: tokio_postgres::Error, isbn: Option<&str>) -> BookRepositoryError {
    constraint_error(&err, isbn).unwrap_or_else(|| err.into())
}

fn constraint_error(
    err: &tokio_postgres::Error,
    isbn: Option<&str>,
) -> Option<BookRepositoryError> {
    let db_error = err.as_db_error()?;
    let state = db_error.code();
    if state == &SqlState::UNIQUE_VIOLATION {
        if db_error.constraint() == Some(PRIMARY_KEY_CONSTRAINT) {
            return Some(BookRepositoryError::DuplicateIdentifier(
                db_error.detail().unwrap_or_default().to_string(),
            ));
        }
        return Some(BookRepositoryError::DuplicateIsbn(
            isbn.unwrap_or_default().to_string(),
        ));
    }
    if state == &SqlState::NOT_NULL_VIOLATION {
        return Some(BookRepositoryError::MissingRequiredField(
            db_error.column().unwrap_or_default().to_string(),
        ));
    }
    // class 23 - integrity constraint violation
    if state.code().starts_with("23") {
        return Some(BookRepositoryError::IntegrityViolation(
            db_error.message().to_string(),
        ));
    }
    None
}

#[async_trait::async_trait]
impl BookRepository for PostgresBooksRepository {
    async fn add_book(&self, book: NewBook) -> Result<Book, BookRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare(&format!(
                "INSERT INTO books \
                 (title, author, publication_date, category, isbn, rating, price, visible) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {BOOK_COLUMNS}"
            ))
            .await?;

        let rows = self
            .client
            .query(
                &stmt,
                &[
                    &book.title,
                    &book.author,
                    &book.publication_date,
                    &book.category,
                    &book.isbn,
                    &book.rating,
                    &book.price,
                    &book.visible,
                ],
            )
            .await
            .map_err(|err| write_error(err, book.isbn.as_deref()))?;

        let row = rows
            .first()
            .ok_or_else(|| BookRepositoryError::Other("Book not returned".to_string()))?;
        Ok(book_from_row(row)?)
    }

    async fn save_book(&self, book: Book) -> Result<Book, BookRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare(&format!(
                "UPDATE books SET title = $1, author = $2, publication_date = $3, category = $4, \
                 isbn = $5, rating = $6, price = $7, visible = $8 \
                 WHERE id = $9 RETURNING {BOOK_COLUMNS}"
            ))
            .await?;

        let rows = self
            .client
            .query(
                &stmt,
                &[
                    &book.title,
                    &book.author,
                    &book.publication_date,
                    &book.category,
                    &book.isbn,
                    &book.rating,
                    &book.price,
                    &book.visible,
                    &book.id,
                ],
            )
            .await
            .map_err(|err| write_error(err, book.isbn.as_deref()))?;

        let row = rows
            .first()
            .ok_or(BookRepositoryError::NotFound(book.id))?;
        Ok(book_from_row(row)?)
    }

    async fn get_book(&self, book_id: BookId) -> Result<Book, BookRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare(&format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = ($1)"))
            .await?;

        let rows = self.client.query(&stmt, &[&book_id]).await?;

        let row = rows
            .first()
            .ok_or(BookRepositoryError::NotFound(book_id))?;
        Ok(book_from_row(row)?)
    }

    async fn delete_book(&self, book_id: BookId) -> Result<(), BookRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare("DELETE FROM books WHERE id = ($1)")
            .await?;

        let deleted = self.client.execute(&stmt, &[&book_id]).await?;
        if deleted == 0 {
            return Err(BookRepositoryError::NotFound(book_id));
        }
        Ok(())
    }

    async fn find_books(
        &self,
        specification: &BookSpecification,
    ) -> Result<Vec<Book>, BookRepositoryError> {
        let predicate = specification.to_sql_where(1);
        let query = format!(
            "SELECT {BOOK_COLUMNS} FROM books {} ORDER BY id",
            predicate.clause
        );
        tracing::debug!("Searching books with: {}", query);

        let stmt: Statement = self.client.prepare(&query).await?;
        let params: Vec<&(dyn ToSql + Sync)> = predicate
            .params
            .iter()
            .map(|param| param.as_ref() as &(dyn ToSql + Sync))
            .collect();

        let rows = self.client.query(&stmt, &params).await?;

        rows.iter()
            .map(book_from_row)
            .collect()
    }
}
