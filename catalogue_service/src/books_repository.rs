pub use in_memory_books_repository::InMemoryBookRepository;
pub use postgres_books_repository::{PostgresBooksRepository, PostgresBooksRepositoryConfig};

use crate::api::{Book, BookId, NewBook};
use crate::search::BookSpecification;

mod in_memory_books_repository;
mod postgres_books_repository;

#[derive(thiserror::Error, Debug)]
pub enum BookRepositoryError {
    #[error("Book {0} not found")]
    NotFound(BookId),

    #[error("Book with isbn {0} already exists")]
    DuplicateIsbn(String),

    #[error("Book with id {0} already exists")]
    DuplicateIdentifier(String),

    #[error("Required field {0} is missing")]
    MissingRequiredField(String),

    #[error("Integrity constraint violated: {0}")]
    IntegrityViolation(String),

    #[error("Failed to read stored book {0}")]
    DeserializationError(String),

    #[error("DatabaseFailure failure {0}")]
    DatabaseFailure(#[from] tokio_postgres::Error),

    #[error("Other error {0}")]
    Other(String),
}

#[async_trait::async_trait]
pub trait BookRepository: Send + Sync {
    /// Adds book to repository, returns the stored book with the id assigned to it
    async fn add_book(&self, book: NewBook) -> Result<Book, BookRepositoryError>;
    /// Replaces the stored book having the same id, fails with NotFound if there is none
    async fn save_book(&self, book: Book) -> Result<Book, BookRepositoryError>;
    /// Retrieves the book from repository
    async fn get_book(&self, book_id: BookId) -> Result<Book, BookRepositoryError>;
    /// Removes the book from repository, fails with NotFound if there is none
    async fn delete_book(&self, book_id: BookId) -> Result<(), BookRepositoryError>;
    /// Lists books satisfying the specification ordered by id
    async fn find_books(
        &self,
        specification: &BookSpecification,
    ) -> Result<Vec<Book>, BookRepositoryError>;
}
