use std::sync::Arc;

use rust_decimal::Decimal;
use validator::{Validate, ValidationErrors};

use crate::api::{Book, BookId, BookSearchQuery, NewBook, UpdateBookRequest};
use crate::books_repository::{BookRepository, BookRepositoryError};
use crate::search::BookSpecification;
use crate::validation;

#[derive(thiserror::Error, Debug)]
pub enum BooksServiceError {
    #[error("Book {0} not found")]
    NotFound(BookId),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Business rule {code} violated by field {field}")]
    BusinessRule {
        field: &'static str,
        code: &'static str,
    },

    #[error("Failed to apply merge patch: {0}")]
    InvalidPatch(String),

    #[error("Book with isbn {0} already exists")]
    DuplicateIsbn(String),

    #[error("Book with id {0} already exists")]
    DuplicateIdentifier(String),

    #[error("Required field {0} is missing")]
    MissingRequiredField(String),

    #[error("Integrity constraint violated: {0}")]
    IntegrityViolation(String),

    #[error("Repository failure: {0}")]
    Repository(BookRepositoryError),
}

impl From<BookRepositoryError> for BooksServiceError {
    fn from(err: BookRepositoryError) -> Self {
        match err {
            BookRepositoryError::NotFound(book_id) => BooksServiceError::NotFound(book_id),
            BookRepositoryError::DuplicateIsbn(isbn) => BooksServiceError::DuplicateIsbn(isbn),
            BookRepositoryError::DuplicateIdentifier(reason) => {
                BooksServiceError::DuplicateIdentifier(reason)
            }
            BookRepositoryError::MissingRequiredField(column) => {
                BooksServiceError::MissingRequiredField(column)
            }
            BookRepositoryError::IntegrityViolation(reason) => {
                BooksServiceError::IntegrityViolation(reason)
            }
            other => BooksServiceError::Repository(other),
        }
    }
}

/// Catalogue operations on top of a book repository
#[derive(Clone)]
pub struct BooksService {
    repository: Arc<dyn BookRepository>,
}

impl BooksService {
    pub fn new(repository: Arc<dyn BookRepository>) -> Self {
        Self { repository }
    }

    /// Books matching every filter that is set, all books when none is
    pub async fn get_books(&self, filters: &BookSearchQuery) -> Result<Vec<Book>, BooksServiceError> {
        let specification = BookSpecification::from_filters(filters);
        Ok(self.repository.find_books(&specification).await?)
    }

    pub async fn get_book(&self, book_id: BookId) -> Result<Book, BooksServiceError> {
        Ok(self.repository.get_book(book_id).await?)
    }

    pub async fn remove_book(&self, book_id: BookId) -> Result<(), BooksServiceError> {
        Ok(self.repository.delete_book(book_id).await?)
    }

    pub async fn create_book(&self, book: NewBook) -> Result<Book, BooksServiceError> {
        validate_price(&book.price)?;
        Ok(self.repository.add_book(book).await?)
    }

    /// Applies an RFC 7386 merge patch to the stored book.
    /// The identifier can not be patched, the patched book must still be a valid book.
    pub async fn patch_book(
        &self,
        book_id: BookId,
        patch: &serde_json::Value,
    ) -> Result<Book, BooksServiceError> {
        let book = self.repository.get_book(book_id).await?;

        let mut target = serde_json::to_value(&book)
            .map_err(|err| BooksServiceError::InvalidPatch(err.to_string()))?;
        json_patch::merge(&mut target, patch);
        let mut patched: Book = serde_json::from_value(target)
            .map_err(|err| BooksServiceError::InvalidPatch(err.to_string()))?;
        patched.id = book.id;

        UpdateBookRequest::from(&patched).validate()?;
        validate_price(&patched.price)?;

        Ok(self.repository.save_book(patched).await?)
    }

    /// Overwrites the stored fields that are set in the update
    pub async fn update_book(
        &self,
        book_id: BookId,
        update: UpdateBookRequest,
    ) -> Result<Book, BooksServiceError> {
        let mut book = self.repository.get_book(book_id).await?;
        book.apply_update(update);

        validate_price(&book.price)?;

        Ok(self.repository.save_book(book).await?)
    }
}

/// Prices must be strictly positive before anything is written
fn validate_price(price: &Decimal) -> Result<(), BooksServiceError> {
    tracing::info!("Validating price: {}", price);
    if *price <= Decimal::ZERO {
        tracing::error!("Price validation failed for value: {}", price);
        return Err(BooksServiceError::BusinessRule {
            field: "price",
            code: validation::PRICE_NOT_POSITIVE,
        });
    }
    Ok(())
}
