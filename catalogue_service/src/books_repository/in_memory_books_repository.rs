use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::api::{Book, BookId, NewBook};
use crate::books_repository::{BookRepository, BookRepositoryError};
use crate::search::BookSpecification;

pub struct InMemoryBookRepository {
    book_sequence_generator: AtomicI64,
    books: parking_lot::RwLock<BTreeMap<BookId, Book>>,
}

impl Default for InMemoryBookRepository {
    fn default() -> Self {
        Self {
            book_sequence_generator: AtomicI64::new(1),
            books: Default::default(),
        }
    }
}

/// Fails if another book than `book_id` already uses the isbn
fn ensure_isbn_unique(
    books: &BTreeMap<BookId, Book>,
    isbn: Option<&str>,
    book_id: Option<BookId>,
) -> Result<(), BookRepositoryError> {
    let Some(isbn) = isbn else {
        return Ok(());
    };
    let taken = books
        .values()
        .any(|other| Some(other.id) != book_id && other.isbn.as_deref() == Some(isbn));
    if taken {
        return Err(BookRepositoryError::DuplicateIsbn(isbn.to_string()));
    }
    Ok(())
}

#[async_trait::async_trait]
impl BookRepository for InMemoryBookRepository {
    async fn add_book(&self, book: NewBook) -> Result<Book, BookRepositoryError> {
        let mut locked_books = self.books.write();
        ensure_isbn_unique(&locked_books, book.isbn.as_deref(), None)?;

        let id = self.book_sequence_generator.fetch_add(1, Ordering::Relaxed);
        let book = book.into_book(id);
        locked_books.insert(id, book.clone());
        Ok(book)
    }

    async fn save_book(&self, book: Book) -> Result<Book, BookRepositoryError> {
        let mut locked_books = self.books.write();
        if !locked_books.contains_key(&book.id) {
            return Err(BookRepositoryError::NotFound(book.id));
        }
        ensure_isbn_unique(&locked_books, book.isbn.as_deref(), Some(book.id))?;

        locked_books.insert(book.id, book.clone());
        Ok(book)
    }

    async fn get_book(&self, book_id: BookId) -> Result<Book, BookRepositoryError> {
        self.books
            .read()
            .get(&book_id)
            .cloned()
            .ok_or(BookRepositoryError::NotFound(book_id))
    }

    async fn delete_book(&self, book_id: BookId) -> Result<(), BookRepositoryError> {
        self.books
            .write()
            .remove(&book_id)
            .map(|_| ())
            .ok_or(BookRepositoryError::NotFound(book_id))
    }

    async fn find_books(
        &self,
        specification: &BookSpecification,
    ) -> Result<Vec<Book>, BookRepositoryError> {
        Ok(self
            .books
            .read()
            .values()
            .filter(|book| specification.is_satisfied_by(book))
            .cloned()
            .collect())
    }
}
