use chrono::{DateTime, NaiveDate, Utc};
use paperclip::actix::Apiv2Schema;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use crate::validation::ISBN_PATTERN;

pub type BookId = i64;

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
#[serde(rename_all = "camelCase")]
/// A book stored in the catalogue
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub publication_date: Option<NaiveDate>,
    pub category: Option<String>,
    pub isbn: Option<String>,
    pub rating: Option<i32>,
    pub price: Decimal,
    pub visible: bool,
}

#[derive(Debug, Clone, Eq, PartialEq)]
/// Book contents that passed validation and are ready to be stored, the id is assigned by the repository
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub publication_date: Option<NaiveDate>,
    pub category: Option<String>,
    pub isbn: Option<String>,
    pub rating: Option<i32>,
    pub price: Decimal,
    pub visible: bool,
}

impl NewBook {
    pub fn into_book(self, id: BookId) -> Book {
        Book {
            id,
            title: self.title,
            author: self.author,
            publication_date: self.publication_date,
            category: self.category,
            isbn: self.isbn,
            rating: self.rating,
            price: self.price,
            visible: self.visible,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq, Validate, Apiv2Schema)]
#[serde(rename_all = "camelCase")]
/// Body of POST /books
pub struct CreateBookRequest {
    #[validate(
        required(code = "BOOK-001"),
        custom(function = "crate::validation::not_blank", code = "BOOK-001"),
        length(max = 200, code = "BOOK-002")
    )]
    pub title: Option<String>,
    #[validate(
        required(code = "BOOK-010"),
        custom(function = "crate::validation::not_blank", code = "BOOK-010"),
        length(max = 150, code = "BOOK-011")
    )]
    pub author: Option<String>,
    #[validate(
        required(code = "BOOK-070"),
        custom(function = "crate::validation::not_in_future", code = "BOOK-072")
    )]
    pub publication_date: Option<NaiveDate>,
    #[validate(length(max = 100, code = "BOOK-030"))]
    pub category: Option<String>,
    #[validate(
        length(max = 20, code = "BOOK-020"),
        regex(path = *ISBN_PATTERN, code = "BOOK-021")
    )]
    pub isbn: Option<String>,
    #[validate(range(min = 0, max = 5, code = "BOOK-050"))]
    pub rating: Option<i32>,
    #[validate(
        required(code = "BOOK-040"),
        custom(function = "crate::validation::valid_price")
    )]
    pub price: Option<Decimal>,
    #[validate(required(code = "BOOK-060"))]
    pub visible: Option<bool>,
}

impl TryFrom<CreateBookRequest> for NewBook {
    type Error = ValidationErrors;

    fn try_from(request: CreateBookRequest) -> Result<Self, Self::Error> {
        request.validate()?;
        match request {
            CreateBookRequest {
                title: Some(title),
                author: Some(author),
                publication_date,
                category,
                isbn,
                rating,
                price: Some(price),
                visible: Some(visible),
            } => Ok(NewBook {
                title,
                author,
                publication_date,
                category,
                isbn,
                rating,
                price,
                visible,
            }),
            // validate() already reported every missing required field
            _ => Err(ValidationErrors::new()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq, Validate, Apiv2Schema)]
#[serde(rename_all = "camelCase")]
/// Body of PUT /books/{book_id}. Only the fields that are present overwrite the stored book
pub struct UpdateBookRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(
        custom(function = "crate::validation::not_blank", code = "BOOK-001"),
        length(max = 200, code = "BOOK-002")
    )]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(
        custom(function = "crate::validation::not_blank", code = "BOOK-010"),
        length(max = 150, code = "BOOK-011")
    )]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "crate::validation::not_in_future", code = "BOOK-072"))]
    pub publication_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 100, code = "BOOK-030"))]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(
        length(max = 20, code = "BOOK-020"),
        regex(path = *ISBN_PATTERN, code = "BOOK-021")
    )]
    pub isbn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0, max = 5, code = "BOOK-050"))]
    pub rating: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "crate::validation::valid_price"))]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
}

impl From<&Book> for UpdateBookRequest {
    fn from(book: &Book) -> Self {
        Self {
            title: Some(book.title.clone()),
            author: Some(book.author.clone()),
            publication_date: book.publication_date,
            category: book.category.clone(),
            isbn: book.isbn.clone(),
            rating: book.rating,
            price: Some(book.price),
            visible: Some(book.visible),
        }
    }
}

impl Book {
    /// Overwrites the fields set in the update and leaves the others untouched
    pub fn apply_update(&mut self, update: UpdateBookRequest) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(author) = update.author {
            self.author = author;
        }
        if let Some(publication_date) = update.publication_date {
            self.publication_date = Some(publication_date);
        }
        if let Some(category) = update.category {
            self.category = Some(category);
        }
        if let Some(isbn) = update.isbn {
            self.isbn = Some(isbn);
        }
        if let Some(rating) = update.rating {
            self.rating = Some(rating);
        }
        if let Some(price) = update.price {
            self.price = price;
        }
        if let Some(visible) = update.visible {
            self.visible = visible;
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
#[serde(rename_all = "camelCase")]
/// Optional filters of GET /books, every filter that is set must match
pub struct BookSearchQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Case insensitive substring of the title
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Case insensitive substring of the author
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Case insensitive substring of the category
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct FieldError {
    pub field: String,
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
/// Body returned with every 4xx and 5xx response
pub struct ErrorResponse {
    pub timestamp: DateTime<Utc>,
    pub status: u16,
    pub error: String,
    pub code: String,
    pub message: String,
    pub path: String,
    #[serde(default)]
    pub details: Vec<FieldError>,
}
