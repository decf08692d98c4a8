//! Field constraints applied to incoming book payloads and the stable codes they report.

use std::borrow::Cow;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use validator::{ValidationError, ValidationErrors};

use crate::api::FieldError;

pub const TITLE_REQUIRED: &str = "BOOK-001";
pub const TITLE_TOO_LONG: &str = "BOOK-002";
pub const AUTHOR_REQUIRED: &str = "BOOK-010";
pub const AUTHOR_TOO_LONG: &str = "BOOK-011";
pub const ISBN_TOO_LONG: &str = "BOOK-020";
pub const ISBN_INVALID_FORMAT: &str = "BOOK-021";
pub const ISBN_ALREADY_EXISTS: &str = "BOOK-022";
pub const CATEGORY_TOO_LONG: &str = "BOOK-030";
pub const PRICE_REQUIRED: &str = "BOOK-040";
pub const PRICE_NOT_POSITIVE: &str = "BOOK-041";
pub const PRICE_TOO_PRECISE: &str = "BOOK-042";
pub const RATING_OUT_OF_RANGE: &str = "BOOK-050";
pub const VISIBLE_REQUIRED: &str = "BOOK-060";
pub const PUBLICATION_DATE_REQUIRED: &str = "BOOK-070";
pub const PUBLICATION_DATE_IN_FUTURE: &str = "BOOK-072";
pub const MALFORMED_REQUEST: &str = "BOOK-400-001";
pub const INVALID_PATCH: &str = "BOOK-400-002";
pub const BOOK_NOT_FOUND: &str = "BOOK-404-001";
pub const DUPLICATE_IDENTIFIER: &str = "GENERIC-001";
pub const MISSING_REQUIRED_FIELD: &str = "GENERIC-002";
pub const INTEGRITY_VIOLATION: &str = "GENERIC-003";
pub const UNEXPECTED_ERROR: &str = "GENERIC-004";

const MAX_PRICE_FRACTION_DIGITS: u32 = 2;
/// Matches the `NUMERIC(10, 2)` price column
const MAX_PRICE_INTEGER_DIGITS: u32 = 8;

/// ISBN-10 or ISBN-13, digits optionally separated by hyphens
pub static ISBN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9\-]{10,17}$").expect("ISBN pattern is a valid regex"));

/// Human readable message for every code the service can report
pub fn message_for(code: &str) -> &'static str {
    match code {
        TITLE_REQUIRED => "The 'title' field is required and must not be blank",
        TITLE_TOO_LONG => "The 'title' field exceeds the maximum length (200 characters)",
        AUTHOR_REQUIRED => "The 'author' field is required and must not be blank",
        AUTHOR_TOO_LONG => "The 'author' field exceeds the maximum length (150 characters)",
        ISBN_TOO_LONG => "The 'isbn' field exceeds the maximum length (20 characters)",
        ISBN_INVALID_FORMAT => "The 'isbn' field has an invalid format",
        ISBN_ALREADY_EXISTS => "The 'isbn' already exists in the catalogue",
        CATEGORY_TOO_LONG => "The 'category' field exceeds the maximum length (100 characters)",
        PRICE_REQUIRED => "The 'price' field is required",
        PRICE_NOT_POSITIVE => "The 'price' field must be greater than 0",
        PRICE_TOO_PRECISE => "The 'price' field must have at most 2 decimal places",
        RATING_OUT_OF_RANGE => "The 'rating' field must be between 0 and 5",
        VISIBLE_REQUIRED => "The 'visible' field is required",
        PUBLICATION_DATE_REQUIRED => "The 'publicationDate' field is required",
        PUBLICATION_DATE_IN_FUTURE => "The 'publicationDate' field must not be a future date",
        MALFORMED_REQUEST => "The request could not be parsed",
        INVALID_PATCH => "The merge patch could not be applied to the book",
        BOOK_NOT_FOUND => "No book exists with the given identifier",
        DUPLICATE_IDENTIFIER => "A record with the same identifier already exists",
        MISSING_REQUIRED_FIELD => "Required fields are missing",
        INTEGRITY_VIOLATION => "The change violates a data integrity constraint",
        _ => "An unexpected error occurred, please contact the administrator",
    }
}

pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

pub fn not_in_future(date: &NaiveDate) -> Result<(), ValidationError> {
    if *date > chrono::Local::now().date_naive() {
        return Err(ValidationError::new(PUBLICATION_DATE_IN_FUTURE));
    }
    Ok(())
}

/// Boundary check for prices: non negative, at most 8 integer and 2 fraction digits.
/// The stricter "greater than zero" rule is enforced by the service before writing.
pub fn valid_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(ValidationError::new(PRICE_NOT_POSITIVE));
    }
    let normalized = price.normalize();
    let integer_digits = normalized.trunc().abs().to_string().trim_start_matches('0').len();
    if normalized.scale() > MAX_PRICE_FRACTION_DIGITS
        || integer_digits > MAX_PRICE_INTEGER_DIGITS as usize
    {
        return Err(ValidationError::new(PRICE_TOO_PRECISE));
    }
    Ok(())
}

/// Flattens validator output into the field level details returned to clients
pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut details: Vec<FieldError> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, field_errors)| {
            let field = api_field_name(&field.to_string());
            field_errors.iter().map(move |error| FieldError {
                field: field.clone(),
                code: error.code.to_string(),
                message: error
                    .message
                    .clone()
                    .unwrap_or_else(|| Cow::Borrowed(message_for(&error.code)))
                    .to_string(),
            })
        })
        .collect();
    details.sort_by(|a, b| a.code.cmp(&b.code));
    details
}

fn api_field_name(field: &str) -> String {
    match field {
        "publication_date" => "publicationDate".to_string(),
        other => other.to_string(),
    }
}
