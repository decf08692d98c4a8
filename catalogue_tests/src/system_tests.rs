use std::str::FromStr;

use chrono::NaiveDate;
use rand::{thread_rng, Rng};
use rust_decimal::Decimal;
use serde_json::json;

use catalogue_service::api::{Book, BookSearchQuery, CreateBookRequest, UpdateBookRequest};
use catalogue_service::client::{CatalogueClient, CatalogueClientError};

use crate::catalogue_url;

fn run_suffix() -> u64 {
    thread_rng().gen_range(0..10_000_000_000)
}

fn unique_isbn() -> String {
    format!("978-{:010}", run_suffix())
}

fn create_request(title: &str, isbn: Option<String>) -> CreateBookRequest {
    CreateBookRequest {
        title: Some(title.to_string()),
        author: Some("Gabriel García Márquez".to_string()),
        publication_date: NaiveDate::from_ymd_opt(1967, 5, 30),
        category: Some("Fiction".to_string()),
        isbn,
        rating: Some(5),
        price: Some(Decimal::from_str("19.99").unwrap()),
        visible: Some(true),
    }
}

fn rejected_code(result: Result<Book, CatalogueClientError>) -> String {
    result
        .expect_err("Request should have been rejected")
        .code()
        .expect("Rejection without error body")
        .to_string()
}

#[tokio::test]
/// Creates a book
/// Gets it, updates it, patches it
/// Searches for it and deletes it
async fn catalogue_e2e_test() {
    let client = CatalogueClient::new(&catalogue_url()).expect("Failed to create client");
    let suffix = format!("{:010}", run_suffix());
    let title = format!("Cien años de soledad {}", suffix);

    let created = client
        .add_book(&create_request(&title, Some(unique_isbn())))
        .await
        .expect("Failed to add book");

    let returned = client
        .get_book(created.id)
        .await
        .expect("Failed to get book")
        .expect("Book not found");
    assert_eq!(returned, created);

    let updated = client
        .update_book(
            created.id,
            &UpdateBookRequest {
                price: Some(Decimal::from_str("9.95").unwrap()),
                ..UpdateBookRequest::default()
            },
        )
        .await
        .expect("Failed to update book");
    assert_eq!(
        updated,
        Book {
            price: Decimal::from_str("9.95").unwrap(),
            ..created.clone()
        }
    );

    let patched = client
        .patch_book(created.id, &json!({ "category": null, "rating": 4 }))
        .await
        .expect("Failed to patch book");
    assert_eq!(
        patched,
        Book {
            category: None,
            rating: Some(4),
            ..updated
        }
    );

    let found = client
        .list_books(&BookSearchQuery {
            title: Some(suffix),
            author: Some("MÁRQUEZ".to_string()),
            ..BookSearchQuery::default()
        })
        .await
        .expect("Failed to list books");
    assert_eq!(found, vec![patched.clone()]);

    assert!(client.delete_book(created.id).await.expect("Failed to delete"));
    assert!(!client.delete_book(created.id).await.expect("Failed to delete"));
    assert_eq!(client.get_book(created.id).await.expect("Failed to get"), None);
}

#[tokio::test]
async fn invalid_books_are_rejected_with_codes() {
    let client = CatalogueClient::new(&catalogue_url()).expect("Failed to create client");

    let missing_title = client
        .add_book(&CreateBookRequest {
            title: None,
            ..create_request("ignored", None)
        })
        .await;
    assert_eq!(rejected_code(missing_title), "BOOK-001");

    let zero_price = client
        .add_book(&CreateBookRequest {
            price: Some(Decimal::ZERO),
            ..create_request("Free book", None)
        })
        .await;
    assert_eq!(rejected_code(zero_price), "BOOK-041");

    let isbn = unique_isbn();
    let first = client
        .add_book(&create_request("Original", Some(isbn.clone())))
        .await
        .expect("Failed to add book");
    let duplicate = client
        .add_book(&create_request("Duplicate", Some(isbn)))
        .await;
    match duplicate {
        Err(CatalogueClientError::Rejected { status, error }) => {
            assert_eq!(status, 409);
            assert_eq!(error.code, "BOOK-022");
        }
        other => panic!("Expected conflict, got {:?}", other),
    }

    let negative_patch = client.patch_book(first.id, &json!({ "price": 0 })).await;
    assert_eq!(rejected_code(negative_patch), "BOOK-041");
    assert_eq!(
        client.get_book(first.id).await.expect("Failed to get"),
        Some(first.clone())
    );

    let missing = client.patch_book(i64::MAX, &json!({ "rating": 1 })).await;
    assert_eq!(rejected_code(missing), "BOOK-404-001");

    client.delete_book(first.id).await.expect("Failed to delete");
}
