use actix_web::http::header::LOCATION;
use actix_web::web::Data;
use actix_web::Error;
use actix_web::HttpResponse;
use paperclip::actix::{
    api_v2_operation,
    web::{self},
};
use validator::Validate;

use crate::api::{BookId, BookSearchQuery, CreateBookRequest, NewBook, UpdateBookRequest};
use crate::books_service::BooksService;
use crate::http_errors::{service_error_response, validation_error_response};

fn book_path(book_id: BookId) -> String {
    format!("/books/{}", book_id)
}

#[api_v2_operation]
pub async fn health() -> Result<HttpResponse, Error> {
    Ok(HttpResponse::Ok().finish())
}

#[api_v2_operation]
/// Lists the books matching all given filters, every book when no filter is given
pub async fn get_books(
    books_service: Data<BooksService>,
    filters: web::Query<BookSearchQuery>,
) -> Result<HttpResponse, Error> {
    tracing::info!("Request to get books with filters {:?}", filters);
    Ok(match books_service.get_books(&filters).await {
        Ok(books) => HttpResponse::Ok().json(books),
        Err(err) => service_error_response(&err, "/books"),
    })
}

#[api_v2_operation]
pub async fn get_book(
    books_service: Data<BooksService>,
    book_id: web::Path<BookId>,
) -> Result<HttpResponse, Error> {
    let book_id = book_id.into_inner();
    tracing::info!("Request to get book {}", book_id);
    Ok(match books_service.get_book(book_id).await {
        Ok(book) => HttpResponse::Ok().json(book),
        Err(err) => service_error_response(&err, &book_path(book_id)),
    })
}

#[api_v2_operation]
/// Creates a book, responds with the stored book and its location
pub async fn add_book(
    books_service: Data<BooksService>,
    request: web::Json<CreateBookRequest>,
) -> Result<HttpResponse, Error> {
    tracing::info!("Request to create book {:?}", request);
    let new_book = match NewBook::try_from(request.into_inner()) {
        Ok(new_book) => new_book,
        Err(errors) => return Ok(validation_error_response(&errors, "/books")),
    };

    Ok(match books_service.create_book(new_book).await {
        Ok(book) => HttpResponse::Created()
            .append_header((LOCATION, book_path(book.id)))
            .json(book),
        Err(err) => service_error_response(&err, "/books"),
    })
}

#[api_v2_operation]
/// Overwrites the fields present in the body, the others keep their stored value
pub async fn update_book(
    books_service: Data<BooksService>,
    book_id: web::Path<BookId>,
    update: web::Json<UpdateBookRequest>,
) -> Result<HttpResponse, Error> {
    let book_id = book_id.into_inner();
    tracing::info!("Request to update book {}", book_id);
    if let Err(errors) = update.validate() {
        return Ok(validation_error_response(&errors, &book_path(book_id)));
    }

    Ok(
        match books_service.update_book(book_id, update.into_inner()).await {
            Ok(book) => HttpResponse::Ok().json(book),
            Err(err) => service_error_response(&err, &book_path(book_id)),
        },
    )
}

#[api_v2_operation]
/// Partially updates the book with a JSON merge patch (RFC 7386)
pub async fn patch_book(
    books_service: Data<BooksService>,
    book_id: web::Path<BookId>,
    patch: web::Json<serde_json::Value>,
) -> Result<HttpResponse, Error> {
    let book_id = book_id.into_inner();
    tracing::info!("Request to patch book {}", book_id);
    Ok(match books_service.patch_book(book_id, &patch).await {
        Ok(book) => HttpResponse::Ok().json(book),
        Err(err) => service_error_response(&err, &book_path(book_id)),
    })
}

#[api_v2_operation]
pub async fn delete_book(
    books_service: Data<BooksService>,
    book_id: web::Path<BookId>,
) -> Result<HttpResponse, Error> {
    let book_id = book_id.into_inner();
    tracing::info!("Request to delete book {}", book_id);
    Ok(match books_service.remove_book(book_id).await {
        Ok(()) => HttpResponse::Ok().finish(),
        Err(err) => service_error_response(&err, &book_path(book_id)),
    })
}

#[cfg(test)]
mod handler_tests {
    use std::sync::Arc;

    use actix_web::http::header::{CONTENT_TYPE, LOCATION};
    use actix_web::http::StatusCode;
    use actix_web::{test, web, App};
    use paperclip::actix::OpenApiExt;
    use serde_json::{json, Value};

    use crate::api::{Book, BookId, ErrorResponse, NewBook};
    use crate::app_config::{config_app, json_config, path_config, query_config};
    use crate::books_repository::{BookRepository, BookRepositoryError, InMemoryBookRepository};
    use crate::books_service::BooksService;
    use crate::search::BookSpecification;

    macro_rules! init_app {
        () => {
            init_app!(InMemoryBookRepository::default())
        };
        ($repository:expr) => {
            test::init_service(
                App::new()
                    .wrap_api()
                    .app_data(web::Data::new(BooksService::new(Arc::new($repository))))
                    .app_data(json_config())
                    .app_data(query_config())
                    .app_data(path_config())
                    .configure(config_app)
                    .build(),
            )
            .await
        };
    }

    /// Repository failing every operation with the error built by `error`
    struct FailingBookRepository {
        error: fn() -> BookRepositoryError,
    }

    #[async_trait::async_trait]
    impl BookRepository for FailingBookRepository {
        async fn add_book(&self, _book: NewBook) -> Result<Book, BookRepositoryError> {
            Err((self.error)())
        }

        async fn save_book(&self, _book: Book) -> Result<Book, BookRepositoryError> {
            Err((self.error)())
        }

        async fn get_book(&self, _book_id: BookId) -> Result<Book, BookRepositoryError> {
            Err((self.error)())
        }

        async fn delete_book(&self, _book_id: BookId) -> Result<(), BookRepositoryError> {
            Err((self.error)())
        }

        async fn find_books(
            &self,
            _specification: &BookSpecification,
        ) -> Result<Vec<Book>, BookRepositoryError> {
            Err((self.error)())
        }
    }

    fn soledad() -> Value {
        json!({
            "title": "Cien años de soledad",
            "author": "Gabriel García Márquez",
            "publicationDate": "1967-05-30",
            "category": "Fiction",
            "isbn": "978-0307474728",
            "rating": 5,
            "price": 19.99,
            "visible": true
        })
    }

    #[actix_web::test]
    async fn create_then_get_book() {
        let app = init_app!();

        let request = test::TestRequest::post()
            .uri("/books")
            .set_json(soledad())
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let location = response
            .headers()
            .get(LOCATION)
            .expect("No location header")
            .to_str()
            .unwrap()
            .to_string();
        let created: Book = test::read_body_json(response).await;
        assert_eq!(location, format!("/books/{}", created.id));
        assert_eq!(created.title, "Cien años de soledad");

        let request = test::TestRequest::get().uri(&location).to_request();
        let fetched: Book = test::call_and_read_body_json(&app, request).await;
        assert_eq!(fetched, created);
    }

    #[actix_web::test]
    async fn invalid_create_reports_field_codes() {
        let app = init_app!();

        let mut body = soledad();
        body["title"] = json!("");
        body["rating"] = json!(9);
        body.as_object_mut().unwrap().remove("visible");

        let request = test::TestRequest::post()
            .uri("/books")
            .set_json(body)
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let error: ErrorResponse = test::read_body_json(response).await;
        let codes: Vec<_> = error.details.iter().map(|d| d.code.as_str()).collect();
        assert_eq!(codes, vec!["BOOK-001", "BOOK-050", "BOOK-060"]);
        assert_eq!(error.status, 400);
    }

    #[actix_web::test]
    async fn zero_price_is_rejected_by_business_rule() {
        let app = init_app!();

        let mut body = soledad();
        body["price"] = json!(0);
        let request = test::TestRequest::post()
            .uri("/books")
            .set_json(body)
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ErrorResponse = test::read_body_json(response).await;
        assert_eq!(error.code, "BOOK-041");
    }

    #[actix_web::test]
    async fn duplicate_isbn_is_conflict() {
        let app = init_app!();

        for expected in [StatusCode::CREATED, StatusCode::CONFLICT] {
            let request = test::TestRequest::post()
                .uri("/books")
                .set_json(soledad())
                .to_request();
            let response = test::call_service(&app, request).await;
            assert_eq!(response.status(), expected);
        }

        let request = test::TestRequest::get().uri("/books").to_request();
        let books: Vec<Book> = test::call_and_read_body_json(&app, request).await;
        assert_eq!(books.len(), 1);
    }

    #[actix_web::test]
    async fn merge_patch_and_put_keep_unspecified_fields() {
        let app = init_app!();

        let request = test::TestRequest::post()
            .uri("/books")
            .set_json(soledad())
            .to_request();
        let created: Book = test::call_and_read_body_json(&app, request).await;

        let request = test::TestRequest::patch()
            .uri(&format!("/books/{}", created.id))
            .insert_header((CONTENT_TYPE, "application/merge-patch+json"))
            .set_payload(r#"{"category": null, "rating": 4}"#)
            .to_request();
        let patched: Book = test::call_and_read_body_json(&app, request).await;
        assert_eq!(
            patched,
            Book {
                category: None,
                rating: Some(4),
                ..created.clone()
            }
        );

        let request = test::TestRequest::put()
            .uri(&format!("/books/{}", created.id))
            .set_json(json!({ "title": "One Hundred Years of Solitude" }))
            .to_request();
        let updated: Book = test::call_and_read_body_json(&app, request).await;
        assert_eq!(
            updated,
            Book {
                title: "One Hundred Years of Solitude".to_string(),
                ..patched
            }
        );
    }

    #[actix_web::test]
    async fn patch_with_non_positive_price_leaves_book_unchanged() {
        let app = init_app!();

        let request = test::TestRequest::post()
            .uri("/books")
            .set_json(soledad())
            .to_request();
        let created: Book = test::call_and_read_body_json(&app, request).await;

        let request = test::TestRequest::patch()
            .uri(&format!("/books/{}", created.id))
            .set_json(json!({ "price": 0 }))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let request = test::TestRequest::patch()
            .uri(&format!("/books/{}", created.id))
            .insert_header((CONTENT_TYPE, "application/merge-patch+json"))
            .set_payload("not json")
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ErrorResponse = test::read_body_json(response).await;
        assert_eq!(error.code, "BOOK-400-002");

        let request = test::TestRequest::get()
            .uri(&format!("/books/{}", created.id))
            .to_request();
        let fetched: Book = test::call_and_read_body_json(&app, request).await;
        assert_eq!(fetched, created);
    }

    #[actix_web::test]
    async fn search_filters_are_combined() {
        let app = init_app!();

        let mut colera = soledad();
        colera["title"] = json!("El amor en los tiempos del cólera");
        colera["isbn"] = json!("978-0307387264");
        colera["visible"] = json!(false);

        for body in [soledad(), colera] {
            let request = test::TestRequest::post()
                .uri("/books")
                .set_json(body)
                .to_request();
            let response = test::call_service(&app, request).await;
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let request = test::TestRequest::get().uri("/books").to_request();
        let all: Vec<Book> = test::call_and_read_body_json(&app, request).await;
        assert_eq!(all.len(), 2);

        let request = test::TestRequest::get()
            .uri("/books?title=SOLEDAD")
            .to_request();
        let by_title: Vec<Book> = test::call_and_read_body_json(&app, request).await;
        assert_eq!(by_title.len(), 1);
        assert_eq!(by_title[0].title, "Cien años de soledad");

        let request = test::TestRequest::get()
            .uri("/books?title=soledad&visible=false")
            .to_request();
        let none: Vec<Book> = test::call_and_read_body_json(&app, request).await;
        assert!(none.is_empty());

        let request = test::TestRequest::get()
            .uri("/books?author=M%C3%A1RQUEZ&visible=false")
            .to_request();
        let by_author: Vec<Book> = test::call_and_read_body_json(&app, request).await;
        assert_eq!(by_author.len(), 1);

        let request = test::TestRequest::get()
            .uri("/books?publicationDate=1967-05-30&visible=false&price=19.99")
            .to_request();
        let hidden: Vec<Book> = test::call_and_read_body_json(&app, request).await;
        assert_eq!(hidden.len(), 1);
        assert_eq!(hidden[0].title, "El amor en los tiempos del cólera");

        let request = test::TestRequest::get()
            .uri("/books?rating=high")
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn delete_twice_is_not_found() {
        let app = init_app!();

        let request = test::TestRequest::post()
            .uri("/books")
            .set_json(soledad())
            .to_request();
        let created: Book = test::call_and_read_body_json(&app, request).await;

        let uri = format!("/books/{}", created.id);
        let request = test::TestRequest::delete().uri(&uri).to_request();
        assert_eq!(
            test::call_service(&app, request).await.status(),
            StatusCode::OK
        );

        let request = test::TestRequest::delete().uri(&uri).to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let error: ErrorResponse = test::read_body_json(response).await;
        assert_eq!(error.code, "BOOK-404-001");
        assert_eq!(error.path, uri);

        let request = test::TestRequest::get().uri(&uri).to_request();
        assert_eq!(
            test::call_service(&app, request).await.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[actix_web::test]
    async fn repository_failure_is_internal_error() {
        let app = init_app!(FailingBookRepository {
            error: || BookRepositoryError::Other("connection reset".to_string()),
        });

        let request = test::TestRequest::get().uri("/books").to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let error: ErrorResponse = test::read_body_json(response).await;
        assert_eq!(error.code, "GENERIC-004");
        assert_eq!(error.status, 500);
        assert_eq!(error.path, "/books");
        // internal details are not leaked
        assert!(!error.message.contains("connection reset"));
    }

    #[actix_web::test]
    async fn constraint_violations_are_conflicts() {
        let cases: [(fn() -> BookRepositoryError, &str); 3] = [
            (
                || BookRepositoryError::IntegrityViolation("check failed".to_string()),
                "GENERIC-003",
            ),
            (
                || BookRepositoryError::DuplicateIdentifier("Key (id)=(1)".to_string()),
                "GENERIC-001",
            ),
            (
                || BookRepositoryError::MissingRequiredField("title".to_string()),
                "GENERIC-002",
            ),
        ];

        for (error, expected_code) in cases {
            let app = init_app!(FailingBookRepository { error });

            let request = test::TestRequest::post()
                .uri("/books")
                .set_json(soledad())
                .to_request();
            let response = test::call_service(&app, request).await;
            assert_eq!(response.status(), StatusCode::CONFLICT);
            let body: ErrorResponse = test::read_body_json(response).await;
            assert_eq!(body.code, expected_code);
            assert_eq!(body.status, 409);
            assert_eq!(body.path, "/books");
        }
    }

    #[actix_web::test]
    async fn non_numeric_id_is_malformed_request() {
        let app = init_app!();

        for request in [
            test::TestRequest::get().uri("/books/abc").to_request(),
            test::TestRequest::delete().uri("/books/abc").to_request(),
        ] {
            let response = test::call_service(&app, request).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let error: ErrorResponse = test::read_body_json(response).await;
            assert_eq!(error.code, "BOOK-400-001");
            assert_eq!(error.path, "/books/abc");
        }
    }
}
