use anyhow::Context;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, Response, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::RetryTransientMiddleware;
use reqwest_tracing::TracingMiddleware;

use crate::api::{Book, BookId, BookSearchQuery, CreateBookRequest, ErrorResponse, UpdateBookRequest};

const MERGE_PATCH_CONTENT_TYPE: &str = "application/merge-patch+json";

#[derive(thiserror::Error, Debug)]
pub enum CatalogueClientError {
    #[error("Request rejected with {status}: {} {}", .error.code, .error.message)]
    Rejected { status: u16, error: ErrorResponse },

    #[error("Request failed with {0} and no error body")]
    UnexpectedStatus(u16),

    #[error("Failed to send request: {0}")]
    Transport(#[from] reqwest_middleware::Error),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] reqwest::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CatalogueClientError {
    /// Error code reported by the service, if the request got that far
    pub fn code(&self) -> Option<&str> {
        match self {
            CatalogueClientError::Rejected { error, .. } => Some(&error.code),
            _ => None,
        }
    }
}

pub type CatalogueClientResult<T> = Result<T, CatalogueClientError>;

pub struct CatalogueClient {
    url: String,
    client: ClientWithMiddleware,
    retrying_client: ClientWithMiddleware,
}

impl CatalogueClient {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        let reqwest_client = reqwest::Client::builder()
            .build()
            .context("Failed to build reqwest client")?;
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);
        let retrying_client = ClientBuilder::new(reqwest_client.clone())
            .with(TracingMiddleware::default())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();
        let client = ClientBuilder::new(reqwest_client)
            .with(TracingMiddleware::default())
            .build();

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            client,
            retrying_client,
        })
    }

    /// Only idempotent requests are retried, a repeated POST could store the book twice
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let client = if is_idempotent(&method) {
            &self.retrying_client
        } else {
            &self.client
        };
        client.request(method, format!("{}{}", self.url, path))
    }

    /// Calls GET /books with the filters that are set
    pub async fn list_books(&self, filters: &BookSearchQuery) -> CatalogueClientResult<Vec<Book>> {
        let response = self
            .request(Method::GET, "/books")
            .query(filters)
            .send()
            .await?;
        Ok(successful(response).await?.json().await?)
    }

    /// Calls GET /books/{book_id}
    /// Returns None if the book is not in the catalogue
    pub async fn get_book(&self, book_id: BookId) -> CatalogueClientResult<Option<Book>> {
        let response = self
            .request(Method::GET, &format!("/books/{book_id}"))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(successful(response).await?.json().await?))
    }

    /// Calls POST /books, returns the stored book with its identifier
    pub async fn add_book(&self, request: &CreateBookRequest) -> CatalogueClientResult<Book> {
        let response = self
            .request(Method::POST, "/books")
            .json(request)
            .send()
            .await?;
        Ok(successful(response).await?.json().await?)
    }

    /// Calls PUT /books/{book_id}
    pub async fn update_book(
        &self,
        book_id: BookId,
        update: &UpdateBookRequest,
    ) -> CatalogueClientResult<Book> {
        let response = self
            .request(Method::PUT, &format!("/books/{book_id}"))
            .json(update)
            .send()
            .await?;
        Ok(successful(response).await?.json().await?)
    }

    /// Calls PATCH /books/{book_id} with a JSON merge patch document
    pub async fn patch_book(
        &self,
        book_id: BookId,
        patch: &serde_json::Value,
    ) -> CatalogueClientResult<Book> {
        let body = serde_json::to_vec(patch).context("Failed to serialize patch")?;
        let response = self
            .request(Method::PATCH, &format!("/books/{book_id}"))
            .header(CONTENT_TYPE, MERGE_PATCH_CONTENT_TYPE)
            .body(body)
            .send()
            .await?;
        Ok(successful(response).await?.json().await?)
    }

    /// Calls DELETE /books/{book_id}
    /// Returns false if there was nothing to delete
    pub async fn delete_book(&self, book_id: BookId) -> CatalogueClientResult<bool> {
        let response = self
            .request(Method::DELETE, &format!("/books/{book_id}"))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        successful(response).await?;
        Ok(true)
    }
}

fn is_idempotent(method: &Method) -> bool {
    [Method::GET, Method::PUT, Method::DELETE].contains(method)
}

async fn successful(response: Response) -> CatalogueClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    match response.json::<ErrorResponse>().await {
        Ok(error) => Err(CatalogueClientError::Rejected {
            status: status.as_u16(),
            error,
        }),
        Err(_) => Err(CatalogueClientError::UnexpectedStatus(status.as_u16())),
    }
}
