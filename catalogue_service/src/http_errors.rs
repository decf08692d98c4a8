use actix_web::error::{InternalError, JsonPayloadError, PathError, QueryPayloadError};
use actix_web::http::{Method, StatusCode};
use actix_web::{HttpRequest, HttpResponse};

use crate::api::{ErrorResponse, FieldError};
use crate::books_service::BooksServiceError;
use crate::validation;

pub fn error_response(
    status: StatusCode,
    code: &str,
    message: impl Into<String>,
    path: &str,
    details: Vec<FieldError>,
) -> HttpResponse {
    HttpResponse::build(status).json(ErrorResponse {
        timestamp: chrono::Utc::now(),
        status: status.as_u16(),
        error: status.canonical_reason().unwrap_or_default().to_string(),
        code: code.to_string(),
        message: message.into(),
        path: path.to_string(),
        details,
    })
}

/// Maps service failures to the status codes and bodies exposed by the API
pub fn service_error_response(err: &BooksServiceError, path: &str) -> HttpResponse {
    match err {
        BooksServiceError::NotFound(_) => error_response(
            StatusCode::NOT_FOUND,
            validation::BOOK_NOT_FOUND,
            validation::message_for(validation::BOOK_NOT_FOUND),
            path,
            vec![],
        ),
        BooksServiceError::Validation(errors) => validation_error_response(errors, path),
        BooksServiceError::BusinessRule { field, code } => error_response(
            StatusCode::BAD_REQUEST,
            code,
            "Business validation error",
            path,
            vec![FieldError {
                field: field.to_string(),
                code: code.to_string(),
                message: validation::message_for(code).to_string(),
            }],
        ),
        BooksServiceError::InvalidPatch(reason) => error_response(
            StatusCode::BAD_REQUEST,
            validation::INVALID_PATCH,
            format!(
                "{}: {}",
                validation::message_for(validation::INVALID_PATCH),
                reason
            ),
            path,
            vec![],
        ),
        BooksServiceError::DuplicateIsbn(_) => error_response(
            StatusCode::CONFLICT,
            validation::ISBN_ALREADY_EXISTS,
            validation::message_for(validation::ISBN_ALREADY_EXISTS),
            path,
            vec![],
        ),
        BooksServiceError::DuplicateIdentifier(reason) => {
            tracing::warn!("Duplicate identifier on {}: {}", path, reason);
            error_response(
                StatusCode::CONFLICT,
                validation::DUPLICATE_IDENTIFIER,
                validation::message_for(validation::DUPLICATE_IDENTIFIER),
                path,
                vec![],
            )
        }
        BooksServiceError::MissingRequiredField(column) => {
            tracing::warn!("Missing required field {} on {}", column, path);
            error_response(
                StatusCode::CONFLICT,
                validation::MISSING_REQUIRED_FIELD,
                validation::message_for(validation::MISSING_REQUIRED_FIELD),
                path,
                vec![],
            )
        }
        BooksServiceError::IntegrityViolation(reason) => {
            tracing::warn!("Integrity violation on {}: {}", path, reason);
            error_response(
                StatusCode::CONFLICT,
                validation::INTEGRITY_VIOLATION,
                validation::message_for(validation::INTEGRITY_VIOLATION),
                path,
                vec![],
            )
        }
        BooksServiceError::Repository(repository_err) => {
            tracing::error!("Request to {} failed {}", path, repository_err);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                validation::UNEXPECTED_ERROR,
                validation::message_for(validation::UNEXPECTED_ERROR),
                path,
                vec![],
            )
        }
    }
}

pub fn validation_error_response(errors: &validator::ValidationErrors, path: &str) -> HttpResponse {
    let details = validation::field_errors(errors);
    let code = details
        .first()
        .map(|detail| detail.code.clone())
        .unwrap_or_else(|| validation::MALFORMED_REQUEST.to_string());
    error_response(
        StatusCode::BAD_REQUEST,
        &code,
        "Validation error",
        path,
        details,
    )
}

fn malformed_request(err: impl std::fmt::Display, req: &HttpRequest) -> HttpResponse {
    error_response(
        StatusCode::BAD_REQUEST,
        validation::MALFORMED_REQUEST,
        format!(
            "{}: {}",
            validation::message_for(validation::MALFORMED_REQUEST),
            err
        ),
        req.path(),
        vec![],
    )
}

/// Unreadable merge patch documents are reported as patch failures, other bodies as malformed
pub fn json_error_handler(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    let response = if req.method() == Method::PATCH {
        error_response(
            StatusCode::BAD_REQUEST,
            validation::INVALID_PATCH,
            format!(
                "{}: {}",
                validation::message_for(validation::INVALID_PATCH),
                err
            ),
            req.path(),
            vec![],
        )
    } else {
        malformed_request(&err, req)
    };
    InternalError::from_response(err, response).into()
}

pub fn query_error_handler(err: QueryPayloadError, req: &HttpRequest) -> actix_web::Error {
    let response = malformed_request(&err, req);
    InternalError::from_response(err, response).into()
}

pub fn path_error_handler(err: PathError, req: &HttpRequest) -> actix_web::Error {
    let response = malformed_request(&err, req);
    InternalError::from_response(err, response).into()
}
