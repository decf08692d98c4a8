use paperclip::actix::web;

use crate::handlers;
use crate::http_errors::{json_error_handler, path_error_handler, query_error_handler};

pub fn config_app(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").route(web::get().to(handlers::health)))
        .service(
            web::scope("/books")
                .service(
                    web::resource("")
                        .route(web::get().to(handlers::get_books))
                        .route(web::post().to(handlers::add_book)),
                )
                .service(
                    web::resource("/{book_id}")
                        .route(web::get().to(handlers::get_book))
                        .route(web::put().to(handlers::update_book))
                        .route(web::patch().to(handlers::patch_book))
                        .route(web::delete().to(handlers::delete_book)),
                ),
        );
}

/// Accepts `application/json` and `application/merge-patch+json` bodies, malformed ones get the API error body
pub fn json_config() -> actix_web::web::JsonConfig {
    actix_web::web::JsonConfig::default().error_handler(json_error_handler)
}

pub fn query_config() -> actix_web::web::QueryConfig {
    actix_web::web::QueryConfig::default().error_handler(query_error_handler)
}

pub fn path_config() -> actix_web::web::PathConfig {
    actix_web::web::PathConfig::default().error_handler(path_error_handler)
}
