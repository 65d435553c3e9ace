use crate::assets;
use crate::error::AppError;
use crate::handlers::{chat, health, qna, upload};
use actix_web::web;

/// Registers the JSON API followed by the embedded admin UI.
///
/// The static catch-all is registered last so it never shadows an API path.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(query_config())
        .service(health::health)
        .service(qna::list_entries)
        .service(qna::add_question)
        .service(qna::delete_entry)
        .service(qna::commit_csv)
        .service(chat::chat)
        .service(upload::process_csv)
        .service(assets::index)
        .service(assets::asset);
}

/// JSON bodies share the upload limit since reviewed CSV rows come back as JSON
pub fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .error_handler(|err, _req| AppError::InvalidRequest(err.to_string()).into())
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| AppError::InvalidRequest(err.to_string()).into())
}
