use crate::error::AppError;
use actix_web::{get, web, HttpResponse};
use mime_guess::from_path;
use rust_embed::RustEmbed;

const INDEX_FILE: &str = "admin.html";

/// Admin UI compiled into the binary
#[derive(RustEmbed)]
#[folder = "public/"]
#[include = "*.html"]
#[include = "*.js"]
#[include = "*.css"]
#[include = "*.ico"]
#[include = "*.svg"]
#[include = "*.png"]
pub struct AdminAssets;

#[get("/")]
pub async fn index() -> Result<HttpResponse, AppError> {
    serve(INDEX_FILE)
}

#[get("/{filename:.*}")]
pub async fn asset(path: web::Path<String>) -> Result<HttpResponse, AppError> {
    serve(path.trim_start_matches('/'))
}

fn serve(file_path: &str) -> Result<HttpResponse, AppError> {
    tracing::debug!("Serving embedded file: {}", file_path);

    let content = <AdminAssets as RustEmbed>::get(file_path)
        .ok_or_else(|| AppError::NotFound(format!("File {file_path}")))?;
    let mime = from_path(file_path).first_or_octet_stream();

    let mut response = HttpResponse::Ok();
    response.content_type(mime.as_ref());
    if file_path.ends_with(".html") {
        response
            .insert_header(("Cache-Control", "no-cache, no-store, must-revalidate"))
            .insert_header(("Pragma", "no-cache"))
            .insert_header(("Expires", "0"));
    } else {
        response.insert_header(("Cache-Control", "public, max-age=3600"));
    }

    Ok(response.body(content.data.into_owned()))
}
