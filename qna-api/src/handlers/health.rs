use crate::error::AppResult;
use crate::models::HealthResponse;
use crate::AppState;
use actix_web::{get, web, HttpResponse};

#[get("/health")]
pub async fn health(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    state.store.ping().await?;

    Ok(HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    }))
}
