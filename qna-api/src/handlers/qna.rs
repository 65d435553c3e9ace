use crate::error::{AppError, AppResult};
use crate::models::{
    AddQuestionRequest, CommitCsvRequest, CommitCsvResponse, DeleteResponse, NewQnaEntry,
};
use crate::AppState;
use actix_web::{delete, get, post, web, HttpResponse};
use tracing::{info, warn};

#[get("/qna")]
pub async fn list_entries(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let entries = state.store.list().await?;
    info!(count = entries.len(), "Listing library entries");

    Ok(HttpResponse::Ok()
        .insert_header((
            "Cache-Control",
            "no-store, no-cache, must-revalidate, private",
        ))
        .insert_header(("Pragma", "no-cache"))
        .insert_header(("Expires", "0"))
        .json(entries))
}

#[post("/add-question")]
pub async fn add_question(
    state: web::Data<AppState>,
    body: web::Json<AddQuestionRequest>,
) -> AppResult<HttpResponse> {
    let request = body.into_inner();

    let entry = NewQnaEntry {
        question: required(request.question, "question")?,
        answer: required(request.answer, "answer")?,
        category: Some(required(request.category, "category")?),
        subcategory: request
            .subcategory
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
    };

    let created = state.store.insert(entry).await?;
    info!(id = created.id, "Added library entry");

    Ok(HttpResponse::Created().json(created))
}

#[delete("/qna/{id}")]
pub async fn delete_entry(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let raw = path.into_inner();
    let id: i64 = raw
        .parse()
        .map_err(|_| AppError::InvalidRequest(format!("Invalid entry id: {raw}")))?;

    if !state.store.delete(id).await? {
        warn!(id, "Delete requested for unknown entry");
        return Err(AppError::NotFound(format!("Q&A entry {id}")));
    }

    info!(id, "Deleted library entry");
    Ok(HttpResponse::Ok().json(DeleteResponse { success: true, id }))
}

/// Stores reviewed CSV rows one by one; rows inserted before a failure stay.
#[post("/commit-csv")]
pub async fn commit_csv(
    state: web::Data<AppState>,
    body: web::Json<CommitCsvRequest>,
) -> AppResult<HttpResponse> {
    let rows = body.into_inner().data;
    if rows.is_empty() {
        return Err(AppError::InvalidRequest("No rows to commit".to_string()));
    }

    if let Some(position) = rows
        .iter()
        .position(|r| r.question.trim().is_empty() || r.answer.trim().is_empty())
    {
        return Err(AppError::InvalidRequest(format!(
            "Row {} is missing a question or an answer",
            position + 1
        )));
    }

    let mut committed = 0;
    for row in rows {
        state
            .store
            .insert(NewQnaEntry::from_csv(row.question.trim(), row.answer.trim()))
            .await?;
        committed += 1;
    }

    info!(committed, "Committed reviewed CSV rows");
    Ok(HttpResponse::Ok().json(CommitCsvResponse {
        success: true,
        message: format!("Committed {committed} questions to the library"),
        committed,
    }))
}

fn required(value: Option<String>, field: &str) -> AppResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::InvalidRequest(format!("Field '{field}' is required")))
}
