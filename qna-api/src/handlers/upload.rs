use crate::config::UploadConfig;
use crate::error::{AppError, AppResult};
use crate::models::ProcessCsvQuery;
use crate::models::ProcessCsvResponse;
use crate::services::batch::{self, BatchMode};
use crate::AppState;
use actix_multipart::Multipart;
use actix_web::{post, web, HttpResponse};
use futures_util::TryStreamExt;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;

/// Generates answers for every question in an uploaded CSV.
///
/// By default answered questions are stored under the CSV upload category;
/// with `?preview=true` the answers are only returned for review.
#[post("/process-csv")]
pub async fn process_csv(
    state: web::Data<AppState>,
    query: web::Query<ProcessCsvQuery>,
    mut payload: Multipart,
) -> AppResult<HttpResponse> {
    let upload = receive_csv(&mut payload, &state.upload).await?;
    let parsed = batch::read_questions(upload.path())?;
    info!(
        questions = parsed.questions.len(),
        empty_rows = parsed.empty_rows,
        "Extracted questions from upload"
    );

    let mode = if query.preview {
        BatchMode::Preview
    } else {
        BatchMode::Persist
    };
    let report =
        batch::process_questions(parsed.questions, &state.answers, state.store.as_ref(), mode)
            .await;
    drop(upload);

    let processed = report.processed();
    let message = match mode {
        BatchMode::Persist => format!("Successfully processed {processed} questions"),
        BatchMode::Preview => format!("Generated answers for {processed} questions"),
    };

    Ok(HttpResponse::Ok().json(ProcessCsvResponse {
        success: true,
        message,
        questions_processed: processed,
        failed: report.failed(),
        data: report.rows(),
    }))
}

/// Spools the `file` field into a temp file that is removed on drop
async fn receive_csv(payload: &mut Multipart, config: &UploadConfig) -> AppResult<NamedTempFile> {
    while let Some(mut field) = payload.try_next().await? {
        if field.name() != Some("file") {
            while field.try_next().await?.is_some() {}
            continue;
        }

        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .unwrap_or_default()
            .to_string();
        if filename.is_empty() {
            return Err(AppError::InvalidRequest("No file uploaded".to_string()));
        }
        if !is_csv(&filename) {
            return Err(AppError::InvalidRequest(format!(
                "Only .csv files are accepted, got '{filename}'"
            )));
        }

        let mut builder = tempfile::Builder::new();
        builder.prefix("qna-upload-").suffix(".csv");
        let mut file = match &config.dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };

        let mut size = 0;
        while let Some(chunk) = field.try_next().await? {
            size += chunk.len();
            if size > config.max_file_size {
                return Err(AppError::InvalidRequest(format!(
                    "File exceeds the {} byte upload limit",
                    config.max_file_size
                )));
            }
            file.write_all(&chunk)?;
        }
        file.flush()?;

        info!(filename = %filename, size, "Received CSV upload");
        return Ok(file);
    }

    Err(AppError::InvalidRequest("No file uploaded".to_string()))
}

fn is_csv(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_extension_is_case_insensitive() {
        assert!(is_csv("questions.csv"));
        assert!(is_csv("RFP.CSV"));
        assert!(!is_csv("questions.xlsx"));
        assert!(!is_csv("questions.csv.exe"));
        assert!(!is_csv("csv"));
    }
}
