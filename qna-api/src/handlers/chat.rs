use crate::error::AppResult;
use crate::models::{AnswerSource, ChatRequest, ChatResponse};
use crate::services::chat::{self as chat_service, ChatOutcome};
use crate::AppState;
use actix_web::{post, web, HttpResponse};
use tracing::info;

const ESCALATION_MESSAGE: &str =
    "No sufficiently similar question was found in the library. Would you like to ask Grok?";

#[post("/chat")]
pub async fn chat(
    state: web::Data<AppState>,
    body: web::Json<ChatRequest>,
) -> AppResult<HttpResponse> {
    let request = body.into_inner();
    info!(use_grok = request.use_grok, "Chat question received");

    let outcome = chat_service::resolve(
        state.store.as_ref(),
        &state.answers,
        &state.chat,
        &request.question,
        request.use_grok,
    )
    .await?;

    Ok(HttpResponse::Ok().json(ChatResponse::from(outcome)))
}

impl From<ChatOutcome> for ChatResponse {
    fn from(outcome: ChatOutcome) -> Self {
        match outcome {
            ChatOutcome::Matched { entry, score } => ChatResponse {
                answer: Some(entry.answer),
                source: Some(AnswerSource::Database),
                ask_for_grok: None,
                similarity: Some(format!("{:.2}", score)),
                message: None,
            },
            ChatOutcome::NeedsEscalation { best_score } => ChatResponse {
                answer: None,
                source: None,
                ask_for_grok: Some(true),
                similarity: best_score.map(format_rounded_down),
                message: Some(ESCALATION_MESSAGE.to_string()),
            },
            ChatOutcome::Generated { answer, .. } => ChatResponse {
                answer: Some(answer),
                source: Some(AnswerSource::Grok),
                ask_for_grok: None,
                similarity: None,
                message: None,
            },
        }
    }
}

/// Two decimals without rounding up, so a score just under the acceptance
/// threshold never displays as reaching it.
fn format_rounded_down(score: f32) -> String {
    // The epsilon absorbs f32 noise such as 0.29 being stored as 0.28999999
    let hundredths = (f64::from(score) * 100.0 + 1e-4).floor();
    format!("{:.2}", hundredths / 100.0)
}
