use crate::config::ChatConfig;
use crate::error::{AppError, AppResult};
use crate::models::{QnaEntry, ScoredEntry};
use crate::services::answers::AnswerGenerator;
use crate::storage::QnaStore;
use std::fmt::Write as _;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct ChatSettings {
    pub candidate_threshold: f32,
    pub acceptance_threshold: f32,
    pub max_results: usize,
    pub context_size: usize,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            candidate_threshold: 0.15,
            acceptance_threshold: 0.25,
            max_results: 5,
            context_size: 3,
        }
    }
}

impl From<&ChatConfig> for ChatSettings {
    fn from(config: &ChatConfig) -> Self {
        Self {
            candidate_threshold: config.candidate_threshold,
            acceptance_threshold: config.acceptance_threshold,
            max_results: config.max_results,
            context_size: config.context_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChatOutcome {
    /// A stored answer scored at or above the acceptance threshold
    Matched { entry: QnaEntry, score: f32 },
    /// Nothing close enough and escalation was not requested
    NeedsEscalation { best_score: Option<f32> },
    Generated { answer: String, context_entries: usize },
}

/// Answers a chat question from the library, or from the completion service
/// when `use_grok` is set and no stored question is close enough.
pub async fn resolve(
    store: &dyn QnaStore,
    generator: &AnswerGenerator,
    settings: &ChatSettings,
    question: &str,
    use_grok: bool,
) -> AppResult<ChatOutcome> {
    let question = question.trim();
    if question.is_empty() {
        return Err(AppError::InvalidRequest("Question is required".to_string()));
    }

    let candidates = store
        .find_similar(question, settings.candidate_threshold, settings.max_results)
        .await?;
    let best_score = candidates.first().map(|c| c.score);
    debug!(candidates = candidates.len(), ?best_score, "Library lookup");

    if let Some(best) = candidates.first() {
        if best.score >= settings.acceptance_threshold {
            info!(id = best.entry.id, score = best.score, "Answered from library");
            return Ok(ChatOutcome::Matched {
                entry: best.entry.clone(),
                score: best.score,
            });
        }
    }

    if !use_grok {
        return Ok(ChatOutcome::NeedsEscalation { best_score });
    }

    let context = build_context(&candidates, settings.context_size);
    let context_entries = candidates.len().min(settings.context_size);
    let answer = generator.generate(question, context.as_deref()).await?;
    info!(context_entries, "Answered by completion service");

    Ok(ChatOutcome::Generated {
        answer,
        context_entries,
    })
}

/// Formats the top candidates as Q/A examples for the system prompt
pub fn build_context(candidates: &[ScoredEntry], limit: usize) -> Option<String> {
    if candidates.is_empty() || limit == 0 {
        return None;
    }

    let mut context = String::from(
        "Here are related questions and answers from the knowledge library. \
         Use them as a guide for tone and content where relevant:\n",
    );
    for candidate in candidates.iter().take(limit) {
        let _ = write!(
            context,
            "\nQ: {}\nA: {}\n",
            candidate.entry.question, candidate.entry.answer
        );
    }
    Some(context)
}
