use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Category stamped on rows created from CSV uploads
pub const CSV_UPLOAD_CATEGORY: &str = "CSV Upload";

/// One stored question/answer pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct QnaEntry {
    pub id: i64,
    pub question: String,
    pub answer: String,
    pub category: Option<String>,
    pub subcategory: Option<String>,
}

/// Insert payload; the id is assigned by the store
#[derive(Debug, Clone, PartialEq)]
pub struct NewQnaEntry {
    pub question: String,
    pub answer: String,
    pub category: Option<String>,
    pub subcategory: Option<String>,
}

impl NewQnaEntry {
    pub fn from_csv(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            category: Some(CSV_UPLOAD_CATEGORY.to_string()),
            subcategory: None,
        }
    }
}

/// A stored entry with its similarity to a query
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredEntry {
    pub entry: QnaEntry,
    pub score: f32,
}

#[derive(Debug, Deserialize)]
pub struct AddQuestionRequest {
    pub question: Option<String>,
    pub answer: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub use_grok: bool,
}

/// Where a chat answer came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerSource {
    Database,
    Grok,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    #[serde(rename = "match")]
    pub answer: Option<String>,
    pub source: Option<AnswerSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ask_for_grok: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProcessCsvQuery {
    #[serde(default)]
    pub preview: bool,
}

/// Question/answer pair exchanged with the review screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvRow {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessCsvResponse {
    pub success: bool,
    pub message: String,
    pub questions_processed: usize,
    pub failed: usize,
    pub data: Vec<CsvRow>,
}

#[derive(Debug, Deserialize)]
pub struct CommitCsvRequest {
    #[serde(default)]
    pub data: Vec<CsvRow>,
}

#[derive(Debug, Serialize)]
pub struct CommitCsvResponse {
    pub success: bool,
    pub message: String,
    pub committed: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}
