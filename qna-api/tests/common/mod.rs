#![allow(dead_code)]

use actix_web::http::header;
use actix_web::{test, web, App};
use qna_api::config::UploadConfig;
use qna_api::models::{NewQnaEntry, QnaEntry, ScoredEntry};
use qna_api::routes::{configure_routes, json_config};
use qna_api::services::{AnswerGenerator, ChatSettings};
use qna_api::storage::{InMemoryQnaStore, QnaStore, StorageError};
use qna_api::AppState;
use qna_llm_sdk::client::LlmClient;
use qna_llm_sdk::error::LlmError;
use qna_llm_sdk::types::{CompletionRequest, CompletionResponse, Usage};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Questions containing this marker make the mock client fail
pub const FAIL_MARKER: &str = "FAIL";

/// Inserts of questions containing this marker fail in [`RejectingStore`]
pub const REJECT_MARKER: &str = "REJECT";

pub const BOUNDARY: &str = "qna-test-boundary";

pub struct TestApp<S> {
    pub store: Arc<InMemoryQnaStore>,
    pub mock_llm_client: Arc<MockLlmClient>,
    pub upload_dir: TempDir,
    pub app: S,
}

pub struct MockLlmClient {
    pub requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        MockLlmClient {
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn get_call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_system_prompt(&self) -> Option<String> {
        self.requests
            .lock()
            .unwrap()
            .last()
            .and_then(|r| r.system.clone())
    }
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let prompt = request.prompt.clone();
        self.requests.lock().unwrap().push(request);

        if prompt.contains(FAIL_MARKER) {
            return Err(LlmError::api(503, "upstream unavailable"));
        }

        Ok(create_completion_response_with_text(&format!(
            "Generated answer for: {prompt}"
        )))
    }

    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

pub fn create_completion_response_with_text(text: &str) -> CompletionResponse {
    CompletionResponse {
        text: text.to_string(),
        model: "mock-model".to_string(),
        usage: Usage {
            input_tokens: 10,
            output_tokens: 20,
        },
        finish_reason: Some("stop".to_string()),
    }
}

pub fn answer_generator(client: Arc<MockLlmClient>) -> AnswerGenerator {
    AnswerGenerator::new(client, "You answer RFP questions.", 256)
}

/// Delegates to an in-memory store but refuses inserts carrying
/// [`REJECT_MARKER`], the way a constraint violation would.
pub struct RejectingStore {
    inner: Arc<InMemoryQnaStore>,
}

#[async_trait::async_trait]
impl QnaStore for RejectingStore {
    async fn list(&self) -> Result<Vec<QnaEntry>, StorageError> {
        self.inner.list().await
    }

    async fn insert(&self, entry: NewQnaEntry) -> Result<QnaEntry, StorageError> {
        if entry.question.contains(REJECT_MARKER) {
            return Err(StorageError::OperationFailed(
                "insert rejected by constraint".to_string(),
            ));
        }
        self.inner.insert(entry).await
    }

    async fn delete(&self, id: i64) -> Result<bool, StorageError> {
        self.inner.delete(id).await
    }

    async fn find_similar(
        &self,
        question: &str,
        min_score: f32,
        limit: usize,
    ) -> Result<Vec<ScoredEntry>, StorageError> {
        self.inner.find_similar(question, min_score, limit).await
    }

    async fn ping(&self) -> Result<(), StorageError> {
        self.inner.ping().await
    }
}

pub async fn setup_test_app() -> anyhow::Result<
    TestApp<
        impl actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
        >,
    >,
> {
    build_test_app(false).await
}

/// Like [`setup_test_app`], but inserts of marked questions fail
pub async fn setup_test_app_rejecting_inserts() -> anyhow::Result<
    TestApp<
        impl actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
        >,
    >,
> {
    build_test_app(true).await
}

async fn build_test_app(reject_marked_inserts: bool) -> anyhow::Result<
    TestApp<
        impl actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
        >,
    >,
> {
    let store = Arc::new(InMemoryQnaStore::new());
    let mock_llm_client = Arc::new(MockLlmClient::new());
    let upload_dir = TempDir::new()?;
    let max_file_size = 64 * 1024;

    let app_store: Arc<dyn QnaStore> = if reject_marked_inserts {
        Arc::new(RejectingStore {
            inner: store.clone(),
        })
    } else {
        store.clone()
    };

    let state = web::Data::new(AppState {
        store: app_store,
        answers: answer_generator(mock_llm_client.clone()),
        chat: ChatSettings::default(),
        upload: UploadConfig {
            max_file_size,
            dir: Some(upload_dir.path().to_path_buf()),
        },
    });

    let app = test::init_service(
        App::new()
            .app_data(state)
            .app_data(json_config(max_file_size))
            .configure(configure_routes),
    )
    .await;

    Ok(TestApp {
        store,
        mock_llm_client,
        upload_dir,
        app,
    })
}

pub async fn seed(store: &InMemoryQnaStore, question: &str, answer: &str) -> i64 {
    store
        .insert(NewQnaEntry {
            question: question.to_string(),
            answer: answer.to_string(),
            category: Some("General".to_string()),
            subcategory: None,
        })
        .await
        .unwrap()
        .id
}

pub fn multipart_body(filename: &str, content: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
         Content-Type: text/csv\r\n\
         \r\n"
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn upload_request(uri: &str, filename: &str, content: &str) -> test::TestRequest {
    upload_bytes_request(uri, filename, content.as_bytes())
}

/// Upload of raw file bytes, for content that is not valid UTF-8
pub fn upload_bytes_request(uri: &str, filename: &str, content: &[u8]) -> test::TestRequest {
    test::TestRequest::post()
        .uri(uri)
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        ))
        .set_payload(multipart_body(filename, content))
}

pub fn files_in(dir: &TempDir) -> usize {
    std::fs::read_dir(dir.path()).unwrap().count()
}
