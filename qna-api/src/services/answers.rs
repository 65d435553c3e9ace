use crate::config::LlmConfig;
use qna_llm_sdk::client::LlmClient;
use qna_llm_sdk::error::LlmError;
use qna_llm_sdk::types::CompletionRequest;
use std::sync::Arc;
use tracing::debug;

/// Turns a question (plus optional library context) into a generated answer
#[derive(Clone)]
pub struct AnswerGenerator {
    client: Arc<dyn LlmClient>,
    system_prompt: String,
    max_tokens: u32,
    temperature: Option<f32>,
}

impl AnswerGenerator {
    pub fn new(client: Arc<dyn LlmClient>, system_prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            client,
            system_prompt: system_prompt.into(),
            max_tokens,
            temperature: None,
        }
    }

    pub fn from_config(client: Arc<dyn LlmClient>, config: &LlmConfig) -> Self {
        Self {
            temperature: config.temperature,
            ..Self::new(client, config.system_prompt.clone(), config.max_tokens)
        }
    }

    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    /// The context block, when given, is appended to the system prompt
    pub async fn generate(&self, question: &str, context: Option<&str>) -> Result<String, LlmError> {
        let system = match context {
            Some(context) => format!("{}\n\n{}", self.system_prompt, context),
            None => self.system_prompt.clone(),
        };

        let request = CompletionRequest::new(question)
            .system(system)
            .max_tokens(self.max_tokens)
            .temperature(self.temperature);

        let response = self.client.complete(request).await?;
        debug!(
            provider = self.client.provider_name(),
            model = %response.model,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "Completion received"
        );

        let answer = response.text.trim().to_string();
        if answer.is_empty() {
            return Err(LlmError::invalid_response("completion service returned an empty answer"));
        }
        Ok(answer)
    }
}
