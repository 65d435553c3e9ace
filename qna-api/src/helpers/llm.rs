use crate::config::LlmConfig;
use anyhow::anyhow;
use qna_llm_sdk::client::LlmClient;
use qna_llm_sdk::grok::GrokClient;
use std::sync::Arc;

pub fn create_llm_client(config: &LlmConfig) -> anyhow::Result<Arc<dyn LlmClient>> {
    let api_key = config
        .api_key
        .clone()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| anyhow!("No API key found. Set XAI_API_KEY or [llm].api_key."))?;

    let mut client = GrokClient::new(api_key)?.with_model(config.model.clone());
    if let Some(base_url) = &config.base_url {
        client = client.with_base_url(base_url.clone());
    }

    Ok(Arc::new(client))
}
