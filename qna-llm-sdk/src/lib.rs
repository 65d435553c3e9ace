//! # QnA LLM SDK
//!
//! Completion client used by the QnA admin service to generate answers.
//! Currently ships a single provider, xAI Grok, behind the provider-agnostic
//! [`client::LlmClient`] trait.
//!
//! ## Example
//!
//! ```rust,no_run
//! use qna_llm_sdk::client::LlmClient;
//! use qna_llm_sdk::grok::GrokClient;
//! use qna_llm_sdk::types::CompletionRequest;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = GrokClient::new("your-xai-api-key")?;
//!     let request = CompletionRequest::new("What services do you provide?")
//!         .system("You answer RFP questions.")
//!         .max_tokens(1024);
//!
//!     let response = client.complete(request).await?;
//!     println!("Response: {}", response.text);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod grok;
pub mod types;
