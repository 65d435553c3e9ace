//! xAI Grok provider.

pub mod client;
mod types;

pub use client::GrokClient;

pub const PROVIDER: &str = "xai";
pub const DEFAULT_MODEL: &str = "grok-3-beta";
