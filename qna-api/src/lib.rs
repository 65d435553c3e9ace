use crate::config::UploadConfig;
use crate::services::{AnswerGenerator, ChatSettings};
use crate::storage::QnaStore;
use std::sync::Arc;

pub mod assets;
pub mod config;
pub mod error;
pub mod handlers;
pub mod helpers;
pub mod logging;
pub mod models;
pub mod routes;
pub mod services;
pub mod storage;

/// Shared state handed to every handler through `web::Data`
pub struct AppState {
    pub store: Arc<dyn QnaStore>,
    pub answers: AnswerGenerator,
    pub chat: ChatSettings,
    pub upload: UploadConfig,
}
