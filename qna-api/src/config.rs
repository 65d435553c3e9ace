use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a claims/operations specialist at a Third-Party \
Administration company for medical and prescription claims, specializing in answering RFP \
(Request for Proposal) related questions. Provide clear, professional, and accurate responses.";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub chat: ChatConfig,
    pub upload: UploadConfig,
    pub logging: LoggingConfig,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    /// libpq-style mode; unset means verify-full unless the url carries `sslmode`
    pub ssl_mode: Option<String>,
    pub resolve_ipv4: bool,
    pub run_migrations: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    pub system_prompt: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ChatConfig {
    /// Minimum similarity for a stored question to be considered at all
    pub candidate_threshold: f32,
    /// Minimum similarity for the top candidate to be returned as the answer
    pub acceptance_threshold: f32,
    pub max_results: usize,
    /// Number of candidates passed to the completion service as examples
    pub context_size: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct UploadConfig {
    pub max_file_size: usize,
    /// Where uploads are spooled while processed; system temp dir when unset
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CorsConfig {
    /// Empty list allows any origin
    pub allowed_origins: Vec<String>,
}

impl ApiConfig {
    /// Loads defaults, then the config file, then `QNA__*` variables, then
    /// `DATABASE_URL`, `XAI_API_KEY` and `PORT`.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Self::defaults()?;

        match explicit_path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::Message(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                builder = builder.add_source(File::from(path.to_path_buf()));
            }
            None => {
                for path in default_config_paths() {
                    builder = builder.add_source(File::from(path).required(false));
                }
            }
        }

        let builder = builder
            .add_source(
                Environment::with_prefix("QNA")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .set_override_option("database.url", env::var("DATABASE_URL").ok())?
            .set_override_option("llm.api_key", env::var("XAI_API_KEY").ok())?
            .set_override_option("server.port", env::var("PORT").ok())?;

        Self::build(builder)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("database.max_connections", 10)?
            .set_default("database.acquire_timeout_secs", 10)?
            .set_default("database.resolve_ipv4", false)?
            .set_default("database.run_migrations", true)?
            .set_default("llm.model", qna_llm_sdk::grok::DEFAULT_MODEL)?
            .set_default("llm.max_tokens", 1024)?
            .set_default("llm.system_prompt", DEFAULT_SYSTEM_PROMPT)?
            .set_default("chat.candidate_threshold", 0.15)?
            .set_default("chat.acceptance_threshold", 0.25)?
            .set_default("chat.max_results", 5)?
            .set_default("chat.context_size", 3)?
            .set_default("upload.max_file_size", 10 * 1024 * 1024)?
            .set_default("logging.level", "info")?
            .set_default("cors.allowed_origins", Vec::<String>::new())
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let mut config: ApiConfig = builder.build()?.try_deserialize()?;

        config.logging.dir = config.logging.dir.map(expand_home);
        config.upload.dir = config.upload.dir.map(expand_home);

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let chat = &self.chat;
        for (name, value) in [
            ("candidate_threshold", chat.candidate_threshold),
            ("acceptance_threshold", chat.acceptance_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Message(format!(
                    "chat.{name} must be between 0 and 1, got {value}"
                )));
            }
        }
        if chat.candidate_threshold > chat.acceptance_threshold {
            return Err(ConfigError::Message(
                "chat.candidate_threshold cannot exceed chat.acceptance_threshold".to_string(),
            ));
        }
        if chat.max_results == 0 {
            return Err(ConfigError::Message(
                "chat.max_results must be at least 1".to_string(),
            ));
        }
        if self.upload.max_file_size == 0 {
            return Err(ConfigError::Message(
                "upload.max_file_size must be at least 1 byte".to_string(),
            ));
        }
        Ok(())
    }
}

fn expand_home(path: PathBuf) -> PathBuf {
    if let (Ok(rest), Some(home)) = (path.strip_prefix("~"), dirs::home_dir()) {
        return home.join(rest);
    }
    path
}

fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("qna-admin/api.toml"));
    }
    if let Ok(current_dir) = env::current_dir() {
        paths.push(current_dir.join("qna.toml"));
    }
    paths
}
